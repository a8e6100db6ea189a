use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};

use crate::bus_network::{BusNetwork, Location};
use crate::config::{ContainerStyle, MapConfig};
use crate::selection::Selection;

pub const PATH_STROKE_WEIGHT: u32 = 3;
pub const DIMMED_PATH_OPACITY: f64 = 0.3;
pub const DIMMED_MARKER_OPACITY: f64 = 0.5;
pub const MARKER_ICON_SIZE: u32 = 30;

const MARKER_ICON_URL_PREFIX: &str = "http://maps.google.com/mapfiles/ms/icons";

/// Colors available as stock marker icons on the widget side.
#[derive(
    Copy,
    Clone,
    Debug,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumString,
    EnumIter,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MarkerColor {
    Red,
    Blue,
    Green,
    Yellow,
    Purple,
    Orange,
    Pink,
    Ltblue,
}

impl MarkerColor {
    pub fn icon_url(&self) -> String {
        format!("{MARKER_ICON_URL_PREFIX}/{self}-dot.png")
    }
}

lazy_static! {
    static ref DEFAULT_MARKER_ICONS: MarkerIconTable = MarkerIconTable {
        colors: BTreeMap::from([
            ("route1".to_string(), MarkerColor::Red),
            ("route2".to_string(), MarkerColor::Blue),
        ]),
        fallback: MarkerColor::Green,
    };
}

/// Route id -> marker color. Routes without an entry use `fallback`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MarkerIconTable {
    pub colors: BTreeMap<String, MarkerColor>,
    pub fallback: MarkerColor,
}

impl Default for MarkerIconTable {
    fn default() -> Self {
        DEFAULT_MARKER_ICONS.clone()
    }
}

impl MarkerIconTable {
    pub fn color_for(&self, route_id: &str) -> MarkerColor {
        self.colors.get(route_id).copied().unwrap_or(self.fallback)
    }
}

/// User input coming back from the map widget or the route list.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum MapEvent {
    #[serde(rename_all = "camelCase")]
    RouteClicked { route_id: String },
    /// Stop ids are scoped to their route.
    #[serde(rename_all = "camelCase")]
    StopClicked { route_id: String, stop_id: String },
    PopupClosed,
    WidgetLoaded,
    WidgetFailed { reason: String },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PathOverlay {
    pub key: String,
    pub path: Vec<Location>,
    pub stroke_color: String,
    pub stroke_opacity: f64,
    pub stroke_weight: u32,
    pub on_click: MapEvent,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub struct IconSize {
    pub width: u32,
    pub height: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkerIcon {
    pub url: String,
    pub scaled_size: IconSize,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkerOverlay {
    /// `<route id>:<stop id>`, unique across the scene.
    pub key: String,
    pub route_id: String,
    pub stop_id: String,
    pub position: Location,
    pub opacity: f64,
    pub icon: MarkerIcon,
    pub on_click: MapEvent,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PopupOverlay {
    pub position: Location,
    pub title: String,
    pub on_close: MapEvent,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteListItem {
    pub id: String,
    pub name: String,
    pub color: String,
    pub selected: bool,
    pub on_click: MapEvent,
}

/// Everything the map widget needs to draw one frame.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MapScene {
    pub container: ContainerStyle,
    pub center: Location,
    pub zoom: u8,
    pub paths: Vec<PathOverlay>,
    pub markers: Vec<MarkerOverlay>,
    pub popup: Option<PopupOverlay>,
}

/// Full opacity when nothing is selected or `route_id` is the selected route.
pub fn emphasis(selection: &Selection, route_id: &str, dimmed_opacity: f64) -> f64 {
    match selection.selected_route() {
        Some(selected) if selected != route_id => dimmed_opacity,
        _ => 1.0,
    }
}

pub fn project_scene(network: &BusNetwork, selection: &Selection, config: &MapConfig) -> MapScene {
    let paths = network
        .routes()
        .iter()
        .map(|route| PathOverlay {
            key: route.id.clone(),
            path: route.path.clone(),
            stroke_color: route.color.clone(),
            stroke_opacity: emphasis(selection, &route.id, DIMMED_PATH_OPACITY),
            stroke_weight: PATH_STROKE_WEIGHT,
            on_click: MapEvent::RouteClicked {
                route_id: route.id.clone(),
            },
        })
        .collect();

    let markers = network
        .stops()
        .map(|(route, stop)| MarkerOverlay {
            key: format!("{}:{}", route.id, stop.id),
            route_id: route.id.clone(),
            stop_id: stop.id.clone(),
            position: stop.location,
            opacity: emphasis(selection, &route.id, DIMMED_MARKER_OPACITY),
            icon: MarkerIcon {
                url: config.marker_icons.color_for(&route.id).icon_url(),
                scaled_size: IconSize {
                    width: MARKER_ICON_SIZE,
                    height: MARKER_ICON_SIZE,
                },
            },
            on_click: MapEvent::StopClicked {
                route_id: route.id.clone(),
                stop_id: stop.id.clone(),
            },
        })
        .collect();

    let popup = selection.selected_stop().map(|stop| PopupOverlay {
        position: stop.location,
        title: stop.name.clone(),
        on_close: MapEvent::PopupClosed,
    });

    MapScene {
        container: config.container.clone(),
        center: config.center,
        zoom: config.zoom,
        paths,
        markers,
        popup,
    }
}

pub fn project_route_list(network: &BusNetwork, selection: &Selection) -> Vec<RouteListItem> {
    network
        .routes()
        .iter()
        .map(|route| RouteListItem {
            id: route.id.clone(),
            name: route.name.clone(),
            color: route.color.clone(),
            selected: selection.is_route_selected(&route.id),
            on_click: MapEvent::RouteClicked {
                route_id: route.id.clone(),
            },
        })
        .collect()
}
