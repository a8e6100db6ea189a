use std::sync::{Arc, Mutex};

use anyhow::Result;
use serde::Serialize;

use crate::bus_network::BusNetwork;
use crate::config::MapConfig;
use crate::renderer::map_scene::{self, MapEvent, MapScene, RouteListItem};
use crate::route_loader::{self, RouteSource};
use crate::selection::Selection;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WidgetStatus {
    Loading,
    Ready,
    Failed(String),
}

/// What the frontend should show right now.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum ViewFrame {
    /// The widget could not be loaded. Nothing else is shown for the rest of
    /// the session.
    LoadError { message: String },
    Loading { message: String },
    Ready {
        title: String,
        routes: Vec<RouteListItem>,
        scene: MapScene,
    },
}

pub struct BusMapView {
    config: MapConfig,
    network: BusNetwork,
    selection: Selection,
    widget_status: WidgetStatus,
    mounted: bool,
    version: u64,
}

impl BusMapView {
    pub fn new(config: MapConfig) -> Self {
        if !config.has_credential() {
            warn!("[bus_map_view] no map API key configured, the map widget is expected to fail");
        }
        BusMapView {
            config,
            network: BusNetwork::empty(),
            selection: Selection::new(),
            widget_status: WidgetStatus::Loading,
            mounted: false,
            version: 0,
        }
    }

    /// A view that is already mounted on `network`. No fetch happens.
    pub fn with_network(config: MapConfig, network: BusNetwork) -> Self {
        let mut view = Self::new(config);
        view.network = network;
        view.mounted = true;
        view
    }

    /// Fetches the dataset once. A failed fetch leaves the network empty.
    pub fn mount(&mut self) {
        if let Some(source) = self.begin_mount() {
            let network = route_loader::load_bus_routes(&source);
            self.finish_mount(network);
        }
    }

    /// Same as `mount` for a view shared with the map server. The lock is not
    /// held during the fetch, so the server keeps answering (including the
    /// dataset request itself when it serves the data).
    pub fn mount_shared(view: &Arc<Mutex<BusMapView>>) -> Result<()> {
        let source = view
            .lock()
            .map_err(|_| anyhow!("bus map view lock is poisoned"))?
            .begin_mount();
        if let Some(source) = source {
            let network = route_loader::load_bus_routes(&source);
            view.lock()
                .map_err(|_| anyhow!("bus map view lock is poisoned"))?
                .finish_mount(network);
        }
        Ok(())
    }

    /// Marks the view as mounted and returns where to fetch from, or `None`
    /// if it was mounted before.
    pub fn begin_mount(&mut self) -> Option<RouteSource> {
        if self.mounted {
            warn!("[bus_map_view] `mount` is called multiple times");
            return None;
        }
        self.mounted = true;
        Some(self.config.route_source())
    }

    pub fn finish_mount(&mut self, network: BusNetwork) {
        self.network = network;
        self.bump_version();
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    pub fn config(&self) -> &MapConfig {
        &self.config
    }

    pub fn network(&self) -> &BusNetwork {
        &self.network
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn widget_status(&self) -> &WidgetStatus {
        &self.widget_status
    }

    /// Returns whether the view changed.
    pub fn handle_event(&mut self, event: &MapEvent) -> bool {
        debug!("[bus_map_view] event: {event:?}");
        match event {
            MapEvent::RouteClicked { route_id } => self.on_route_click(route_id),
            MapEvent::StopClicked { route_id, stop_id } => self.on_stop_click(route_id, stop_id),
            MapEvent::PopupClosed => self.on_popup_close(),
            MapEvent::WidgetLoaded => self.on_widget_loaded(),
            MapEvent::WidgetFailed { reason } => self.on_widget_failed(reason),
        }
    }

    pub fn on_route_click(&mut self, route_id: &str) -> bool {
        if self.network.route(route_id).is_none() {
            warn!("[bus_map_view] ignoring click on unknown route `{route_id}`");
            return false;
        }
        self.selection.toggle_route(route_id);
        self.bump_version();
        true
    }

    pub fn on_stop_click(&mut self, route_id: &str, stop_id: &str) -> bool {
        match self.network.stop(route_id, stop_id) {
            None => {
                warn!("[bus_map_view] ignoring click on unknown stop `{stop_id}` of route `{route_id}`");
                false
            }
            Some(stop) => {
                self.selection.select_stop(stop.clone());
                self.bump_version();
                true
            }
        }
    }

    pub fn on_popup_close(&mut self) -> bool {
        if self.selection.selected_stop().is_none() {
            return false;
        }
        self.selection.dismiss_popup();
        self.bump_version();
        true
    }

    pub fn on_widget_loaded(&mut self) -> bool {
        match self.widget_status {
            WidgetStatus::Loading => {
                info!("[bus_map_view] map widget loaded");
                self.widget_status = WidgetStatus::Ready;
                self.bump_version();
                true
            }
            WidgetStatus::Ready => false,
            WidgetStatus::Failed(_) => {
                warn!("[bus_map_view] widget reported loaded after a failure, ignoring");
                false
            }
        }
    }

    pub fn on_widget_failed(&mut self, reason: &str) -> bool {
        error!("[bus_map_view] map widget failed to load: {reason}");
        if matches!(self.widget_status, WidgetStatus::Failed(_)) {
            return false;
        }
        self.widget_status = WidgetStatus::Failed(reason.to_string());
        self.bump_version();
        true
    }

    pub fn scene(&self) -> MapScene {
        map_scene::project_scene(&self.network, &self.selection, &self.config)
    }

    pub fn route_list(&self) -> Vec<RouteListItem> {
        map_scene::project_route_list(&self.network, &self.selection)
    }

    pub fn frame(&self) -> ViewFrame {
        let strings = &self.config.strings;
        match self.widget_status {
            WidgetStatus::Failed(_) => ViewFrame::LoadError {
                message: strings.load_error.clone(),
            },
            WidgetStatus::Loading => ViewFrame::Loading {
                message: strings.loading.clone(),
            },
            WidgetStatus::Ready => ViewFrame::Ready {
                title: strings.title.clone(),
                routes: self.route_list(),
                scene: self.scene(),
            },
        }
    }

    fn bump_version(&mut self) {
        self.version = self.version.wrapping_add(1);
    }

    pub fn get_current_version(&self) -> u64 {
        self.version
    }

    pub fn get_version_string(&self) -> String {
        format!("\"{:x}\"", self.version)
    }

    pub fn parse_version_string(version_str: &str) -> Option<u64> {
        let cleaned = version_str.trim_matches('"');
        u64::from_str_radix(cleaned, 16).ok()
    }

    /// `None` when the client already has the current frame.
    pub fn frame_if_changed(&self, client_version: Option<&str>) -> Option<(ViewFrame, String)> {
        match client_version {
            Some(v_str) if Self::parse_version_string(v_str) == Some(self.version) => None,
            _ => Some((self.frame(), self.get_version_string())),
        }
    }
}
