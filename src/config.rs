use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::bus_network::Location;
use crate::renderer::map_scene::MarkerIconTable;
use crate::route_loader::RouteSource;

pub const API_KEY_ENV: &str = "BUSMAP_MAPS_API_KEY";
pub const DATA_BASE_ENV: &str = "BUSMAP_DATA_BASE";

/// What the widget gets when no key is configured. The widget rejects it and
/// reports a load failure, which ends up as the blocking error frame.
pub const PLACEHOLDER_API_KEY: &str = "YOUR_GOOGLE_MAPS_API_KEY";

// Nha Trang
const DEFAULT_CENTER: Location = Location {
    lat: 12.2388,
    lng: 109.1967,
};
const DEFAULT_ZOOM: u8 = 13;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerStyle {
    pub width: String,
    pub height: String,
}

impl Default for ContainerStyle {
    fn default() -> Self {
        ContainerStyle {
            width: "100%".to_string(),
            height: "100vh".to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UiStrings {
    pub title: String,
    pub loading: String,
    pub load_error: String,
}

impl Default for UiStrings {
    fn default() -> Self {
        UiStrings {
            title: "Các tuyến xe buýt Nha Trang".to_string(),
            loading: "Đang tải bản đồ...".to_string(),
            load_error: "Có lỗi khi tải Google Maps".to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    pub api_key: String,
    pub widget_script_id: String,
    pub container: ContainerStyle,
    pub center: Location,
    pub zoom: u8,
    /// Directory or http(s) URL the data path is resolved against.
    pub data_base: String,
    pub data_path: String,
    pub marker_icons: MarkerIconTable,
    pub strings: UiStrings,
}

impl Default for MapConfig {
    fn default() -> Self {
        MapConfig {
            api_key: PLACEHOLDER_API_KEY.to_string(),
            widget_script_id: "google-map-script".to_string(),
            container: ContainerStyle::default(),
            center: DEFAULT_CENTER,
            zoom: DEFAULT_ZOOM,
            data_base: ".".to_string(),
            data_path: "/data/busRoutes.json".to_string(),
            marker_icons: MarkerIconTable::default(),
            strings: UiStrings::default(),
        }
    }
}

impl MapConfig {
    /// Defaults, then the optional JSON file, then environment variables.
    pub fn load(config_file: Option<&Path>) -> Result<Self> {
        let mut config = match config_file {
            None => MapConfig::default(),
            Some(path) => {
                let content = fs::read_to_string(path)
                    .with_context(|| format!("reading config file {}", path.display()))?;
                serde_json::from_str(&content)
                    .with_context(|| format!("parsing config file {}", path.display()))?
            }
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(api_key) = lookup(API_KEY_ENV).filter(|x| !x.trim().is_empty()) {
            self.api_key = api_key;
        }
        if let Some(data_base) = lookup(DATA_BASE_ENV).filter(|x| !x.trim().is_empty()) {
            self.data_base = data_base;
        }
    }

    pub fn has_credential(&self) -> bool {
        !self.api_key.trim().is_empty() && self.api_key != PLACEHOLDER_API_KEY
    }

    pub fn route_source(&self) -> RouteSource {
        RouteSource::resolve(&self.data_base, &self.data_path)
    }

    pub fn widget_settings(&self) -> WidgetSettings {
        WidgetSettings {
            api_key: self.api_key.clone(),
            script_id: self.widget_script_id.clone(),
            container: self.container.clone(),
            center: self.center,
            zoom: self.zoom,
        }
    }
}

/// Bootstrap settings handed to the map widget before any overlay is drawn.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetSettings {
    pub api_key: String,
    pub script_id: String,
    pub container: ContainerStyle,
    pub center: Location,
    pub zoom: u8,
}
