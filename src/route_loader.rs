use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::bus_network::BusNetwork;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RouteSource {
    File(PathBuf),
    Http(String),
}

impl RouteSource {
    /// Resolves the logical data path (e.g. `/data/busRoutes.json`) against a
    /// base that is either a local directory or an http(s) URL.
    pub fn resolve(base: &str, data_path: &str) -> Self {
        let relative = data_path.trim_start_matches('/');
        if base.starts_with("http://") || base.starts_with("https://") {
            RouteSource::Http(format!("{}/{}", base.trim_end_matches('/'), relative))
        } else {
            RouteSource::File(Path::new(base).join(relative))
        }
    }
}

impl fmt::Display for RouteSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteSource::File(path) => write!(f, "{}", path.display()),
            RouteSource::Http(url) => write!(f, "{url}"),
        }
    }
}

/// Reads and parses the whole dataset. One bad route fails the whole load.
pub fn fetch_bus_routes(source: &RouteSource) -> Result<BusNetwork> {
    let content = match source {
        RouteSource::File(path) => fs::read_to_string(path)
            .with_context(|| format!("reading bus routes from {}", path.display()))?,
        RouteSource::Http(url) => reqwest::blocking::get(url)
            .and_then(|response| response.error_for_status())
            .and_then(|response| response.text())
            .with_context(|| format!("fetching bus routes from {url}"))?,
    };
    BusNetwork::from_json(&content).with_context(|| format!("parsing bus routes from {source}"))
}

/// Same as `fetch_bus_routes`, except that failures are only logged and an
/// empty network is returned. There is no retry.
pub fn load_bus_routes(source: &RouteSource) -> BusNetwork {
    match fetch_bus_routes(source) {
        Ok(network) => {
            info!(
                "[route_loader] loaded {} routes / {} stops from {}",
                network.route_count(),
                network.stop_count(),
                source
            );
            network
        }
        Err(e) => {
            error!("[route_loader] Error loading bus routes data: {e:?}");
            BusNetwork::empty()
        }
    }
}
