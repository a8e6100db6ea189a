#![allow(dead_code)]

use busmap_core::bus_network::{BusNetwork, BusRoute, BusStop, Location};
use busmap_core::config::MapConfig;
use std::fs;
use std::path::Path;

pub const SAMPLE_DATA_DIR: &str = "./tests/data";
pub const SAMPLE_DATASET: &str = "./tests/data/bus_routes.json";

pub fn load_sample_network() -> BusNetwork {
    let content = fs::read_to_string(SAMPLE_DATASET).unwrap();
    BusNetwork::from_json(&content).unwrap()
}

pub fn stop(id: &str, lat: f64, lng: f64) -> BusStop {
    BusStop {
        id: id.to_string(),
        name: format!("Stop {id}"),
        location: Location::new(lat, lng),
    }
}

pub fn route(id: &str, color: &str, stops: Vec<BusStop>) -> BusRoute {
    let path = stops.iter().map(|stop| stop.location).collect();
    BusRoute {
        id: id.to_string(),
        name: format!("Route {id}"),
        color: color.to_string(),
        stops,
        path,
    }
}

/// `[{id:"route1", stops:[{id:"s1", location:{lat:12.24,lng:109.2}}], color:"red"}]`
pub fn single_route_network() -> BusNetwork {
    BusNetwork::new(vec![BusRoute {
        id: "route1".to_string(),
        name: "Route 1".to_string(),
        color: "red".to_string(),
        stops: vec![BusStop {
            id: "s1".to_string(),
            name: "Stop 1".to_string(),
            location: Location::new(12.24, 109.2),
        }],
        path: vec![Location::new(12.24, 109.2), Location::new(12.25, 109.21)],
    }])
}

/// Two routes that both list a stop with id `hub`, on opposite sides of the
/// street.
pub fn shared_stop_network() -> BusNetwork {
    let hub = |name: &str, lat: f64, lng: f64| BusStop {
        id: "hub".to_string(),
        name: name.to_string(),
        location: Location::new(lat, lng),
    };
    BusNetwork::new(vec![
        route(
            "route1",
            "red",
            vec![stop("a", 12.20, 109.19), hub("Hub northbound", 12.2401, 109.1960)],
        ),
        route(
            "route2",
            "blue",
            vec![hub("Hub southbound", 12.2399, 109.1962), stop("b", 12.27, 109.20)],
        ),
    ])
}

/// Config whose data path points at `file_name` inside `dir`.
pub fn config_for_data_file(dir: &Path, file_name: &str) -> MapConfig {
    MapConfig {
        data_base: dir.to_str().unwrap().to_string(),
        data_path: format!("/{file_name}"),
        ..MapConfig::default()
    }
}
