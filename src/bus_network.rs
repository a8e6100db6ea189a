use anyhow::Result;
use itertools::Itertools;
use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub lat: f64,
    pub lng: f64,
}

impl Location {
    pub fn new(lat: f64, lng: f64) -> Self {
        Location { lat, lng }
    }

    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BusStop {
    pub id: String,
    pub name: String,
    pub location: Location,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BusRoute {
    pub id: String,
    pub name: String,
    /// Any CSS color the map widget understands, e.g. `#ff0000` or `red`.
    pub color: String,
    pub stops: Vec<BusStop>,
    /// Polyline drawn for the route, in travel order.
    pub path: Vec<Location>,
}

/// The loaded dataset. Routes keep the order they had in the data file, which
/// is also the order of the route list.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BusNetwork {
    routes: Vec<BusRoute>,
}

impl BusNetwork {
    pub fn new(routes: Vec<BusRoute>) -> Self {
        BusNetwork { routes }
    }

    pub fn empty() -> Self {
        BusNetwork { routes: Vec::new() }
    }

    pub fn from_json(data: &str) -> Result<Self> {
        let network: BusNetwork = serde_json::from_str(data)?;
        network.validate()?;
        Ok(network)
    }

    pub fn routes(&self) -> &[BusRoute] {
        &self.routes
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn route_count(&self) -> usize {
        self.routes.len()
    }

    pub fn stop_count(&self) -> usize {
        self.routes.iter().map(|route| route.stops.len()).sum()
    }

    pub fn route(&self, route_id: &str) -> Option<&BusRoute> {
        self.routes.iter().find(|route| route.id == route_id)
    }

    /// Stop ids are only unique within their route, so a stop is looked up
    /// through the route that lists it.
    pub fn stop(&self, route_id: &str, stop_id: &str) -> Option<&BusStop> {
        self.route(route_id)?
            .stops
            .iter()
            .find(|stop| stop.id == stop_id)
    }

    /// Every stop in the network, paired with the route it belongs to.
    pub fn stops(&self) -> impl Iterator<Item = (&BusRoute, &BusStop)> {
        self.routes
            .iter()
            .flat_map(|route| route.stops.iter().map(move |stop| (route, stop)))
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(id) = self.routes.iter().map(|route| &route.id).duplicates().next() {
            bail!("duplicated route id `{}`", id);
        }
        for route in &self.routes {
            if let Some(id) = route.stops.iter().map(|stop| &stop.id).duplicates().next() {
                bail!("duplicated stop id `{}` in route `{}`", id, route.id);
            }
        }
        for (route, stop) in self.stops() {
            if !stop.location.is_valid() {
                bail!(
                    "stop `{}` of route `{}` has an invalid location ({}, {})",
                    stop.id,
                    route.id,
                    stop.location.lat,
                    stop.location.lng
                );
            }
        }
        for route in &self.routes {
            if let Some(point) = route.path.iter().find(|point| !point.is_valid()) {
                bail!(
                    "path of route `{}` has an invalid point ({}, {})",
                    route.id,
                    point.lat,
                    point.lng
                );
            }
        }
        Ok(())
    }
}
