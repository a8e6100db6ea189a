use crate::bus_network::BusStop;

/// The two pieces of UI state. They are independent: touching one never
/// changes the other.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Selection {
    route_id: Option<String>,
    stop: Option<BusStop>,
}

impl Selection {
    pub fn new() -> Self {
        Selection {
            route_id: None,
            stop: None,
        }
    }

    pub fn selected_route(&self) -> Option<&str> {
        self.route_id.as_deref()
    }

    pub fn selected_stop(&self) -> Option<&BusStop> {
        self.stop.as_ref()
    }

    pub fn is_route_selected(&self, route_id: &str) -> bool {
        self.route_id.as_deref() == Some(route_id)
    }

    /// Clicking the selected route clears it, any other route replaces it.
    pub fn toggle_route(&mut self, route_id: &str) {
        if self.is_route_selected(route_id) {
            self.route_id = None;
        } else {
            self.route_id = Some(route_id.to_string());
        }
    }

    pub fn select_stop(&mut self, stop: BusStop) {
        self.stop = Some(stop);
    }

    pub fn dismiss_popup(&mut self) {
        self.stop = None;
    }
}
