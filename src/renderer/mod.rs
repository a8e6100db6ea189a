pub mod bus_map_view;
pub use bus_map_view::BusMapView;

pub mod map_scene;

pub mod map_server;
pub use map_server::MapServer;
