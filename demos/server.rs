use busmap_core::config::MapConfig;
use busmap_core::renderer::{BusMapView, MapServer};

use std::sync::{Arc, Mutex};
use std::time::Duration;

pub fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize the logger with info level
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .format_module_path(false)
        .init();

    let mut server = MapServer::new("localhost", 0).with_data_dir("./tests/data");
    server.start()?;

    // the view fetches its dataset from the server it is served by
    let mut config = MapConfig::load(None)?;
    config.data_base = server.data_base_url();
    config.data_path = "/data/bus_routes.json".to_string();
    if !config.has_credential() {
        println!("BUSMAP_MAPS_API_KEY is not set, the widget will report a load error.");
    }

    let view = Arc::new(Mutex::new(BusMapView::new(config)));
    let token = server.register(&view);
    BusMapView::mount_shared(&view)?;

    println!("================================================");
    println!("[Bus Map Frame]:    {}/frame", token.url());
    println!("[Bus Map Events]:   {}/events", token.url());
    println!("[Widget Settings]:  {}/widget.json", token.url());
    println!(
        "[Dataset]:          {}/data/bus_routes.json",
        server.data_base_url()
    );
    println!("Press Ctrl+C to exit");

    // Block the main thread to keep server running
    loop {
        std::thread::sleep(Duration::from_secs(1));
    }
}
