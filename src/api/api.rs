use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};

use anyhow::Result;

use crate::config::MapConfig;
use crate::logs;
use crate::renderer::bus_map_view::{BusMapView, ViewFrame};
use crate::renderer::map_server::{MapServer, Token};

struct ServerSession {
    // dropped before the server so the view is unregistered first
    token: Token,
    server: MapServer,
}

struct MainState {
    cache_dir: String,
    view: Arc<Mutex<BusMapView>>,
    server_session: Mutex<Option<ServerSession>>,
}

static MAIN_STATE: OnceLock<MainState> = OnceLock::new();

pub fn init(cache_dir: String, config_file: Option<String>) -> Result<()> {
    if MAIN_STATE.get().is_some() {
        warn!("`init` is called multiple times");
        return Ok(());
    }
    // the logger can only be installed once, so nothing may fail after it
    let config = MapConfig::load(config_file.as_deref().map(Path::new))?;
    logs::init(&cache_dir)?;
    let state = MainState {
        cache_dir,
        view: Arc::new(Mutex::new(BusMapView::new(config))),
        server_session: Mutex::new(None),
    };
    if MAIN_STATE.set(state).is_err() {
        warn!("`init` raced with another `init`");
    }
    info!("initialized");
    Ok(())
}

fn get() -> Result<&'static MainState> {
    MAIN_STATE
        .get()
        .ok_or_else(|| anyhow!("main state is not initialized"))
}

fn view() -> Result<MutexGuard<'static, BusMapView>> {
    get()?
        .view
        .lock()
        .map_err(|_| anyhow!("bus map view lock is poisoned"))
}

/// Loads the route dataset. Only the first call fetches, without holding the
/// view lock.
pub fn mount_bus_map() -> Result<()> {
    BusMapView::mount_shared(&get()?.view)
}

pub fn get_view_frame() -> Result<ViewFrame> {
    Ok(view()?.frame())
}

pub fn on_route_click(route_id: String) -> Result<bool> {
    Ok(view()?.on_route_click(&route_id))
}

pub fn on_stop_click(route_id: String, stop_id: String) -> Result<bool> {
    Ok(view()?.on_stop_click(&route_id, &stop_id))
}

pub fn on_popup_close() -> Result<bool> {
    Ok(view()?.on_popup_close())
}

pub fn on_widget_loaded() -> Result<bool> {
    Ok(view()?.on_widget_loaded())
}

pub fn on_widget_failed(reason: String) -> Result<bool> {
    Ok(view()?.on_widget_failed(&reason))
}

/// Starts the local map view server and returns the URL of the view.
pub fn start_map_server(host: String, port: u16, data_dir: Option<String>) -> Result<String> {
    let state = get()?;
    let mut session = state
        .server_session
        .lock()
        .map_err(|_| anyhow!("server session lock is poisoned"))?;
    if let Some(session) = session.as_ref() {
        warn!("map server is already running");
        return Ok(session.token.url());
    }
    let mut server = MapServer::new(&host, port);
    if let Some(data_dir) = data_dir {
        server = server.with_data_dir(data_dir);
    }
    server.start()?;
    let token = server.register(&state.view);
    let url = token.url();
    *session = Some(ServerSession { token, server });
    Ok(url)
}

pub fn stop_map_server() -> Result<()> {
    let state = get()?;
    let session = state
        .server_session
        .lock()
        .map_err(|_| anyhow!("server session lock is poisoned"))?
        .take();
    drop(session);
    Ok(())
}

pub fn export_logs(target_file_path: String) -> Result<()> {
    logs::export(&get()?.cache_dir, &target_file_path)
}
