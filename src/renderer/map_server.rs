use actix_web::dev::{Service, ServerHandle};
use actix_web::http::header;
use actix_web::{web, App, HttpRequest, HttpResponse, HttpServer};
use anyhow::Result;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::{mpsc, Arc, Mutex, RwLock, Weak};
use std::thread;
use tokio::runtime::Runtime;
use uuid::Uuid;

use crate::renderer::bus_map_view::BusMapView;
use crate::renderer::map_scene::MapEvent;

type ViewMap = HashMap<Uuid, Weak<Mutex<BusMapView>>>;

/// Handed out for every registered view. The view stays reachable over http
/// until the token is dropped (or the view itself is dropped).
pub struct Token {
    id: Uuid,
    url_prefix: Arc<RwLock<String>>,
    registry: Weak<RwLock<ViewMap>>,
}

impl Token {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Follows the registry prefix, so a token taken before the server
    /// started still points at the running server afterwards.
    pub fn url(&self) -> String {
        let prefix = self
            .url_prefix
            .read()
            .map(|prefix| prefix.clone())
            .unwrap_or_default();
        format!("{}/views/{}", prefix, self.id)
    }
}

impl Drop for Token {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            debug!("[map_server] dropping view {} from registry", self.id);
            if let Ok(mut items) = registry.write() {
                items.remove(&self.id);
            }
        }
    }
}

#[derive(Default, Clone)]
pub struct Registry {
    url_prefix: Arc<RwLock<String>>,
    items: Arc<RwLock<ViewMap>>,
}

impl Registry {
    pub fn new(url_prefix: &str) -> Self {
        Self {
            url_prefix: Arc::new(RwLock::new(url_prefix.to_string())),
            items: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn set_url_prefix(&self, url_prefix: &str) {
        if let Ok(mut prefix) = self.url_prefix.write() {
            *prefix = url_prefix.to_string();
        }
    }

    pub fn url_prefix(&self) -> String {
        self.url_prefix
            .read()
            .map(|prefix| prefix.clone())
            .unwrap_or_default()
    }

    pub fn register(&self, view: &Arc<Mutex<BusMapView>>) -> Token {
        let id = Uuid::new_v4();
        if let Ok(mut items) = self.items.write() {
            items.insert(id, Arc::downgrade(view));
        }
        Token {
            id,
            url_prefix: self.url_prefix.clone(),
            registry: Arc::downgrade(&self.items),
        }
    }

    pub fn get(&self, id: &Uuid) -> Option<Arc<Mutex<BusMapView>>> {
        let items = self.items.read().ok()?;
        items.get(id).and_then(|view| view.upgrade())
    }

    pub fn len(&self) -> usize {
        self.items.read().map(|items| items.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lookup(&self, id: &str) -> Option<Arc<Mutex<BusMapView>>> {
        Uuid::parse_str(id).ok().and_then(|uuid| self.get(&uuid))
    }
}

pub struct AppState {
    registry: Registry,
    data_dir: Option<PathBuf>,
}

impl AppState {
    pub fn new(registry: Registry, data_dir: Option<PathBuf>) -> Self {
        Self { registry, data_dir }
    }
}

fn frame_response(view: &BusMapView, client_version: Option<&str>) -> HttpResponse {
    match view.frame_if_changed(client_version) {
        None => HttpResponse::NotModified().finish(),
        Some((frame, version)) => HttpResponse::Ok()
            .insert_header((header::ETAG, version))
            .json(frame),
    }
}

async fn serve_frame(
    id: web::Path<String>,
    req: HttpRequest,
    data: web::Data<AppState>,
) -> HttpResponse {
    let Some(view) = data.registry.lookup(&id) else {
        return HttpResponse::NotFound().finish();
    };
    let client_version = req
        .headers()
        .get(header::IF_NONE_MATCH)
        .and_then(|h| h.to_str().ok());
    let response = match view.lock() {
        Ok(view) => frame_response(&view, client_version),
        Err(_) => HttpResponse::InternalServerError().finish(),
    };
    response
}

async fn post_event(
    id: web::Path<String>,
    body: web::Bytes,
    data: web::Data<AppState>,
) -> HttpResponse {
    let Some(view) = data.registry.lookup(&id) else {
        return HttpResponse::NotFound().finish();
    };
    let event: MapEvent = match serde_json::from_slice(&body) {
        Ok(event) => event,
        Err(e) => {
            warn!("[map_server] malformed event for view {id}: {e}");
            return HttpResponse::BadRequest().body(e.to_string());
        }
    };
    let response = match view.lock() {
        Ok(mut view) => {
            view.handle_event(&event);
            frame_response(&view, None)
        }
        Err(_) => HttpResponse::InternalServerError().finish(),
    };
    response
}

async fn serve_widget_settings(id: web::Path<String>, data: web::Data<AppState>) -> HttpResponse {
    let Some(view) = data.registry.lookup(&id) else {
        return HttpResponse::NotFound().finish();
    };
    let response = match view.lock() {
        Ok(view) => HttpResponse::Ok().json(view.config().widget_settings()),
        Err(_) => HttpResponse::InternalServerError().finish(),
    };
    response
}

async fn serve_data_file(file: web::Path<String>, data: web::Data<AppState>) -> HttpResponse {
    let Some(data_dir) = &data.data_dir else {
        return HttpResponse::NotFound().finish();
    };
    // flat directory only
    if file.contains('/') || file.contains('\\') || file.starts_with('.') {
        return HttpResponse::NotFound().finish();
    }
    match fs::read(data_dir.join(file.as_str())) {
        Ok(bytes) => HttpResponse::Ok()
            .content_type("application/json")
            .body(bytes),
        Err(e) => {
            warn!("[map_server] cannot serve data file {file}: {e}");
            HttpResponse::NotFound().finish()
        }
    }
}

pub fn configure_routes(cfg: &mut web::ServiceConfig, prefix: &str) {
    cfg.route(
        &format!("/{prefix}/views/{{id}}/frame"),
        web::get().to(serve_frame),
    )
    .route(
        &format!("/{prefix}/views/{{id}}/events"),
        web::post().to(post_event),
    )
    .route(
        &format!("/{prefix}/views/{{id}}/widget.json"),
        web::get().to(serve_widget_settings),
    )
    .route("/data/{file}", web::get().to(serve_data_file));
}

pub struct MapServer {
    host: String,
    port: u16,
    data_dir: Option<PathBuf>,
    handle: Option<thread::JoinHandle<()>>,
    server_handle: Option<ServerHandle>,
    registry: Registry,
}

impl MapServer {
    pub fn new(host: &str, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            data_dir: None,
            handle: None,
            server_handle: None,
            registry: Registry::new(&format!("http://{host}:{port}")),
        }
    }

    /// Also serve the files of `data_dir` under `/data/`.
    pub fn with_data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
        self.data_dir = Some(data_dir.into());
        self
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn register(&self, view: &Arc<Mutex<BusMapView>>) -> Token {
        self.registry.register(view)
    }

    /// Base URL the dataset path can be resolved against.
    pub fn data_base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }

    // Start the server in a separate thread
    pub fn start(&mut self) -> Result<()> {
        if self.handle.is_some() {
            bail!("map server is already running");
        }
        let host = self.host.clone();
        let port = self.port;
        let data_dir = self.data_dir.clone();
        let registry = self.registry.clone();
        let random_prefix = Uuid::new_v4().to_string();

        // reports the bound port (or the bind error) back to the caller
        let (tx, rx) = mpsc::channel::<std::result::Result<(u16, ServerHandle), String>>();

        let handle = thread::spawn(move || {
            let runtime = match Runtime::new() {
                Ok(runtime) => runtime,
                Err(e) => {
                    let _ = tx.send(Err(format!("failed to create tokio runtime: {e}")));
                    return;
                }
            };
            runtime.block_on(async move {
                let app_state = web::Data::new(AppState::new(registry.clone(), data_dir));
                let prefix = random_prefix.clone();
                let server = HttpServer::new(move || {
                    let prefix = prefix.clone();
                    App::new()
                        .app_data(app_state.clone())
                        .wrap_fn(|req, srv| {
                            debug!("Incoming request: {} {}", req.method(), req.uri());
                            srv.call(req)
                        })
                        .configure(move |cfg| configure_routes(cfg, &prefix))
                })
                .workers(1)
                .bind(format!("{host}:{port}"));
                let server = match server {
                    Ok(server) => server,
                    Err(e) => {
                        let _ = tx.send(Err(format!("failed to bind {host}:{port}: {e}")));
                        return;
                    }
                };

                // port 0 means the OS picked one
                let port = server
                    .addrs()
                    .first()
                    .map(|addr| addr.port())
                    .unwrap_or(port);
                registry.set_url_prefix(&format!("http://{host}:{port}/{random_prefix}"));

                let server = server.run();
                let _ = tx.send(Ok((port, server.handle())));
                info!("[map_server] bound to {host}:{port}");
                if let Err(e) = server.await {
                    error!("[map_server] server stopped with error: {e}");
                }
            });
        });

        match rx.recv() {
            Ok(Ok((port, server_handle))) => {
                self.port = port;
                self.server_handle = Some(server_handle);
                self.handle = Some(handle);
                Ok(())
            }
            Ok(Err(e)) => {
                let _ = handle.join();
                Err(anyhow!(e))
            }
            Err(_) => {
                let _ = handle.join();
                bail!("map server thread exited before binding")
            }
        }
    }

    pub fn stop(&mut self) {
        if let Some(server_handle) = self.server_handle.take() {
            pollster::block_on(server_handle.stop(true));
        }
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("[map_server] server thread panicked");
            }
        }
    }
}

impl Drop for MapServer {
    fn drop(&mut self) {
        self.stop();
    }
}
