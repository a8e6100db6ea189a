pub mod test_utils;

use actix_web::http::{header, StatusCode};
use actix_web::{test, web, App};
use busmap_core::config::MapConfig;
use busmap_core::renderer::bus_map_view::BusMapView;
use busmap_core::renderer::map_server::{configure_routes, AppState, Registry};
use busmap_core::renderer::MapServer;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

const PREFIX: &str = "test-prefix";

fn shared_view() -> Arc<Mutex<BusMapView>> {
    Arc::new(Mutex::new(BusMapView::with_network(
        MapConfig::default(),
        test_utils::load_sample_network(),
    )))
}

#[actix_web::test]
async fn frame_and_events() {
    let registry = Registry::new("http://localhost:0/test-prefix");
    let view = shared_view();
    let token = registry.register(&view);
    assert!(token.url().ends_with(&format!("/views/{}", token.id())));

    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(AppState::new(registry.clone(), None)))
            .configure(|cfg| configure_routes(cfg, PREFIX)),
    )
    .await;

    let frame_uri = format!("/{PREFIX}/views/{}/frame", token.id());
    let events_uri = format!("/{PREFIX}/views/{}/events", token.id());

    let req = test::TestRequest::get().uri(&frame_uri).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let etag = resp
        .headers()
        .get(header::ETAG)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["state"], "loading");

    // unchanged -> 304
    let req = test::TestRequest::get()
        .uri(&frame_uri)
        .insert_header((header::IF_NONE_MATCH, etag.clone()))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_MODIFIED);

    let req = test::TestRequest::post()
        .uri(&events_uri)
        .set_payload(r#"{"event": "widgetLoaded"}"#)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["state"], "ready");
    assert_eq!(body["scene"]["paths"].as_array().unwrap().len(), 3);
    assert_eq!(body["scene"]["markers"].as_array().unwrap().len(), 7);

    let req = test::TestRequest::post()
        .uri(&events_uri)
        .set_payload(r#"{"event": "routeClicked", "routeId": "route2"}"#)
        .to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["routes"][1]["selected"], true);
    assert_eq!(body["scene"]["paths"][0]["strokeOpacity"], 0.3);
    assert_eq!(body["scene"]["paths"][1]["strokeOpacity"], 1.0);

    let req = test::TestRequest::post()
        .uri(&events_uri)
        .set_payload(r#"{"event": "stopClicked", "routeId": "route1", "stopId": "r1-s3"}"#)
        .to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["scene"]["popup"]["title"], "Hon Chong");
    assert_eq!(body["scene"]["popup"]["onClose"]["event"], "popupClosed");
    let marker = &body["scene"]["markers"][0];
    assert_eq!(marker["key"], "route1:r1-s1");
    assert_eq!(marker["onClick"]["event"], "stopClicked");
    assert_eq!(marker["onClick"]["routeId"], "route1");
    assert_eq!(marker["onClick"]["stopId"], "r1-s1");

    // the old etag is stale now
    let req = test::TestRequest::get()
        .uri(&frame_uri)
        .insert_header((header::IF_NONE_MATCH, etag))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    assert_eq!(
        view.lock().unwrap().selection().selected_route(),
        Some("route2")
    );
}

#[actix_web::test]
async fn bad_requests() {
    let registry = Registry::new("http://localhost:0/test-prefix");
    let view = shared_view();
    let token = registry.register(&view);

    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(AppState::new(registry.clone(), None)))
            .configure(|cfg| configure_routes(cfg, PREFIX)),
    )
    .await;

    let req = test::TestRequest::post()
        .uri(&format!("/{PREFIX}/views/{}/events", token.id()))
        .set_payload(r#"{"event": "teleport"}"#)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    // a stop is only addressable through its route
    let req = test::TestRequest::post()
        .uri(&format!("/{PREFIX}/views/{}/events", token.id()))
        .set_payload(r#"{"event": "stopClicked", "stopId": "r1-s3"}"#)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let req = test::TestRequest::get()
        .uri(&format!("/{PREFIX}/views/not-a-uuid/frame"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    // no data dir configured
    let req = test::TestRequest::get()
        .uri("/data/bus_routes.json")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    // dropping the token unregisters the view
    let frame_uri = format!("/{PREFIX}/views/{}/frame", token.id());
    drop(token);
    assert!(registry.is_empty());
    let req = test::TestRequest::get().uri(&frame_uri).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn widget_settings_and_data() {
    let registry = Registry::new("http://localhost:0/test-prefix");
    let view = shared_view();
    let token = registry.register(&view);

    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(AppState::new(
                registry.clone(),
                Some(test_utils::SAMPLE_DATA_DIR.into()),
            )))
            .configure(|cfg| configure_routes(cfg, PREFIX)),
    )
    .await;

    let req = test::TestRequest::get()
        .uri(&format!("/{PREFIX}/views/{}/widget.json", token.id()))
        .to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["apiKey"], "YOUR_GOOGLE_MAPS_API_KEY");
    assert_eq!(body["scriptId"], "google-map-script");
    assert_eq!(body["zoom"], 13);
    assert_eq!(body["center"]["lat"], 12.2388);

    let req = test::TestRequest::get()
        .uri("/data/bus_routes.json")
        .to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body.as_array().unwrap().len(), 3);

    let req = test::TestRequest::get()
        .uri("/data/..%2FCargo.toml")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[std::prelude::v1::test]
fn view_dropped_with_live_token() {
    let registry = Registry::new("http://localhost:0/test-prefix");
    let view = shared_view();
    let token = registry.register(&view);
    assert!(registry.get(&token.id()).is_some());
    drop(view);
    assert!(registry.get(&token.id()).is_none());
}

#[std::prelude::v1::test]
fn start_and_stop() {
    let mut server = MapServer::new("127.0.0.1", 0);
    server.start().unwrap();
    assert!(server.start().is_err());

    let view = shared_view();
    let token = server.register(&view);
    assert!(token.url().starts_with("http://127.0.0.1:"));
    assert!(!token.url().contains(":0/"));
    assert_eq!(server.registry().len(), 1);

    drop(token);
    server.stop();
}

#[std::prelude::v1::test]
fn token_registered_before_start() {
    let mut server = MapServer::new("127.0.0.1", 0);
    let view = shared_view();
    let token = server.register(&view);
    assert!(token.url().starts_with("http://127.0.0.1:0/views/"));

    server.start().unwrap();
    let url = token.url();
    assert!(!url.contains(":0/"));
    assert!(url.starts_with(&server.registry().url_prefix()));
    assert!(url.ends_with(&format!("/views/{}", token.id())));

    let resp = reqwest::blocking::get(format!("{url}/frame")).unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::OK);
    let body: serde_json::Value = serde_json::from_str(&resp.text().unwrap()).unwrap();
    assert_eq!(body["state"], "loading");

    drop(token);
    server.stop();
}

#[std::prelude::v1::test]
fn mount_from_same_server_while_polled() {
    let mut server = MapServer::new("127.0.0.1", 0).with_data_dir(test_utils::SAMPLE_DATA_DIR);
    server.start().unwrap();

    let config = MapConfig {
        data_base: server.data_base_url(),
        data_path: "/data/bus_routes.json".to_string(),
        ..MapConfig::default()
    };
    let view = Arc::new(Mutex::new(BusMapView::new(config)));
    let token = server.register(&view);
    let frame_url = format!("{}/frame", token.url());

    let done = Arc::new(AtomicBool::new(false));
    let poller = {
        let done = done.clone();
        let frame_url = frame_url.clone();
        thread::spawn(move || {
            let client = reqwest::blocking::Client::builder()
                .timeout(Duration::from_secs(5))
                .build()
                .unwrap();
            let mut polls = 0;
            loop {
                let resp = client.get(&frame_url).send().unwrap();
                assert_eq!(resp.status(), reqwest::StatusCode::OK);
                polls += 1;
                if done.load(Ordering::SeqCst) {
                    return polls;
                }
            }
        })
    };

    // let the poller get going before the fetch starts
    thread::sleep(Duration::from_millis(100));
    BusMapView::mount_shared(&view).unwrap();
    done.store(true, Ordering::SeqCst);
    assert!(poller.join().unwrap() > 0);

    {
        let view = view.lock().unwrap();
        assert!(view.is_mounted());
        assert_eq!(view.network().route_count(), 3);
        assert_eq!(view.network().stop_count(), 7);
    }

    // a second mount neither fetches nor touches the network
    BusMapView::mount_shared(&view).unwrap();
    assert_eq!(view.lock().unwrap().network().route_count(), 3);

    drop(token);
    server.stop();
}
