//! Shared fixtures for router tests.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::connect_info::MockConnectInfo;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use crate::config::AppConfig;
use crate::snapshot::SnapshotStore;
use crate::{AppState, Storage};

pub const ADMIN_USERNAME: &str = "admin";
pub const ADMIN_PASSWORD: &str = "correct horse";

pub fn config() -> AppConfig {
    let mut config = AppConfig::for_tests();
    config.upload_dir = std::env::temp_dir()
        .join("portfolio-showcase-tests")
        .join(uuid::Uuid::new_v4().to_string());
    config
}

pub async fn state() -> AppState {
    state_with_store(None).await
}

pub async fn state_with_store(store: Option<Arc<dyn SnapshotStore>>) -> AppState {
    AppState::assemble(config(), Storage::in_memory(), store)
        .await
        .unwrap()
}

pub fn app(state: AppState) -> Router {
    crate::create_app(state).layer(MockConnectInfo(SocketAddr::from(([127, 0, 0, 1], 12345))))
}

/// Send a request and decode the JSON body (`Value::Null` when empty).
pub async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let res = app.clone().oneshot(req).await.unwrap();
    let status = res.status();
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

pub fn json_request(method: &str, uri: &str, cookie: Option<&str>, body: &Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap()
}

pub fn empty_request(method: &str, uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

/// Log in as the test administrator and return the `sid=...` cookie pair.
pub async fn login(app: &Router) -> String {
    let req = json_request(
        "POST",
        "/api/login",
        None,
        &json!({ "username": ADMIN_USERNAME, "password": ADMIN_PASSWORD }),
    );
    let res = app.clone().oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let set_cookie = res.headers()[header::SET_COOKIE].to_str().unwrap();
    set_cookie
        .split(';')
        .next()
        .unwrap()
        .trim()
        .to_string()
}
