// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Test harness for driving the portfolio gate router in-process.
//!
//! Builds a router over a recording mailer and a manual clock, and provides
//! request builders and response readers for `tower::ServiceExt::oneshot`.

#![allow(dead_code)]

pub mod generators;
pub mod metrics;

use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{header, Method, Request, Response},
    Router,
};
use portfolio_gate::{
    clock::ManualClock,
    config::Config,
    handlers::{router, AppState},
    mailer::MockMailer,
};
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tower::ServiceExt;

/// Token present in every test store.
pub const SEED_TOKEN: &str = "seed-token-for-tests";

pub const WINDOW_MS: u64 = 12 * 60 * 60 * 1000;

pub struct TestApp {
    pub state: Arc<AppState>,
    pub mailer: Arc<MockMailer>,
    pub clock: Arc<ManualClock>,
    pub router: Router,
}

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }
}

pub fn test_config() -> Config {
    let mut config = Config::default();
    config.access.seed_tokens = vec![SEED_TOKEN.to_string()];
    config
}

pub async fn test_app() -> TestApp {
    test_app_with(MockMailer::new(), |_| {}).await
}

pub async fn test_app_with(mailer: MockMailer, configure: impl FnOnce(&mut Config)) -> TestApp {
    let mut config = test_config();
    configure(&mut config);

    let mailer = Arc::new(mailer);
    let clock = Arc::new(ManualClock::default());
    let state = AppState::with_clock(config, mailer.clone(), clock.clone())
        .await
        .unwrap();

    TestApp {
        router: router(state.clone()),
        state,
        mailer,
        clock,
    }
}

/// A GET with no credentials.
pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

/// A GET carrying the access cookie.
pub fn get_with_cookie(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::COOKIE, format!("access_token={token}"))
        .body(Body::empty())
        .unwrap()
}

/// A JSON POST arriving from `ip`.
pub fn post_json(uri: &str, body: &serde_json::Value, ip: IpAddr) -> Request<Body> {
    let mut request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    request
        .extensions_mut()
        .insert(ConnectInfo(SocketAddr::new(ip, 40_000)));
    request
}

pub fn contact_body(name: &str, email: &str, message: &str) -> serde_json::Value {
    serde_json::json!({ "name": name, "email": email, "message": message })
}

pub fn ip(s: &str) -> IpAddr {
    s.parse().unwrap()
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

pub async fn body_text(response: Response<Body>) -> String {
    String::from_utf8(body_bytes(response).await).unwrap()
}

pub fn location(response: &Response<Body>) -> Option<&str> {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
}

pub fn set_cookie(response: &Response<Body>) -> Option<&str> {
    response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
}
