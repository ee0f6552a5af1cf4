// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! HTTP handlers and router assembly for the portfolio gate.

use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::contact::ContactService;
use crate::error::{panic_response, AppError};
use crate::gate::{self, access_cookie, found, GateRejection, TokenQuery, TokenSource};
use crate::limiter::CooldownLimiter;
use crate::mailer::Mailer;
use crate::metrics::{GateDecision, Metrics};
use crate::pages;
use crate::protocol::{ContactForm, ContactSent, HealthResponse, StatusResponse};
use crate::tokens::{redact, TokenStore};
use axum::{
    extract::{rejection::JsonRejection, ConnectInfo, Query, Request, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    middleware,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use std::any::Any;
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceExt;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{AllowOrigin, CorsLayer},
    services::ServeDir,
    set_header::{SetResponseHeader, SetResponseHeaderLayer},
    trace::TraceLayer,
};
use tracing::{debug, info, warn};

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub tokens: TokenStore,
    pub contact: ContactService,
    pub metrics: Metrics,
}

impl AppState {
    /// Build state on the system clock.
    pub async fn new(config: Config, mailer: Arc<dyn Mailer>) -> Result<Arc<Self>, prometheus::Error> {
        Self::with_clock(config, mailer, Arc::new(SystemClock)).await
    }

    /// Build state with an explicit clock, seeding configured tokens.
    pub async fn with_clock(
        config: Config,
        mailer: Arc<dyn Mailer>,
        clock: Arc<dyn Clock>,
    ) -> Result<Arc<Self>, prometheus::Error> {
        let tokens = TokenStore::with_capacity(config.access.max_tokens);
        for seed in &config.access.seed_tokens {
            tokens.insert_seed(seed.as_str()).await;
        }

        let limiter = CooldownLimiter::with_clock("server", config.rate_limit.window(), clock);
        let contact = ContactService::new(limiter, mailer);

        Ok(Arc::new(Self {
            config,
            tokens,
            contact,
            metrics: Metrics::new()?,
        }))
    }

    pub fn limiter(&self) -> &CooldownLimiter {
        self.contact.limiter()
    }
}

/// Identify the client for rate limiting.
///
/// Uses the peer address, or the first `X-Forwarded-For` hop when the
/// service is configured to trust a fronting proxy.
pub fn client_identity(
    config: &Config,
    headers: &HeaderMap,
    peer: Option<&ConnectInfo<SocketAddr>>,
) -> String {
    if config.rate_limit.trust_forwarded_for {
        let forwarded = headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty());
        if let Some(ip) = forwarded {
            return ip.to_string();
        }
    }
    match peer {
        Some(ConnectInfo(addr)) => addr.ip().to_string(),
        None => "unknown".to_string(),
    }
}

/// Build the full router with gate, CORS, tracing and panic handling.
pub fn router(state: Arc<AppState>) -> Router {
    let config = &state.config;

    let mut app = Router::new()
        .route("/access", get(redeem))
        .route("/access-denied", get(access_denied))
        .route("/api/check-status", post(check_status))
        .route("/api/contact", post(contact))
        .route("/mobile", get(mobile))
        .route("/health", get(health))
        .route("/ping", get(ping))
        .route("/favicon.ico", get(favicon));
    if config.metrics.enabled {
        match config.metrics.check_path() {
            Ok(()) => app = app.route(&config.metrics.path, get(metrics)),
            Err(e) => warn!(error = %e, "Metrics route not mounted"),
        }
    }

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_methods([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true);

    let expose = config.expose_errors();

    app.fallback(static_files)
        .layer(middleware::from_fn_with_state(state.clone(), gate::require_access))
        .layer(cors)
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("SAMEORIGIN"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::REFERRER_POLICY,
            HeaderValue::from_static("no-referrer"),
        ))
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::custom(
            move |panic: Box<dyn Any + Send + 'static>| panic_response(panic, expose),
        ))
        .with_state(state)
}

/// Redeem a token from the query string only.
pub async fn redeem(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Query(query): Query<TokenQuery>,
) -> Response {
    let source = TokenSource::resolve(query.token.as_deref(), None);
    match gate::authorize(&state, &source).await {
        Ok(token) => {
            info!(token = %redact(&token), "Access token redeemed");
            state.metrics.gate(GateDecision::Granted);
            (jar.add(access_cookie(&state.config, &token)), found("/")).into_response()
        }
        Err(rejection) => {
            info!(decision = ?rejection.decision(), "Token redemption refused");
            state.metrics.gate(rejection.decision());
            rejection.into_response()
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct DeniedQuery {
    pub invalid_token: Option<String>,
}

/// Render the access-required page.
pub async fn access_denied(headers: HeaderMap, Query(query): Query<DeniedQuery>) -> Html<String> {
    let port = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .and_then(|host| host.rsplit_once(':'))
        .map(|(_, port)| port.to_string());
    Html(pages::access_denied(
        query.invalid_token.as_deref(),
        port.as_deref(),
    ))
}

/// Report the caller's cooldown state.
pub async fn check_status(
    State(state): State<Arc<AppState>>,
    peer: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
) -> Json<StatusResponse> {
    let identity = client_identity(&state.config, &headers, peer.as_ref());
    let status = state.limiter().check_status(&identity).await;
    debug!(%identity, can_send = status.can_send, "Cooldown status checked");
    Json(StatusResponse {
        can_send_message: status.can_send,
        time_left: status.time_left,
    })
}

/// Accept a contact form submission.
pub async fn contact(
    State(state): State<Arc<AppState>>,
    peer: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    body: Result<Json<ContactForm>, JsonRejection>,
) -> Result<Json<ContactSent>, AppError> {
    let identity = client_identity(&state.config, &headers, peer.as_ref());
    // An unreadable body is treated like an empty form
    let form = match body {
        Ok(Json(form)) => form,
        Err(rejection) => {
            warn!(%identity, error = %rejection, "Unreadable contact body");
            ContactForm::default()
        }
    };

    let hint = state.contact.submit(&identity, &form, &state.metrics).await?;
    Ok(Json(ContactSent {
        success: true,
        message: "Email sent successfully",
        time_left: hint,
    }))
}

/// Issue a fresh token for a mobile visitor.
pub async fn mobile(State(state): State<Arc<AppState>>, jar: CookieJar, headers: HeaderMap) -> Response {
    if !state.config.access.mobile_enabled {
        return GateRejection::Missing.into_response();
    }

    let token = state.tokens.issue().await;
    state.metrics.token_issued();

    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    if state.config.access.is_embedded_browser(user_agent) {
        info!(token = %redact(&token), "Issued mobile token to in-app browser");
        let host = headers
            .get(header::HOST)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("localhost");
        return Html(pages::embedded_browser_access(host, &token)).into_response();
    }

    info!(token = %redact(&token), "Issued mobile token");
    (jar.add(access_cookie(&state.config, &token)), found("/")).into_response()
}

/// Health check endpoint.
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        timestamp: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
        port: state.config.port(),
    })
}

pub async fn ping() -> &'static str {
    "pong"
}

pub async fn favicon() -> StatusCode {
    StatusCode::NO_CONTENT
}

/// Prometheus exposition.
pub async fn metrics(State(state): State<Arc<AppState>>) -> Result<Response, AppError> {
    let body = state
        .metrics
        .render()
        .map_err(|e| AppError::internal(e.to_string(), state.config.expose_errors()))?;
    Ok((
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        body,
    )
        .into_response())
}

const NO_CACHE: &str = "no-cache, no-store, must-revalidate";

/// Serve the static site. Extension-less paths other than `/` go home.
pub async fn static_files(State(state): State<Arc<AppState>>, request: Request) -> Response {
    let path = request.uri().path();
    if path != "/" && !path.contains('.') {
        return found("/");
    }

    let files = SetResponseHeader::overriding(
        ServeDir::new(&state.config.static_files.root),
        header::CACHE_CONTROL,
        HeaderValue::from_static(NO_CACHE),
    );
    match files.oneshot(request).await {
        Ok(response) => response.map(axum::body::Body::new).into_response(),
        Err(never) => match never {},
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};

    fn peer(ip: [u8; 4]) -> ConnectInfo<SocketAddr> {
        ConnectInfo(SocketAddr::new(IpAddr::V4(Ipv4Addr::from(ip)), 50_000))
    }

    #[test]
    fn test_identity_from_peer() {
        let config = Config::default();
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.9"));
        assert_eq!(
            client_identity(&config, &headers, Some(&peer([10, 0, 0, 7]))),
            "10.0.0.7"
        );
    }

    #[test]
    fn test_identity_from_trusted_forwarded_for() {
        let mut config = Config::default();
        config.rate_limit.trust_forwarded_for = true;
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.9, 10.0.0.1"),
        );
        assert_eq!(
            client_identity(&config, &headers, Some(&peer([10, 0, 0, 7]))),
            "203.0.113.9"
        );
    }

    #[test]
    fn test_identity_without_peer() {
        let config = Config::default();
        assert_eq!(client_identity(&config, &HeaderMap::new(), None), "unknown");
    }
}
