// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Token-based access gate.
//!
//! Every request outside the configured exemptions must carry a valid token,
//! either as a `token` query parameter or in the access cookie (the query
//! parameter wins). Granted requests get a fresh cookie with a full expiry;
//! everything else is redirected to the denial page.

use crate::config::{AccessConfig, Config};
use crate::handlers::AppState;
use crate::metrics::GateDecision;
use crate::tokens::redact;
use axum::{
    extract::{Query, Request, State},
    http::{header, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info};

pub const DENIED_PATH: &str = "/access-denied";

/// Where the candidate token came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenSource {
    Query(String),
    Cookie(String),
    Absent,
}

impl TokenSource {
    /// Pick the candidate token: a non-empty query value, else a non-empty
    /// cookie value.
    pub fn resolve(query: Option<&str>, cookie: Option<&str>) -> Self {
        match (query.filter(|t| !t.is_empty()), cookie.filter(|t| !t.is_empty())) {
            (Some(token), _) => Self::Query(token.to_string()),
            (None, Some(token)) => Self::Cookie(token.to_string()),
            (None, None) => Self::Absent,
        }
    }

    pub fn token(&self) -> Option<&str> {
        match self {
            Self::Query(t) | Self::Cookie(t) => Some(t),
            Self::Absent => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Query(_) => "query",
            Self::Cookie(_) => "cookie",
            Self::Absent => "absent",
        }
    }
}

/// Query string carrying a token.
#[derive(Debug, Default, Deserialize)]
pub struct TokenQuery {
    pub token: Option<String>,
}

impl TokenQuery {
    /// Parse the token parameter from a request, ignoring malformed queries.
    pub fn from_request(request: &Request) -> Self {
        Query::<TokenQuery>::try_from_uri(request.uri())
            .map(|Query(q)| q)
            .unwrap_or_default()
    }
}

/// Why the gate refused a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateRejection {
    /// No token at all
    Missing,
    /// A token that is not in the store
    Invalid(String),
}

impl GateRejection {
    pub fn decision(&self) -> GateDecision {
        match self {
            Self::Missing => GateDecision::Missing,
            Self::Invalid(_) => GateDecision::Invalid,
        }
    }
}

impl IntoResponse for GateRejection {
    fn into_response(self) -> Response {
        match self {
            Self::Missing => found(DENIED_PATH),
            Self::Invalid(token) => found(&format!(
                "{DENIED_PATH}?invalid_token={}",
                urlencoding::encode(&token)
            )),
        }
    }
}

/// A `302 Found` redirect.
pub fn found(location: &str) -> Response {
    match HeaderValue::try_from(location) {
        Ok(value) => (StatusCode::FOUND, [(header::LOCATION, value)]).into_response(),
        Err(_) => (StatusCode::FOUND, [(header::LOCATION, HeaderValue::from_static("/"))]).into_response(),
    }
}

/// Build the access cookie for `token` with a full lifetime.
pub fn access_cookie(config: &Config, token: &str) -> Cookie<'static> {
    cookie_for(&config.access, config.is_production(), token)
}

fn cookie_for(access: &AccessConfig, secure: bool, token: &str) -> Cookie<'static> {
    Cookie::build((access.cookie_name.clone(), token.to_string()))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(access.cookie_max_age())
        .build()
}

/// Check a candidate token against the store.
pub async fn authorize(state: &AppState, source: &TokenSource) -> Result<String, GateRejection> {
    let Some(token) = source.token() else {
        return Err(GateRejection::Missing);
    };
    if state.tokens.is_valid(token).await {
        Ok(token.to_string())
    } else {
        Err(GateRejection::Invalid(token.to_string()))
    }
}

/// Middleware guarding every non-exempt path.
pub async fn require_access(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    if state.config.is_exempt(&path) {
        return next.run(request).await;
    }

    let query = TokenQuery::from_request(&request);
    let source = TokenSource::resolve(
        query.token.as_deref(),
        jar.get(&state.config.access.cookie_name).map(|c| c.value()),
    );

    match authorize(&state, &source).await {
        Ok(token) => {
            debug!(%path, token = %redact(&token), via = source.kind(), "Access granted");
            state.metrics.gate(GateDecision::Granted);
            let jar = jar.add(access_cookie(&state.config, &token));
            (jar, next.run(request).await).into_response()
        }
        Err(rejection) => {
            info!(%path, decision = ?rejection.decision(), "Access denied");
            state.metrics.gate(rejection.decision());
            rejection.into_response()
        }
    }
}
