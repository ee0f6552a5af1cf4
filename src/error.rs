// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Error types for the HTTP surface.

use crate::limiter::Rejected;
use crate::mailer::MailError;
use crate::protocol::ContactFailure;
use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use std::any::Any;
use thiserror::Error;

pub const MISSING_FIELDS_MESSAGE: &str = "Please provide all required fields";
pub const RATE_LIMITED_MESSAGE: &str = "Please wait before sending another message";
pub const SEND_FAILED_MESSAGE: &str = "Failed to send email. Please try again later.";
pub const INTERNAL_MESSAGE: &str = "Internal server error";

/// Errors returned by JSON API handlers.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Missing required field: {field}")]
    Validation { field: &'static str },

    #[error(transparent)]
    RateLimited(#[from] Rejected),

    #[error("Mail transport failed: {0}")]
    Transport(#[from] MailError),

    /// `detail` is only populated when the environment allows exposing it.
    #[error("Internal error: {message}")]
    Internal {
        message: String,
        detail: Option<String>,
    },
}

impl AppError {
    pub fn internal(message: impl Into<String>, expose: bool) -> Self {
        let message = message.into();
        let detail = expose.then(|| message.clone());
        Self::Internal { message, detail }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation { .. } => StatusCode::BAD_REQUEST,
            Self::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            Self::Transport(_) | Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let mut body = ContactFailure {
            success: false,
            error: String::new(),
            field: None,
            time_left: None,
        };

        match self {
            Self::Validation { field } => {
                body.error = MISSING_FIELDS_MESSAGE.to_string();
                body.field = Some(field);
            }
            Self::RateLimited(rejected) => {
                body.error = RATE_LIMITED_MESSAGE.to_string();
                body.time_left = Some(rejected.time_left);
                let mut response = (status, Json(body)).into_response();
                if let Ok(value) = HeaderValue::try_from(rejected.time_left.retry_after_secs().to_string()) {
                    response.headers_mut().insert(header::RETRY_AFTER, value);
                }
                return response;
            }
            Self::Transport(err) => {
                tracing::error!(error = %err, "Error sending contact mail");
                body.error = SEND_FAILED_MESSAGE.to_string();
            }
            Self::Internal { message, detail } => {
                tracing::error!(error = %message, "Server error");
                body.error = detail.unwrap_or_else(|| INTERNAL_MESSAGE.to_string());
            }
        }

        (status, Json(body)).into_response()
    }
}

/// Build the response for a handler panic caught by `CatchPanicLayer`.
pub fn panic_response(panic: Box<dyn Any + Send + 'static>, expose: bool) -> Response {
    let message = if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "handler panicked".to_string()
    };
    AppError::internal(message, expose).into_response()
}
