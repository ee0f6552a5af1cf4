// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! HTTP access to the contact endpoints.

use crate::protocol::{ContactForm, ContactReply, StatusResponse};
use async_trait::async_trait;
use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Could not connect to server. Please check your network connection.")]
    Connect(#[source] reqwest::Error),

    #[error("Unexpected response from server: {0}")]
    Decode(#[source] reqwest::Error),

    #[error("Invalid server address: {0}")]
    Url(#[from] url::ParseError),
}

/// A contact submission response: HTTP status plus the parsed body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiReply {
    pub status: u16,
    pub body: ContactReply,
}

impl ApiReply {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status) && self.body.success
    }

    pub fn is_rate_limited(&self) -> bool {
        self.status == 429
    }
}

#[async_trait]
pub trait ContactApi: Send + Sync {
    async fn check_status(&self) -> Result<StatusResponse, ApiError>;

    async fn submit(&self, form: &ContactForm) -> Result<ApiReply, ApiError>;
}

/// `ContactApi` over HTTP against a site origin.
#[derive(Debug, Clone)]
pub struct HttpContactApi {
    client: reqwest::Client,
    status_url: Url,
    contact_url: Url,
}

impl HttpContactApi {
    pub fn new(origin: &str) -> Result<Self, ApiError> {
        Self::with_client(reqwest::Client::new(), origin)
    }

    pub fn with_client(client: reqwest::Client, origin: &str) -> Result<Self, ApiError> {
        let base = Url::parse(origin)?;
        Ok(Self {
            client,
            status_url: base.join("/api/check-status")?,
            contact_url: base.join("/api/contact")?,
        })
    }

    pub fn status_url(&self) -> &Url {
        &self.status_url
    }

    pub fn contact_url(&self) -> &Url {
        &self.contact_url
    }
}

#[async_trait]
impl ContactApi for HttpContactApi {
    async fn check_status(&self) -> Result<StatusResponse, ApiError> {
        let response = self
            .client
            .post(self.status_url.clone())
            .json(&serde_json::json!({}))
            .send()
            .await
            .map_err(ApiError::Connect)?;
        response.json().await.map_err(ApiError::Decode)
    }

    async fn submit(&self, form: &ContactForm) -> Result<ApiReply, ApiError> {
        let response = self
            .client
            .post(self.contact_url.clone())
            .json(form)
            .send()
            .await
            .map_err(ApiError::Connect)?;
        let status = response.status().as_u16();
        let body = response.json().await.map_err(ApiError::Decode)?;
        Ok(ApiReply { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoints_join_on_origin() {
        let api = HttpContactApi::new("https://example.com/some/page").unwrap();
        assert_eq!(api.status_url().as_str(), "https://example.com/api/check-status");
        assert_eq!(api.contact_url().as_str(), "https://example.com/api/contact");
    }

    #[test]
    fn test_bad_origin() {
        assert!(matches!(HttpContactApi::new("not a url"), Err(ApiError::Url(_))));
    }

    #[test]
    fn test_reply_classification() {
        let ok = ApiReply {
            status: 200,
            body: ContactReply {
                success: true,
                ..Default::default()
            },
        };
        assert!(ok.is_success());

        let limited = ApiReply {
            status: 429,
            body: ContactReply::default(),
        };
        assert!(!limited.is_success());
        assert!(limited.is_rate_limited());
    }
}
