// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! JSON wire types shared by the server handlers and the client mirror.

use serde::{Deserialize, Serialize};

const MS_PER_HOUR: u64 = 60 * 60 * 1000;
const MS_PER_MINUTE: u64 = 60 * 1000;
const MS_PER_SECOND: u64 = 1000;

/// Remaining cooldown, decomposed by truncating division.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeLeft {
    pub hours: u64,
    pub minutes: u64,
    pub seconds: u64,
    pub total_ms: u64,
}

impl TimeLeft {
    pub fn from_millis(total_ms: u64) -> Self {
        let hours = total_ms / MS_PER_HOUR;
        let rem = total_ms % MS_PER_HOUR;
        let minutes = rem / MS_PER_MINUTE;
        let seconds = (rem % MS_PER_MINUTE) / MS_PER_SECOND;
        Self {
            hours,
            minutes,
            seconds,
            total_ms,
        }
    }

    /// Hours left rounded up, as shown by the advisory check.
    pub fn hours_ceil(&self) -> u64 {
        self.total_ms.div_ceil(MS_PER_HOUR)
    }

    /// Retry-After value in whole seconds, rounded up.
    pub fn retry_after_secs(&self) -> u64 {
        self.total_ms.div_ceil(MS_PER_SECOND)
    }
}

/// Only the total, as returned after a successful send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CooldownHint {
    pub total_ms: u64,
}

impl From<TimeLeft> for CooldownHint {
    fn from(t: TimeLeft) -> Self {
        Self {
            total_ms: t.total_ms,
        }
    }
}

/// Contact form body. Missing fields deserialize as empty and fail validation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub message: String,
}

impl ContactForm {
    pub fn new(name: impl Into<String>, email: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            message: message.into(),
        }
    }

    /// Copy with surrounding whitespace removed from every field.
    pub fn trimmed(&self) -> Self {
        Self {
            name: self.name.trim().to_string(),
            email: self.email.trim().to_string(),
            message: self.message.trim().to_string(),
        }
    }

    /// First empty field after trimming, in form order.
    pub fn missing_field(&self) -> Option<&'static str> {
        [
            ("name", &self.name),
            ("email", &self.email),
            ("message", &self.message),
        ]
        .into_iter()
        .find(|(_, value)| value.trim().is_empty())
        .map(|(field, _)| field)
    }
}

/// `POST /api/check-status` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub can_send_message: bool,
    pub time_left: Option<TimeLeft>,
}

/// `POST /api/contact` success body.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactSent {
    pub success: bool,
    pub message: &'static str,
    pub time_left: CooldownHint,
}

/// `POST /api/contact` failure body.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactFailure {
    pub success: bool,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_left: Option<TimeLeft>,
}

/// Any `POST /api/contact` body, as read by the client.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactReply {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub field: Option<String>,
    #[serde(default)]
    pub time_left: Option<CooldownHint>,
}

/// `GET /health` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
    pub port: Option<u16>,
}
