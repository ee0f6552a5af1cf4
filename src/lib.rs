// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Portfolio Gate
//!
//! Backend for a private portfolio site:
//!
//! - Token-gated access (query parameter or sliding 30-day cookie)
//! - Contact form relayed by mail with a per-client cooldown
//! - Cooldown status endpoint for the page's countdown
//! - Client mirror: advisory fingerprint cooldown, countdown presenter and
//!   submission flow

pub mod client;
pub mod clock;
pub mod config;
pub mod contact;
pub mod error;
pub mod gate;
pub mod handlers;
pub mod limiter;
pub mod mailer;
pub mod metrics;
pub mod pages;
pub mod protocol;
pub mod tokens;

pub use config::Config;
pub use handlers::{router, AppState};
pub use limiter::{CooldownLimiter, CooldownStatus, Rejected};
pub use tokens::TokenStore;
