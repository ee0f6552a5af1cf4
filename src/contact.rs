// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Server-side contact submission flow.
//!
//! Validation → cooldown permit → mail → commit. The cheapest check runs
//! first, and only a delivered message advances the cooldown window.

use crate::error::AppError;
use crate::limiter::CooldownLimiter;
use crate::mailer::{Mailer, OutgoingMail};
use crate::metrics::{ContactOutcome, Metrics};
use crate::protocol::{ContactForm, CooldownHint};
use std::sync::Arc;
use tracing::{info, warn};

/// Relays contact messages under the authoritative cooldown.
pub struct ContactService {
    limiter: CooldownLimiter,
    mailer: Arc<dyn Mailer>,
}

impl ContactService {
    pub fn new(limiter: CooldownLimiter, mailer: Arc<dyn Mailer>) -> Self {
        Self { limiter, mailer }
    }

    pub fn limiter(&self) -> &CooldownLimiter {
        &self.limiter
    }

    pub fn mailer(&self) -> &dyn Mailer {
        self.mailer.as_ref()
    }

    /// Run one submission for `identity`.
    ///
    /// On success returns the cooldown that now applies (the full window).
    pub async fn submit(
        &self,
        identity: &str,
        form: &ContactForm,
        metrics: &Metrics,
    ) -> Result<CooldownHint, AppError> {
        if let Some(field) = form.missing_field() {
            info!(%identity, field, "Contact form rejected: missing field");
            metrics.contact(ContactOutcome::Invalid);
            return Err(AppError::Validation { field });
        }
        let form = form.trimmed();

        let permit = match self.limiter.acquire(identity).await {
            Ok(permit) => permit,
            Err(rejected) => {
                info!(
                    %identity,
                    remaining_ms = rejected.time_left.total_ms,
                    "Contact form rate limited"
                );
                metrics.contact(ContactOutcome::RateLimited);
                return Err(rejected.into());
            }
        };

        info!(
            %identity,
            message_length = form.message.len(),
            "Sending contact mail"
        );
        if let Err(err) = self.mailer.send(&OutgoingMail::from_contact(&form)).await {
            // Permit dropped uncommitted: the window does not move
            warn!(%identity, "Contact mail failed, cooldown unchanged");
            metrics.contact(ContactOutcome::SendFailed);
            return Err(err.into());
        }

        permit.commit().await;
        metrics.contact(ContactOutcome::Sent);
        Ok(CooldownHint {
            total_ms: self.limiter.window_ms(),
        })
    }
}
