// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Client-side contact submission.
//!
//! Mirrors the server rules for a quicker answer: fields are checked locally
//! and an advisory cooldown keyed by the browser fingerprint runs before any
//! request. The server stays authoritative; its status is re-read after every
//! success or rate-limit reply and drives the countdown.

use super::api::{ApiReply, ContactApi};
use super::countdown::{CountdownPresenter, SubmitControl, Tone, SEND_LABEL};
use crate::limiter::CooldownLimiter;
use crate::protocol::{ContactForm, CooldownHint};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tracing::{debug, info, warn};

pub const FILL_ALL_FIELDS: &str = "Please fill in all fields";
pub const SENDING_LABEL: &str = "Sending...";
pub const SENDING_MESSAGE: &str = "Sending message...";
pub const SENT_MESSAGE: &str = "Message sent successfully!";
pub const SEND_FAILED: &str = "Failed to send message";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowState {
    Idle,
    Validating,
    RateCheck,
    Sending,
    Sent,
}

/// How one call to [`ContactFlow::submit`] ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Sent,
    /// A field was blank after trimming
    Invalid,
    /// The local advisory cooldown is still running
    AdvisoryLimited { hours: u64 },
    /// The server refused with 429
    RateLimited,
    Failed(String),
    /// Another submission is in flight; nothing was done
    AlreadySending,
    /// The cooldown countdown still has the control disabled; nothing was done
    CoolingDown,
}

/// Clears the sending flag however a submission ends.
struct SendingGuard<'a>(&'a AtomicBool);

impl Drop for SendingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct ContactFlow {
    api: Arc<dyn ContactApi>,
    control: Arc<dyn SubmitControl>,
    countdown: CountdownPresenter,
    advisory: CooldownLimiter,
    fingerprint: String,
    state: Mutex<FlowState>,
    sending: AtomicBool,
}

impl ContactFlow {
    pub fn new(
        api: Arc<dyn ContactApi>,
        control: Arc<dyn SubmitControl>,
        fingerprint: impl Into<String>,
        advisory_window: Duration,
    ) -> Self {
        Self::with_limiter(
            api,
            control,
            fingerprint,
            CooldownLimiter::new("advisory", advisory_window),
        )
    }

    pub fn with_limiter(
        api: Arc<dyn ContactApi>,
        control: Arc<dyn SubmitControl>,
        fingerprint: impl Into<String>,
        advisory: CooldownLimiter,
    ) -> Self {
        Self {
            countdown: CountdownPresenter::new(control.clone()),
            api,
            control,
            advisory,
            fingerprint: fingerprint.into(),
            state: Mutex::new(FlowState::Idle),
            sending: AtomicBool::new(false),
        }
    }

    pub fn state(&self) -> FlowState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn advisory(&self) -> &CooldownLimiter {
        &self.advisory
    }

    pub fn countdown(&self) -> &CountdownPresenter {
        &self.countdown
    }

    fn set_state(&self, state: FlowState) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = state;
    }

    /// Read the server cooldown and show it. Used on page load.
    ///
    /// Returns whether a countdown was started. Errors are logged only.
    pub async fn sync_status(&self) -> bool {
        self.resync(None).await
    }

    /// Start a countdown from the server status, else from `fallback`.
    async fn resync(&self, fallback: Option<CooldownHint>) -> bool {
        let remaining = match self.api.check_status().await {
            Ok(status) if !status.can_send_message => status.time_left.map(|t| t.total_ms),
            Ok(_) => None,
            Err(e) => {
                warn!(error = %e, "Error checking cooldown status");
                None
            }
        }
        .or(fallback.map(|hint| hint.total_ms))
        .filter(|ms| *ms > 0);

        match remaining {
            Some(total_ms) => {
                self.countdown.start(total_ms);
                true
            }
            None => false,
        }
    }

    /// Submit the form once.
    pub async fn submit(&self, form: &ContactForm) -> SubmitOutcome {
        if self
            .sending
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("Submission already in flight");
            return SubmitOutcome::AlreadySending;
        }
        let _guard = SendingGuard(&self.sending);

        if self.countdown.is_running() {
            debug!("Submission ignored during cooldown countdown");
            return SubmitOutcome::CoolingDown;
        }

        self.set_state(FlowState::Validating);
        let form = form.trimmed();
        if form.missing_field().is_some() {
            self.control.set_message(Some(FILL_ALL_FIELDS), Tone::Error);
            self.set_state(FlowState::Idle);
            return SubmitOutcome::Invalid;
        }

        self.set_state(FlowState::RateCheck);
        if let Err(rejected) = self.advisory.enforce(&self.fingerprint).await {
            let hours = rejected.time_left.hours_ceil();
            let message = format!("Please wait {hours} hour(s) before sending another message.");
            self.control.set_message(Some(&message), Tone::Error);
            self.set_state(FlowState::Idle);
            return SubmitOutcome::AdvisoryLimited { hours };
        }

        self.set_state(FlowState::Sending);
        self.control.set_enabled(false);
        self.control.set_label(SENDING_LABEL);
        self.control.set_message(Some(SENDING_MESSAGE), Tone::Info);

        let outcome = match self.api.submit(&form).await {
            Ok(reply) => self.handle_reply(reply).await,
            Err(e) => {
                warn!(error = %e, "Error sending message");
                self.fail(e.to_string())
            }
        };

        if outcome == SubmitOutcome::Sent {
            self.set_state(FlowState::Sent);
        }
        self.set_state(FlowState::Idle);
        outcome
    }

    async fn handle_reply(&self, reply: ApiReply) -> SubmitOutcome {
        if reply.is_success() {
            let now = self.advisory.now();
            self.advisory.record_success(&self.fingerprint, now).await;
            info!(fingerprint = %self.fingerprint, "Message sent");
            self.control.set_message(Some(SENT_MESSAGE), Tone::Info);
            if !self.resync(reply.body.time_left).await {
                self.control.set_enabled(true);
                self.control.set_label(SEND_LABEL);
            }
            return SubmitOutcome::Sent;
        }

        if reply.is_rate_limited() && self.resync(reply.body.time_left).await {
            info!("Server cooldown active");
            return SubmitOutcome::RateLimited;
        }

        let message = reply.body.error.unwrap_or_else(|| SEND_FAILED.to_string());
        self.fail(message)
    }

    fn fail(&self, message: String) -> SubmitOutcome {
        self.control.set_message(Some(&message), Tone::Error);
        self.control.set_label(SEND_LABEL);
        self.control.set_enabled(true);
        SubmitOutcome::Failed(message)
    }
}
