// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Cooldown countdown on the contact form's submit control.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

pub const SEND_LABEL: &str = "Send Message";

const TICK: Duration = Duration::from_secs(1);
const TICK_MS: u64 = 1000;

/// Colour of a status message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Info,
    Error,
}

/// The form widgets a flow drives: one button and one message line.
pub trait SubmitControl: Send + Sync {
    fn set_enabled(&self, enabled: bool);
    fn set_label(&self, label: &str);
    /// `None` clears the message.
    fn set_message(&self, message: Option<&str>, tone: Tone);
}

/// Remaining time as shown to the visitor.
///
/// Total seconds are rounded up before decomposing, so the display never
/// reads zero while a cooldown is still running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountdownDisplay {
    pub hours: u64,
    pub minutes: u64,
    pub seconds: u64,
}

impl CountdownDisplay {
    pub fn from_millis(total_ms: u64) -> Self {
        let total_secs = total_ms.div_ceil(TICK_MS);
        Self {
            hours: total_secs / 3600,
            minutes: (total_secs % 3600) / 60,
            seconds: total_secs % 60,
        }
    }

    pub fn label(&self) -> String {
        format!("Wait {}h {}m {}s", self.hours, self.minutes, self.seconds)
    }

    pub fn message(&self) -> String {
        format!(
            "You can send another message in {} hours, {} minutes, and {} seconds",
            self.hours, self.minutes, self.seconds
        )
    }
}

fn render_wait(control: &dyn SubmitControl, remaining_ms: u64) {
    let display = CountdownDisplay::from_millis(remaining_ms);
    control.set_enabled(false);
    control.set_label(&display.label());
    control.set_message(Some(&display.message()), Tone::Info);
}

fn render_ready(control: &dyn SubmitControl) {
    control.set_message(None, Tone::Info);
    control.set_enabled(true);
    control.set_label(SEND_LABEL);
}

/// Drives at most one running countdown; starting another supersedes it.
pub struct CountdownPresenter {
    control: Arc<dyn SubmitControl>,
    current: Arc<Mutex<Option<CancellationToken>>>,
}

impl CountdownPresenter {
    pub fn new(control: Arc<dyn SubmitControl>) -> Self {
        Self {
            control,
            current: Arc::new(Mutex::new(None)),
        }
    }

    /// Show `total_ms` of cooldown and tick it down once per second.
    ///
    /// The first frame is rendered before returning. Must be called from
    /// within a tokio runtime.
    pub fn start(&self, total_ms: u64) {
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = current.take() {
            previous.cancel();
        }

        if total_ms == 0 {
            render_ready(self.control.as_ref());
            return;
        }

        render_wait(self.control.as_ref(), total_ms);
        if total_ms <= TICK_MS {
            render_ready(self.control.as_ref());
            return;
        }

        let token = CancellationToken::new();
        *current = Some(token.clone());
        drop(current);

        debug!(total_ms, "Countdown started");
        let control = self.control.clone();
        let slot = self.current.clone();
        tokio::spawn(async move {
            let mut remaining = total_ms;
            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => return,
                    _ = tokio::time::sleep(TICK) => {}
                }
                remaining -= TICK_MS;

                // Render under the slot lock so a superseding start() wins
                let mut guard = slot.lock().unwrap_or_else(PoisonError::into_inner);
                if token.is_cancelled() {
                    return;
                }
                render_wait(control.as_ref(), remaining);
                if remaining <= TICK_MS {
                    render_ready(control.as_ref());
                    // Still ours: start() cancels before replacing
                    *guard = None;
                    drop(guard);
                    debug!("Countdown finished");
                    return;
                }
            }
        });
    }

    /// Cancel the running countdown without touching the control.
    pub fn stop(&self) {
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(token) = current.take() {
            token.cancel();
        }
    }

    pub fn is_running(&self) -> bool {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|token| !token.is_cancelled())
    }
}

impl Drop for CountdownPresenter {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_rounds_seconds_up() {
        assert_eq!(
            CountdownDisplay::from_millis(3500),
            CountdownDisplay { hours: 0, minutes: 0, seconds: 4 }
        );
        assert_eq!(
            CountdownDisplay::from_millis(3_600_000),
            CountdownDisplay { hours: 1, minutes: 0, seconds: 0 }
        );
        assert_eq!(
            CountdownDisplay::from_millis(3_599_001),
            CountdownDisplay { hours: 1, minutes: 0, seconds: 0 }
        );
        assert_eq!(
            CountdownDisplay::from_millis(43_199_000),
            CountdownDisplay { hours: 11, minutes: 59, seconds: 59 }
        );
    }

    #[test]
    fn test_display_text() {
        let display = CountdownDisplay::from_millis(3_723_000);
        assert_eq!(display.label(), "Wait 1h 2m 3s");
        assert_eq!(
            display.message(),
            "You can send another message in 1 hours, 2 minutes, and 3 seconds"
        );
    }
}
