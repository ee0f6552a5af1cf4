// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Cooldown rate limiter for contact submissions.
//!
//! Tracks, per client identity, when the last accepted submission happened
//! and refuses new ones until the configured window has elapsed. Entries are
//! only written after the guarded action succeeds, so rejected or failed
//! attempts never move the window.
//!
//! The same type backs the authoritative server limiter (keyed by network
//! address) and the advisory client mirror (keyed by browser fingerprint);
//! they are separate instances with separate windows.

use crate::clock::{Clock, SystemClock};
use crate::protocol::TimeLeft;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tracing::debug;

/// Result of a cooldown status query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CooldownStatus {
    pub can_send: bool,
    pub time_left: Option<TimeLeft>,
}

impl CooldownStatus {
    fn ready() -> Self {
        Self {
            can_send: true,
            time_left: None,
        }
    }
}

/// Refusal while a cooldown is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Cooldown active, {} ms remaining", .time_left.total_ms)]
pub struct Rejected {
    pub time_left: TimeLeft,
}

/// Thread-safe cooldown limiter.
pub struct CooldownLimiter {
    /// Label used in logs ("server", "advisory")
    name: &'static str,
    window: Duration,
    clock: Arc<dyn Clock>,
    /// Identity -> time of last accepted submission
    last_success: RwLock<HashMap<String, DateTime<Utc>>>,
    /// Identity -> lock held between `acquire` and commit/drop
    in_flight: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl CooldownLimiter {
    /// Create a limiter on the system clock.
    pub fn new(name: &'static str, window: Duration) -> Self {
        Self::with_clock(name, window, Arc::new(SystemClock))
    }

    pub fn with_clock(name: &'static str, window: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            name,
            window,
            clock,
            last_success: RwLock::new(HashMap::new()),
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn window_ms(&self) -> u64 {
        u64::try_from(self.window.as_millis()).unwrap_or(u64::MAX)
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Milliseconds remaining for an entry, if any remain.
    fn remaining(&self, last: DateTime<Utc>, now: DateTime<Utc>) -> Option<u64> {
        let elapsed = (now - last).num_milliseconds();
        let left = i128::from(self.window_ms()) - i128::from(elapsed);
        (left > 0).then(|| u64::try_from(left).unwrap_or(u64::MAX))
    }

    /// Report whether `identity` may send now. Never mutates state.
    pub async fn check_status(&self, identity: &str) -> CooldownStatus {
        let now = self.clock.now();
        let entries = self.last_success.read().await;
        match entries.get(identity).and_then(|last| self.remaining(*last, now)) {
            Some(ms) => CooldownStatus {
                can_send: false,
                time_left: Some(TimeLeft::from_millis(ms)),
            },
            None => CooldownStatus::ready(),
        }
    }

    /// Fail with the remaining time if `identity` is still cooling down.
    pub async fn enforce(&self, identity: &str) -> Result<(), Rejected> {
        match self.check_status(identity).await.time_left {
            Some(time_left) => {
                debug!(limiter = self.name, %identity, remaining_ms = time_left.total_ms, "Cooldown active");
                Err(Rejected { time_left })
            }
            None => Ok(()),
        }
    }

    /// Start the window for `identity` at `now`.
    pub async fn record_success(&self, identity: &str, now: DateTime<Utc>) {
        self.last_success
            .write()
            .await
            .insert(identity.to_string(), now);
        debug!(limiter = self.name, %identity, "Recorded successful submission");
    }

    /// Serialize attempts for `identity` and enforce the cooldown.
    ///
    /// The returned permit keeps other attempts for the same identity waiting
    /// until it is committed or dropped, so two concurrent requests cannot
    /// both pass the check before either records success.
    pub async fn acquire(&self, identity: &str) -> Result<CooldownPermit<'_>, Rejected> {
        let lock = {
            let mut in_flight = self.in_flight.lock().await;
            in_flight
                .entry(identity.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        let guard = lock.lock_owned().await;

        self.enforce(identity).await?;

        Ok(CooldownPermit {
            limiter: self,
            identity: identity.to_string(),
            _guard: guard,
        })
    }

    /// Drop entries whose window has fully elapsed and locks nobody holds.
    ///
    /// An elapsed entry answers every query exactly like a missing one.
    pub async fn cleanup(&self) {
        let now = self.clock.now();
        {
            let mut entries = self.last_success.write().await;
            let before = entries.len();
            entries.retain(|_, last| self.remaining(*last, now).is_some());
            debug!(limiter = self.name, removed = before - entries.len(), "Swept expired cooldowns");
        }
        {
            let mut in_flight = self.in_flight.lock().await;
            in_flight.retain(|_, lock| Arc::strong_count(lock) > 1);
        }
    }

    /// Number of identities with a recorded submission.
    pub async fn tracked(&self) -> usize {
        self.last_success.read().await.len()
    }
}

/// Exclusive right to attempt one submission for an identity.
pub struct CooldownPermit<'a> {
    limiter: &'a CooldownLimiter,
    identity: String,
    _guard: OwnedMutexGuard<()>,
}

impl CooldownPermit<'_> {
    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Record success at the limiter's current time and release the lock.
    pub async fn commit(self) -> DateTime<Utc> {
        let now = self.limiter.now();
        self.limiter.record_success(&self.identity, now).await;
        now
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    const HOUR: Duration = Duration::from_secs(3600);

    fn limiter(window: Duration) -> (CooldownLimiter, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::default());
        let limiter = CooldownLimiter::with_clock("test", window, clock.clone());
        (limiter, clock)
    }

    #[tokio::test]
    async fn test_unknown_identity_can_send() {
        let (limiter, _) = limiter(HOUR);
        let status = limiter.check_status("10.0.0.1").await;
        assert!(status.can_send);
        assert!(status.time_left.is_none());
        assert!(limiter.enforce("10.0.0.1").await.is_ok());
    }

    #[tokio::test]
    async fn test_enforce_after_success_reports_full_window() {
        let (limiter, clock) = limiter(HOUR);
        limiter.record_success("10.0.0.1", clock.now()).await;

        let rejected = limiter.enforce("10.0.0.1").await.unwrap_err();
        assert_eq!(rejected.time_left.total_ms, 3_600_000);
        assert_eq!(rejected.time_left.hours, 1);
    }

    #[tokio::test]
    async fn test_window_boundary() {
        let (limiter, clock) = limiter(HOUR);
        limiter.record_success("a", clock.now()).await;

        clock.advance(HOUR - Duration::from_millis(1));
        let status = limiter.check_status("a").await;
        assert!(!status.can_send);
        assert_eq!(status.time_left.map(|t| t.total_ms), Some(1));

        clock.advance(Duration::from_millis(1));
        assert!(limiter.check_status("a").await.can_send);
    }

    #[tokio::test]
    async fn test_identities_are_independent() {
        let (limiter, clock) = limiter(HOUR);
        limiter.record_success("a", clock.now()).await;
        assert!(limiter.enforce("a").await.is_err());
        assert!(limiter.enforce("b").await.is_ok());
    }

    #[tokio::test]
    async fn test_dropped_permit_leaves_state_untouched() {
        let (limiter, _) = limiter(HOUR);
        {
            let permit = limiter.acquire("a").await.unwrap();
            assert_eq!(permit.identity(), "a");
        }
        assert!(limiter.check_status("a").await.can_send);
        assert_eq!(limiter.tracked().await, 0);
    }

    #[tokio::test]
    async fn test_committed_permit_starts_window() {
        let (limiter, _) = limiter(HOUR);
        let permit = limiter.acquire("a").await.unwrap();
        permit.commit().await;
        assert!(limiter.acquire("a").await.is_err());
    }

    #[tokio::test]
    async fn test_rejection_does_not_extend_window() {
        let (limiter, clock) = limiter(HOUR);
        limiter.record_success("a", clock.now()).await;
        clock.advance(Duration::from_secs(1800));
        assert!(limiter.acquire("a").await.is_err());
        clock.advance(Duration::from_secs(1800));
        assert!(limiter.acquire("a").await.is_ok());
    }

    #[tokio::test]
    async fn test_cleanup_removes_only_expired() {
        let (limiter, clock) = limiter(HOUR);
        limiter.record_success("old", clock.now()).await;
        clock.advance(Duration::from_secs(1800));
        limiter.record_success("new", clock.now()).await;
        clock.advance(Duration::from_secs(1800));

        limiter.cleanup().await;
        assert_eq!(limiter.tracked().await, 1);
        assert!(limiter.check_status("old").await.can_send);
        assert!(!limiter.check_status("new").await.can_send);
    }
}
