// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Outcome tallies for flood simulations.

use axum::http::StatusCode;
use std::collections::HashMap;

/// How the service answered one contact submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    Sent,
    Invalid,
    RateLimited,
    SendFailed,
    Other,
}

impl From<StatusCode> for Outcome {
    fn from(status: StatusCode) -> Self {
        match status {
            StatusCode::OK => Self::Sent,
            StatusCode::BAD_REQUEST => Self::Invalid,
            StatusCode::TOO_MANY_REQUESTS => Self::RateLimited,
            StatusCode::INTERNAL_SERVER_ERROR => Self::SendFailed,
            _ => Self::Other,
        }
    }
}

/// Counts outcomes per client across a simulation.
#[derive(Debug, Default)]
pub struct FloodReport {
    outcomes: HashMap<Outcome, usize>,
    per_client: HashMap<String, HashMap<Outcome, usize>>,
}

impl FloodReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, client: &str, status: StatusCode) {
        let outcome = Outcome::from(status);
        *self.outcomes.entry(outcome).or_insert(0) += 1;
        *self
            .per_client
            .entry(client.to_string())
            .or_default()
            .entry(outcome)
            .or_insert(0) += 1;
    }

    pub fn total(&self) -> usize {
        self.outcomes.values().sum()
    }

    pub fn count(&self, outcome: Outcome) -> usize {
        self.outcomes.get(&outcome).copied().unwrap_or(0)
    }

    pub fn client_count(&self, client: &str, outcome: Outcome) -> usize {
        self.per_client
            .get(client)
            .and_then(|m| m.get(&outcome))
            .copied()
            .unwrap_or(0)
    }

    pub fn clients(&self) -> usize {
        self.per_client.len()
    }
}
