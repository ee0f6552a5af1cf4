// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Prometheus counters for gate and contact activity.

use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};

/// Outcome of an access gate check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Granted,
    Missing,
    Invalid,
}

impl GateDecision {
    fn label(self) -> &'static str {
        match self {
            Self::Granted => "granted",
            Self::Missing => "missing",
            Self::Invalid => "invalid",
        }
    }
}

/// Outcome of a contact submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactOutcome {
    Sent,
    Invalid,
    RateLimited,
    SendFailed,
}

impl ContactOutcome {
    fn label(self) -> &'static str {
        match self {
            Self::Sent => "sent",
            Self::Invalid => "invalid",
            Self::RateLimited => "rate_limited",
            Self::SendFailed => "send_failed",
        }
    }
}

/// Service metrics, registered in a private registry.
pub struct Metrics {
    registry: Registry,
    gate_decisions: IntCounterVec,
    contact_submissions: IntCounterVec,
    tokens_issued: IntCounter,
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new_custom(Some("portfolio_gate".to_string()), None)?;

        let gate_decisions = IntCounterVec::new(
            Opts::new("gate_decisions_total", "Access gate decisions by result"),
            &["decision"],
        )?;
        let contact_submissions = IntCounterVec::new(
            Opts::new("contact_submissions_total", "Contact submissions by outcome"),
            &["outcome"],
        )?;
        let tokens_issued = IntCounter::new("tokens_issued_total", "Access tokens issued on demand")?;

        registry.register(Box::new(gate_decisions.clone()))?;
        registry.register(Box::new(contact_submissions.clone()))?;
        registry.register(Box::new(tokens_issued.clone()))?;

        Ok(Self {
            registry,
            gate_decisions,
            contact_submissions,
            tokens_issued,
        })
    }

    pub fn gate(&self, decision: GateDecision) {
        self.gate_decisions
            .with_label_values(&[decision.label()])
            .inc();
    }

    pub fn contact(&self, outcome: ContactOutcome) {
        self.contact_submissions
            .with_label_values(&[outcome.label()])
            .inc();
    }

    pub fn token_issued(&self) {
        self.tokens_issued.inc();
    }

    pub fn gate_count(&self, decision: GateDecision) -> u64 {
        self.gate_decisions
            .with_label_values(&[decision.label()])
            .get()
    }

    pub fn contact_count(&self, outcome: ContactOutcome) -> u64 {
        self.contact_submissions
            .with_label_values(&[outcome.label()])
            .get()
    }

    /// Render all metrics in the Prometheus text exposition format.
    pub fn render(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_render() {
        let metrics = Metrics::new().unwrap();
        metrics.gate(GateDecision::Granted);
        metrics.gate(GateDecision::Invalid);
        metrics.contact(ContactOutcome::RateLimited);
        metrics.token_issued();

        assert_eq!(metrics.gate_count(GateDecision::Granted), 1);
        assert_eq!(metrics.contact_count(ContactOutcome::RateLimited), 1);

        let text = metrics.render().unwrap();
        assert!(text.contains("portfolio_gate_gate_decisions_total{decision=\"invalid\"} 1"));
        assert!(text.contains("portfolio_gate_contact_submissions_total{outcome=\"rate_limited\"} 1"));
        assert!(text.contains("portfolio_gate_tokens_issued_total 1"));
    }
}
