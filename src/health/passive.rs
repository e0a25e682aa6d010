//! Passive health checking (failure detection).
//!
//! # Responsibilities
//! - Observe request outcomes
//! - Track consecutive failures
//! - Trigger state transitions on threshold breach
//!
//! # Design Decisions
//! - Any response received in time is a success, whatever its status
//! - Timeouts and connection failures both count as failures
//! - Outcomes for one target serialize on that target's lock; different
//!   targets never contend

use std::sync::Arc;

use tokio::time::Instant;

use crate::config::PoolConfig;
use crate::health::state::{QuarantinePolicy, Transition};
use crate::health::{report_transition, Outcome};
use crate::load_balancer::target::Target;
use crate::observability::metrics;

/// Converts request outcomes into health transitions.
#[derive(Debug, Clone, Copy, Default)]
pub struct HealthMonitor {
    policy: QuarantinePolicy,
}

impl HealthMonitor {
    pub fn new(policy: QuarantinePolicy) -> Self {
        Self { policy }
    }

    pub fn from_config(config: &PoolConfig) -> Self {
        Self::new(QuarantinePolicy {
            failure_threshold: config.failure_threshold,
            quarantine_period: config.quarantine_period(),
            max_quarantine_period: config.max_quarantine_period(),
        })
    }

    pub fn policy(&self) -> &QuarantinePolicy {
        &self.policy
    }

    /// Start tracking an attempt against `target`.
    ///
    /// The returned guard records `Timeout` if it is dropped before
    /// [`InFlight::complete`] runs, so a cancelled attempt still counts.
    pub fn begin(&self, target: Arc<Target>) -> InFlight {
        InFlight {
            monitor: *self,
            target: Some(target),
        }
    }

    /// Record the outcome of one forwarding attempt against `target`.
    pub fn record(&self, target: &Target, outcome: Outcome) -> Option<Transition> {
        self.record_at(target, outcome, Instant::now())
    }

    /// Same as [`record`](Self::record) with an explicit clock reading.
    pub fn record_at(&self, target: &Target, outcome: Outcome, now: Instant) -> Option<Transition> {
        target.counters().count(outcome);
        metrics::record_attempt(target.id().as_str(), outcome);

        let transition = target.with_health(|health| match outcome {
            Outcome::Success => health.on_success(&self.policy),
            Outcome::Timeout | Outcome::ConnectionFailure => health.on_failure(now, &self.policy),
        });

        if let Some(t) = transition {
            report_transition(target, t, outcome.as_str());
        } else if outcome.is_failure() {
            tracing::debug!(
                target_id = %target.id(),
                outcome = outcome.as_str(),
                consecutive_failures = target.snapshot_health().consecutive_failures(),
                "Failure recorded"
            );
        }
        transition
    }
}

/// Guard for one in-flight forwarding attempt.
#[derive(Debug)]
#[must_use = "dropping the guard records the attempt as a timeout"]
pub struct InFlight {
    monitor: HealthMonitor,
    target: Option<Arc<Target>>,
}

impl InFlight {
    /// Record the classified outcome and disarm the guard.
    pub fn complete(mut self, outcome: Outcome) -> Option<Transition> {
        let target = self.target.take()?;
        self.monitor.record(&target, outcome)
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        if let Some(target) = self.target.take() {
            tracing::debug!(target_id = %target.id(), "Attempt cancelled before completion");
            self.monitor.record(&target, Outcome::Timeout);
        }
    }
}
