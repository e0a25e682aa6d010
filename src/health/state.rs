//! Target health state machine.
//!
//! # States
//! - Healthy: target receives traffic
//! - Quarantined: target excluded from selection
//! - Probing: quarantine expired, target receives trial traffic
//!
//! # State Transitions
//! ```text
//! Healthy → Quarantined: consecutive failures reach failure_threshold
//! Quarantined → Probing: quarantine period elapsed (checked at selection)
//! Probing → Healthy: any success
//! Probing → Quarantined: any failure (period grows with backoff)
//! ```
//!
//! All methods take `now` explicitly; callers own the clock.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::resilience::backoff::quarantine_backoff;

/// Health state of a single target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthState {
    Healthy,
    Quarantined,
    Probing,
}

impl HealthState {
    /// Whether a target in this state may be selected.
    pub fn is_eligible(self) -> bool {
        !matches!(self, HealthState::Quarantined)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            HealthState::Healthy => "healthy",
            HealthState::Quarantined => "quarantined",
            HealthState::Probing => "probing",
        }
    }

    /// Gauge encoding used by metrics.
    pub fn as_gauge(self) -> f64 {
        match self {
            HealthState::Healthy => 0.0,
            HealthState::Probing => 1.0,
            HealthState::Quarantined => 2.0,
        }
    }
}

impl std::fmt::Display for HealthState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Thresholds governing transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuarantinePolicy {
    pub failure_threshold: u32,
    pub quarantine_period: Duration,
    pub max_quarantine_period: Duration,
}

impl Default for QuarantinePolicy {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
            quarantine_period: Duration::from_secs(5),
            max_quarantine_period: Duration::from_secs(60),
        }
    }
}

/// A state change produced by a single event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: HealthState,
    pub to: HealthState,
}

/// Mutable health record of one target. Guarded by the target's lock.
#[derive(Debug, Clone)]
pub struct TargetHealth {
    state: HealthState,
    quarantined_at: Option<Instant>,
    consecutive_failures: u32,
    failed_probes: u32,
    quarantine_period: Duration,
}

impl TargetHealth {
    pub fn new(policy: &QuarantinePolicy) -> Self {
        Self {
            state: HealthState::Healthy,
            quarantined_at: None,
            consecutive_failures: 0,
            failed_probes: 0,
            quarantine_period: policy.quarantine_period,
        }
    }

    pub fn state(&self) -> HealthState {
        self.state
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    pub fn failed_probes(&self) -> u32 {
        self.failed_probes
    }

    pub fn quarantined_at(&self) -> Option<Instant> {
        self.quarantined_at
    }

    /// Quarantine period currently in force (grows with failed probes).
    pub fn quarantine_period(&self) -> Duration {
        self.quarantine_period
    }

    /// Time left before a quarantined target becomes eligible again.
    pub fn quarantine_remaining(&self, now: Instant) -> Option<Duration> {
        match (self.state, self.quarantined_at) {
            (HealthState::Quarantined, Some(at)) => {
                Some(self.quarantine_period.saturating_sub(now.saturating_duration_since(at)))
            }
            _ => None,
        }
    }

    /// Apply a successful outcome.
    pub fn on_success(&mut self, policy: &QuarantinePolicy) -> Option<Transition> {
        self.consecutive_failures = 0;
        match self.state {
            HealthState::Probing => {
                self.failed_probes = 0;
                self.quarantine_period = policy.quarantine_period;
                Some(self.move_to(HealthState::Healthy))
            }
            // Late success from a request dispatched before quarantine
            HealthState::Healthy | HealthState::Quarantined => None,
        }
    }

    /// Apply a failed outcome (timeout or connection failure).
    pub fn on_failure(&mut self, now: Instant, policy: &QuarantinePolicy) -> Option<Transition> {
        match self.state {
            HealthState::Healthy => {
                self.consecutive_failures += 1;
                if self.consecutive_failures < policy.failure_threshold {
                    return None;
                }
                self.failed_probes = 0;
                self.quarantine_period = policy.quarantine_period;
                Some(self.quarantine(now))
            }
            HealthState::Probing => {
                self.failed_probes = self.failed_probes.saturating_add(1);
                self.quarantine_period = quarantine_backoff(
                    self.failed_probes,
                    policy.quarantine_period,
                    policy.max_quarantine_period,
                );
                Some(self.quarantine(now))
            }
            // Already out of rotation; the clock keeps running from the original entry.
            HealthState::Quarantined => None,
        }
    }

    /// Promote to Probing once the quarantine period has fully elapsed.
    ///
    /// Returns the transition when one happened. Idempotent otherwise.
    pub fn promote_if_due(&mut self, now: Instant) -> Option<Transition> {
        if self.state != HealthState::Quarantined {
            return None;
        }
        let due = match self.quarantined_at {
            Some(at) => now.saturating_duration_since(at) >= self.quarantine_period,
            None => true,
        };
        if !due {
            return None;
        }
        self.quarantined_at = None;
        Some(self.move_to(HealthState::Probing))
    }

    fn quarantine(&mut self, now: Instant) -> Transition {
        self.consecutive_failures = 0;
        self.quarantined_at = Some(now);
        self.move_to(HealthState::Quarantined)
    }

    fn move_to(&mut self, to: HealthState) -> Transition {
        let from = self.state;
        self.state = to;
        Transition { from, to }
    }
}
