//! Target abstraction.
//!
//! # Responsibilities
//! - Represent a single backend endpoint
//! - Hold its health record behind a per-target lock
//! - Count outcomes for observability

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use axum::http::uri::Authority;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::health::{report_transition, HealthState, Outcome, QuarantinePolicy, TargetHealth};

/// Stable target identifier (the configured `host:port`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TargetId(Arc<str>);

impl TargetId {
    pub fn new(id: impl Into<Arc<str>>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Cumulative per-target counters.
#[derive(Debug, Default)]
pub struct OutcomeCounters {
    selections: AtomicU64,
    successes: AtomicU64,
    timeouts: AtomicU64,
    connection_failures: AtomicU64,
}

impl OutcomeCounters {
    pub fn count(&self, outcome: Outcome) {
        let counter = match outcome {
            Outcome::Success => &self.successes,
            Outcome::Timeout => &self.timeouts,
            Outcome::ConnectionFailure => &self.connection_failures,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn selected(&self) {
        self.selections.fetch_add(1, Ordering::Relaxed);
    }
}

/// A single backend target.
#[derive(Debug)]
pub struct Target {
    id: TargetId,
    authority: Authority,
    health: Mutex<TargetHealth>,
    counters: OutcomeCounters,
}

impl Target {
    /// Create a new target in the `Healthy` state.
    pub fn new(authority: Authority, policy: &QuarantinePolicy) -> Self {
        Self {
            id: TargetId::new(authority.as_str()),
            authority,
            health: Mutex::new(TargetHealth::new(policy)),
            counters: OutcomeCounters::default(),
        }
    }

    pub fn id(&self) -> &TargetId {
        &self.id
    }

    /// Network location requests are forwarded to.
    pub fn authority(&self) -> &Authority {
        &self.authority
    }

    pub fn counters(&self) -> &OutcomeCounters {
        &self.counters
    }

    pub fn state(&self) -> HealthState {
        self.with_health(|h| h.state())
    }

    /// Run `f` with exclusive access to the health record.
    ///
    /// Every mutation leaves the record consistent, so a poisoned lock is
    /// still safe to use.
    pub(crate) fn with_health<R>(&self, f: impl FnOnce(&mut TargetHealth) -> R) -> R {
        let mut guard = self.health.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }

    /// Copy of the current health record.
    pub fn snapshot_health(&self) -> TargetHealth {
        self.with_health(|h| h.clone())
    }

    /// Eligibility check used during selection.
    ///
    /// Promotes an expired quarantine to `Probing` on the way.
    pub(crate) fn try_select(&self, now: Instant) -> bool {
        let (transition, eligible) = self.with_health(|h| {
            let transition = h.promote_if_due(now);
            (transition, h.state().is_eligible())
        });
        if let Some(t) = transition {
            report_transition(self, t, "quarantine_elapsed");
        }
        eligible
    }

    pub(crate) fn mark_selected(&self) {
        self.counters.selected();
    }

    /// Read-only view for operators. Never promotes.
    pub fn snapshot(&self, now: Instant) -> TargetSnapshot {
        let health = self.snapshot_health();
        TargetSnapshot {
            id: self.id.to_string(),
            address: self.authority.to_string(),
            state: health.state(),
            consecutive_failures: health.consecutive_failures(),
            failed_probes: health.failed_probes(),
            quarantine_period_ms: health.quarantine_period().as_millis() as u64,
            quarantine_remaining_ms: health
                .quarantine_remaining(now)
                .map(|d| d.as_millis() as u64),
            selections: self.counters.selections.load(Ordering::Relaxed),
            successes: self.counters.successes.load(Ordering::Relaxed),
            timeouts: self.counters.timeouts.load(Ordering::Relaxed),
            connection_failures: self.counters.connection_failures.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time view of one target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetSnapshot {
    pub id: String,
    pub address: String,
    pub state: HealthState,
    pub consecutive_failures: u32,
    pub failed_probes: u32,
    pub quarantine_period_ms: u64,
    pub quarantine_remaining_ms: Option<u64>,
    pub selections: u64,
    pub successes: u64,
    pub timeouts: u64,
    pub connection_failures: u64,
}
