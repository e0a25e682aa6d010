//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! Passive health checks (passive.rs):
//!     Forwarding attempt completes (or is cancelled)
//!     → Outcome classified
//!     → HealthMonitor::record updates state.rs
//!
//! Lazy promotion:
//!     TargetPool::select encounters a quarantined target
//!     → quarantine period elapsed? promote to Probing
//! ```
//!
//! # Design Decisions
//! - No background prober: promotion is evaluated when a request needs a target
//! - State transitions require consecutive failures to prevent flapping
//! - Health state is per-target, not per-pool

pub mod passive;
pub mod state;

pub use passive::{HealthMonitor, InFlight};
pub use state::{HealthState, QuarantinePolicy, TargetHealth, Transition};

use serde::{Deserialize, Serialize};

use crate::load_balancer::target::Target;
use crate::observability::metrics;

/// Classified result of one forwarding attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Success,
    Timeout,
    ConnectionFailure,
}

impl Outcome {
    pub fn is_failure(self) -> bool {
        !matches!(self, Outcome::Success)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Outcome::Success => "success",
            Outcome::Timeout => "timeout",
            Outcome::ConnectionFailure => "connection_failure",
        }
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Log a state change and publish the new state gauge.
pub(crate) fn report_transition(target: &Target, transition: Transition, cause: &str) {
    let id = target.id().as_str();
    match transition.to {
        HealthState::Quarantined => {
            let health = target.snapshot_health();
            tracing::warn!(
                target_id = id,
                from = %transition.from,
                cause,
                quarantine_ms = health.quarantine_period().as_millis() as u64,
                failed_probes = health.failed_probes(),
                "Target quarantined"
            );
        }
        HealthState::Probing => {
            tracing::info!(target_id = id, "Quarantine elapsed, probing target");
        }
        HealthState::Healthy => {
            tracing::info!(target_id = id, from = %transition.from, "Target recovered");
        }
    }
    metrics::record_target_state(id, transition.to);
}
