//! Load balancing subsystem.
//!
//! # Data Flow
//! ```text
//! Request arrives
//!     → pool.rs (targets in configuration order)
//!     → round_robin.rs (scan from cursor for an eligible target,
//!       promoting expired quarantines on the way)
//!     → target.rs (chosen target, health behind a per-target lock)
//!     → Return target or NoHealthyTargets
//! ```
//!
//! # Design Decisions
//! - The pool is built once from static configuration and never changes shape
//! - Per-target locks plus an atomic cursor; no global lock
//! - Quarantined targets excluded from selection

pub mod pool;
pub mod round_robin;
pub mod target;

use std::fmt::Debug;
use std::sync::Arc;

use tokio::time::Instant;

pub use pool::{PoolError, TargetPool};
pub use round_robin::RoundRobin;
pub use target::{Target, TargetId, TargetSnapshot};

/// Target selection strategy.
pub trait LoadBalancer: Debug + Send + Sync {
    /// Pick an eligible target, avoiding `exclude` when possible.
    fn next_target(
        &self,
        targets: &[Arc<Target>],
        now: Instant,
        exclude: &[TargetId],
    ) -> Option<Arc<Target>>;
}
