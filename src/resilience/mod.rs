//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Request to target:
//!     → timeouts.rs (connect deadline, then response deadline once connected)
//!     → On failure: retries.rs (pick another target, bounded attempts)
//!     → health monitor quarantines the target past the failure threshold
//!     → backoff.rs (grow quarantine period after failed probes)
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every upstream call has a deadline
//! - Retries are bounded so a caller always gets an answer in bounded time
//! - Quarantine replaces a circuit breaker; see the health module

pub mod backoff;
pub mod retries;
pub mod timeouts;

pub use retries::{RetryPolicy, RetryState};
pub use timeouts::{AttemptTimeouts, DeadlineElapsed};
