//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Buffered ProxyRequest
//!     → TargetPool::select (round-robin over eligible targets)
//!     → Forwarder::connect under the connect timeout, then send under the response timeout
//!     → HealthMonitor records the outcome
//!     → success: backend response
//!       failure: retry on another target, or synthesized 502/503/504
//! ```
//!
//! # Design Decisions
//! - One router instance shared by every request task
//! - The forwarding step sits behind a trait so it can be stubbed

pub mod router;

pub use router::{Forwarded, ProxyRouter};
