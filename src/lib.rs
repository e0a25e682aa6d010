//! Round-robin HTTP load balancer with passive health checking.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ http::server ──▶ routing::ProxyRouter ──▶ load_balancer::TargetPool
//!                                           │                        (round-robin over
//!                                           │                         eligible targets)
//!                                           ▼
//!                                     http::client ─────────────────────────────▶ Target
//!                                           │
//!                                           ▼
//!                                  health::HealthMonitor
//!                          Healthy ──N failures──▶ Quarantined
//!                             ▲                        │ period elapsed
//!                             └──success── Probing ◀───┘ (checked at selection)
//!
//!     Cross-cutting: config, resilience (timeouts, retries, backoff),
//!     observability (tracing, metrics), admin API, lifecycle
//! ```

pub mod admin;
pub mod config;
pub mod health;
pub mod http;
pub mod lifecycle;
pub mod load_balancer;
pub mod observability;
pub mod resilience;
pub mod routing;

pub use config::schema::ProxyConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use load_balancer::{TargetPool, TargetSnapshot};
pub use routing::{Forwarded, ProxyRouter};
