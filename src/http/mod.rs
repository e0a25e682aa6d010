//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, in-flight limit)
//!     → request.rs (buffer body, strip hop-by-hop, forwarding headers)
//!     → [routing::ProxyRouter picks a target and retries]
//!     → client.rs (one upstream attempt)
//!     → response.rs (pass through, or synthesized 502/503/504)
//!     → Send to client
//! ```

pub mod client;
pub mod request;
pub mod response;
pub mod server;

pub use client::{ForwardError, Forwarder, HttpForwarder};
pub use request::{ProxyRequest, X_REQUEST_ID};
pub use server::HttpServer;
