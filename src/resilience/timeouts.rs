//! Timeout enforcement.
//!
//! # Responsibilities
//! - Hold the connect and response timeouts for one forwarding attempt
//! - Bound each phase of an attempt by its own deadline
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities
//! - The response deadline starts once the connection is established
//! - Deadlines are per attempt, never per request, so retries stay bounded
//! - Dropping the wrapped future cancels the attempt cleanly

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio::time;

use crate::config::PoolConfig;

/// The attempt phase whose deadline passed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DeadlineElapsed {
    #[error("connect timed out")]
    Connect,

    #[error("no response headers within the response timeout")]
    Response,
}

/// Per-attempt deadlines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttemptTimeouts {
    /// Bound on establishing the TCP connection.
    pub connect: Duration,
    /// Bound on receiving response headers once connected.
    pub response: Duration,
}

impl AttemptTimeouts {
    pub fn new(connect: Duration, response: Duration) -> Self {
        Self { connect, response }
    }

    pub fn from_config(config: &PoolConfig) -> Self {
        Self::new(config.connect_timeout(), config.response_timeout())
    }

    /// Upper bound for a whole attempt, connect through response headers.
    pub fn attempt_deadline(&self) -> Duration {
        self.connect.saturating_add(self.response)
    }

    /// Run the connect phase of an attempt.
    pub async fn connect<F: Future>(&self, fut: F) -> Result<F::Output, DeadlineElapsed> {
        time::timeout(self.connect, fut)
            .await
            .map_err(|_| DeadlineElapsed::Connect)
    }

    /// Run the response phase on an established connection.
    pub async fn response<F: Future>(&self, fut: F) -> Result<F::Output, DeadlineElapsed> {
        time::timeout(self.response, fut)
            .await
            .map_err(|_| DeadlineElapsed::Response)
    }
}

impl Default for AttemptTimeouts {
    fn default() -> Self {
        Self::from_config(&PoolConfig::default())
    }
}
