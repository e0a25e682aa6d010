//! Request orchestration.
//!
//! # Responsibilities
//! - Select a target, forward one attempt, classify and record its outcome
//! - Retry failed attempts on another eligible target, up to the policy bound
//! - Produce either the backend response or a synthesized failure
//!
//! # Design Decisions
//! - Retries are an explicit loop with a typed terminal state ([`Forwarded`])
//! - No network call is made when every target is quarantined
//! - Connect and response phases each have their own deadline, so a caller always
//!   gets an answer within `(connect + response) * (max_retries + 1)`

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, Response};
use axum::response::IntoResponse;
use tokio::time::Instant;

use crate::config::PoolConfig;
use crate::health::{HealthMonitor, Outcome};
use crate::http::client::{ForwardError, Forwarder, HttpForwarder};
use crate::http::request::ProxyRequest;
use crate::http::response;
use crate::load_balancer::pool::{PoolError, TargetPool};
use crate::load_balancer::target::{Target, TargetId};
use crate::observability::metrics;
use crate::resilience::{AttemptTimeouts, RetryPolicy};

/// Terminal state of one forwarded request.
#[derive(Debug)]
pub enum Forwarded {
    /// A backend answered within the deadline.
    Upstream {
        target: TargetId,
        attempts: u32,
        response: Response<Body>,
    },

    /// Every target was quarantined when the request arrived.
    NoHealthyTargets { retry_after: Option<Duration> },

    /// Every permitted attempt failed.
    Exhausted { attempts: u32, last: Outcome },

    /// The upstream request could not be built.
    Internal(String),
}

impl IntoResponse for Forwarded {
    fn into_response(self) -> axum::response::Response {
        match self {
            Forwarded::Upstream { response, .. } => response::from_upstream(response),
            Forwarded::NoHealthyTargets { retry_after } => response::no_healthy_targets(retry_after),
            Forwarded::Exhausted { last, .. } => response::upstream_failed(last),
            Forwarded::Internal(_) => response::internal_error(),
        }
    }
}

/// Drives a request through selection, forwarding and retries.
#[derive(Debug)]
pub struct ProxyRouter<F = HttpForwarder> {
    pool: Arc<TargetPool>,
    monitor: HealthMonitor,
    timeouts: AttemptTimeouts,
    retry: RetryPolicy,
    forwarder: F,
}

impl ProxyRouter<HttpForwarder> {
    /// Build the pool, health policy and HTTP client from configuration.
    pub fn from_config(config: &PoolConfig) -> Result<Self, PoolError> {
        let monitor = HealthMonitor::from_config(config);
        let pool = Arc::new(TargetPool::from_config(config, monitor.policy())?);
        let timeouts = AttemptTimeouts::from_config(config);
        let forwarder = HttpForwarder::new();

        Ok(Self::new(
            pool,
            monitor,
            timeouts,
            RetryPolicy::new(config.max_retries),
            forwarder,
        ))
    }
}

impl<F: Forwarder> ProxyRouter<F> {
    pub fn new(
        pool: Arc<TargetPool>,
        monitor: HealthMonitor,
        timeouts: AttemptTimeouts,
        retry: RetryPolicy,
        forwarder: F,
    ) -> Self {
        Self {
            pool,
            monitor,
            timeouts,
            retry,
            forwarder,
        }
    }

    pub fn pool(&self) -> &Arc<TargetPool> {
        &self.pool
    }

    /// Forward `request`, retrying on timeout or connection failure.
    pub async fn forward(&self, request: &ProxyRequest) -> Forwarded {
        let request_id = request.request_id().unwrap_or("-");
        let mut retry = self.retry.start();

        while let Some(attempt) = retry.next_attempt() {
            let now = Instant::now();
            let target = match self.pool.select_at(now, retry.excluded()) {
                Ok(target) => target,
                Err(_) if attempt == 1 => {
                    let retry_after = self.pool.next_release(now);
                    tracing::warn!(
                        request_id,
                        retry_after_ms = retry_after.map(|d| d.as_millis() as u64),
                        "No healthy targets, rejecting request"
                    );
                    return Forwarded::NoHealthyTargets { retry_after };
                }
                Err(_) => break,
            };

            if attempt > 1 {
                metrics::record_retry();
            }

            let upstream = match request.upstream_request(&target) {
                Ok(upstream) => upstream,
                Err(e) => {
                    tracing::error!(request_id, target_id = %target.id(), error = %e, "Failed to build upstream request");
                    return Forwarded::Internal(e.to_string());
                }
            };

            tracing::debug!(request_id, target_id = %target.id(), attempt, "Forwarding attempt");

            let guard = self.monitor.begin(target.clone());
            let outcome = match self.attempt(&target, upstream).await {
                Ok(response) => {
                    guard.complete(Outcome::Success);
                    return Forwarded::Upstream {
                        target: target.id().clone(),
                        attempts: attempt,
                        response,
                    };
                }
                Err(e) => {
                    tracing::debug!(request_id, target_id = %target.id(), error = %e, "Attempt failed");
                    e.outcome()
                }
            };
            guard.complete(outcome);
            retry.record_failure(target.id(), outcome);

            tracing::warn!(
                request_id,
                target_id = %target.id(),
                outcome = outcome.as_str(),
                attempt,
                max_attempts = self.retry.max_attempts(),
                "Upstream attempt failed"
            );
        }

        match retry.last_failure() {
            Some(last) => Forwarded::Exhausted {
                attempts: retry.failures(),
                last,
            },
            None => Forwarded::NoHealthyTargets {
                retry_after: self.pool.next_release(Instant::now()),
            },
        }
    }

    /// One attempt: connect under the connect timeout, then wait for
    /// response headers under the response timeout.
    async fn attempt(&self, target: &Target, request: Request<Body>) -> Result<Response<Body>, ForwardError> {
        let connection = self.timeouts.connect(self.forwarder.connect(target)).await??;
        self.timeouts.response(self.forwarder.send(connection, request)).await?
    }
}
