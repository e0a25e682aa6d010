//! Metrics collection and exposition.
//!
//! # Metrics
//! - `proxy_requests_total` (counter): requests by method, status
//! - `proxy_request_duration_seconds` (histogram): end-to-end latency
//! - `proxy_attempts_total` (counter): forwarding attempts by target, outcome
//! - `proxy_retries_total` (counter): attempts beyond the first
//! - `proxy_target_state` (gauge): 0=healthy, 1=probing, 2=quarantined
//!
//! Without an installed recorder every call is a no-op, so tests and
//! embedders pay nothing.

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::health::{HealthState, Outcome};

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

/// Record a completed inbound request.
pub fn record_request(method: &str, status: u16, start: Instant) {
    metrics::counter!(
        "proxy_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!("proxy_request_duration_seconds").record(start.elapsed().as_secs_f64());
}

/// Record the outcome of one forwarding attempt.
pub fn record_attempt(target: &str, outcome: Outcome) {
    metrics::counter!(
        "proxy_attempts_total",
        "target" => target.to_string(),
        "outcome" => outcome.as_str()
    )
    .increment(1);
}

pub fn record_retry() {
    metrics::counter!("proxy_retries_total").increment(1);
}

/// Publish the current health state of a target.
pub fn record_target_state(target: &str, state: HealthState) {
    metrics::gauge!("proxy_target_state", "target" => target.to_string()).set(state.as_gauge());
}
