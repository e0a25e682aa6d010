//! Response handling and transformation.
//!
//! # Responsibilities
//! - Pass backend responses through with hop-by-hop headers removed
//! - Synthesize the failure responses the proxy itself produces
//!
//! # Design Decisions
//! - Backend status, headers and body are returned verbatim, 5xx included
//! - Exhausted retries map to 504 after a timeout, 502 otherwise
//! - No healthy targets maps to 503 with `Retry-After`

use std::time::Duration;

use axum::body::Body;
use axum::http::{header, HeaderValue, Response, StatusCode};
use axum::response::IntoResponse;

use crate::health::Outcome;
use crate::http::request::strip_hop_by_hop;

/// Prepare a backend response for the client.
pub fn from_upstream(response: Response<Body>) -> Response<Body> {
    let (mut parts, body) = response.into_parts();
    strip_hop_by_hop(&mut parts.headers);
    Response::from_parts(parts, body)
}

/// `503` returned when every target is quarantined.
pub fn no_healthy_targets(retry_after: Option<Duration>) -> Response<Body> {
    let mut response =
        (StatusCode::SERVICE_UNAVAILABLE, "No healthy targets available").into_response();
    if let Some(wait) = retry_after {
        response
            .headers_mut()
            .insert(header::RETRY_AFTER, HeaderValue::from(retry_after_secs(wait)));
    }
    response
}

/// Response for a request whose attempts all failed.
pub fn upstream_failed(last: Outcome) -> Response<Body> {
    match last {
        Outcome::Timeout => (StatusCode::GATEWAY_TIMEOUT, "Upstream timed out").into_response(),
        _ => (StatusCode::BAD_GATEWAY, "Upstream request failed").into_response(),
    }
}

pub fn payload_too_large(limit: usize) -> Response<Body> {
    (
        StatusCode::PAYLOAD_TOO_LARGE,
        format!("Request body exceeds {limit} bytes"),
    )
        .into_response()
}

pub fn internal_error() -> Response<Body> {
    (StatusCode::INTERNAL_SERVER_ERROR, "Internal proxy error").into_response()
}

/// Whole seconds, rounded up, never below one.
fn retry_after_secs(wait: Duration) -> u64 {
    let secs = wait.as_secs() + u64::from(wait.subsec_nanos() > 0);
    secs.max(1)
}
