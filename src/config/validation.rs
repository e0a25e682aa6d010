//! Configuration validation.
//!
//! Serde handles syntax; this module checks value ranges and target
//! addresses. Every problem is reported, not just the first, so an operator
//! can fix a broken file in one pass.

use std::collections::HashSet;
use std::net::SocketAddr;

use axum::http::uri::Authority;
use thiserror::Error;

use crate::config::schema::ProxyConfig;

/// A single semantic problem with the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("pool.targets must list at least one target")]
    NoTargets,

    #[error("target address `{0}` is not a valid host:port")]
    InvalidTarget(String),

    #[error("target `{0}` is listed more than once")]
    DuplicateTarget(String),

    #[error("pool.failure_threshold must be at least 1")]
    ZeroFailureThreshold,

    #[error("{0} must be greater than zero")]
    ZeroDuration(&'static str),

    #[error("pool.max_quarantine_period_ms ({cap}) is below pool.quarantine_period_ms ({base})")]
    QuarantineCapBelowBase { base: u64, cap: u64 },

    #[error("{field} `{value}` is not a valid socket address")]
    InvalidBindAddress { field: &'static str, value: String },

    #[error("listener.max_connections must be at least 1")]
    ZeroMaxConnections,

    #[error("admin.api_key must be set when the admin API is enabled")]
    MissingAdminKey,
}

/// Validate a parsed configuration.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let pool = &config.pool;

    if pool.targets.is_empty() {
        errors.push(ValidationError::NoTargets);
    }

    let mut seen = HashSet::new();
    for target in &pool.targets {
        match parse_target(target) {
            Some(authority) => {
                if !seen.insert(authority.as_str().to_ascii_lowercase()) {
                    errors.push(ValidationError::DuplicateTarget(target.clone()));
                }
            }
            None => errors.push(ValidationError::InvalidTarget(target.clone())),
        }
    }

    if pool.failure_threshold == 0 {
        errors.push(ValidationError::ZeroFailureThreshold);
    }

    for (field, value) in [
        ("pool.quarantine_period_ms", pool.quarantine_period_ms),
        ("pool.connect_timeout_ms", pool.connect_timeout_ms),
        ("pool.response_timeout_ms", pool.response_timeout_ms),
    ] {
        if value == 0 {
            errors.push(ValidationError::ZeroDuration(field));
        }
    }

    if pool.max_quarantine_period_ms < pool.quarantine_period_ms {
        errors.push(ValidationError::QuarantineCapBelowBase {
            base: pool.quarantine_period_ms,
            cap: pool.max_quarantine_period_ms,
        });
    }

    check_bind(&mut errors, "listener.bind_address", &config.listener.bind_address);

    if config.listener.max_connections == 0 {
        errors.push(ValidationError::ZeroMaxConnections);
    }

    if config.observability.metrics_enabled {
        check_bind(
            &mut errors,
            "observability.metrics_address",
            &config.observability.metrics_address,
        );
    }

    if config.admin.enabled {
        check_bind(&mut errors, "admin.bind_address", &config.admin.bind_address);
        if config.admin.api_key.is_empty() {
            errors.push(ValidationError::MissingAdminKey);
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Parse a target entry into an authority with an explicit port.
pub fn parse_target(address: &str) -> Option<Authority> {
    let authority: Authority = address.parse().ok()?;
    // userinfo has no meaning for a backend address
    if authority.port_u16().is_none() || authority.as_str().contains('@') {
        return None;
    }
    if authority.host().is_empty() {
        return None;
    }
    Some(authority)
}

fn check_bind(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidBindAddress {
            field,
            value: value.to_string(),
        });
    }
}
