//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration for the proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind address, limits).
    pub listener: ListenerConfig,

    /// Target pool and health policy.
    pub pool: PoolConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Read-only admin API.
    pub admin: AdminConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Maximum concurrent in-flight requests (backpressure).
    pub max_connections: usize,

    /// Maximum buffered request body in bytes.
    pub max_body_size: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            max_connections: 10_000,
            max_body_size: 2 * 1024 * 1024, // 2MB
        }
    }
}

/// Backend targets plus the quarantine and retry policy applied to them.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Target addresses (`host:port`). Order defines round-robin order.
    pub targets: Vec<String>,

    /// Consecutive failures before a target is quarantined.
    pub failure_threshold: u32,

    /// Base quarantine period in milliseconds.
    pub quarantine_period_ms: u64,

    /// Cap for the quarantine period after repeated failed probes.
    pub max_quarantine_period_ms: u64,

    /// TCP connect timeout in milliseconds.
    pub connect_timeout_ms: u64,

    /// Time allowed for response headers after connecting, in milliseconds.
    pub response_timeout_ms: u64,

    /// Retries after a failed attempt (0 disables retrying).
    pub max_retries: u32,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            targets: Vec::new(),
            failure_threshold: 3,
            quarantine_period_ms: 5_000,
            max_quarantine_period_ms: 60_000,
            connect_timeout_ms: 1_000,
            response_timeout_ms: 1_000,
            max_retries: 1,
        }
    }
}

impl PoolConfig {
    pub fn quarantine_period(&self) -> Duration {
        Duration::from_millis(self.quarantine_period_ms)
    }

    pub fn max_quarantine_period(&self) -> Duration {
        Duration::from_millis(self.max_quarantine_period_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn response_timeout(&self) -> Duration {
        Duration::from_millis(self.response_timeout_ms)
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Pretty output for development, JSON for log aggregation.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable the admin API.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,

    /// Admin API bind address.
    pub bind_address: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_key: String::new(),
            bind_address: "127.0.0.1:8081".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_file_uses_defaults() {
        let config: ProxyConfig = toml::from_str(
            r#"
            [pool]
            targets = ["127.0.0.1:8001", "127.0.0.1:8002"]
            "#,
        )
        .unwrap();

        assert_eq!(config.pool.targets.len(), 2);
        assert_eq!(config.pool.failure_threshold, 3);
        assert_eq!(config.pool.quarantine_period(), Duration::from_secs(5));
        assert_eq!(config.pool.connect_timeout(), Duration::from_secs(1));
        assert_eq!(config.pool.response_timeout(), Duration::from_secs(1));
        assert_eq!(config.pool.max_retries, 1);
        assert_eq!(config.listener.bind_address, "0.0.0.0:8080");
        assert_eq!(config.observability.log_format, LogFormat::Pretty);
        assert!(!config.admin.enabled);
    }

    #[test]
    fn test_log_format_parses_lowercase() {
        let config: ProxyConfig = toml::from_str(
            r#"
            [observability]
            log_format = "json"
            "#,
        )
        .unwrap();
        assert_eq!(config.observability.log_format, LogFormat::Json);
    }
}
