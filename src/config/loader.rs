//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::ProxyConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Read and parse a TOML file without validating it.
///
/// Callers that apply command-line overrides validate afterwards.
pub fn read_config(path: &Path) -> Result<ProxyConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<ProxyConfig, ConfigError> {
    let config = read_config(path)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(name: &str, content: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("lb-proxy-{}-{}.toml", name, std::process::id()));
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_load_valid_file() {
        let path = write_temp(
            "valid",
            r#"
            [pool]
            targets = ["127.0.0.1:9001", "127.0.0.1:9002", "127.0.0.1:9003"]
            failure_threshold = 2
            quarantine_period_ms = 3000
            "#,
        );
        let config = load_config(&path).unwrap();
        assert_eq!(config.pool.targets.len(), 3);
        assert_eq!(config.pool.failure_threshold, 2);
        let _ = fs::remove_file(path);
    }

    #[test]
    fn test_invalid_file_is_refused() {
        let path = write_temp(
            "invalid",
            r#"
            [pool]
            targets = []
            failure_threshold = 0
            "#,
        );
        let err = load_config(&path).unwrap_err();
        match err {
            ConfigError::Validation(errors) => assert_eq!(errors.len(), 2),
            other => panic!("unexpected error: {other}"),
        }
        let _ = fs::remove_file(path);
    }

    #[test]
    fn test_malformed_toml() {
        let path = write_temp("malformed", "[pool\ntargets = ");
        assert!(matches!(load_config(&path), Err(ConfigError::Parse(_))));
        let _ = fs::remove_file(path);
    }

    #[test]
    fn test_missing_file() {
        let path = Path::new("/nonexistent/lb-proxy.toml");
        assert!(matches!(load_config(path), Err(ConfigError::Io(_))));
    }
}
