//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::PipelineConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<PipelineConfig, ConfigError> {
    let config: PipelineConfig = toml::from_str(content)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<PipelineConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_config() {
        let config = parse_config(
            r#"
            [upstream]
            base_url = "http://backend.internal:9000"

            [timeouts.by_endpoint]
            "/api/exportar" = 45000
            "#,
        )
        .unwrap();
        assert_eq!(config.upstream.base_url, "http://backend.internal:9000");
        assert_eq!(config.timeouts.by_endpoint["/api/exportar"], 45_000);
    }

    #[test]
    fn test_validation_error_message() {
        let err = parse_config("[metrics]\nmax_records = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
        assert_eq!(
            err.to_string(),
            "Validation failed: metrics.max_records must be greater than zero"
        );
    }

    #[test]
    fn test_missing_file() {
        let err = load_config(Path::new("does-not-exist.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn test_example_config_matches_defaults() {
        let config = parse_config(include_str!("../../pipeline.example.toml")).unwrap();
        let defaults = PipelineConfig::default();
        assert_eq!(config.cache.ttl_by_endpoint, defaults.cache.ttl_by_endpoint);
        assert_eq!(config.timeouts.by_endpoint, defaults.timeouts.by_endpoint);
        assert_eq!(
            config.retries.overrides_by_endpoint,
            defaults.retries.overrides_by_endpoint
        );
        assert_eq!(config.validators.persistence_path.as_deref(), Some("validators.json"));
    }
}
