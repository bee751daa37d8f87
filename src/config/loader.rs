//! Configuration loading from disk.

use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::config::schema::UnlockConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Environment variable that overrides `ledger.api_token`.
pub const LEDGER_TOKEN_ENV_VAR: &str = "UNLOCK_LEDGER_API_TOKEN";

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
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<UnlockConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parse and validate configuration from TOML text, applying env overrides.
pub fn parse_config(content: &str) -> Result<UnlockConfig, ConfigError> {
    let mut config: UnlockConfig = toml::from_str(content)?;
    apply_env_overrides(&mut config);
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Secrets are read from the environment rather than the config file when present.
pub fn apply_env_overrides(config: &mut UnlockConfig) {
    if let Ok(token) = std::env::var(LEDGER_TOKEN_ENV_VAR) {
        if !token.is_empty() {
            config.ledger.api_token = token;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid() {
        let config = parse_config(
            r#"
            [unlock]
            max_confirmation_rounds = 10
            "#,
        )
        .unwrap();
        assert_eq!(config.unlock.max_confirmation_rounds, 10);
    }

    #[test]
    fn test_parse_error() {
        let err = parse_config("[unlock\namount = 1").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_validation_error_lists_fields() {
        let err = parse_config(
            r#"
            [ledger]
            request_timeout_secs = 0
            validity_rounds = 0
            "#,
        )
        .unwrap_err();
        let msg = err.to_string();
        assert!(msg.starts_with("Validation failed"));
        assert!(msg.contains("ledger.request_timeout_secs"));
        assert!(msg.contains("ledger.validity_rounds"));
    }

    #[test]
    fn test_missing_file() {
        let err = load_config(Path::new("does/not/exist.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
