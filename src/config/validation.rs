//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate URLs and value ranges (timeouts > 0, round budgets > 0)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: UnlockConfig → Result<(), Vec<ValidationError>>

use std::fmt;

use crate::config::schema::UnlockConfig;

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: String,
    /// What is wrong with it.
    pub message: String,
}

impl ValidationError {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a parsed configuration.
pub fn validate_config(config: &UnlockConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_url(&mut errors, "ledger.node_url", &config.ledger.node_url);
    for (i, url) in config.ledger.failover_urls.iter().enumerate() {
        check_url(&mut errors, &format!("ledger.failover_urls[{}]", i), url);
    }
    check_url(&mut errors, "gateways.analysis_url", &config.gateways.analysis_url);
    check_url(&mut errors, "gateways.advice_url", &config.gateways.advice_url);
    check_url(&mut errors, "wallet.bridge_url", &config.wallet.bridge_url);

    if config.ledger.request_timeout_secs == 0 {
        errors.push(ValidationError::new("ledger.request_timeout_secs", "must be greater than 0"));
    }
    if config.ledger.validity_rounds == 0 {
        errors.push(ValidationError::new("ledger.validity_rounds", "must be greater than 0"));
    }
    if config.gateways.request_timeout_secs == 0 {
        errors.push(ValidationError::new("gateways.request_timeout_secs", "must be greater than 0"));
    }
    if config.unlock.max_confirmation_rounds == 0 {
        errors.push(ValidationError::new("unlock.max_confirmation_rounds", "must be greater than 0"));
    }
    if config.unlock.note.len() > 1024 {
        errors.push(ValidationError::new("unlock.note", "exceeds 1024 bytes"));
    }
    if config.retries.max_attempts == 0 {
        errors.push(ValidationError::new("retries.max_attempts", "must be at least 1"));
    }
    if config.retries.base_delay_ms > config.retries.max_delay_ms {
        errors.push(ValidationError::new("retries.base_delay_ms", "must not exceed max_delay_ms"));
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<std::net::SocketAddr>().is_err()
    {
        errors.push(ValidationError::new("observability.metrics_address", "not a socket address"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_url(errors: &mut Vec<ValidationError>, field: &str, value: &str) {
    match url::Url::parse(value) {
        Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {}
        Ok(url) => errors.push(ValidationError::new(
            field,
            format!("unsupported scheme '{}'", url.scheme()),
        )),
        Err(e) => errors.push(ValidationError::new(field, format!("invalid URL: {}", e))),
    }
}
