//! Custom validation functions for configuration.

use lazy_static::lazy_static;
use regex::Regex;
use validator::ValidationError;

lazy_static! {
    static ref METRIC_PREFIX: Regex = Regex::new("^[a-zA-Z_][a-zA-Z0-9_]*$").unwrap();
}

/// Validate a `tracing` level name.
pub fn validate_log_level(level: &str) -> Result<(), ValidationError> {
    let valid = ["trace", "debug", "info", "warn", "error"].contains(&level.to_lowercase().as_str());
    if valid {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_log_level"))
    }
}

/// Validate that a metric prefix is a legal Prometheus identifier.
pub fn validate_metric_prefix(prefix: &str) -> Result<(), ValidationError> {
    if METRIC_PREFIX.is_match(prefix) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_metric_prefix"))
    }
}
