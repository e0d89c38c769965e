//! Logging and metrics configuration.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::validation;

/// Telemetry configuration.
#[derive(Debug, Serialize, Deserialize, Validate, Clone, PartialEq)]
pub struct TelemetryConfig {
    /// Default log level (trace, debug, info, warn, error). `RUST_LOG` takes
    /// precedence when set.
    #[validate(custom(function = validation::validate_log_level))]
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,

    /// Include thread names in log lines.
    #[serde(default = "default_true")]
    pub thread_names: bool,

    /// Prefix of exported Prometheus metric names.
    #[validate(custom(function = validation::validate_metric_prefix))]
    #[serde(default = "default_metrics_prefix")]
    pub metrics_prefix: String,
}

fn default_log_level() -> String {
    "info".into()
}

fn default_true() -> bool {
    true
}

fn default_metrics_prefix() -> String {
    "blockpool".into()
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json: false,
            thread_names: default_true(),
            metrics_prefix: default_metrics_prefix(),
        }
    }
}
