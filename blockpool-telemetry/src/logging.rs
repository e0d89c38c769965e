//! ## blockpool-telemetry::logging
//! **Structured logging with `tracing-subscriber`**
//!
//! The allocator and list crates only emit `tracing` events; installing a
//! subscriber is left to the embedding application through [`Logger::init`].

use blockpool_config::TelemetryConfig;
use tracing::Subscriber;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::{fmt, EnvFilter};

use crate::TelemetryError;

#[derive(Clone, Copy, Debug)]
pub struct Logger;

impl Logger {
    /// Installs the global subscriber described by `config`. `RUST_LOG`
    /// overrides the configured level.
    pub fn init(config: &TelemetryConfig) -> Result<(), TelemetryError> {
        tracing::subscriber::set_global_default(Self::subscriber(config))
            .map_err(|_| TelemetryError::SubscriberAlreadySet)
    }

    /// Builds the subscriber without installing it.
    pub fn subscriber(config: &TelemetryConfig) -> Box<dyn Subscriber + Send + Sync> {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(&config.log_level));
        let builder = fmt()
            .with_env_filter(filter)
            .with_thread_names(config.thread_names)
            .with_span_events(FmtSpan::CLOSE);

        if config.json {
            Box::new(builder.json().finish())
        } else {
            Box::new(builder.finish())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscriber_scoped() {
        for json in [false, true] {
            let config = TelemetryConfig {
                json,
                ..TelemetryConfig::default()
            };
            tracing::subscriber::with_default(Logger::subscriber(&config), || {
                tracing::info!(json, "Scoped subscriber active");
            });
        }
    }

    #[test]
    fn test_init_only_once() {
        let config = TelemetryConfig::default();
        Logger::init(&config).unwrap();
        assert!(matches!(
            Logger::init(&config),
            Err(TelemetryError::SubscriberAlreadySet)
        ));
    }
}
