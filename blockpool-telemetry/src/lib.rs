//! # Blockpool Telemetry
//!
//! Logging initialisation and Prometheus metrics for pool sessions.

pub mod error;
pub mod logging;
pub mod metrics;

pub use error::TelemetryError;
pub use logging::Logger;
pub use metrics::PoolMetrics;
