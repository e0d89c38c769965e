//! ## blockpool-telemetry::metrics
//! **Prometheus gauges for pool sessions**
//!
//! [`PoolMetrics::observe`] copies a `PoolStats` snapshot into the registry;
//! callers decide how often to sample.

use blockpool_config::TelemetryConfig;
use blockpool_core::alloc::PoolStats;
use prometheus::{Encoder, Gauge, IntGauge, IntGaugeVec, Opts, Registry, TextEncoder};

use crate::TelemetryError;

#[derive(Debug, Clone)]
pub struct PoolMetrics {
    registry: Registry,
    capacity: IntGauge,
    in_use_bytes: IntGauge,
    free_bytes: IntGauge,
    blocks: IntGauge,
    free_blocks: IntGauge,
    largest_free: IntGauge,
    fragmentation: Gauge,
    operations: IntGaugeVec,
}

impl PoolMetrics {
    pub fn new(prefix: &str) -> Result<Self, TelemetryError> {
        let registry = Registry::new();
        let gauge = |name: &str, help: &str| -> Result<IntGauge, TelemetryError> {
            let gauge = IntGauge::new(format!("{prefix}_{name}"), help)?;
            registry.register(Box::new(gauge.clone()))?;
            Ok(gauge)
        };

        let capacity = gauge("capacity_bytes", "Arena capacity")?;
        let in_use_bytes = gauge("in_use_bytes", "Bytes held by in-use blocks")?;
        let free_bytes = gauge("free_bytes", "Bytes held by free blocks")?;
        let blocks = gauge("blocks", "Block records in the directory")?;
        let free_blocks = gauge("free_blocks", "Free block records in the directory")?;
        let largest_free = gauge("largest_free_bytes", "Size of the largest free block")?;

        let fragmentation = Gauge::new(
            format!("{prefix}_fragmentation_ratio"),
            "Share of free bytes outside the largest free block",
        )?;
        registry.register(Box::new(fragmentation.clone()))?;

        let operations = IntGaugeVec::new(
            Opts::new(
                format!("{prefix}_operations"),
                "Operation counts since the session was initialized",
            ),
            &["kind"],
        )?;
        registry.register(Box::new(operations.clone()))?;

        Ok(Self {
            registry,
            capacity,
            in_use_bytes,
            free_bytes,
            blocks,
            free_blocks,
            largest_free,
            fragmentation,
            operations,
        })
    }

    pub fn from_config(config: &TelemetryConfig) -> Result<Self, TelemetryError> {
        Self::new(&config.metrics_prefix)
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn observe(&self, stats: &PoolStats) {
        self.capacity.set(stats.capacity as i64);
        self.in_use_bytes.set(stats.in_use_bytes as i64);
        self.free_bytes.set(stats.free_bytes as i64);
        self.blocks.set(stats.blocks as i64);
        self.free_blocks.set(stats.free_blocks as i64);
        self.largest_free.set(stats.largest_free as i64);
        self.fragmentation.set(stats.fragmentation());

        for (kind, value) in [
            ("allocations", stats.allocations),
            ("failed_allocations", stats.failed_allocations),
            ("frees", stats.frees),
            ("rejected_frees", stats.rejected_frees),
            ("splits", stats.splits),
            ("merges", stats.merges),
            ("relocations", stats.relocations),
        ] {
            self.operations.with_label_values(&[kind]).set(value as i64);
        }
    }

    /// Renders the registry in the Prometheus text format.
    pub fn gather(&self) -> Result<String, TelemetryError> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::<u8>::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}
