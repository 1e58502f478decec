//! Metrics collection for the locked mutation cycle
//!
//! All metrics live in a private Prometheus registry; [`gather`]
//! renders it in the text exposition format for whatever serves it.

use crate::core::error::Result;
use crate::log_warn;
use once_cell::sync::Lazy;
use prometheus::{Histogram, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry};
use std::time::Instant;

/// Global metrics registry
static REGISTRY: Lazy<Registry> = Lazy::new(Registry::new);

static INSTANCE: Lazy<Option<EngineMetrics>> = Lazy::new(|| match EngineMetrics::new(&REGISTRY) {
    Ok(metrics) => Some(metrics),
    Err(e) => {
        log_warn!("metrics disabled: {}", e);
        None
    }
});

/// Counters and timings for terminal operations
pub struct EngineMetrics {
    /// Terminal operations by name and outcome (`ok` or an error class)
    pub operations: IntCounterVec,
    /// Duration of terminal operations in seconds, by name
    pub operation_duration: HistogramVec,
    /// Locks that could not be acquired
    pub lock_failures: IntCounter,
    /// Releases that failed after the operation finished
    pub release_failures: IntCounter,
    /// Stored documents that failed to decode and were replaced by `{}`
    pub decode_recoveries: IntCounter,
    /// Documents written back to the store
    pub writebacks: IntCounter,
    /// Time spent waiting for a lock grant
    pub lock_wait: Histogram,
    /// Time spent holding a lock
    pub lock_hold: Histogram,
}

impl EngineMetrics {
    /// Create the metrics and register them with `registry`
    pub fn new(registry: &Registry) -> Result<Self> {
        let metrics = Self {
            operations: IntCounterVec::new(
                Opts::new("nestlock_operations_total", "Terminal operations by outcome"),
                &["operation", "outcome"],
            )?,
            operation_duration: HistogramVec::new(
                HistogramOpts::new(
                    "nestlock_operation_duration_seconds",
                    "Duration of terminal operations in seconds",
                )
                .buckets(vec![0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]),
                &["operation"],
            )?,
            lock_failures: IntCounter::new("nestlock_lock_failures_total", "Locks that could not be acquired")?,
            release_failures: IntCounter::new(
                "nestlock_release_failures_total",
                "Lock releases that were not acknowledged",
            )?,
            decode_recoveries: IntCounter::new(
                "nestlock_decode_recoveries_total",
                "Undecodable documents replaced by an empty object",
            )?,
            writebacks: IntCounter::new("nestlock_writebacks_total", "Documents written back to the store")?,
            lock_wait: Histogram::with_opts(
                HistogramOpts::new("nestlock_lock_wait_seconds", "Time spent waiting for a document lock")
                    .buckets(vec![0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]),
            )?,
            lock_hold: Histogram::with_opts(
                HistogramOpts::new("nestlock_lock_hold_seconds", "Time spent holding a document lock")
                    .buckets(vec![0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0]),
            )?,
        };

        registry.register(Box::new(metrics.operations.clone()))?;
        registry.register(Box::new(metrics.operation_duration.clone()))?;
        registry.register(Box::new(metrics.lock_failures.clone()))?;
        registry.register(Box::new(metrics.release_failures.clone()))?;
        registry.register(Box::new(metrics.decode_recoveries.clone()))?;
        registry.register(Box::new(metrics.writebacks.clone()))?;
        registry.register(Box::new(metrics.lock_wait.clone()))?;
        registry.register(Box::new(metrics.lock_hold.clone()))?;
        Ok(metrics)
    }

    /// Get the global metrics instance, if registration succeeded
    pub fn global() -> Option<&'static EngineMetrics> {
        INSTANCE.as_ref()
    }
}

/// Timer for one terminal operation
pub struct Timer {
    start: Instant,
    operation: &'static str,
}

impl Timer {
    /// Start timing `operation`
    pub fn start(operation: &'static str) -> Self {
        Self {
            start: Instant::now(),
            operation,
        }
    }

    /// Record the duration and outcome, consuming the timer
    pub fn finish(self, outcome: &str) {
        if let Some(m) = EngineMetrics::global() {
            m.operations.with_label_values(&[self.operation, outcome]).inc();
            m.operation_duration
                .with_label_values(&[self.operation])
                .observe(self.start.elapsed().as_secs_f64());
        }
    }
}

/// Apply `f` to the global metrics when they are available
pub fn record(f: impl FnOnce(&EngineMetrics)) {
    if let Some(m) = EngineMetrics::global() {
        f(m);
    }
}

/// Get the Prometheus registry holding the engine metrics
pub fn registry() -> &'static Registry {
    Lazy::force(&INSTANCE);
    &REGISTRY
}

/// Collect and return all metrics as a Prometheus-formatted string
pub fn gather() -> String {
    let encoder = prometheus::TextEncoder::new();
    let metric_families = registry().gather();
    encoder.encode_to_string(&metric_families).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timer_records_outcome() {
        Timer::start("get").finish("ok");
        Timer::start("get").finish("usage");

        let text = gather();
        assert!(text.contains("nestlock_operations_total"));
        assert!(text.contains("outcome=\"usage\""));
    }

    #[test]
    fn test_separate_registries_do_not_collide() {
        let registry = Registry::new();
        let metrics = EngineMetrics::new(&registry).unwrap();
        metrics.writebacks.inc();
        assert_eq!(metrics.writebacks.get(), 1);
        assert!(EngineMetrics::new(&registry).is_err());
    }
}
