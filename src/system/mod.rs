//! System utilities and monitoring

/// Prometheus metrics for the mutation cycle
pub mod metrics;

pub use metrics::{gather, EngineMetrics};
