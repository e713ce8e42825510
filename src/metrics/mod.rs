//! Prometheus Metrics
//!
//! Counters and gauges describing a running engine, exported in the
//! Prometheus text format.

mod exporter;

pub use exporter::EngineMetrics;
