//! Metric registry, handle kinds and Prometheus exposition.
//!
//! Callers register gauges and pull-computed collectors in a
//! [`MetricRegistry`]; [`exposition::render`] serializes the registry
//! for a scrape.

pub mod exposition;
pub mod handle;
pub mod registry;

pub use exposition::{gather, render};
pub use handle::{DynamicCollector, MetricHandle, MetricIdentity, StaticGauge, ValueFn};
pub use registry::MetricRegistry;
