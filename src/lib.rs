//! Library exports for prometrics, shared between the binary and tests.

pub mod config;
pub mod error;
pub mod labels;
pub mod metrics;
pub mod query;
pub mod routes;
pub mod startup;
pub mod state;
pub mod utils;

pub use error::{ConfigError, MetricsError, QueryError};
pub use labels::{Fingerprint, Labels};
pub use metrics::MetricRegistry;
