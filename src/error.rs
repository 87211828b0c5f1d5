//! Error types shared across the registry, the query client and configuration.

use thiserror::Error;

/// Errors raised by the metric registry and the exposition adapter.
#[derive(Debug, Error)]
pub enum MetricsError {
    /// `increment` was called for a gauge that was never registered.
    #[error("no gauge registered under '{0}'")]
    UnknownGauge(String),
    /// The key exists but holds a dynamic collector, which has no mutable state.
    #[error("metric '{0}' is a dynamic collector, not a gauge")]
    NotAGauge(String),
    /// Handles sharing a name must agree on kind, help text and label names.
    #[error("metric '{name}' conflicts with an existing registration: {reason}")]
    InconsistentFamily { name: String, reason: String },
    /// Invalid metric or label names, label cardinality mismatches.
    #[error(transparent)]
    Prometheus(#[from] prometheus::Error),
    #[error("failed to encode metrics: {0}")]
    Encoding(String),
}

/// Errors returned by the PromQL query client.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("invalid Prometheus API address '{0}'")]
    InvalidAddress(String),
    #[error("request to Prometheus failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Prometheus returned {error_type}: {error}")]
    Api { error_type: String, error: String },
    #[error("query returned a warning: {0}")]
    Warning(String),
    #[error("unsupported result type '{0}', only instant vectors are reshaped")]
    UnsupportedResultType(String),
    #[error("malformed query response: {0}")]
    Malformed(String),
}

/// Errors raised while loading configuration or initializing logging.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("error loading configuration: {0}")]
    Load(#[from] figment::Error),
    #[error("invalid logging.level '{0}'. Valid values: trace, debug, info, warn, error")]
    InvalidLogLevel(String),
    #[error("failed to install tracing subscriber: {0}")]
    Subscriber(String),
}
