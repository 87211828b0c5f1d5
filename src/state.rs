//! Shared application state.

use crate::config::ConfigV1;
use crate::metrics::MetricRegistry;
use std::sync::Arc;

/// Application state shared across all HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration loaded at startup.
    pub config: Arc<ConfigV1>,
    /// The registry serialized on every scrape.
    pub registry: Arc<MetricRegistry>,
}
