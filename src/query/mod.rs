//! Client for the Prometheus HTTP query API.
//!
//! Runs instant PromQL queries and reshapes vector results into a plain
//! JSON object keyed by the `id` label of each sample.

mod client;
mod response;

pub use client::QueryService;
pub use response::{Sample, convert_result_to_response};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Where the Prometheus API lives and how long a query may take.
#[derive(Deserialize, Serialize, Debug, Clone, JsonSchema)]
pub struct QueryConfig {
    /// Base address, e.g. `http://prometheus:9090`.
    pub prom_api: String,
    #[serde(default = "default_timeout_in_ms")]
    pub timeout_in_ms: u64,
}

fn default_timeout_in_ms() -> u64 {
    30_000
}
