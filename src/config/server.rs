use std::time::Duration;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Settings of the scrape endpoint listener.
#[derive(Deserialize, Serialize, Debug, Clone, JsonSchema)]
pub struct ServerConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    /// Upper bound for handling one request, scrape included.
    #[serde(default = "default_request_timeout_in_ms")]
    pub request_timeout_in_ms: u64,
}

impl ServerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_in_ms)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            request_timeout_in_ms: default_request_timeout_in_ms(),
        }
    }
}

fn default_bind_address() -> String {
    "0.0.0.0:9100".to_string()
}

fn default_request_timeout_in_ms() -> u64 {
    60_000
}
