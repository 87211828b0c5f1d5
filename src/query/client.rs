use std::time::Duration;

use reqwest::Url;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::QueryConfig;
use super::response::{ApiResponse, Sample, convert_result_to_response};
use crate::error::QueryError;

/// Runs instant queries against one Prometheus server.
#[derive(Clone, Debug)]
pub struct QueryService {
    query_url: Url,
    client: reqwest::Client,
}

impl QueryService {
    pub fn new(config: &QueryConfig) -> Result<Self, QueryError> {
        let base = config.prom_api.trim_end_matches('/');
        let query_url = Url::parse(&format!("{}/api/v1/query", base))
            .map_err(|_| QueryError::InvalidAddress(config.prom_api.clone()))?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_in_ms))
            .build()?;

        info!("Creating Prometheus query client for '{}'", base);
        Ok(Self { query_url, client })
    }

    /// Evaluates `promql` at the server's current time.
    ///
    /// Returns `Ok(None)` when the result vector is empty. Any warning
    /// reported by the server fails the query.
    pub async fn query(&self, promql: &str) -> Result<Option<Value>, QueryError> {
        debug!(
            event_name = "query.request",
            event_domain = "query",
            url = self.query_url.as_str(),
            query = promql,
            "sending Prometheus instant query"
        );

        let response = self
            .client
            .get(self.query_url.clone())
            .query(&[("query", promql)])
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;

        let parsed: ApiResponse = match serde_json::from_str(&body) {
            Ok(parsed) => parsed,
            Err(_) if !status.is_success() => {
                return Err(QueryError::Api {
                    error_type: status.to_string(),
                    error: body,
                });
            }
            Err(e) => return Err(QueryError::Malformed(e.to_string())),
        };

        if parsed.status != "success" {
            return Err(QueryError::Api {
                error_type: parsed.error_type.unwrap_or_else(|| status.to_string()),
                error: parsed.error.unwrap_or_default(),
            });
        }

        if let Some(warning) = parsed.warnings.into_iter().next() {
            warn!(query = promql, "Prometheus query returned warning: {}", warning);
            return Err(QueryError::Warning(warning));
        }

        let data = parsed
            .data
            .ok_or_else(|| QueryError::Malformed("missing data".to_string()))?;
        if data.result_type != "vector" {
            return Err(QueryError::UnsupportedResultType(data.result_type));
        }

        let samples: Vec<Sample> = serde_json::from_value(data.result)
            .map_err(|e| QueryError::Malformed(e.to_string()))?;
        debug!(query = promql, samples = samples.len(), "Prometheus query completed");

        if samples.is_empty() {
            return Ok(None);
        }
        Ok(Some(convert_result_to_response(&samples)))
    }
}
