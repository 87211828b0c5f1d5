use std::collections::HashMap;

use serde::Deserialize;
use serde_json::{Map, Value, json};

/// Envelope of every Prometheus API response.
#[derive(Deserialize, Debug)]
pub(super) struct ApiResponse {
    pub status: String,
    #[serde(default)]
    pub data: Option<QueryData>,
    #[serde(rename = "errorType", default)]
    pub error_type: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub warnings: Vec<String>,
}

#[derive(Deserialize, Debug)]
pub(super) struct QueryData {
    #[serde(rename = "resultType")]
    pub result_type: String,
    pub result: Value,
}

/// One element of an instant vector.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct Sample {
    pub metric: HashMap<String, String>,
    /// `[unix_timestamp, "value"]`
    pub value: (f64, String),
}

/// Reshapes vector samples into one JSON object.
///
/// Samples carrying an `id` label are stored under that id as
/// `{"timestamp": .., "value": ..}`. A sample without one replaces the
/// whole response with its own object, so the last id-less sample wins.
pub fn convert_result_to_response(samples: &[Sample]) -> Value {
    let mut response = Map::new();

    for sample in samples {
        let (timestamp, value) = &sample.value;
        let entry = json!({
            "timestamp": timestamp,
            "value": value,
        });

        match sample.metric.get("id") {
            Some(id) => {
                response.insert(id.clone(), entry);
            }
            None => {
                if let Value::Object(map) = entry {
                    response = map;
                }
            }
        }
    }

    Value::Object(response)
}
