#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request};
use figment::{
    Figment,
    providers::{Format, Yaml},
};
use prometrics::config::{ConfigV1, load_config_from};
use prometrics::metrics::MetricRegistry;
use prometrics::routes::create_router;
use prometrics::state::AppState;

pub const TEST_CONFIG: &str = r#"
version: "1.0.0"
logging:
  level: "debug"
  format: "json"
server:
  bind_address: 127.0.0.1:0
  request_timeout_in_ms: 3000
"#;

pub fn load_test_config() -> ConfigV1 {
    load_config_from(Figment::new().merge(Yaml::string(TEST_CONFIG)))
        .expect("Failed to parse test config YAML")
}

pub fn build_app(config: ConfigV1, registry: Arc<MetricRegistry>) -> Router {
    let state = AppState {
        config: Arc::new(config),
        registry,
    };
    create_router(state)
}

pub fn get(path: &str) -> Request<Body> {
    Request::builder()
        .method(Method::GET)
        .uri(path)
        .body(Body::empty())
        .expect("failed to build request")
}

pub async fn body_text(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("failed to read body");
    String::from_utf8(bytes.to_vec()).expect("body is not UTF-8")
}
