//! Metrics exposition endpoint.

use crate::metrics::render;
use crate::state::AppState;
use crate::utils::http_helpers::HTTPError;
use axum::{Router, extract::State, http::StatusCode, response::IntoResponse, routing::get};
use tracing::error;

/// Content type of the Prometheus text exposition format.
pub const TEXT_FORMAT: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Creates the metrics route.
pub fn routes() -> Router<AppState> {
    Router::new().route("/metrics", get(metrics_handler))
}

/// Handler for the /metrics endpoint.
///
/// Value functions of dynamic collectors run synchronously, so the scrape
/// happens on the blocking pool. A panicking value function is re-raised.
async fn metrics_handler(State(state): State<AppState>) -> Result<impl IntoResponse, HTTPError> {
    let registry = state.registry.clone();
    let rendered = match tokio::task::spawn_blocking(move || render(&registry)).await {
        Ok(rendered) => rendered,
        Err(join_error) if join_error.is_panic() => std::panic::resume_unwind(join_error.into_panic()),
        Err(join_error) => {
            return Err(HTTPError::new(
                StatusCode::SERVICE_UNAVAILABLE,
                format!("scrape cancelled: {}", join_error),
            ));
        }
    };

    match rendered {
        Ok(metrics_text) => Ok((
            StatusCode::OK,
            [("Content-Type", TEXT_FORMAT)],
            metrics_text,
        )),
        Err(e) => {
            error!(event_name = "metrics.scrape.failed", event_domain = "metrics", "{}", e);
            Err(HTTPError::new(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
        }
    }
}
