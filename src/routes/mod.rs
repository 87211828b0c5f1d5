//! HTTP route definitions and handlers.
//!
//! The scrape endpoint and a health check, both bounded by the configured
//! request timeout.

mod health_routes;
mod metrics;

pub use metrics::TEXT_FORMAT;

use crate::state::AppState;
use crate::utils::http_helpers::HTTPError;
use axum::error_handling::HandleErrorLayer;
use axum::http::StatusCode;
use axum::{BoxError, Router};
use tower::ServiceBuilder;
use tower::timeout::error::Elapsed;

/// Creates the application router with all configured routes.
pub fn create_router(state: AppState) -> Router {
    let timeout = state.config.server.request_timeout();

    Router::new()
        .merge(metrics::routes())
        .merge(health_routes::routes())
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(handle_middleware_error))
                .timeout(timeout),
        )
}

async fn handle_middleware_error(err: BoxError) -> HTTPError {
    if err.is::<Elapsed>() {
        HTTPError::new(StatusCode::REQUEST_TIMEOUT, "request timed out")
    } else {
        HTTPError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("unhandled internal error: {}", err),
        )
    }
}
