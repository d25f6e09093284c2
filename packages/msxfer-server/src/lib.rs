pub mod auth;
pub mod error;
pub mod routes;
pub mod state;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use auth::Authenticator;
use state::AppState;

/// Assemble the full router over a pre-built [`AppState`]. Body size
/// limits are disabled on the upload route since transferred files
/// routinely exceed axum's default 2 MiB cap.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/v1/health", get(routes::health_handler))
        .route("/v1/upload", post(routes::upload_handler))
        .route_layer(DefaultBodyLimit::disable())
        .route("/v1/transfer/:id/status", get(routes::status_handler))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

pub fn default_authenticator(api_key: Option<String>) -> Arc<dyn Authenticator> {
    match api_key {
        Some(key) => Arc::new(auth::ApiKeyAuth::new(key)),
        None => Arc::new(auth::NoAuth),
    }
}
