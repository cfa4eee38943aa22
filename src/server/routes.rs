//! Router assembly for the speech service.

use axum::Json;
use axum::Router;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;

use super::speech::{self, AppState};

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/v1/audio/speech", post(speech::synthesize_speech))
        .route("/health", get(health_check))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check
async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
