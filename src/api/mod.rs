//! HTTP surface: shared state, routes and middleware.

pub mod caption;
pub mod translate;
pub mod tts;

use std::path::Path;
use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::response::Json;
use axum::routing::{get, post};
use axum::Router;
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::frontend;
use crate::model::CaptionModel;

/// Matches the upload cap advertised by the frontend.
const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub model: Arc<CaptionModel>,
    pub http: reqwest::Client,
}

pub fn router(state: AppState, static_dir: &Path) -> Router {
    Router::new()
        .route("/generate_caption", post(caption::generate_caption))
        .route("/health", get(health))
        .with_state(state)
        .fallback_service(frontend::spa(static_dir))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}
