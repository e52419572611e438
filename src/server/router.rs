use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::server::handlers::{chat, health, ingest};
use crate::state::AppState;

/// Creates the application router:
/// - `/` chat page
/// - `/get` question answering (GET or POST form)
/// - `/ingest` multipart upload of files and URLs
/// - `/health` liveness and active configuration
pub fn router(state: Arc<AppState>) -> Router {
    let body_limit = state.settings.server.max_upload_bytes;
    Router::new()
        .route("/", get(chat::index))
        .route("/get", get(chat::get_answer).post(chat::get_answer))
        .route("/ingest", post(ingest::ingest))
        .route("/health", get(health::health))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
