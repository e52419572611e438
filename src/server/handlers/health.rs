use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::state::AppState;

pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "index": state.settings.index.name,
        "embedding_model": state.query.embedder().model_id(),
        "started_at": state.started_at.to_rfc3339(),
    }))
}
