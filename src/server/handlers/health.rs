use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::state::AppState;

pub async fn health(State(_state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

pub async fn get_status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let indexed_chunks = state.pipeline.indexed_chunks();
    Json(json!({
        "index_ready": indexed_chunks.is_some(),
        "indexed_chunks": indexed_chunks,
        "embedding_model": state.settings.embedding.model,
        "generation_model": state.settings.generation.model,
        "started_at": state.started_at,
    }))
}
