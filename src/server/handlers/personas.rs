use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::persona::PersonaRegistry;
use crate::state::AppState;

pub async fn list_personas(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let personas: Vec<_> = state
        .pipeline
        .personas()
        .all()
        .iter()
        .map(|p| {
            json!({
                "id": p.id,
                "name": p.name,
                "description": p.description,
                "filtered": !p.keywords.is_empty(),
            })
        })
        .collect();

    Json(json!({
        "personas": personas,
        "default": PersonaRegistry::DEFAULT_PERSONA,
    }))
}
