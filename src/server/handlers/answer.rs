use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::core::errors::{ApiError, PipelineError};
use crate::persona::PersonaRegistry;
use crate::pipeline::SourceRef;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AnswerRequest {
    pub query: String,
    /// Omitting the field selects the default persona; an unknown id is a
    /// 404, never a silent fallback.
    #[serde(default)]
    pub persona: Option<String>,
    #[serde(default)]
    pub top_k: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct AnswerResponse {
    pub answer: String,
    pub persona: String,
    pub sources: Vec<SourceRef>,
}

pub async fn answer(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AnswerRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let query = request.query.trim();
    if query.is_empty() {
        return Err(ApiError::BadRequest("query must not be empty".to_string()));
    }

    let persona_id = request
        .persona
        .as_deref()
        .unwrap_or(PersonaRegistry::DEFAULT_PERSONA);

    match state.pipeline.answer(query, persona_id, request.top_k).await {
        Ok(result) => Ok(Json(AnswerResponse {
            answer: result.answer_text,
            persona: persona_id.to_string(),
            sources: result.sources,
        })),
        // A refusal is surfaced as an explicit error answer, never a
        // fabricated one and never a crash.
        Err(PipelineError::GenerationRefused(reason)) => {
            tracing::warn!("Generation refused for query '{query}': {reason}");
            Ok(Json(AnswerResponse {
                answer: format!("The model declined to answer this query: {reason}"),
                persona: persona_id.to_string(),
                sources: Vec::new(),
            }))
        }
        Err(other) => Err(other.into()),
    }
}
