use std::path::PathBuf;

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use thiserror::Error;

/// Failures inside the retrieval-and-answer pipeline.
///
/// Ingestion and index-build variants are fatal at startup; per-query
/// variants are mapped to responses at the HTTP edge.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("corpus file not found: {0}")]
    SourceNotFound(PathBuf),
    #[error("corpus is malformed: {0}")]
    SourceMalformed(String),
    #[error("embedding service unavailable: {0}")]
    EmbeddingUnavailable(String),
    #[error("vector index contains no chunks")]
    EmptyIndex,
    #[error("persisted index is stale: {0}")]
    IndexStale(String),
    #[error("unknown persona: {0}")]
    UnknownPersona(String),
    #[error("generation service unavailable: {0}")]
    GenerationUnavailable(String),
    #[error("generation refused: {0}")]
    GenerationRefused(String),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("i/o failure: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn internal<E: std::fmt::Display>(err: E) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::UnknownPersona(name) => {
                ApiError::NotFound(format!("unknown persona: {name}"))
            }
            PipelineError::EmbeddingUnavailable(msg)
            | PipelineError::GenerationUnavailable(msg) => ApiError::ServiceUnavailable(msg),
            PipelineError::EmptyIndex => {
                ApiError::ServiceUnavailable("no documents are indexed".to_string())
            }
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match &self {
            ApiError::ServiceUnavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg.clone()),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        let body = Json(json!({ "error": message }));
        (status, body).into_response()
    }
}
