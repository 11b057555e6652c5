use std::sync::Arc;

use axum::http::{header, Method};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::server::handlers::{answer, health, personas};
use crate::state::AppState;

/// Main application router: the query interface consumed by the front end,
/// plus persona listing and health probes.
pub fn router(state: Arc<AppState>) -> Router {
    let cors_layer = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/health", get(health::health))
        .route("/api/status", get(health::get_status))
        .route("/api/answer", post(answer::answer))
        .route("/api/personas", get(personas::list_personas))
        .layer(cors_layer)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
