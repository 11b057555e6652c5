use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::core::config::{AppPaths, Settings};
use crate::embed::HttpEmbedder;
use crate::generate::OpenAiChat;
use crate::persona::PersonaRegistry;
use crate::pipeline::Pipeline;

/// Application state shared across all routes.
///
/// Built once at startup by `initialize()`; the pipeline inside carries its
/// own first-query initialization barrier.
#[derive(Clone)]
pub struct AppState {
    pub paths: Arc<AppPaths>,
    pub settings: Settings,
    pub pipeline: Arc<Pipeline>,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn initialize() -> anyhow::Result<Arc<Self>> {
        let paths = Arc::new(AppPaths::new());
        let settings = Settings::load(&paths.settings_path)?;
        let registry = PersonaRegistry::load(&paths.personas_path)?;

        let api_key = settings.api_key();
        if api_key.is_none() {
            tracing::warn!(
                "No API key in ${}; generation requests will fail until it is set",
                settings.generation.api_key_env
            );
        }

        let embedder = Arc::new(HttpEmbedder::new(&settings.embedding, api_key.clone()));
        let chat_model = Arc::new(OpenAiChat::new(&settings.generation, api_key));

        let pipeline = Arc::new(Pipeline::new(
            &paths,
            settings.clone(),
            registry,
            embedder,
            chat_model,
        ));

        Ok(Arc::new(AppState {
            paths,
            settings,
            pipeline,
            started_at: Utc::now(),
        }))
    }
}
