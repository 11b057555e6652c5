use std::env;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::errors::PipelineError;

/// Application settings, loaded once at startup from `config.yml`.
///
/// Every field has a default so a missing file yields a runnable
/// configuration; `NEWSDESK_CORPUS` overrides the corpus location.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Corpus CSV, relative to the project root unless absolute.
    #[serde(default = "default_corpus_file")]
    pub corpus_file: String,
    /// Column holding the article body text.
    #[serde(default = "default_text_column")]
    pub text_column: String,
    /// Optional column holding a stable document id; row ordinal otherwise.
    #[serde(default)]
    pub id_column: Option<String>,
    /// Chunk window size in characters.
    #[serde(default = "default_chunk_chars")]
    pub chunk_chars: usize,
    /// Overlap between consecutive chunks, in characters.
    #[serde(default = "default_overlap_chars")]
    pub overlap_chars: usize,
    /// Default number of chunks fed to the generator per query.
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default)]
    pub embedding: EmbeddingSettings,
    #[serde(default)]
    pub generation: GenerationSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingSettings {
    #[serde(default = "default_api_base")]
    pub base_url: String,
    #[serde(default = "default_embedding_model")]
    pub model: String,
    /// Output dimensionality of the embedding model. Persisted indexes are
    /// validated against this before being trusted.
    #[serde(default = "default_embedding_dimension")]
    pub dimension: usize,
    #[serde(default = "default_embedding_batch")]
    pub batch_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationSettings {
    #[serde(default = "default_api_base")]
    pub base_url: String,
    #[serde(default = "default_generation_model")]
    pub model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    /// Environment variable holding the API key. The key itself is never
    /// written to configuration.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
}

fn default_corpus_file() -> String {
    "data/news_articles.csv".to_string()
}

fn default_text_column() -> String {
    "content".to_string()
}

fn default_chunk_chars() -> usize {
    500
}

fn default_overlap_chars() -> usize {
    50
}

fn default_top_k() -> usize {
    3
}

fn default_api_base() -> String {
    "https://api.openai.com".to_string()
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}

fn default_embedding_dimension() -> usize {
    1536
}

fn default_embedding_batch() -> usize {
    64
}

fn default_generation_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_max_tokens() -> u32 {
    300
}

fn default_temperature() -> f64 {
    0.3
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            corpus_file: default_corpus_file(),
            text_column: default_text_column(),
            id_column: None,
            chunk_chars: default_chunk_chars(),
            overlap_chars: default_overlap_chars(),
            top_k: default_top_k(),
            embedding: EmbeddingSettings::default(),
            generation: GenerationSettings::default(),
        }
    }
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        EmbeddingSettings {
            base_url: default_api_base(),
            model: default_embedding_model(),
            dimension: default_embedding_dimension(),
            batch_size: default_embedding_batch(),
        }
    }
}

impl Default for GenerationSettings {
    fn default() -> Self {
        GenerationSettings {
            base_url: default_api_base(),
            model: default_generation_model(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            api_key_env: default_api_key_env(),
        }
    }
}

impl Settings {
    pub fn load(path: &Path) -> Result<Self, PipelineError> {
        let mut settings = if path.exists() {
            let raw = fs::read_to_string(path)?;
            serde_yaml::from_str(&raw)
                .map_err(|e| PipelineError::InvalidConfig(format!("{}: {e}", path.display())))?
        } else {
            tracing::info!("No config.yml at {}, using defaults", path.display());
            Settings::default()
        };

        if let Ok(corpus) = env::var("NEWSDESK_CORPUS") {
            settings.corpus_file = corpus;
        }

        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.chunk_chars == 0 {
            return Err(PipelineError::InvalidConfig(
                "chunk_chars must be positive".to_string(),
            ));
        }
        if self.overlap_chars >= self.chunk_chars {
            return Err(PipelineError::InvalidConfig(format!(
                "overlap_chars ({}) must be smaller than chunk_chars ({})",
                self.overlap_chars, self.chunk_chars
            )));
        }
        if self.top_k == 0 {
            return Err(PipelineError::InvalidConfig(
                "top_k must be positive".to_string(),
            ));
        }
        if self.embedding.dimension == 0 {
            return Err(PipelineError::InvalidConfig(
                "embedding.dimension must be positive".to_string(),
            ));
        }
        if self.embedding.batch_size == 0 {
            return Err(PipelineError::InvalidConfig(
                "embedding.batch_size must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// API key for the hosted model endpoints, if configured.
    pub fn api_key(&self) -> Option<String> {
        env::var(&self.generation.api_key_env)
            .ok()
            .filter(|v| !v.trim().is_empty())
    }
}
