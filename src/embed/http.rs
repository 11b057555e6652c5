use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use super::Embedder;
use crate::core::config::EmbeddingSettings;
use crate::core::errors::PipelineError;

/// OpenAI-compatible `/v1/embeddings` client. Works against the hosted API
/// and against local servers speaking the same protocol.
pub struct HttpEmbedder {
    base_url: String,
    model: String,
    dimension: usize,
    batch_size: usize,
    api_key: Option<String>,
    client: Client,
}

#[derive(Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingEntry>,
}

#[derive(Deserialize)]
struct EmbeddingEntry {
    embedding: Vec<f32>,
}

impl HttpEmbedder {
    pub fn new(settings: &EmbeddingSettings, api_key: Option<String>) -> Self {
        Self {
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            model: settings.model.clone(),
            dimension: settings.dimension,
            batch_size: settings.batch_size,
            api_key,
            client: Client::new(),
        }
    }

    async fn request_batch(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, PipelineError> {
        let url = format!("{}/v1/embeddings", self.base_url);
        let body = json!({
            "model": self.model,
            "input": inputs,
        });

        let mut request = self.client.post(&url).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| PipelineError::EmbeddingUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(PipelineError::EmbeddingUnavailable(format!(
                "{status}: {text}"
            )));
        }

        let payload: EmbeddingsResponse = response
            .json()
            .await
            .map_err(|e| PipelineError::EmbeddingUnavailable(e.to_string()))?;

        if payload.data.len() != inputs.len() {
            return Err(PipelineError::EmbeddingUnavailable(format!(
                "expected {} vectors, got {}",
                inputs.len(),
                payload.data.len()
            )));
        }

        let mut vectors = Vec::with_capacity(payload.data.len());
        for entry in payload.data {
            if entry.embedding.len() != self.dimension {
                return Err(PipelineError::EmbeddingUnavailable(format!(
                    "model '{}' returned dimension {}, configured {}",
                    self.model,
                    entry.embedding.len(),
                    self.dimension
                )));
            }
            vectors.push(entry.embedding);
        }
        Ok(vectors)
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    fn model_id(&self) -> &str {
        &self.model
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, PipelineError> {
        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            tracing::debug!("Embedding batch of {} texts", batch.len());
            vectors.extend(self.request_batch(batch).await?);
        }
        Ok(vectors)
    }
}
