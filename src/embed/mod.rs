//! Embedding: text to fixed-length vectors via an external model.

mod http;

pub use http::HttpEmbedder;

use async_trait::async_trait;

use crate::core::errors::PipelineError;

/// Maps text to fixed-length vectors. Deterministic for a fixed model.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Identifier of the backing model, stored in the persisted index so a
    /// model swap invalidates it.
    fn model_id(&self) -> &str;

    /// Output vector length. Persisted indexes with a different
    /// dimensionality are stale.
    fn dimension(&self) -> usize;

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, PipelineError>;

    async fn embed(&self, text: &str) -> Result<Vec<f32>, PipelineError> {
        let input = [text.to_string()];
        let mut vectors = self.embed_batch(&input).await?;
        vectors.pop().ok_or_else(|| {
            PipelineError::EmbeddingUnavailable("embedding service returned no vector".to_string())
        })
    }
}
