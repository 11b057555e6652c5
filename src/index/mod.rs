//! Flat exact nearest-neighbor index over embedded chunks.
//!
//! At this corpus scale brute-force cosine scan is the whole algorithm;
//! persistence and staleness checking live in [`persist`].

pub mod persist;

use std::cmp::Ordering;

use crate::core::errors::PipelineError;
use crate::corpus::Chunk;

/// Embedding matrix plus the chunks it was built from, positionally aligned.
/// Immutable after construction: searches take `&self` and may run
/// concurrently.
#[derive(Debug)]
pub struct SearchIndex {
    model_id: String,
    dimension: usize,
    embeddings: Vec<Vec<f32>>,
    chunks: Vec<Chunk>,
}

impl SearchIndex {
    /// Construct from parallel chunk and embedding lists.
    ///
    /// Rejects length disagreement and any vector whose dimensionality
    /// differs from `dimension` — the uniformity invariant everything else
    /// relies on.
    pub fn build(
        model_id: &str,
        dimension: usize,
        chunks: Vec<Chunk>,
        embeddings: Vec<Vec<f32>>,
    ) -> Result<Self, PipelineError> {
        if chunks.len() != embeddings.len() {
            return Err(PipelineError::InvalidConfig(format!(
                "{} chunks but {} embeddings",
                chunks.len(),
                embeddings.len()
            )));
        }
        for (i, embedding) in embeddings.iter().enumerate() {
            if embedding.len() != dimension {
                return Err(PipelineError::InvalidConfig(format!(
                    "embedding {} has dimension {}, expected {dimension}",
                    i,
                    embedding.len()
                )));
            }
        }

        Ok(Self {
            model_id: model_id.to_string(),
            dimension,
            embeddings,
            chunks,
        })
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn chunk(&self, position: usize) -> &Chunk {
        &self.chunks[position]
    }

    pub(crate) fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub(crate) fn embeddings(&self) -> &[Vec<f32>] {
        &self.embeddings
    }

    /// Top-k positions by cosine similarity, descending. Ties keep chunk
    /// insertion order (the sort is stable). At most k results.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<(usize, f32)>, PipelineError> {
        if self.is_empty() {
            return Err(PipelineError::EmptyIndex);
        }
        if query.len() != self.dimension {
            return Err(PipelineError::InvalidConfig(format!(
                "query vector has dimension {}, index has {}",
                query.len(),
                self.dimension
            )));
        }

        let mut scored: Vec<(usize, f32)> = self
            .embeddings
            .iter()
            .enumerate()
            .map(|(position, embedding)| (position, cosine_similarity(query, embedding)))
            .collect();

        scored.sort_by(|left, right| right.1.partial_cmp(&left.1).unwrap_or(Ordering::Equal));
        scored.truncate(k);
        Ok(scored)
    }
}

pub(crate) fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    let denom = norm_a * norm_b;

    if denom <= f32::EPSILON {
        0.0
    } else {
        dot / denom
    }
}
