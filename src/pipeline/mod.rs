//! The retrieval-and-answer pipeline.
//!
//! Owns the corpus, embedder, index, retriever, persona registry, and
//! generator as one explicitly-initialized context object. The index is
//! built behind a one-time async barrier: concurrent first queries share a
//! single build, and steady-state searches are read-only.

use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::OnceCell;

use crate::core::config::{AppPaths, Settings};
use crate::core::errors::PipelineError;
use crate::corpus::{self, ChunkingConfig};
use crate::embed::Embedder;
use crate::generate::{AnswerGenerator, ChatModel};
use crate::index::{persist, SearchIndex};
use crate::persona::PersonaRegistry;
use crate::retrieve::{Retriever, ScoredChunk};

/// Attribution entry for one retrieved chunk, most relevant first.
#[derive(Debug, Clone, Serialize)]
pub struct SourceRef {
    pub chunk_id: String,
    pub excerpt: String,
    pub score: f32,
}

/// Result of one query. Ephemeral; never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    pub answer_text: String,
    pub sources: Vec<SourceRef>,
}

const EXCERPT_CHARS: usize = 160;

pub struct Pipeline {
    corpus_path: PathBuf,
    index_path: PathBuf,
    settings: Settings,
    registry: PersonaRegistry,
    embedder: Arc<dyn Embedder>,
    retriever: Retriever,
    generator: AnswerGenerator,
    index: OnceCell<SearchIndex>,
}

impl Pipeline {
    pub fn new(
        paths: &AppPaths,
        settings: Settings,
        registry: PersonaRegistry,
        embedder: Arc<dyn Embedder>,
        chat_model: Arc<dyn ChatModel>,
    ) -> Self {
        let generator = AnswerGenerator::new(
            chat_model,
            settings.generation.temperature,
            settings.generation.max_tokens,
        );
        Self {
            corpus_path: paths.resolve_corpus(&settings.corpus_file),
            index_path: paths.index_path.clone(),
            settings,
            registry,
            embedder,
            retriever: Retriever::default(),
            generator,
            index: OnceCell::new(),
        }
    }

    pub fn personas(&self) -> &PersonaRegistry {
        &self.registry
    }

    /// Chunk count of the index, if it has been built.
    pub fn indexed_chunks(&self) -> Option<usize> {
        self.index.get().map(SearchIndex::len)
    }

    /// Force the initialization barrier now so ingestion and index-build
    /// failures abort startup instead of surfacing on the first query.
    pub async fn warm_up(&self) -> Result<(), PipelineError> {
        self.index().await.map(|_| ())
    }

    /// Answer a query under a persona. `k` falls back to the configured
    /// top-k when `None`.
    pub async fn answer(
        &self,
        query_text: &str,
        persona_id: &str,
        k: Option<usize>,
    ) -> Result<Answer, PipelineError> {
        let persona = self.registry.resolve(persona_id)?;
        let index = self.index().await?;
        let k = k.unwrap_or(self.settings.top_k).max(1);

        let retrieved = self
            .retriever
            .retrieve(self.embedder.as_ref(), index, query_text, persona, k)
            .await?;

        let answer_text = self
            .generator
            .generate(query_text, &retrieved, persona)
            .await?;

        Ok(Answer {
            answer_text,
            sources: retrieved.iter().map(source_ref).collect(),
        })
    }

    /// At-most-one build in flight; concurrent first queries await the same
    /// result.
    async fn index(&self) -> Result<&SearchIndex, PipelineError> {
        self.index.get_or_try_init(|| self.load_or_build()).await
    }

    async fn load_or_build(&self) -> Result<SearchIndex, PipelineError> {
        let documents = corpus::load_documents(
            &self.corpus_path,
            &self.settings.text_column,
            self.settings.id_column.as_deref(),
        )?;
        let chunks = corpus::chunk_corpus(
            &documents,
            ChunkingConfig {
                chunk_chars: self.settings.chunk_chars,
                overlap_chars: self.settings.overlap_chars,
            },
        );

        if self.index_path.exists() {
            match persist::load(
                &self.index_path,
                self.embedder.model_id(),
                self.embedder.dimension(),
                chunks.len(),
            ) {
                Ok(index) => {
                    tracing::info!(
                        "Loaded persisted index ({} chunks) from {}",
                        index.len(),
                        self.index_path.display()
                    );
                    return Ok(index);
                }
                Err(PipelineError::IndexStale(reason)) => {
                    tracing::warn!("Persisted index is stale ({reason}), rebuilding");
                }
                Err(other) => return Err(other),
            }
        }

        let index = self.build_index(chunks).await?;
        persist::save(&index, &self.index_path)?;
        Ok(index)
    }

    async fn build_index(
        &self,
        chunks: Vec<crate::corpus::Chunk>,
    ) -> Result<SearchIndex, PipelineError> {
        tracing::info!("Embedding {} chunks for index build", chunks.len());
        let embeddings = if chunks.is_empty() {
            Vec::new()
        } else {
            let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
            self.embedder.embed_batch(&texts).await?
        };
        SearchIndex::build(
            self.embedder.model_id(),
            self.embedder.dimension(),
            chunks,
            embeddings,
        )
    }
}

fn source_ref(scored: &ScoredChunk) -> SourceRef {
    let excerpt: String = scored.chunk.text.chars().take(EXCERPT_CHARS).collect();
    SourceRef {
        chunk_id: scored.chunk.ref_id(),
        excerpt,
        score: scored.score,
    }
}
