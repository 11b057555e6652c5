//! Retrieval: query embedding, index search, persona keyword filtering.

use serde::Serialize;

use crate::core::errors::PipelineError;
use crate::corpus::Chunk;
use crate::embed::Embedder;
use crate::index::SearchIndex;
use crate::persona::Persona;

/// A retrieved chunk with its similarity score. Higher is more relevant.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub score: f32,
}

pub struct Retriever {
    /// Candidate multiplier used when a persona keyword filter is active:
    /// `oversample × k` chunks are fetched before filtering.
    oversample: usize,
}

impl Default for Retriever {
    fn default() -> Self {
        Self { oversample: 5 }
    }
}

impl Retriever {
    /// Top-k chunks for a query under a persona's keyword filter.
    ///
    /// Without keywords this is a plain index search. With keywords, a
    /// larger candidate pool is fetched, chunks containing none of the
    /// keywords are dropped, and the survivors are truncated to k. Fewer
    /// than k survivors means fewer results; irrelevant chunks are never
    /// padded in. No survivors is an empty result, not an error.
    pub async fn retrieve(
        &self,
        embedder: &dyn Embedder,
        index: &SearchIndex,
        query_text: &str,
        persona: &Persona,
        k: usize,
    ) -> Result<Vec<ScoredChunk>, PipelineError> {
        let query_vector = embedder.embed(query_text).await?;

        let fetch = if persona.keywords.is_empty() {
            k
        } else {
            k.saturating_mul(self.oversample)
        };

        let hits = index.search(&query_vector, fetch)?;
        let mut results: Vec<ScoredChunk> = hits
            .into_iter()
            .map(|(position, score)| ScoredChunk {
                chunk: index.chunk(position).clone(),
                score,
            })
            .filter(|scored| matches_keywords(&scored.chunk.text, &persona.keywords))
            .collect();
        results.truncate(k);

        tracing::debug!(
            "Retrieved {} chunks for persona '{}' (k={k})",
            results.len(),
            persona.id
        );
        Ok(results)
    }
}

/// Case-insensitive substring match against any keyword. Empty keyword list
/// accepts everything.
fn matches_keywords(text: &str, keywords: &[String]) -> bool {
    if keywords.is_empty() {
        return true;
    }
    let lowered = text.to_lowercase();
    keywords
        .iter()
        .any(|keyword| lowered.contains(&keyword.to_lowercase()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::Chunk;
    use crate::persona::Persona;
    use async_trait::async_trait;

    /// Deterministic stand-in embedder: one axis per known term.
    struct TermEmbedder;

    const TERMS: [&str; 4] = ["weather", "rain", "bus", "school"];

    #[async_trait]
    impl Embedder for TermEmbedder {
        fn model_id(&self) -> &str {
            "term-test"
        }

        fn dimension(&self) -> usize {
            TERMS.len()
        }

        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, PipelineError> {
            Ok(texts
                .iter()
                .map(|text| {
                    let lowered = text.to_lowercase();
                    TERMS
                        .iter()
                        .map(|term| if lowered.contains(term) { 1.0 } else { 0.0 })
                        .collect()
                })
                .collect())
        }
    }

    fn persona_with(keywords: &[&str]) -> Persona {
        Persona {
            id: "test".to_string(),
            name: "Test".to_string(),
            description: String::new(),
            system_prompt: "Answer from context.".to_string(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        }
    }

    async fn index_of(texts: &[&str]) -> SearchIndex {
        let embedder = TermEmbedder;
        let owned: Vec<String> = texts.iter().map(|t| t.to_string()).collect();
        let embeddings = embedder.embed_batch(&owned).await.expect("embed");
        let chunks = texts
            .iter()
            .enumerate()
            .map(|(i, text)| Chunk {
                document_id: i.to_string(),
                chunk_index: 0,
                start_offset: 0,
                text: text.to_string(),
            })
            .collect();
        SearchIndex::build("term-test", TERMS.len(), chunks, embeddings).expect("build")
    }

    #[tokio::test]
    async fn keyword_filter_excludes_non_matching_chunks() {
        // 3 chunks mention weather, 7 do not; k=10 must return only the 3.
        let texts = [
            "weather alert issued for the city",
            "bus depot opens near the lake",
            "school results announced today",
            "weather stays dry this week",
            "new bus routes from majestic",
            "school admissions open in june",
            "council meets on road repairs",
            "weather office warns of rain",
            "bus fares revised upward",
            "school syllabus updated",
        ];
        let index = index_of(&texts).await;
        let persona = persona_with(&["weather"]);

        let results = Retriever::default()
            .retrieve(&TermEmbedder, &index, "weather in bangalore", &persona, 10)
            .await
            .expect("retrieve");

        assert_eq!(results.len(), 3);
        assert!(results.iter().all(|r| r.chunk.text.contains("weather")));
    }

    #[tokio::test]
    async fn fewer_survivors_than_k_is_not_padded() {
        let index = index_of(&["rain over the city", "bus strike tomorrow"]).await;
        let persona = persona_with(&["rain"]);

        let results = Retriever::default()
            .retrieve(&TermEmbedder, &index, "rain", &persona, 5)
            .await
            .expect("retrieve");

        assert_eq!(results.len(), 1);
    }

    #[tokio::test]
    async fn no_survivors_is_empty_not_error() {
        let index = index_of(&["bus strike tomorrow", "school exam dates"]).await;
        let persona = persona_with(&["monsoon"]);

        let results = Retriever::default()
            .retrieve(&TermEmbedder, &index, "anything", &persona, 3)
            .await
            .expect("retrieve");

        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn keyword_match_is_case_insensitive() {
        let index = index_of(&["WEATHER WARNING for the coast"]).await;
        let persona = persona_with(&["weather"]);

        let results = Retriever::default()
            .retrieve(&TermEmbedder, &index, "weather", &persona, 1)
            .await
            .expect("retrieve");

        assert_eq!(results.len(), 1);
    }

    #[tokio::test]
    async fn unfiltered_persona_returns_top_k() {
        let index = index_of(&["rain floods roads", "bus routes change", "school reopens"]).await;
        let persona = persona_with(&[]);

        let results = Retriever::default()
            .retrieve(&TermEmbedder, &index, "rain", &persona, 2)
            .await
            .expect("retrieve");

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].chunk.text, "rain floods roads");
    }
}
