//! Answer generation: prompt assembly and the external chat model contract.

mod openai;

pub use openai::OpenAiChat;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::errors::PipelineError;
use crate::persona::Persona;
use crate::retrieve::ScoredChunk;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    pub temperature: Option<f64>,
    pub max_tokens: Option<u32>,
}

impl ChatRequest {
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            temperature: None,
            max_tokens: None,
        }
    }
}

/// External generation model: prompt in, text out.
#[async_trait]
pub trait ChatModel: Send + Sync {
    fn name(&self) -> &str;

    async fn chat(&self, request: ChatRequest) -> Result<String, PipelineError>;
}

/// Assemble the user-role prompt: attributed context blocks, then the
/// question. With no retrieved chunks the model is still called, with an
/// explicit no-context notice instead of a fabricated answer.
pub fn build_prompt(query_text: &str, chunks: &[ScoredChunk]) -> String {
    let context = if chunks.is_empty() {
        "No relevant context found.".to_string()
    } else {
        chunks
            .iter()
            .enumerate()
            .map(|(i, scored)| {
                format!(
                    "[{}] (source: {})\n{}",
                    i + 1,
                    scored.chunk.ref_id(),
                    scored.chunk.text
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    };

    format!(
        "Based on the following context:\n\nContext:\n{context}\n\nQuestion: {query_text}\n\nAnswer:"
    )
}

/// Combines retrieved context, persona prompt, and the user query into one
/// generation call.
pub struct AnswerGenerator {
    model: std::sync::Arc<dyn ChatModel>,
    temperature: f64,
    max_tokens: u32,
}

impl AnswerGenerator {
    pub fn new(model: std::sync::Arc<dyn ChatModel>, temperature: f64, max_tokens: u32) -> Self {
        Self {
            model,
            temperature,
            max_tokens,
        }
    }

    pub async fn generate(
        &self,
        query_text: &str,
        chunks: &[ScoredChunk],
        persona: &Persona,
    ) -> Result<String, PipelineError> {
        let request = ChatRequest {
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: persona.system_prompt.clone(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: build_prompt(query_text, chunks),
                },
            ],
            temperature: Some(self.temperature),
            max_tokens: Some(self.max_tokens),
        };

        tracing::debug!(
            "Generating answer via '{}' with {} context chunks",
            self.model.name(),
            chunks.len()
        );
        self.model.chat(request).await
    }
}
