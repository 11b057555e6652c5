use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use super::{ChatModel, ChatRequest};
use crate::core::config::GenerationSettings;
use crate::core::errors::PipelineError;

/// OpenAI-compatible `/v1/chat/completions` client.
///
/// The API key comes from the environment at startup and is never written to
/// configuration. A missing key is not fatal at startup; the first
/// generation call reports it as `GenerationUnavailable`.
pub struct OpenAiChat {
    base_url: String,
    model: String,
    api_key: Option<String>,
    client: Client,
}

impl OpenAiChat {
    pub fn new(settings: &GenerationSettings, api_key: Option<String>) -> Self {
        Self {
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            model: settings.model.clone(),
            api_key,
            client: Client::new(),
        }
    }
}

#[async_trait]
impl ChatModel for OpenAiChat {
    fn name(&self) -> &str {
        &self.model
    }

    async fn chat(&self, request: ChatRequest) -> Result<String, PipelineError> {
        let api_key = self.api_key.as_ref().ok_or_else(|| {
            PipelineError::GenerationUnavailable(
                "API key is not configured; set it in the environment".to_string(),
            )
        })?;

        let url = format!("{}/v1/chat/completions", self.base_url);
        let mut body = json!({
            "model": self.model,
            "messages": request.messages,
            "stream": false,
        });
        if let Some(obj) = body.as_object_mut() {
            if let Some(t) = request.temperature {
                obj.insert("temperature".to_string(), json!(t));
            }
            if let Some(t) = request.max_tokens {
                obj.insert("max_tokens".to_string(), json!(t));
            }
        }

        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| PipelineError::GenerationUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(PipelineError::GenerationUnavailable(format!(
                "{status}: {text}"
            )));
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| PipelineError::GenerationUnavailable(e.to_string()))?;

        let choice = &payload["choices"][0];
        let finish_reason = choice["finish_reason"].as_str().unwrap_or_default();
        if finish_reason == "content_filter" {
            return Err(PipelineError::GenerationRefused(
                "the model's content filter declined this request".to_string(),
            ));
        }

        let content = choice["message"]["content"]
            .as_str()
            .unwrap_or_default()
            .trim()
            .to_string();
        if content.is_empty() {
            return Err(PipelineError::GenerationRefused(
                "the model returned an empty completion".to_string(),
            ));
        }

        Ok(content)
    }
}
