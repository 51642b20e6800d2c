//! Text-generation client for OpenAI-compatible providers

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use super::{build_system_prompt, draft_from_response, DraftGenerator, GeneratedDraft};
use crate::config::Config;
use crate::context::ReviewContext;
use crate::error::{Error, Result};
use crate::types::{PipelineItem, Stage};

/// Configuration for a generation API provider
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// Base URL for the API (e.g., "https://openrouter.ai/api/v1")
    pub base_url: String,
    /// API key for authentication
    pub api_key: String,
    /// Extra headers to include in requests
    pub extra_headers: Vec<(String, String)>,
}

impl ProviderConfig {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            extra_headers: Vec::new(),
        }
    }

    /// Build from the loaded config, resolving the API key from env
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        Ok(Self::new(
            config.provider.base_url.clone(),
            config.provider.api_key()?,
        ))
    }
}

/// A chat message on the wire
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    modalities: Option<Vec<String>>,
}

/// Chat completions client (OpenRouter and other OpenAI-compatible APIs)
#[derive(Clone)]
pub struct OpenRouterClient {
    client: Arc<Client>,
    provider: ProviderConfig,
}

impl OpenRouterClient {
    pub fn new(provider: ProviderConfig) -> Self {
        Self {
            client: Arc::new(Client::new()),
            provider,
        }
    }

    pub fn provider(&self) -> &ProviderConfig {
        &self.provider
    }

    /// Send a chat completion request and return the assistant text
    pub async fn complete(
        &self,
        model: &str,
        messages: Vec<ChatMessage>,
        max_tokens: Option<u32>,
    ) -> Result<String> {
        let body = self
            .send(ChatRequest {
                model: model.to_string(),
                messages,
                max_tokens,
                modalities: None,
            })
            .await?;
        Ok(extract_text(&body))
    }

    /// Send a chat completion request asking for an image modality and
    /// return the base64 payload of the first generated image
    pub async fn complete_image(&self, model: &str, prompt: &str) -> Result<String> {
        let body = self
            .send(ChatRequest {
                model: model.to_string(),
                messages: vec![ChatMessage::user(prompt)],
                max_tokens: None,
                modalities: Some(vec!["image".to_string(), "text".to_string()]),
            })
            .await?;
        extract_image_base64(&body)
            .ok_or_else(|| Error::generation("provider returned no image payload"))
    }

    async fn send(&self, request: ChatRequest) -> Result<serde_json::Value> {
        let mut builder = self
            .client
            .post(format!("{}/chat/completions", self.provider.base_url))
            .header("Authorization", format!("Bearer {}", self.provider.api_key));
        for (key, value) in &self.provider.extra_headers {
            builder = builder.header(key.as_str(), value.as_str());
        }

        let response = builder
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::generation(format!("request to provider failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::generation(format!(
                "provider API error ({}): {}",
                status, body
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| Error::generation(format!("failed to read provider response: {}", e)))?;
        debug!("Provider response: {} bytes", body.len());

        serde_json::from_str(&body)
            .map_err(|e| Error::generation(format!("unparseable provider response: {}", e)))
    }
}

/// Pull assistant text out of a chat completions response.
/// Handles both string content and array-of-content-parts formats.
fn extract_text(response: &serde_json::Value) -> String {
    let content = response
        .get("choices")
        .and_then(|c| c.as_array())
        .and_then(|arr| arr.first())
        .and_then(|choice| choice.get("message"))
        .and_then(|msg| msg.get("content"));

    match content {
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(serde_json::Value::Array(parts)) => parts
            .iter()
            .filter_map(|part| {
                if part.get("type").and_then(|t| t.as_str()) == Some("text") {
                    part.get("text").and_then(|t| t.as_str()).map(String::from)
                } else {
                    None
                }
            })
            .collect::<Vec<_>>()
            .join(""),
        _ => String::new(),
    }
}

/// Pull the first image data URI out of a chat completions response,
/// stripping the `data:image/...;base64,` prefix when present
fn extract_image_base64(response: &serde_json::Value) -> Option<String> {
    let url = response
        .get("choices")
        .and_then(|c| c.as_array())
        .and_then(|arr| arr.first())
        .and_then(|choice| choice.get("message"))
        .and_then(|msg| msg.get("images"))
        .and_then(|imgs| imgs.as_array())
        .and_then(|arr| arr.first())
        .and_then(|img| img.get("image_url"))
        .and_then(|iu| iu.get("url"))
        .and_then(|u| u.as_str())?;

    match url.split_once(";base64,") {
        Some((_, data)) => Some(data.to_string()),
        None => Some(url.to_string()),
    }
}

/// Draft generator backed by the chat completions client
pub struct OpenRouterGenerator {
    client: OpenRouterClient,
    models: crate::config::ModelsConfig,
}

impl OpenRouterGenerator {
    pub fn new(client: OpenRouterClient, models: crate::config::ModelsConfig) -> Self {
        Self { client, models }
    }
}

#[async_trait]
impl DraftGenerator for OpenRouterGenerator {
    async fn generate(
        &self,
        ctx: &ReviewContext,
        stage: Stage,
        upstream: Option<&PipelineItem>,
    ) -> Result<GeneratedDraft> {
        let system = build_system_prompt(ctx, stage);
        let user = match upstream {
            Some(item) => format!(
                "Generate one {} derived from this approved upstream item:\n\nTitle: {}\nDescription: {}",
                stage, item.title, item.description
            ),
            None => format!("Generate one fresh {} for this project.", stage),
        };

        let model = self.models.for_stage(stage);
        let response = self
            .client
            .complete(model, vec![ChatMessage::system(system), ChatMessage::user(user)], Some(2048))
            .await?;

        let fallback_title = match upstream {
            Some(item) => format!("{} for {}", capitalize(&stage.to_string()), item.title),
            None => format!("Generated {}", stage),
        };
        Ok(draft_from_response(&response, &fallback_title))
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extract_text_string_content() {
        let response = json!({
            "choices": [{"message": {"content": "hello"}}]
        });
        assert_eq!(extract_text(&response), "hello");
    }

    #[test]
    fn test_extract_text_parts_content() {
        let response = json!({
            "choices": [{"message": {"content": [
                {"type": "text", "text": "a"},
                {"type": "image_url", "image_url": {"url": "x"}},
                {"type": "text", "text": "b"}
            ]}}]
        });
        assert_eq!(extract_text(&response), "ab");
    }

    #[test]
    fn test_extract_image_strips_data_uri_prefix() {
        let response = json!({
            "choices": [{"message": {"images": [
                {"image_url": {"url": "data:image/png;base64,QUJD"}}
            ]}}]
        });
        assert_eq!(extract_image_base64(&response).as_deref(), Some("QUJD"));
    }

    #[test]
    fn test_extract_image_missing_is_none() {
        let response = json!({"choices": [{"message": {"content": "no image"}}]});
        assert!(extract_image_base64(&response).is_none());
    }
}
