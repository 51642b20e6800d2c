//! Image rendering for storyboard frames

use async_trait::async_trait;
use base64::Engine;
use tracing::debug;

use super::{ImageRenderer, OpenRouterClient};
use crate::error::{Error, Result};

/// Image renderer backed by the chat completions client's image modality
pub struct OpenRouterImageRenderer {
    client: OpenRouterClient,
    model: String,
}

impl OpenRouterImageRenderer {
    pub fn new(client: OpenRouterClient, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }
}

#[async_trait]
impl ImageRenderer for OpenRouterImageRenderer {
    async fn render(&self, prompt: &str) -> Result<String> {
        let payload = self.client.complete_image(&self.model, prompt).await?;

        // Sanity-check the payload before persisting it on an item
        base64::engine::general_purpose::STANDARD
            .decode(&payload)
            .map_err(|e| Error::generation(format!("provider returned invalid base64: {}", e)))?;

        debug!("Rendered storyboard frame ({} base64 chars)", payload.len());
        Ok(payload)
    }
}
