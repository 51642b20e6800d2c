//! Generation provider seam
//!
//! The pipeline talks to text and image providers through narrow traits:
//! prompt in, draft or base64 image out. Provider output that should be
//! structured JSON may arrive as free text; extraction fails soft and the
//! raw text is carried on the draft instead of erroring.

pub mod image;
pub mod openrouter;

use async_trait::async_trait;
use std::collections::BTreeMap;

use crate::context::ReviewContext;
use crate::error::Result;
use crate::types::{PipelineItem, Stage};

pub use image::OpenRouterImageRenderer;
pub use openrouter::{ChatMessage, OpenRouterClient, OpenRouterGenerator, ProviderConfig};

/// A generated draft for one pipeline item
#[derive(Debug, Clone)]
pub struct GeneratedDraft {
    pub title: String,
    pub description: String,
    /// Stage-specific fields extracted from structured output
    pub extra: BTreeMap<String, serde_json::Value>,
    /// Set when the provider response could not be parsed as JSON;
    /// holds the unparsed text so the caller can present a degraded result
    pub raw: Option<String>,
}

/// Generates one draft for a stage, optionally derived from an upstream item
#[async_trait]
pub trait DraftGenerator: Send + Sync {
    async fn generate(
        &self,
        ctx: &ReviewContext,
        stage: Stage,
        upstream: Option<&PipelineItem>,
    ) -> Result<GeneratedDraft>;
}

/// Renders an image for a prompt, returning base64-encoded data
#[async_trait]
pub trait ImageRenderer: Send + Sync {
    async fn render(&self, prompt: &str) -> Result<String>;
}

/// Try to pull a JSON value out of provider output.
///
/// Strips markdown code fences and leading prose before the first brace.
/// Returns `None` when nothing parses; callers fall back to the raw text.
pub fn extract_json(text: &str) -> Option<serde_json::Value> {
    let trimmed = text.trim();

    // Direct parse first
    if let Ok(value) = serde_json::from_str(trimmed) {
        return Some(value);
    }

    // Fenced block: ```json ... ``` or ``` ... ```
    if let Some(start) = trimmed.find("```") {
        let after = &trimmed[start + 3..];
        let after = after.strip_prefix("json").unwrap_or(after);
        if let Some(end) = after.find("```") {
            if let Ok(value) = serde_json::from_str(after[..end].trim()) {
                return Some(value);
            }
        }
    }

    // Last resort: first '{' to last '}'
    if let (Some(open), Some(close)) = (trimmed.find('{'), trimmed.rfind('}')) {
        if open < close {
            if let Ok(value) = serde_json::from_str(&trimmed[open..=close]) {
                return Some(value);
            }
        }
    }

    None
}

/// Build a draft from provider output, failing soft on unparseable JSON.
///
/// Structured responses contribute `title`/`description` plus any remaining
/// fields as stage-specific extras; free text becomes the description with
/// the raw payload preserved.
pub fn draft_from_response(response: &str, fallback_title: &str) -> GeneratedDraft {
    match extract_json(response) {
        Some(serde_json::Value::Object(mut map)) => {
            let title = map
                .remove("title")
                .and_then(|v| v.as_str().map(|s| s.to_string()))
                .unwrap_or_else(|| fallback_title.to_string());
            let description = map
                .remove("description")
                .and_then(|v| v.as_str().map(|s| s.to_string()))
                .unwrap_or_default();
            GeneratedDraft {
                title,
                description,
                extra: map.into_iter().collect(),
                raw: None,
            }
        }
        _ => GeneratedDraft {
            title: fallback_title.to_string(),
            description: response.trim().to_string(),
            extra: BTreeMap::new(),
            raw: Some(response.to_string()),
        },
    }
}

/// Serialize the review context into the system prompt for a generation
/// call, so the provider sees decision history, learned rules, and
/// contradictions alongside the brand context.
pub fn build_system_prompt(ctx: &ReviewContext, stage: Stage) -> String {
    let mut prompt = format!(
        "You are a creative assistant generating {} drafts for the project '{}'.\n",
        stage, ctx.project.name
    );

    if !ctx.project.brand_context.is_empty() {
        prompt.push_str(&format!("Brand context: {}\n", ctx.project.brand_context));
    }

    if !ctx.patterns.approved.is_empty() {
        prompt.push_str("\nPreviously approved (match this direction):\n");
        for p in &ctx.patterns.approved {
            prompt.push_str(&format!("- [{}] {}\n", p.stage, p.title));
        }
    }

    if !ctx.patterns.rejected.is_empty() {
        prompt.push_str("\nPreviously rejected (avoid this direction):\n");
        for p in &ctx.patterns.rejected {
            match &p.comment {
                Some(comment) => prompt.push_str(&format!("- [{}] {}: {}\n", p.stage, p.title, comment)),
                None => prompt.push_str(&format!("- [{}] {}\n", p.stage, p.title)),
            }
        }
    }

    if !ctx.patterns.rules.is_empty() {
        prompt.push_str("\nStanding revision rules:\n");
        for rule in &ctx.patterns.rules {
            prompt.push_str(&format!("- {} (from '{}')\n", rule.rule, rule.from));
        }
    }

    if !ctx.contradictions.is_empty() {
        prompt.push_str("\nConflicting feedback to balance:\n");
        for c in &ctx.contradictions {
            prompt.push_str(&format!("- {}\n", c.description));
        }
    }

    // Existing items so the generator does not repeat itself
    for (item_stage, items) in &ctx.items {
        if items.is_empty() {
            continue;
        }
        prompt.push_str(&format!("\nExisting {} items (do not duplicate):\n", item_stage));
        for item in items {
            prompt.push_str(&format!("- {} [{}]\n", item.title, item.status));
        }
    }

    prompt.push_str(
        "\nRespond with a single JSON object: {\"title\": ..., \"description\": ...} \
         plus any stage-specific fields.\n",
    );
    prompt
}
