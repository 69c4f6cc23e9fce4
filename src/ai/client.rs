//! OpenAI-compatible chat-completions adapter.
//!
//! The AI vendor is out of scope for this system (see the spec's
//! non-goals); this client speaks the lowest-common-denominator wire shape
//! (`{model, messages, max_tokens, response_format}`) so swapping vendors is
//! a base-URL change, following the reference daemon's own preference for a
//! small typed `reqwest` client per external HTTP collaborator over a vendor
//! SDK.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::Semaphore;

use crate::core::{retry_with_backoff, AiServiceError, CaptionSpec, ImageAnalysis};

use super::traits::AiAdapter;

const DEFAULT_MAX_TOKENS: u32 = 512;
const MAX_ATTEMPTS: u32 = 3;

/// Async QPS gate shared across all calls made by one adapter instance.
struct RateLimiter {
    semaphore: Arc<Semaphore>,
}

impl RateLimiter {
    fn new(permits: usize, refill_every: std::time::Duration) -> Arc<Self> {
        let semaphore = Arc::new(Semaphore::new(permits));
        let limiter = Arc::new(Self { semaphore });
        let background = Arc::clone(&limiter.semaphore);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(refill_every);
            loop {
                ticker.tick().await;
                if background.available_permits() < permits {
                    background.add_permits(1);
                }
            }
        });
        limiter
    }

    async fn acquire(&self) -> Result<tokio::sync::SemaphorePermit<'_>, AiServiceError> {
        self.semaphore.acquire().await.map_err(|_| AiServiceError::RateLimited)
    }
}

/// `AiAdapter` implementation speaking an OpenAI-compatible chat-completions
/// endpoint.
pub struct OpenAiCompatibleAdapter {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    limiter: Arc<RateLimiter>,
}

impl OpenAiCompatibleAdapter {
    /// Build an adapter. `qps` governs the shared rate limiter.
    #[must_use]
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>, model: impl Into<String>, qps: usize) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
            limiter: RateLimiter::new(qps.max(1), std::time::Duration::from_secs(1) / qps.max(1) as u32),
        }
    }

    async fn chat_json(&self, system: &str, user: &str) -> Result<serde_json::Value, AiServiceError> {
        let _permit = self.limiter.acquire().await?;

        let body = json!({
            "model": self.model,
            "max_tokens": DEFAULT_MAX_TOKENS,
            "response_format": {"type": "json_object"},
            "messages": [
                {"role": "system", "content": system},
                {"role": "user", "content": user},
            ],
        });

        let raw = retry_with_backoff(
            MAX_ATTEMPTS,
            || async {
                let resp = self
                    .client
                    .post(format!("{}/chat/completions", self.base_url))
                    .bearer_auth(&self.api_key)
                    .json(&body)
                    .send()
                    .await
                    .map_err(|e| AiServiceError::Transport { source: anyhow::anyhow!(e.to_string()) })?;

                if resp.status() == reqwest::StatusCode::UNAUTHORIZED || resp.status() == reqwest::StatusCode::FORBIDDEN {
                    return Err(AiServiceError::Auth);
                }
                if resp.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
                    return Err(AiServiceError::RateLimited);
                }
                if !resp.status().is_success() {
                    let text = resp.text().await.unwrap_or_default();
                    return Err(AiServiceError::Transport { source: anyhow::anyhow!(text) });
                }
                resp.text().await.map_err(|e| AiServiceError::Transport { source: anyhow::anyhow!(e.to_string()) })
            },
            |e| matches!(e, AiServiceError::Transport { .. } | AiServiceError::RateLimited),
        )
        .await?;

        extract_content_json(&raw)
    }
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Deserialize)]
struct Message {
    content: String,
}

fn extract_content_json(raw_response: &str) -> Result<serde_json::Value, AiServiceError> {
    let parsed: ChatResponse = serde_json::from_str(raw_response)
        .map_err(|e| AiServiceError::InvalidResponse { detail: format!("envelope: {e}") })?;
    let content = parsed
        .choices
        .first()
        .map(|c| c.message.content.as_str())
        .ok_or_else(|| AiServiceError::InvalidResponse { detail: "no choices".to_string() })?;

    parse_json_with_fallback(content)
}

/// Strict-parse `content` as JSON; on failure, fall back to extracting the
/// substring between the first `{` and the last `}` and retrying once.
fn parse_json_with_fallback(content: &str) -> Result<serde_json::Value, AiServiceError> {
    if let Ok(value) = serde_json::from_str(content) {
        return Ok(value);
    }
    let (Some(start), Some(end)) = (content.find('{'), content.rfind('}')) else {
        return Err(AiServiceError::InvalidResponse { detail: "no JSON object found".to_string() });
    };
    if end <= start {
        return Err(AiServiceError::InvalidResponse { detail: "no JSON object found".to_string() });
    }
    serde_json::from_str(&content[start..=end]).map_err(|e| AiServiceError::InvalidResponse { detail: e.to_string() })
}

#[derive(Serialize)]
struct CaptionPairResponse {
    caption: String,
    #[serde(default)]
    sd_caption: Option<String>,
}

#[async_trait]
impl AiAdapter for OpenAiCompatibleAdapter {
    async fn analyze(&self, image_url: &str) -> Result<ImageAnalysis, AiServiceError> {
        let system = "You analyze an image and return strict JSON matching the ImageAnalysis schema: \
            description (<=30 words), mood, tags, nsfw, safety_labels. Keep tone PG-13.";
        let user = format!("Analyze this image: {image_url}");
        let value = self.chat_json(system, &user).await?;
        serde_json::from_value(value).map_err(|e| AiServiceError::InvalidResponse { detail: e.to_string() })
    }

    async fn create_caption_pair(
        &self,
        analysis: &ImageAnalysis,
        spec: &CaptionSpec,
    ) -> Result<(String, Option<String>), AiServiceError> {
        let system = "You write a social-media caption and a single-line stable-diffusion-style training \
            caption (sd_caption) for an already-analyzed image. Return strict JSON: {caption, sd_caption}.";
        let user = format!(
            "platform={} style={:?} max_length={} hashtags={:?} description={:?} tags={:?}",
            spec.platform, spec.style, spec.max_length, spec.hashtags, analysis.description, analysis.tags
        );

        match self.chat_json(system, &user).await {
            Ok(value) => {
                let parsed: CaptionPairResponse = serde_json::from_value(value)
                    .map_err(|e| AiServiceError::InvalidResponse { detail: e.to_string() })?;
                Ok((parsed.caption, parsed.sd_caption))
            }
            Err(AiServiceError::InvalidResponse { .. }) => {
                // Legacy fallback: caption-only call, no sd_caption.
                let legacy_system = "Write only a short social-media caption as plain text, no JSON.";
                let legacy_user = format!("description={:?}", analysis.description);
                let _permit = self.limiter.acquire().await?;
                let body = json!({
                    "model": self.model,
                    "max_tokens": DEFAULT_MAX_TOKENS,
                    "messages": [
                        {"role": "system", "content": legacy_system},
                        {"role": "user", "content": legacy_user},
                    ],
                });
                let resp = self
                    .client
                    .post(format!("{}/chat/completions", self.base_url))
                    .bearer_auth(&self.api_key)
                    .json(&body)
                    .send()
                    .await
                    .map_err(|e| AiServiceError::Transport { source: anyhow::anyhow!(e.to_string()) })?;
                let raw = resp.text().await.map_err(|e| AiServiceError::Transport { source: anyhow::anyhow!(e.to_string()) })?;
                let parsed: ChatResponse = serde_json::from_str(&raw)
                    .map_err(|e| AiServiceError::InvalidResponse { detail: e.to_string() })?;
                let caption = parsed.choices.into_iter().next().map(|c| c.message.content).unwrap_or_default();
                Ok((caption, None))
            }
            Err(e) => Err(e),
        }
    }
}
