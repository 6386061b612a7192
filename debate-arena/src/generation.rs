//! The model-completion seam. The scheduler and the judge only see the
//! [`Generator`] trait; [`ChatGenerator`] is the live implementation against
//! any OpenAI-compatible Chat Completions endpoint (Groq by default).

use async_trait::async_trait;
use debate_common::config::{self, ConfigError, DebateConfig};
use debate_common::sse::streaming::{self, StreamError};
use debate_common::sse::StopReason;
use serde_json::json;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error(transparent)]
    Stream(#[from] StreamError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("model returned an empty response")]
    Empty,
    #[error("{0}")]
    Other(String),
}

/// Given an instruction and the conversation so far, produce a reply.
///
/// One blocking call per turn from the caller's point of view; the
/// implementation may stream underneath.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, instruction: &str, transcript: &str) -> Result<String, GenerationError>;
}

pub struct ChatGenerator {
    client: reqwest::Client,
    url: String,
    api_key: String,
    model: String,
    temperature: f32,
}

impl ChatGenerator {
    pub fn from_config(config: &DebateConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            client: config::build_http_client(),
            url: config.chat_completions_url(),
            api_key: config.require_api_key()?.to_string(),
            model: config.model.clone(),
            temperature: config.temperature,
        })
    }
}

#[async_trait]
impl Generator for ChatGenerator {
    async fn generate(&self, instruction: &str, transcript: &str) -> Result<String, GenerationError> {
        let payload = json!({
            "model": self.model,
            "temperature": self.temperature,
            "messages": [
                {"role": "system", "content": instruction},
                {"role": "user", "content": transcript},
            ],
        });

        let start = Instant::now();
        let result = streaming::stream_chat(&self.client, &self.url, &self.api_key, payload).await?;
        let elapsed_ms = start.elapsed().as_millis() as u64;

        if result.stop_reason == StopReason::MaxTokens {
            warn!(model = %self.model, "completion hit the token limit, text is truncated");
        }
        if result.text.trim().is_empty() {
            return Err(GenerationError::Empty);
        }

        debug!(model = %self.model, elapsed_ms, chars = result.text.len(), "completion received");
        Ok(result.text)
    }
}
