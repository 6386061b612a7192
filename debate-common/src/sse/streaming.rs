//! Streaming client for OpenAI-compatible Chat Completions.
//!
//! POST -> status check -> SSE loop with idle timeout -> accumulated text.
//! Callers never touch raw bytes or SSE events.

use futures_util::StreamExt;
use reqwest::Client;
use serde_json::Value;
use thiserror::Error;
use tokio::time::timeout;
use tracing::{debug, warn};

use super::openai::parse_chat_sse;
use super::{SseParser, StreamAction, StopReason, IDLE_TIMEOUT};

#[derive(Debug, Error)]
pub enum StreamError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("chat API error HTTP {status}: {body}")]
    Api { status: u16, body: String },
    #[error("chat stream error: {0}")]
    Stream(String),
    #[error("chat stream idle timeout ({}s)", IDLE_TIMEOUT.as_secs())]
    IdleTimeout,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StreamResult {
    pub text: String,
    pub stop_reason: StopReason,
}

// ============================================================================
// StreamAccumulator
// ============================================================================

/// Folds a sequence of [`StreamAction`]s into a [`StreamResult`].
#[derive(Debug)]
pub struct StreamAccumulator {
    pub text: String,
    pub stop_reason: StopReason,
    error: Option<String>,
}

impl Default for StreamAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamAccumulator {
    pub fn new() -> Self {
        Self {
            text: String::new(),
            stop_reason: StopReason::Unknown,
            error: None,
        }
    }

    pub fn process(&mut self, action: StreamAction) {
        match action {
            StreamAction::TextDelta(text) => self.text.push_str(&text),
            StreamAction::MessageComplete { stop_reason } => {
                // `[DONE]` follows the real finish_reason; keep the first one.
                if self.stop_reason == StopReason::Unknown {
                    self.stop_reason = stop_reason;
                }
            }
            StreamAction::Error(msg) => {
                self.error.get_or_insert(msg);
            }
        }
    }

    /// The first in-band error the server reported, if any.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn into_result(self) -> Result<StreamResult, StreamError> {
        if let Some(msg) = self.error {
            return Err(StreamError::Stream(msg));
        }
        // Some servers close the body without a finish_reason.
        let stop_reason = if self.stop_reason == StopReason::Unknown && !self.text.is_empty() {
            StopReason::EndTurn
        } else {
            self.stop_reason
        };
        Ok(StreamResult {
            text: self.text,
            stop_reason,
        })
    }
}

// ============================================================================
// Chat Completions API
// ============================================================================

/// Stream a Chat Completions request (`/v1/chat/completions`) to completion.
pub async fn stream_chat(
    client: &Client,
    url: &str,
    api_key: &str,
    mut payload: Value,
) -> Result<StreamResult, StreamError> {
    payload["stream"] = Value::Bool(true);
    debug!(url, "POST chat completion (streaming)");

    let response = client
        .post(url)
        .bearer_auth(api_key)
        .json(&payload)
        .send()
        .await?;

    if !response.status().is_success() {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        return Err(StreamError::Api { status, body });
    }

    let mut parser = SseParser::new();
    let mut byte_stream = response.bytes_stream();
    let mut acc = StreamAccumulator::new();

    loop {
        match timeout(IDLE_TIMEOUT, byte_stream.next()).await {
            Ok(Some(Ok(chunk))) => {
                for event in parser.feed(&chunk) {
                    if let Some(action) = parse_chat_sse(&event) {
                        acc.process(action);
                    }
                }
            }
            Ok(Some(Err(e))) => return Err(StreamError::Stream(e.to_string())),
            Ok(None) => break,
            Err(_) => {
                if !acc.text.is_empty() {
                    warn!(chars = acc.text.len(), "chat stream went idle, keeping partial text");
                    break;
                }
                return Err(StreamError::IdleTimeout);
            }
        }
    }

    for event in parser.flush() {
        if let Some(action) = parse_chat_sse(&event) {
            acc.process(action);
        }
    }

    acc.into_result()
}
