pub mod openai;
pub mod streaming;

use std::time::Duration;

/// A stream that delivers nothing for this long is treated as dead.
pub const IDLE_TIMEOUT: Duration = Duration::from_secs(60);

// ============================================================================
// SseParser — turns raw response bytes into SSE events
// ============================================================================

#[derive(Debug, Default)]
pub struct SseParser {
    buffer: String,
}

impl SseParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a byte chunk and return any events it completed.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        let text = String::from_utf8_lossy(chunk);
        let normalized = text.replace("\r\n", "\n").replace('\r', "\n");
        self.buffer.push_str(&normalized);

        let mut events = Vec::new();

        while let Some(pos) = self.buffer.find("\n\n") {
            let raw_event: String = self.buffer.drain(..pos + 2).collect();

            if let Some(event) = Self::parse_raw_event(&raw_event[..pos]) {
                events.push(event);
            }
        }

        events
    }

    /// Drain whatever is left once the body ends (servers may omit the final blank line).
    pub fn flush(&mut self) -> Vec<SseEvent> {
        let remaining = std::mem::take(&mut self.buffer);
        let trimmed = remaining.trim();
        if trimmed.is_empty() {
            return Vec::new();
        }
        Self::parse_raw_event(trimmed).into_iter().collect()
    }

    fn parse_raw_event(raw: &str) -> Option<SseEvent> {
        let mut event_type = String::new();
        let mut data_lines: Vec<&str> = Vec::new();

        for line in raw.lines() {
            if line.starts_with(':') {
                continue; // comment / keep-alive
            }
            if let Some(value) = line.strip_prefix("event:") {
                event_type = value.trim().to_string();
            } else if let Some(value) = line.strip_prefix("data:") {
                data_lines.push(value.strip_prefix(' ').unwrap_or(value));
            }
        }

        if event_type.is_empty() && data_lines.is_empty() {
            return None;
        }

        Some(SseEvent {
            event_type,
            data: data_lines.join("\n"),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseEvent {
    pub event_type: String,
    pub data: String,
}

// ============================================================================
// StreamAction — what a chat completion chunk means for the caller
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum StreamAction {
    TextDelta(String),
    MessageComplete { stop_reason: StopReason },
    Error(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    EndTurn,
    MaxTokens,
    Unknown,
}
