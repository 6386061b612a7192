use serde_json::Value;
use super::{SseEvent, StreamAction, StopReason};

/// Parse one OpenAI-compatible Chat Completions SSE event (Groq, OpenAI,
/// local servers). Returns `None` for role-only and keep-alive chunks.
pub fn parse_chat_sse(event: &SseEvent) -> Option<StreamAction> {
    // Chat Completions streams carry no event type, only data lines.
    if event.data.trim() == "[DONE]" {
        return Some(StreamAction::MessageComplete { stop_reason: StopReason::EndTurn });
    }

    let data: Value = serde_json::from_str(&event.data).ok()?;

    if let Some(error) = data.get("error") {
        let msg = error
            .get("message")
            .and_then(|m| m.as_str())
            .or_else(|| error.as_str())
            .unwrap_or("Unknown chat completion SSE error");
        return Some(StreamAction::Error(msg.to_string()));
    }

    let choice = data.get("choices")?.get(0)?;

    if let Some(content) = choice
        .get("delta")
        .and_then(|d| d.get("content"))
        .and_then(|c| c.as_str())
    {
        if !content.is_empty() {
            return Some(StreamAction::TextDelta(content.to_string()));
        }
    }

    let finish = choice.get("finish_reason").and_then(|f| f.as_str())?;
    let stop_reason = match finish {
        "stop" => StopReason::EndTurn,
        "length" => StopReason::MaxTokens,
        _ => StopReason::Unknown,
    };
    Some(StreamAction::MessageComplete { stop_reason })
}
