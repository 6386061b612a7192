//! Shared plumbing for debate-arena: configuration, SSE client streaming
//! against OpenAI-compatible chat endpoints, and the JSONL session logger.

pub mod config;
pub mod session;
pub mod sse;
