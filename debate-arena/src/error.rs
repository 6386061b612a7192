use thiserror::Error;

use crate::generation::GenerationError;
use crate::session::AgentSlot;

/// Errors that end a debate session early. Judge failures never show up
/// here; the scheduler replaces them with a fallback verdict.
#[derive(Debug, Error)]
pub enum DebateError {
    #[error("invalid session config: {0}")]
    InvalidConfig(String),

    #[error("{speaker} failed to generate a turn (round {round}): {source}")]
    Generation {
        speaker: AgentSlot,
        round: u32,
        #[source]
        source: GenerationError,
    },

    #[error("debate is already complete")]
    AlreadyComplete,
}
