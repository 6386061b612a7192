use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::error::DebateError;
use crate::persona::DEFAULT_PERSONA;
use crate::verdict::Verdict;

pub const DEFAULT_MAX_ROUNDS: u32 = debate_common::config::DEFAULT_MAX_ROUNDS;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgentSlot {
    #[serde(rename = "Agent A")]
    AgentA,
    #[serde(rename = "Agent B")]
    AgentB,
}

impl AgentSlot {
    pub fn label(self) -> &'static str {
        match self {
            Self::AgentA => "Agent A",
            Self::AgentB => "Agent B",
        }
    }
}

impl fmt::Display for AgentSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Advisory annotation attached by the turn validator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TurnFlag {
    /// Near-duplicate of an earlier turn by the same agent.
    Repetition { matched_round: u32, similarity: f64 },
    /// No word in common with the topic.
    Drift,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub speaker: AgentSlot,
    pub persona: String,
    pub text: String,
    pub round: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub flags: Vec<TurnFlag>,
}

impl Turn {
    pub fn is_repetition(&self) -> bool {
        self.flags.iter().any(|f| matches!(f, TurnFlag::Repetition { .. }))
    }

    pub fn is_drift(&self) -> bool {
        self.flags.contains(&TurnFlag::Drift)
    }
}

/// What an entry point asks for when starting a debate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    pub topic: String,
    pub max_rounds: u32,
    pub agent_a_persona: String,
    pub agent_b_persona: String,
}

impl SessionConfig {
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            max_rounds: DEFAULT_MAX_ROUNDS,
            agent_a_persona: DEFAULT_PERSONA.to_string(),
            agent_b_persona: DEFAULT_PERSONA.to_string(),
        }
    }

    pub fn with_rounds(mut self, max_rounds: u32) -> Self {
        self.max_rounds = max_rounds;
        self
    }

    pub fn with_personas(mut self, agent_a: impl Into<String>, agent_b: impl Into<String>) -> Self {
        self.agent_a_persona = agent_a.into();
        self.agent_b_persona = agent_b.into();
        self
    }

    pub fn validate(&self) -> Result<(), DebateError> {
        if self.topic.trim().is_empty() {
            return Err(DebateError::InvalidConfig("topic cannot be empty".to_string()));
        }
        Ok(())
    }
}

/// One debate: topic, turn history and, once judged, the verdict.
///
/// Only the scheduler mutates a session; everything else reads it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    id: Uuid,
    started_at: DateTime<Utc>,
    topic: String,
    max_rounds: u32,
    round_count: u32,
    agent_a_persona: String,
    agent_b_persona: String,
    turns: Vec<Turn>,
    verdict: Option<Verdict>,
}

impl Session {
    pub(crate) fn new(config: SessionConfig) -> Self {
        Self {
            id: Uuid::new_v4(),
            started_at: Utc::now(),
            topic: config.topic,
            max_rounds: config.max_rounds,
            round_count: 0,
            agent_a_persona: config.agent_a_persona,
            agent_b_persona: config.agent_b_persona,
            turns: Vec::new(),
            verdict: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn max_rounds(&self) -> u32 {
        self.max_rounds
    }

    pub fn round_count(&self) -> u32 {
        self.round_count
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn verdict(&self) -> Option<&Verdict> {
        self.verdict.as_ref()
    }

    /// Persona id requested for a slot (before registry fallback).
    pub fn persona_for(&self, slot: AgentSlot) -> &str {
        match slot {
            AgentSlot::AgentA => &self.agent_a_persona,
            AgentSlot::AgentB => &self.agent_b_persona,
        }
    }

    /// Earlier turns by `slot` as (round, text), oldest first.
    pub fn prior_texts(&self, slot: AgentSlot) -> Vec<(u32, &str)> {
        self.turns
            .iter()
            .filter(|t| t.speaker == slot)
            .map(|t| (t.round, t.text.as_str()))
            .collect()
    }

    /// The transcript as `<speaker>: <text>` lines.
    pub fn transcript(&self) -> String {
        self.turns
            .iter()
            .map(|t| format!("{}: {}", t.speaker, t.text))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub(crate) fn record_turn(&mut self, turn: Turn) {
        self.turns.push(turn);
        self.round_count += 1;
    }

    pub(crate) fn set_verdict(&mut self, verdict: Verdict) {
        self.verdict = Some(verdict);
    }
}
