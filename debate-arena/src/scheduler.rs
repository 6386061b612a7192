//! The debate state machine.
//!
//! ```text
//! AgentATurn <-> AgentBTurn
//!      \            /
//!       `-> Judging -> Complete
//! ```
//!
//! One [`DebateScheduler`] owns one [`Session`]. Turns run strictly one after
//! another; nothing here is shared between sessions.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::error::DebateError;
use crate::generation::Generator;
use crate::observer::DebateObserver;
use crate::persona::PersonaContext;
use crate::session::{AgentSlot, Session, SessionConfig, Turn, TurnFlag};
use crate::validator::{self, RepetitionPolicy};
use crate::verdict::{self, Verdict};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    AgentATurn,
    AgentBTurn,
    Judging,
    Complete,
}

impl Phase {
    pub const ALL: [Phase; 4] = [
        Phase::AgentATurn,
        Phase::AgentBTurn,
        Phase::Judging,
        Phase::Complete,
    ];

    /// Node name used in logs and the rendered graph.
    pub fn name(self) -> &'static str {
        match self {
            Phase::AgentATurn => "AgentA",
            Phase::AgentBTurn => "AgentB",
            Phase::Judging => "Judge",
            Phase::Complete => "Complete",
        }
    }

    /// Phases reachable in one step.
    pub fn successors(self) -> &'static [Phase] {
        match self {
            Phase::AgentATurn => &[Phase::AgentBTurn, Phase::Judging],
            Phase::AgentBTurn => &[Phase::AgentATurn, Phase::Judging],
            Phase::Judging => &[Phase::Complete],
            Phase::Complete => &[],
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Routing after a completed turn: the round limit sends the debate to the
/// judge, otherwise even rounds belong to Agent A and odd rounds to Agent B.
pub fn next_phase(round_count: u32, max_rounds: u32) -> Phase {
    if round_count >= max_rounds {
        Phase::Judging
    } else if round_count % 2 == 0 {
        Phase::AgentATurn
    } else {
        Phase::AgentBTurn
    }
}

/// Agent A always opens, unless there are no rounds at all.
pub fn initial_phase(max_rounds: u32) -> Phase {
    if max_rounds == 0 {
        Phase::Judging
    } else {
        Phase::AgentATurn
    }
}

/// User content for an agent turn.
pub fn agent_request(transcript: &str) -> String {
    format!("Current Debate History:\n{transcript}\n\nYour turn to argue:")
}

pub struct DebateScheduler {
    generator: Arc<dyn Generator>,
    policy: RepetitionPolicy,
    session: Session,
    phase: Phase,
}

impl DebateScheduler {
    pub fn new(
        generator: Arc<dyn Generator>,
        config: SessionConfig,
        policy: RepetitionPolicy,
    ) -> Result<Self, DebateError> {
        config.validate()?;
        let phase = initial_phase(config.max_rounds);
        let session = Session::new(config);
        info!(
            session = %session.id(),
            topic = session.topic(),
            max_rounds = session.max_rounds(),
            "debate session created"
        );
        Ok(Self {
            generator,
            policy,
            session,
            phase,
        })
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn into_session(self) -> Session {
        self.session
    }

    /// Execute the current phase and return the phase that follows it.
    ///
    /// A generation failure leaves both the phase and the round counter
    /// untouched, so calling `step` again retries the same turn.
    pub async fn step(&mut self, observer: &mut dyn DebateObserver) -> Result<Phase, DebateError> {
        match self.phase {
            Phase::AgentATurn => self.take_turn(AgentSlot::AgentA, observer).await?,
            Phase::AgentBTurn => self.take_turn(AgentSlot::AgentB, observer).await?,
            Phase::Judging => self.judge(observer).await,
            Phase::Complete => return Err(DebateError::AlreadyComplete),
        }
        Ok(self.phase)
    }

    /// Step until the debate is complete.
    pub async fn run(mut self, observer: &mut dyn DebateObserver) -> Result<Session, DebateError> {
        let start = Instant::now();
        while self.phase != Phase::Complete {
            self.step(observer).await?;
        }
        info!(
            session = %self.session.id(),
            turns = self.session.turns().len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "debate complete"
        );
        Ok(self.session)
    }

    async fn take_turn(
        &mut self,
        slot: AgentSlot,
        observer: &mut dyn DebateObserver,
    ) -> Result<(), DebateError> {
        let round = self.session.round_count();
        let context = PersonaContext::new(slot, self.session.persona_for(slot), self.session.topic());
        let persona = context.persona.id;
        let request = agent_request(&self.session.transcript());

        debug!(%slot, round, persona, "generating turn");
        let raw = self
            .generator
            .generate(&context.instruction(), &request)
            .await
            .map_err(|source| DebateError::Generation {
                speaker: slot,
                round,
                source,
            })?;

        let validation = validator::validate_turn(
            raw,
            &self.session.prior_texts(slot),
            self.session.topic(),
            self.policy,
        );
        for flag in &validation.flags {
            match flag {
                TurnFlag::Repetition {
                    matched_round,
                    similarity,
                } => warn!(%slot, round, matched_round, similarity, "repetition detected"),
                TurnFlag::Drift => warn!(%slot, round, "potential topic drift detected"),
            }
        }

        let turn = Turn {
            speaker: slot,
            persona: persona.to_string(),
            text: validation.text,
            round,
            flags: validation.flags,
        };
        observer.on_turn(&turn);
        self.session.record_turn(turn);

        self.phase = next_phase(self.session.round_count(), self.session.max_rounds());
        debug!(next = %self.phase, round_count = self.session.round_count(), "turn recorded");
        Ok(())
    }

    async fn judge(&mut self, observer: &mut dyn DebateObserver) {
        observer.on_judging(&self.session);
        let transcript = self.session.transcript();
        let verdict = match verdict::judge(self.generator.as_ref(), self.session.topic(), &transcript).await {
            Ok(verdict) => verdict,
            Err(e) => {
                warn!(error = %e, "judge output unusable, using fallback verdict");
                Verdict::fallback()
            }
        };
        info!(winner = %verdict.winner, "verdict reached");

        self.session.set_verdict(verdict.clone());
        observer.on_verdict(&self.session, &verdict);
        self.phase = Phase::Complete;
    }
}
