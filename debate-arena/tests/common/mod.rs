//! Shared test doubles for the debate-arena integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use debate_arena::generation::{GenerationError, Generator};
use debate_arena::observer::DebateObserver;
use debate_arena::session::{Session, Turn};
use debate_arena::verdict::Verdict;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

pub const JUDGE_A_WINS: &str = "Winner: Agent B
Summary: A argued for car-free streets. B defended commuters.
Rationale: A brought numbers, B brought feelings.
Conclusion: Cities should pilot car-free zones.
A_Logic: 80
A_Persuasion: 80
A_Aggression: 40
B_Logic: 60
B_Persuasion: 60
B_Aggression: 70
A_Strengths: Uses data || Strong delivery
A_Weaknesses: - Too long
B_Strengths: Passion
B_Weaknesses: Few facts || Vague";

#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub instruction: String,
    pub transcript: String,
}

/// Replays canned responses in order and records every request.
/// `Err` entries become generation failures; an exhausted script fails too.
pub struct ScriptedGenerator {
    script: Mutex<VecDeque<Result<String, String>>>,
    calls: Mutex<Vec<Call>>,
}

impl ScriptedGenerator {
    pub fn new<'a>(responses: impl IntoIterator<Item = &'a str>) -> Arc<Self> {
        Self::with_results(responses.into_iter().map(|r| Ok(r.to_string())))
    }

    pub fn with_results(results: impl IntoIterator<Item = Result<String, String>>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(results.into_iter().collect()),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn remaining(&self) -> usize {
        self.script.lock().unwrap().len()
    }
}

#[async_trait]
impl Generator for ScriptedGenerator {
    async fn generate(&self, instruction: &str, transcript: &str) -> Result<String, GenerationError> {
        self.calls.lock().unwrap().push(Call {
            instruction: instruction.to_string(),
            transcript: transcript.to_string(),
        });
        match self.script.lock().unwrap().pop_front() {
            Some(Ok(text)) => Ok(text),
            Some(Err(message)) => Err(GenerationError::Other(message)),
            None => Err(GenerationError::Other("script exhausted".to_string())),
        }
    }
}

/// Six distinct agent turns followed by a judge response.
pub fn six_turns_then_judge() -> Arc<ScriptedGenerator> {
    ScriptedGenerator::new([
        "Cars choke cities with smoke.",
        "Cars carry workers to jobs.",
        "Buses move more people per lane.",
        "Buses cannot reach the suburbs.",
        "Bike lanes cost a fraction of roads.",
        "Winter makes cycling a fantasy.",
        JUDGE_A_WINS,
    ])
}

#[derive(Default)]
pub struct RecordingObserver {
    pub turns: Vec<Turn>,
    /// Turns already on the session when the judge was called.
    pub judging_at: Vec<usize>,
    pub verdicts: Vec<Verdict>,
    /// Turns already on the session when each verdict arrived.
    pub turns_at_verdict: Vec<usize>,
}

impl DebateObserver for RecordingObserver {
    fn on_turn(&mut self, turn: &Turn) {
        self.turns.push(turn.clone());
    }

    fn on_judging(&mut self, session: &Session) {
        self.judging_at.push(session.turns().len());
    }

    fn on_verdict(&mut self, session: &Session, verdict: &Verdict) {
        self.verdicts.push(verdict.clone());
        self.turns_at_verdict.push(session.turns().len());
    }
}
