//! Integration tests for the debate scheduler, driven by a scripted generator.

mod common;

use common::{six_turns_then_judge, RecordingObserver, ScriptedGenerator, JUDGE_A_WINS};
use debate_arena::error::DebateError;
use debate_arena::scheduler::{DebateScheduler, Phase};
use debate_arena::session::{AgentSlot, SessionConfig, TurnFlag};
use debate_arena::validator::{RepetitionPolicy, REPETITION_NOTE};
use debate_arena::verdict::{Verdict, Winner, JUDGE_INSTRUCTIONS};

const TOPIC: &str = "Should cities ban cars?";

// ============================================================================
// Turn order and round limit
// ============================================================================

#[tokio::test]
async fn six_rounds_alternate_and_end_with_one_verdict() {
    let generator = six_turns_then_judge();
    let scheduler =
        DebateScheduler::new(generator.clone(), SessionConfig::new(TOPIC), RepetitionPolicy::default()).unwrap();
    assert_eq!(scheduler.phase(), Phase::AgentATurn);

    let mut observer = RecordingObserver::default();
    let session = scheduler.run(&mut observer).await.unwrap();

    let speakers: Vec<AgentSlot> = session.turns().iter().map(|t| t.speaker).collect();
    use AgentSlot::{AgentA, AgentB};
    assert_eq!(speakers, vec![AgentA, AgentB, AgentA, AgentB, AgentA, AgentB]);
    let rounds: Vec<u32> = session.turns().iter().map(|t| t.round).collect();
    assert_eq!(rounds, vec![0, 1, 2, 3, 4, 5]);
    assert_eq!(session.round_count(), 6);

    assert_eq!(generator.calls().len(), 7, "six turns plus exactly one judge call");
    assert_eq!(generator.calls()[6].instruction, JUDGE_INSTRUCTIONS);
    assert_eq!(generator.remaining(), 0);

    assert_eq!(observer.turns.len(), 6);
    assert_eq!(observer.verdicts.len(), 1);
    assert_eq!(observer.judging_at, vec![6]);
    assert_eq!(observer.turns_at_verdict, vec![6]);
    assert_eq!(session.verdict().unwrap().winner, Winner::AgentA);
}

#[tokio::test]
async fn odd_round_limit_gives_agent_a_the_extra_turn() {
    let generator = ScriptedGenerator::new(["a0", "b1", "a2", JUDGE_A_WINS]);
    let config = SessionConfig::new(TOPIC).with_rounds(3);
    let scheduler = DebateScheduler::new(generator, config, RepetitionPolicy::default()).unwrap();

    let session = scheduler.run(&mut ()).await.unwrap();
    let texts: Vec<&str> = session.turns().iter().map(|t| t.text.as_str()).collect();
    assert_eq!(texts, vec!["a0", "b1", "a2"]);
    assert_eq!(session.turns()[2].speaker, AgentSlot::AgentA);
}

#[tokio::test]
async fn zero_rounds_judges_an_empty_debate() {
    let generator = ScriptedGenerator::new([JUDGE_A_WINS]);
    let config = SessionConfig::new(TOPIC).with_rounds(0);
    let mut scheduler = DebateScheduler::new(generator.clone(), config, RepetitionPolicy::default()).unwrap();
    assert_eq!(scheduler.phase(), Phase::Judging);

    let mut observer = RecordingObserver::default();
    let next = scheduler.step(&mut observer).await.unwrap();
    assert_eq!(next, Phase::Complete);
    assert!(observer.turns.is_empty());
    assert_eq!(observer.judging_at, vec![0], "judging is announced without any turn");
    assert_eq!(observer.verdicts.len(), 1);
    assert!(scheduler.session().turns().is_empty());
    assert!(scheduler.session().verdict().is_some());

    let calls = generator.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].transcript, format!("Topic: {TOPIC}\n\nHistory:\n"));
}

#[tokio::test]
async fn step_walks_the_phases_one_at_a_time() {
    let generator = ScriptedGenerator::new(["a0", "b1", JUDGE_A_WINS]);
    let config = SessionConfig::new(TOPIC).with_rounds(2);
    let mut scheduler = DebateScheduler::new(generator, config, RepetitionPolicy::default()).unwrap();

    assert_eq!(scheduler.step(&mut ()).await.unwrap(), Phase::AgentBTurn);
    assert_eq!(scheduler.step(&mut ()).await.unwrap(), Phase::Judging);
    assert_eq!(scheduler.step(&mut ()).await.unwrap(), Phase::Complete);
    assert!(matches!(scheduler.step(&mut ()).await, Err(DebateError::AlreadyComplete)));

    let session = scheduler.into_session();
    assert_eq!(session.turns().len(), 2);
    assert!(session.verdict().is_some());
}

// ============================================================================
// Prompts
// ============================================================================

#[tokio::test]
async fn agents_see_identity_persona_and_prior_transcript() {
    let generator = ScriptedGenerator::new(["Tabs are honest.", "Spaces are portable.", JUDGE_A_WINS]);
    let config = SessionConfig::new("Tabs or spaces?")
        .with_rounds(2)
        .with_personas("The Futurist", "The Debunker");
    let scheduler = DebateScheduler::new(generator.clone(), config, RepetitionPolicy::default()).unwrap();
    scheduler.run(&mut ()).await.unwrap();

    let calls = generator.calls();
    assert!(calls[0].instruction.starts_with("IDENTITY: You are Agent A.\nROLE: PROPOSER"));
    assert!(calls[0].instruction.contains("ARCHETYPE: Visionary"));
    assert!(calls[0].instruction.contains("TOPIC: 'Tabs or spaces?'"));
    assert_eq!(calls[0].transcript, "Current Debate History:\n\n\nYour turn to argue:");

    assert!(calls[1].instruction.starts_with("IDENTITY: You are Agent B.\nROLE: OPPONENT"));
    assert!(calls[1].instruction.contains("ARCHETYPE: Aggressive"));
    assert_eq!(
        calls[1].transcript,
        "Current Debate History:\nAgent A: Tabs are honest.\n\nYour turn to argue:"
    );

    assert_eq!(
        calls[2].transcript,
        "Topic: Tabs or spaces?\n\nHistory:\nAgent A: Tabs are honest.\nAgent B: Spaces are portable."
    );
}

#[tokio::test]
async fn unknown_persona_is_recorded_as_default() {
    let generator = ScriptedGenerator::new(["a0", "b1", JUDGE_A_WINS]);
    let config = SessionConfig::new(TOPIC)
        .with_rounds(2)
        .with_personas("Natural", "The Humanist");
    let scheduler = DebateScheduler::new(generator, config, RepetitionPolicy::default()).unwrap();
    let session = scheduler.run(&mut ()).await.unwrap();

    assert_eq!(session.turns()[0].persona, "Default");
    assert_eq!(session.turns()[1].persona, "The Humanist");
    assert_eq!(session.persona_for(AgentSlot::AgentA), "Natural");
}

// ============================================================================
// Validation
// ============================================================================

#[tokio::test]
async fn repeated_argument_is_flagged_against_own_turns_only() {
    let repeated = "Nuclear power is the safest energy source per terawatt hour.";
    let generator = ScriptedGenerator::new([
        repeated,
        "Renewables are cheaper now.",
        "Nuclear power is the safest energy source per terawatt hour!",
        "Storage solves intermittency.",
        JUDGE_A_WINS,
    ]);
    let config = SessionConfig::new("Is nuclear power the future?").with_rounds(4);
    let scheduler = DebateScheduler::new(generator, config, RepetitionPolicy::AppendNote).unwrap();
    let mut observer = RecordingObserver::default();
    let session = scheduler.run(&mut observer).await.unwrap();

    let flagged = &session.turns()[2];
    assert!(flagged.is_repetition());
    assert!(matches!(flagged.flags[0], TurnFlag::Repetition { matched_round: 0, .. }));
    assert!(flagged.text.ends_with(REPETITION_NOTE));
    assert_eq!(observer.turns[2].text, flagged.text, "observer sees the stored text");

    assert!(!session.turns()[1].is_repetition());
    assert!(!session.turns()[3].is_repetition());
}

#[tokio::test]
async fn annotate_only_keeps_the_generated_text() {
    let text = "Nuclear power is the safest energy source per terawatt hour.";
    let generator = ScriptedGenerator::new([text, "b1", text, JUDGE_A_WINS]);
    let config = SessionConfig::new("nuclear").with_rounds(3);
    let scheduler = DebateScheduler::new(generator, config, RepetitionPolicy::AnnotateOnly).unwrap();
    let session = scheduler.run(&mut ()).await.unwrap();

    assert!(session.turns()[2].is_repetition());
    assert_eq!(session.turns()[2].text, text);
}

#[tokio::test]
async fn long_off_topic_turn_is_flagged_as_drift() {
    let off_topic = "The weather in Lisbon is lovely this time of year, and the pastries near the river are \
                     worth the trip on their own.";
    let generator = ScriptedGenerator::new([off_topic, "Cities need cars for deliveries.", JUDGE_A_WINS]);
    let config = SessionConfig::new(TOPIC).with_rounds(2);
    let scheduler = DebateScheduler::new(generator, config, RepetitionPolicy::default()).unwrap();
    let session = scheduler.run(&mut ()).await.unwrap();

    assert!(session.turns()[0].is_drift());
    assert_eq!(session.turns()[0].text, off_topic, "drift never edits the text");
    assert!(!session.turns()[1].is_drift());
}

// ============================================================================
// Failures
// ============================================================================

#[tokio::test]
async fn generation_failure_leaves_phase_and_round_untouched() {
    let generator = ScriptedGenerator::with_results([
        Ok("a0".to_string()),
        Err("rate limited".to_string()),
        Ok("b1".to_string()),
        Ok(JUDGE_A_WINS.to_string()),
    ]);
    let config = SessionConfig::new(TOPIC).with_rounds(2);
    let mut scheduler = DebateScheduler::new(generator, config, RepetitionPolicy::default()).unwrap();

    scheduler.step(&mut ()).await.unwrap();
    let err = scheduler.step(&mut ()).await.unwrap_err();
    match err {
        DebateError::Generation { speaker, round, .. } => {
            assert_eq!(speaker, AgentSlot::AgentB);
            assert_eq!(round, 1);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(scheduler.phase(), Phase::AgentBTurn);
    assert_eq!(scheduler.session().round_count(), 1);
    assert_eq!(scheduler.session().turns().len(), 1);

    assert_eq!(scheduler.step(&mut ()).await.unwrap(), Phase::Judging);
    assert_eq!(scheduler.session().turns()[1].text, "b1");
}

#[tokio::test]
async fn run_propagates_generation_failure_without_a_verdict() {
    let generator = ScriptedGenerator::with_results([Err("connection reset".to_string())]);
    let scheduler = DebateScheduler::new(generator, SessionConfig::new(TOPIC), RepetitionPolicy::default()).unwrap();
    let mut observer = RecordingObserver::default();

    let err = scheduler.run(&mut observer).await.unwrap_err();
    assert!(matches!(err, DebateError::Generation { speaker: AgentSlot::AgentA, round: 0, .. }));
    assert!(err.to_string().contains("connection reset"));
    assert!(observer.turns.is_empty());
    assert!(observer.verdicts.is_empty());
}

#[tokio::test]
async fn judge_failure_falls_back_instead_of_failing() {
    let generator = ScriptedGenerator::with_results([
        Ok("a0".to_string()),
        Ok("b1".to_string()),
        Err("judge unavailable".to_string()),
    ]);
    let config = SessionConfig::new(TOPIC).with_rounds(2);
    let scheduler = DebateScheduler::new(generator, config, RepetitionPolicy::default()).unwrap();
    let session = scheduler.run(&mut ()).await.unwrap();

    assert_eq!(session.verdict(), Some(&Verdict::fallback()));
}

#[tokio::test]
async fn unparseable_judge_output_falls_back() {
    let generator = ScriptedGenerator::new(["a0", "b1", "I decline to judge this."]);
    let config = SessionConfig::new(TOPIC).with_rounds(2);
    let scheduler = DebateScheduler::new(generator, config, RepetitionPolicy::default()).unwrap();
    let session = scheduler.run(&mut ()).await.unwrap();

    let verdict = session.verdict().unwrap();
    assert!(verdict.is_fallback());
    assert_eq!(verdict.winner, Winner::AgentA);
    assert_eq!(verdict.summary, "Error parsing.");
}

#[test]
fn blank_topic_is_rejected_before_any_generation() {
    let generator = ScriptedGenerator::new([]);
    let result = DebateScheduler::new(generator.clone(), SessionConfig::new("  "), RepetitionPolicy::default());
    assert!(matches!(result, Err(DebateError::InvalidConfig(_))));
    assert!(generator.calls().is_empty());
}
