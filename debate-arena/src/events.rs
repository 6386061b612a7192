use debate_common::session::preview_str;
use std::io::Write;
use std::path::Path;

use crate::observer::DebateObserver;
use crate::session::{AgentSlot, Session, Turn};
use crate::verdict::Verdict;

const RULE_WIDTH: usize = 50;

pub fn emit_debate_started(topic: &str, max_rounds: u32) {
    let preview = preview_str(topic, 80);
    eprintln!("[debate] \u{1f3db}\u{fe0f} Debate started: '{}' ({} rounds)", preview, max_rounds);
    eprintln!("[debate] Press Ctrl+C to exit early.");
}

pub fn emit_judging() {
    eprintln!("[debate] \u{2696}\u{fe0f} Judge deliberating...");
}

pub fn emit_debate_completed(elapsed_ms: u64, turns: usize) {
    eprintln!(
        "[debate] \u{2705} Debate completed ({:.0}s, {} turn{})",
        elapsed_ms as f64 / 1000.0,
        turns,
        if turns == 1 { "" } else { "s" }
    );
}

/// The archive is the full record; without one only the transition log exists.
pub fn emit_log_saved(jsonl: &Path, archive: Option<&Path>) {
    match archive {
        Some(archive) => {
            eprintln!("[debate] Full log saved to: {}", archive.display());
            eprintln!("[debate] Transition log: {}", jsonl.display());
        }
        None => eprintln!("[debate] Archive not written; transition log: {}", jsonl.display()),
    }
}

pub fn emit_interrupted() {
    eprintln!("\n[debate] Debate interrupted by user.");
}

/// Prints the transcript and verdict as they arrive.
pub struct TerminalPresenter<W: Write + Send> {
    out: W,
    turns_seen: u32,
    max_rounds: u32,
}

impl<W: Write + Send> TerminalPresenter<W> {
    pub fn new(out: W, max_rounds: u32) -> Self {
        Self {
            out,
            turns_seen: 0,
            max_rounds,
        }
    }
}

impl<W: Write + Send> DebateObserver for TerminalPresenter<W> {
    fn on_turn(&mut self, turn: &Turn) {
        self.turns_seen += 1;
        eprintln!(
            "[debate]   \u{251c}\u{2500} {} ({}): turn {}/{}",
            turn.speaker, turn.persona, self.turns_seen, self.max_rounds
        );
        let _ = writeln!(self.out, "\n[{}]:\n{}\n{}", turn.speaker, turn.text, "-".repeat(RULE_WIDTH));
        let _ = self.out.flush();
    }

    fn on_judging(&mut self, _session: &Session) {
        emit_judging();
    }

    fn on_verdict(&mut self, _session: &Session, verdict: &Verdict) {
        let _ = write_verdict(&mut self.out, verdict);
        let _ = self.out.flush();
    }
}

pub fn write_verdict(out: &mut impl Write, verdict: &Verdict) -> std::io::Result<()> {
    let bar = "=".repeat(20);
    writeln!(out, "\n{bar} JUDGE VERDICT {bar}")?;
    writeln!(out, "WINNER:   {}", verdict.winner)?;
    writeln!(out, "REASON:   {}", verdict.rationale)?;
    if !verdict.summary.is_empty() {
        writeln!(out, "SUMMARY:  {}", verdict.summary)?;
    }
    writeln!(out, "\nSCORES:")?;
    for slot in [AgentSlot::AgentA, AgentSlot::AgentB] {
        let s = verdict.scores.get(slot);
        writeln!(
            out,
            "  {}: logic {}, persuasion {}, aggression {}",
            slot, s.logic, s.persuasion, s.aggression
        )?;
    }
    if !verdict.conclusion.is_empty() {
        writeln!(out, "\nCONCLUSION: {}", verdict.conclusion)?;
    }
    writeln!(out, "{}\n", "=".repeat(55))
}
