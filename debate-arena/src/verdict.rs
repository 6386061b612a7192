//! Judge verdicts: the structured record, the judge prompt and the
//! text-to-record extraction.
//!
//! Extraction is driven by [`EXTRACTION_RULES`], an ordered table of
//! `tag -> extractor -> default`. Every field has a default, so a response
//! that mentions at least one field always yields a complete verdict. The
//! winner is never read from the text: it is recomputed from the scores.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use thiserror::Error;

use crate::generation::{GenerationError, Generator};
use crate::session::AgentSlot;

/// Appended to every judge response so the last field has an end tag.
pub const END_SENTINEL: &str = "<END>";

pub const JUDGE_INSTRUCTIONS: &str = "You are a critical Debate Judge. Analyze the debate.\n\
INSTRUCTIONS:\n\
1. Summary: Chronological recap of what happened.\n\
2. Rationale: Explain why the winner won.\n\
3. Weaknesses: List 2 weaknesses for each.\n\n\
OUTPUT FORMAT:\n\
Winner: [Agent A or Agent B]\n\
Summary: [Text]\n\
Rationale: [Text]\n\
Conclusion: [Text]\n\
A_Logic: [0-100]\n\
A_Persuasion: [0-100]\n\
A_Aggression: [0-100]\n\
B_Logic: [0-100]\n\
B_Persuasion: [0-100]\n\
B_Aggression: [0-100]\n\
A_Strengths: [List] || [List]\n\
A_Weaknesses: [List] || [List]\n\
B_Strengths: [List] || [List]\n\
B_Weaknesses: [List] || [List]";

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("judge generation failed: {0}")]
    Generation(#[from] GenerationError),
    #[error("judge response contained none of the expected fields")]
    Unrecognized,
    #[error("extraction pattern failed to compile: {0}")]
    Pattern(String),
}

// ============================================================================
// Verdict record
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Winner {
    #[serde(rename = "Agent A")]
    AgentA,
    #[serde(rename = "Agent B")]
    AgentB,
    Draw,
}

impl From<AgentSlot> for Winner {
    fn from(slot: AgentSlot) -> Self {
        match slot {
            AgentSlot::AgentA => Self::AgentA,
            AgentSlot::AgentB => Self::AgentB,
        }
    }
}

impl std::fmt::Display for Winner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AgentA => f.write_str("Agent A"),
            Self::AgentB => f.write_str("Agent B"),
            Self::Draw => f.write_str("Draw"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scores {
    pub logic: u8,
    pub persuasion: u8,
    pub aggression: u8,
}

impl Scores {
    /// logic + persuasion; comparing sums is comparing their averages.
    pub fn merit(&self) -> u16 {
        u16::from(self.logic) + u16::from(self.persuasion)
    }
}

/// One value per debater, serialized under the debaters' display names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerAgent<T> {
    #[serde(rename = "Agent A")]
    pub agent_a: T,
    #[serde(rename = "Agent B")]
    pub agent_b: T,
}

impl<T> PerAgent<T> {
    pub fn get(&self, slot: AgentSlot) -> &T {
        match slot {
            AgentSlot::AgentA => &self.agent_a,
            AgentSlot::AgentB => &self.agent_b,
        }
    }

    fn get_mut(&mut self, slot: AgentSlot) -> &mut T {
        match slot {
            AgentSlot::AgentA => &mut self.agent_a,
            AgentSlot::AgentB => &mut self.agent_b,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub winner: Winner,
    pub summary: String,
    pub rationale: String,
    pub conclusion: String,
    pub scores: PerAgent<Scores>,
    pub strengths: PerAgent<Vec<String>>,
    pub weaknesses: PerAgent<Vec<String>>,
}

/// Strictly higher average of (logic, persuasion) wins; equal averages draw.
pub fn decide_winner(scores: &PerAgent<Scores>) -> Winner {
    let a = scores.agent_a.merit();
    let b = scores.agent_b.merit();
    match a.cmp(&b) {
        std::cmp::Ordering::Greater => Winner::AgentA,
        std::cmp::Ordering::Less => Winner::AgentB,
        std::cmp::Ordering::Equal => Winner::Draw,
    }
}

impl Verdict {
    /// The complete record used when the judge produced nothing usable:
    /// Agent A by default, all scores zero, no strengths or weaknesses.
    pub fn fallback() -> Self {
        Self {
            winner: Winner::AgentA,
            summary: "Error parsing.".to_string(),
            rationale: "Judge Error.".to_string(),
            conclusion: String::new(),
            scores: PerAgent::default(),
            strengths: PerAgent::default(),
            weaknesses: PerAgent::default(),
        }
    }

    /// True for the record produced by [`Verdict::fallback`].
    pub fn is_fallback(&self) -> bool {
        *self == Self::fallback()
    }

    /// JSON shape consumed by the web client: the record plus `key_points`,
    /// which mirrors `strengths`.
    pub fn to_client_json(&self) -> serde_json::Value {
        let mut value = serde_json::to_value(self).unwrap_or_default();
        if let Some(obj) = value.as_object_mut() {
            let key_points = obj.get("strengths").cloned().unwrap_or_default();
            obj.insert("key_points".to_string(), key_points);
        }
        value
    }
}

// ============================================================================
// Extraction rule table
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    Logic,
    Persuasion,
    Aggression,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Summary,
    Rationale,
    Conclusion,
    Score(AgentSlot, Metric),
    Strengths(AgentSlot),
    Weaknesses(AgentSlot),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleKind {
    /// Text between `tag:` and the next expected tag; empty when absent.
    Block { until: &'static str },
    /// First integer after `tag:`; `default` when absent or unparsable.
    Integer { default: u8 },
    /// A block split into items on `||`, or on lines with bullets stripped.
    List { until: &'static str },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractionRule {
    pub field: Field,
    pub tag: &'static str,
    pub kind: RuleKind,
}

const fn rule(field: Field, tag: &'static str, kind: RuleKind) -> ExtractionRule {
    ExtractionRule { field, tag, kind }
}

use AgentSlot::{AgentA, AgentB};
use Metric::{Aggression, Logic, Persuasion};

pub const EXTRACTION_RULES: &[ExtractionRule] = &[
    rule(Field::Summary, "Summary", RuleKind::Block { until: "Rationale" }),
    rule(Field::Rationale, "Rationale", RuleKind::Block { until: "Conclusion" }),
    rule(Field::Conclusion, "Conclusion", RuleKind::Block { until: "A_Logic" }),
    rule(Field::Score(AgentA, Logic), "A_Logic", RuleKind::Integer { default: 75 }),
    rule(Field::Score(AgentA, Persuasion), "A_Persuasion", RuleKind::Integer { default: 75 }),
    rule(Field::Score(AgentA, Aggression), "A_Aggression", RuleKind::Integer { default: 50 }),
    rule(Field::Score(AgentB, Logic), "B_Logic", RuleKind::Integer { default: 75 }),
    rule(Field::Score(AgentB, Persuasion), "B_Persuasion", RuleKind::Integer { default: 75 }),
    rule(Field::Score(AgentB, Aggression), "B_Aggression", RuleKind::Integer { default: 50 }),
    rule(Field::Strengths(AgentA), "A_Strengths", RuleKind::List { until: "A_Weaknesses" }),
    rule(Field::Weaknesses(AgentA), "A_Weaknesses", RuleKind::List { until: "B_Strengths" }),
    rule(Field::Strengths(AgentB), "B_Strengths", RuleKind::List { until: "B_Weaknesses" }),
    rule(Field::Weaknesses(AgentB), "B_Weaknesses", RuleKind::List { until: END_SENTINEL }),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extracted {
    Text(String),
    Integer(u8),
    List(Vec<String>),
}

impl RuleKind {
    fn pattern(&self, tag: &str) -> String {
        match self {
            RuleKind::Block { until } | RuleKind::List { until } => {
                format!(r"(?is){}:\s*(.*?){}", regex::escape(tag), regex::escape(until))
            }
            RuleKind::Integer { .. } => format!(r"(?i){}:\s*(\d+)", regex::escape(tag)),
        }
    }

    fn default_value(&self) -> Extracted {
        match self {
            RuleKind::Block { .. } => Extracted::Text(String::new()),
            RuleKind::Integer { default } => Extracted::Integer(*default),
            RuleKind::List { .. } => Extracted::List(Vec::new()),
        }
    }
}

struct CompiledRule {
    rule: &'static ExtractionRule,
    regex: Regex,
}

impl CompiledRule {
    fn new(rule: &'static ExtractionRule) -> Result<Self, regex::Error> {
        Ok(Self {
            rule,
            regex: Regex::new(&rule.kind.pattern(rule.tag))?,
        })
    }

    /// `None` when the tag (or its end tag) is not in `content`.
    fn extract(&self, content: &str) -> Option<Extracted> {
        let captured = self.regex.captures(content)?.get(1)?.as_str();
        Some(match self.rule.kind {
            RuleKind::Block { .. } => Extracted::Text(captured.trim().to_string()),
            RuleKind::Integer { default } => Extracted::Integer(
                captured
                    .parse::<u32>()
                    .map(|n| n.min(100) as u8)
                    .unwrap_or(default),
            ),
            RuleKind::List { .. } => Extracted::List(split_list(captured.trim())),
        })
    }
}

fn compiled_rules() -> Result<&'static [CompiledRule], ExtractionError> {
    static RULES: OnceLock<Result<Vec<CompiledRule>, String>> = OnceLock::new();
    RULES
        .get_or_init(|| {
            EXTRACTION_RULES
                .iter()
                .map(CompiledRule::new)
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| e.to_string())
        })
        .as_deref()
        .map_err(|e| ExtractionError::Pattern(e.to_string()))
}

/// Split a list block: on `||` when present, otherwise one item per line
/// with leading bullet markers removed. Blank items are dropped.
pub fn split_list(raw: &str) -> Vec<String> {
    if raw.contains("||") {
        return raw
            .split("||")
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(String::from)
            .collect();
    }
    raw.lines()
        .map(|line| line.trim().trim_start_matches(['-', '•', '*', ' ']))
        .filter(|item| !item.is_empty())
        .map(String::from)
        .collect()
}

/// Fields are filled from rule defaults first, then overwritten by
/// whatever the response actually contains.
struct Draft {
    summary: String,
    rationale: String,
    conclusion: String,
    scores: PerAgent<Scores>,
    strengths: PerAgent<Vec<String>>,
    weaknesses: PerAgent<Vec<String>>,
}

impl Draft {
    fn empty() -> Self {
        Self {
            summary: String::new(),
            rationale: String::new(),
            conclusion: String::new(),
            scores: PerAgent::default(),
            strengths: PerAgent::default(),
            weaknesses: PerAgent::default(),
        }
    }

    fn apply(&mut self, field: Field, value: Extracted) {
        match (field, value) {
            (Field::Summary, Extracted::Text(t)) => self.summary = t,
            (Field::Rationale, Extracted::Text(t)) => self.rationale = t,
            (Field::Conclusion, Extracted::Text(t)) => self.conclusion = t,
            (Field::Score(slot, metric), Extracted::Integer(n)) => {
                let scores = self.scores.get_mut(slot);
                match metric {
                    Metric::Logic => scores.logic = n,
                    Metric::Persuasion => scores.persuasion = n,
                    Metric::Aggression => scores.aggression = n,
                }
            }
            (Field::Strengths(slot), Extracted::List(items)) => *self.strengths.get_mut(slot) = items,
            (Field::Weaknesses(slot), Extracted::List(items)) => *self.weaknesses.get_mut(slot) = items,
            (field, value) => tracing::warn!(?field, ?value, "extracted value does not fit field"),
        }
    }

    fn finish(self) -> Verdict {
        Verdict {
            winner: decide_winner(&self.scores),
            summary: self.summary,
            rationale: self.rationale,
            conclusion: self.conclusion,
            scores: self.scores,
            strengths: self.strengths,
            weaknesses: self.weaknesses,
        }
    }
}

/// Turn raw judge output into a verdict.
///
/// Fails only when the response contains none of the labeled fields; any
/// field that is missing on its own gets its default.
pub fn parse_verdict(raw: &str) -> Result<Verdict, ExtractionError> {
    let content = format!("{}\n{}", raw.trim(), END_SENTINEL);
    let mut draft = Draft::empty();
    let mut recognized = 0usize;

    for compiled in compiled_rules()? {
        let value = match compiled.extract(&content) {
            Some(value) => {
                recognized += 1;
                value
            }
            None => compiled.rule.kind.default_value(),
        };
        draft.apply(compiled.rule.field, value);
    }

    if recognized == 0 {
        return Err(ExtractionError::Unrecognized);
    }
    tracing::debug!(recognized, total = EXTRACTION_RULES.len(), "judge fields extracted");
    Ok(draft.finish())
}

/// Ask the judge for a verdict on the full transcript and parse it.
pub async fn judge(
    generator: &dyn Generator,
    topic: &str,
    transcript: &str,
) -> Result<Verdict, ExtractionError> {
    let request = format!("Topic: {topic}\n\nHistory:\n{transcript}");
    let raw = generator.generate(JUDGE_INSTRUCTIONS, &request).await?;
    tracing::debug!(chars = raw.len(), "judge response received");
    parse_verdict(&raw)
}
