//! Turn validation: repetition and topic-drift heuristics.
//!
//! Both checks only annotate. Nothing here rejects or regenerates a turn.

use std::collections::{HashMap, HashSet};

pub use debate_common::config::RepetitionPolicy;

use crate::session::TurnFlag;

/// A turn more similar than this to an earlier turn by the same agent is a repetition.
pub const REPETITION_THRESHOLD: f64 = 0.8;

/// Texts at or below this many characters are never flagged for drift.
pub const DRIFT_MIN_CHARS: usize = 100;

pub const REPETITION_NOTE: &str = "\n[System Note: Argument similar to previous point.]";

/// Texts at least this long get popular-character junking on the `b` side.
const AUTOJUNK_MIN_LEN: usize = 200;

/// Ratcliff/Obershelp similarity: `2 * M / (len(a) + len(b))` where `M` is the
/// number of characters in the matching blocks found by repeatedly taking the
/// longest common substring and recursing on both sides of it.
///
/// When `b` has 200 or more characters, any character occurring more than
/// `len(b) / 100 + 1` times in it cannot seed a match; it only joins a block
/// by extending one found from rarer characters. Spaces and common letters in
/// long prose are therefore mostly ignored.
///
/// Two empty strings are identical (1.0).
pub fn similarity_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    let matcher = Matcher::new(&a, &b);
    2.0 * matcher.matching_chars() as f64 / total as f64
}

struct Matcher<'a> {
    a: &'a [char],
    b: &'a [char],
    /// Positions in `b` of every non-popular character, ascending.
    b2j: HashMap<char, Vec<usize>>,
}

impl<'a> Matcher<'a> {
    fn new(a: &'a [char], b: &'a [char]) -> Self {
        let mut b2j: HashMap<char, Vec<usize>> = HashMap::new();
        for (j, &c) in b.iter().enumerate() {
            b2j.entry(c).or_default().push(j);
        }
        if b.len() >= AUTOJUNK_MIN_LEN {
            let limit = b.len() / 100 + 1;
            b2j.retain(|_, positions| positions.len() <= limit);
        }
        Self { a, b, b2j }
    }

    fn matching_chars(&self) -> usize {
        let mut queue = vec![(0, self.a.len(), 0, self.b.len())];
        let mut matched = 0;

        while let Some((alo, ahi, blo, bhi)) = queue.pop() {
            let (i, j, k) = self.longest_match(alo, ahi, blo, bhi);
            if k == 0 {
                continue;
            }
            matched += k;
            if alo < i && blo < j {
                queue.push((alo, i, blo, j));
            }
            if i + k < ahi && j + k < bhi {
                queue.push((i + k, ahi, j + k, bhi));
            }
        }

        matched
    }

    /// Longest common block of `a[alo..ahi]` and `b[blo..bhi]` as (i, j, len).
    /// Ties go to the block starting earliest in `a`, then earliest in `b`.
    fn longest_match(&self, alo: usize, ahi: usize, blo: usize, bhi: usize) -> (usize, usize, usize) {
        let (a, b) = (self.a, self.b);
        let (mut best_i, mut best_j, mut best_k) = (alo, blo, 0);
        // run length of the match ending at (i - 1, j), keyed by j
        let mut runs: HashMap<usize, usize> = HashMap::new();

        for i in alo..ahi {
            let mut next_runs = HashMap::new();
            for &j in self.b2j.get(&a[i]).map(Vec::as_slice).unwrap_or_default() {
                if j < blo {
                    continue;
                }
                if j >= bhi {
                    break;
                }
                let k = j.checked_sub(1).and_then(|p| runs.get(&p)).copied().unwrap_or(0) + 1;
                next_runs.insert(j, k);
                if k > best_k {
                    best_i = i + 1 - k;
                    best_j = j + 1 - k;
                    best_k = k;
                }
            }
            runs = next_runs;
        }

        // grow the block over equal neighbours, popular characters included
        while best_i > alo && best_j > blo && a[best_i - 1] == b[best_j - 1] {
            best_i -= 1;
            best_j -= 1;
            best_k += 1;
        }
        while best_i + best_k < ahi && best_j + best_k < bhi && a[best_i + best_k] == b[best_j + best_k] {
            best_k += 1;
        }

        (best_i, best_j, best_k)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RepetitionMatch {
    pub round: u32,
    pub similarity: f64,
}

/// First earlier text (as `(round, text)`) that `text` is a near-duplicate of.
pub fn check_repetition(text: &str, prior: &[(u32, &str)]) -> Option<RepetitionMatch> {
    prior.iter().find_map(|&(round, earlier)| {
        let similarity = similarity_ratio(text, earlier);
        (similarity > REPETITION_THRESHOLD).then_some(RepetitionMatch { round, similarity })
    })
}

fn word_set(s: &str) -> HashSet<String> {
    s.split_whitespace().map(|w| w.to_lowercase()).collect()
}

/// True when a long text shares no word at all with the topic.
///
/// Words are whitespace-separated and compared lowercased, punctuation
/// included, so paraphrases will trip it.
pub fn check_drift(text: &str, topic: &str) -> bool {
    if text.chars().count() <= DRIFT_MIN_CHARS {
        return false;
    }
    word_set(topic).is_disjoint(&word_set(text))
}

#[derive(Debug, Clone, PartialEq)]
pub struct Validation {
    /// Text to store on the turn (may carry the repetition note).
    pub text: String,
    pub flags: Vec<TurnFlag>,
}

/// Run both checks on a freshly generated turn.
///
/// `prior` holds the same agent's earlier turns. Checks see the text as
/// generated; the repetition note is appended afterwards when the policy asks
/// for it.
pub fn validate_turn(
    text: String,
    prior: &[(u32, &str)],
    topic: &str,
    policy: RepetitionPolicy,
) -> Validation {
    let mut flags = Vec::new();

    let repetition = check_repetition(&text, prior);
    if let Some(m) = repetition {
        flags.push(TurnFlag::Repetition {
            matched_round: m.round,
            similarity: m.similarity,
        });
    }
    if check_drift(&text, topic) {
        flags.push(TurnFlag::Drift);
    }

    let text = match (repetition, policy) {
        (Some(_), RepetitionPolicy::AppendNote) => text + REPETITION_NOTE,
        _ => text,
    };

    Validation { text, flags }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ratio_edges() {
        assert_eq!(similarity_ratio("", ""), 1.0);
        assert_eq!(similarity_ratio("abc", ""), 0.0);
        assert_eq!(similarity_ratio("abc", "abc"), 1.0);
        assert_eq!(similarity_ratio("abc", "xyz"), 0.0);
    }

    #[test]
    fn ratio_counts_blocks_on_both_sides() {
        // "ab" + "d" match around the differing middle character.
        assert!((similarity_ratio("abcd", "abxd") - 0.75).abs() < 1e-12);
        // "e Thread currentThread;" then "privat": every char of the shorter side.
        let r = similarity_ratio(
            "private Thread currentThread;",
            "private volatile Thread currentThread;",
        );
        assert!((r - 2.0 * 29.0 / 67.0).abs() < 1e-12, "got {r}");
    }

    #[test]
    fn ratio_is_symmetric_for_simple_inputs() {
        let a = "Cars pollute cities.";
        let b = "Cities pollute cars.";
        assert!((similarity_ratio(a, b) - similarity_ratio(b, a)).abs() < 1e-12);
    }

    #[test]
    fn longest_match_prefers_earliest_block() {
        let a: Vec<char> = "abXab".chars().collect();
        let b: Vec<char> = "ab".chars().collect();
        assert_eq!(Matcher::new(&a, &b).longest_match(0, a.len(), 0, b.len()), (0, 0, 2));
    }

    #[test]
    fn popular_characters_are_dropped_only_for_long_texts() {
        let short: Vec<char> = "a".repeat(199).chars().collect();
        assert!(Matcher::new(&short, &short).b2j.contains_key(&'a'));

        let long: Vec<char> = format!("{}xyz", "a".repeat(200)).chars().collect();
        let matcher = Matcher::new(&long, &long);
        assert!(!matcher.b2j.contains_key(&'a'));
        assert!(matcher.b2j.contains_key(&'x'));
    }

    #[test]
    fn note_is_appended_only_under_append_policy() {
        let prior = [(0, "Nuclear power is the safest energy source per terawatt hour.")];
        let text = "Nuclear power is the safest energy source per terawatt hour!".to_string();

        let v = validate_turn(text.clone(), &prior, "nuclear power", RepetitionPolicy::AppendNote);
        assert!(v.text.ends_with(REPETITION_NOTE));
        assert!(matches!(v.flags[0], TurnFlag::Repetition { matched_round: 0, .. }));

        let v = validate_turn(text.clone(), &prior, "nuclear power", RepetitionPolicy::AnnotateOnly);
        assert_eq!(v.text, text);
        assert_eq!(v.flags.len(), 1);
    }
}
