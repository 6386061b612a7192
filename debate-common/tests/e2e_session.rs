//! Integration tests for debate-common session helpers: JsonlLogger and text utilities.

use debate_common::session::{now_millis, preview_str, JsonlLogger};
use serde_json::{json, Value};

// ============================================================================
// JsonlLogger
// ============================================================================

#[test]
fn logger_writes_jsonl_entries() {
    let dir = tempfile::tempdir().unwrap();
    let log_path = dir.path().join("debate.jsonl");

    let logger = JsonlLogger::new(&log_path);
    assert!(logger.is_active());
    logger.log("turn_execution", 0, Some(json!({"agent": "Agent A"})));
    logger.log("verdict", 4, None);
    logger.close();

    let content = std::fs::read_to_string(&log_path).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 2);

    let entry1: Value = serde_json::from_str(lines[0]).unwrap();
    assert_eq!(entry1["event"], "turn_execution");
    assert_eq!(entry1["round"], 0);
    assert_eq!(entry1["data"]["agent"], "Agent A");
    assert!(entry1["ts"].as_u64().unwrap() > 0);

    let entry2: Value = serde_json::from_str(lines[1]).unwrap();
    assert_eq!(entry2["event"], "verdict");
    assert_eq!(entry2["round"], 4);
    assert!(entry2.get("data").is_none(), "data should be omitted when None");
}

#[test]
fn logger_is_inert_on_invalid_path() {
    let logger = JsonlLogger::new("/nonexistent/deeply/nested/path/log.jsonl");
    assert!(!logger.is_active());
    logger.log("should_not_crash", 0, None);
    logger.close();
}

#[test]
fn logger_appends_to_existing_file() {
    let dir = tempfile::tempdir().unwrap();
    let log_path = dir.path().join("append.jsonl");

    let first = JsonlLogger::new(&log_path);
    first.log("first", 0, None);
    first.close();

    let second = JsonlLogger::new(&log_path);
    second.log("second", 1, None);
    second.close();

    let content = std::fs::read_to_string(&log_path).unwrap();
    assert_eq!(content.lines().count(), 2);
    assert_eq!(second.path(), log_path.as_path());
}

// ============================================================================
// Utilities
// ============================================================================

#[test]
fn now_millis_returns_reasonable_timestamp() {
    let ts = now_millis();
    assert!(ts > 1704067200000, "Timestamp too small: {}", ts);
}

#[test]
fn preview_keeps_short_strings() {
    assert_eq!(preview_str("Is AI good?", 80), "Is AI good?");
}

#[test]
fn preview_truncates_on_char_boundary() {
    assert_eq!(preview_str("abcdef", 3), "abc...");
    assert_eq!(preview_str("토론주제입니다", 2), "토론...");
}
