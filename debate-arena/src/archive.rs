//! Debate persistence: the per-session JSONL transition log and the JSON
//! archive written once a verdict exists.

use chrono::Local;
use debate_common::session::JsonlLogger;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

use crate::observer::DebateObserver;
use crate::session::{Session, Turn, TurnFlag};
use crate::verdict::Verdict;

const FILE_PREFIX: &str = "debate_log_";
const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("cannot access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot encode archive: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchivedMessage {
    pub sender: String,
    pub content: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl From<&Turn> for ArchivedMessage {
    fn from(turn: &Turn) -> Self {
        Self {
            sender: turn.speaker.label().to_string(),
            content: turn.text.clone(),
            kind: "agent_message".to_string(),
        }
    }
}

/// On-disk shape of a finished debate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveRecord {
    pub topic: String,
    pub timestamp: String,
    pub winner: Value,
    pub messages: Vec<ArchivedMessage>,
}

impl ArchiveRecord {
    pub fn new(session: &Session, verdict: &Verdict, timestamp: String) -> Self {
        Self {
            topic: session.topic().to_string(),
            timestamp,
            winner: verdict.to_client_json(),
            messages: session.turns().iter().map(ArchivedMessage::from).collect(),
        }
    }
}

/// One line of [`list_archives`] output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchiveSummary {
    pub file: String,
    pub topic: String,
    pub timestamp: String,
    pub winner: String,
    pub turns: usize,
}

fn timestamp_now() -> String {
    Local::now().format(TIMESTAMP_FORMAT).to_string()
}

/// First free `debate_log_<timestamp>[_n].<ext>` path in `dir`.
fn unique_path(dir: &Path, timestamp: &str, ext: &str) -> PathBuf {
    let mut path = dir.join(format!("{FILE_PREFIX}{timestamp}.{ext}"));
    let mut n = 1;
    while path.exists() {
        path = dir.join(format!("{FILE_PREFIX}{timestamp}_{n}.{ext}"));
        n += 1;
    }
    path
}

pub fn write_archive(dir: &Path, record: &ArchiveRecord) -> Result<PathBuf, ArchiveError> {
    fs::create_dir_all(dir).map_err(|source| ArchiveError::Io {
        path: dir.to_path_buf(),
        source,
    })?;
    let path = unique_path(dir, &record.timestamp, "json");
    let content = serde_json::to_string_pretty(record)?;
    fs::write(&path, content).map_err(|source| ArchiveError::Io {
        path: path.clone(),
        source,
    })?;
    Ok(path)
}

/// Archived debates in `dir`, newest first. A missing directory is empty;
/// files that do not parse are skipped.
pub fn list_archives(dir: &Path) -> Result<Vec<ArchiveSummary>, ArchiveError> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(source) => {
            return Err(ArchiveError::Io {
                path: dir.to_path_buf(),
                source,
            })
        }
    };

    let mut archives = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        let name = entry.file_name().to_string_lossy().to_string();
        if !name.starts_with(FILE_PREFIX) || path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        let record = match fs::read_to_string(&path)
            .ok()
            .and_then(|content| serde_json::from_str::<ArchiveRecord>(&content).ok())
        {
            Some(record) => record,
            None => {
                warn!(path = %path.display(), "skipping unreadable archive");
                continue;
            }
        };
        archives.push(ArchiveSummary {
            file: name,
            winner: record
                .winner
                .get("winner")
                .and_then(Value::as_str)
                .unwrap_or("")
                .to_string(),
            topic: record.topic,
            timestamp: record.timestamp,
            turns: record.messages.len(),
        });
    }

    archives.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then_with(|| b.file.cmp(&a.file)));
    Ok(archives)
}

/// Observer that records a debate under `log_dir`: every transition goes to
/// the JSONL log as it happens, and the finished debate is archived as JSON.
pub struct SessionLog {
    dir: PathBuf,
    timestamp: String,
    jsonl: JsonlLogger,
    archive_path: Option<PathBuf>,
}

impl SessionLog {
    pub fn create(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        if let Err(e) = fs::create_dir_all(&dir) {
            warn!(path = %dir.display(), error = %e, "cannot create log directory");
        }
        let timestamp = timestamp_now();
        let jsonl = JsonlLogger::new(unique_path(&dir, &timestamp, "jsonl"));
        Self {
            dir,
            timestamp,
            jsonl,
            archive_path: None,
        }
    }

    pub fn jsonl_path(&self) -> &Path {
        self.jsonl.path()
    }

    /// Set once the verdict has been archived.
    pub fn archive_path(&self) -> Option<&Path> {
        self.archive_path.as_deref()
    }
}

impl DebateObserver for SessionLog {
    fn on_turn(&mut self, turn: &Turn) {
        for flag in &turn.flags {
            let issue = match flag {
                TurnFlag::Repetition {
                    matched_round,
                    similarity,
                } => json!({
                    "issue": "repetition",
                    "matched_round": matched_round,
                    "similarity": similarity,
                }),
                TurnFlag::Drift => json!({ "issue": "potential topic drift detected" }),
            };
            self.jsonl.log(
                "validation_fail",
                turn.round,
                Some(json!({ "agent": turn.speaker, "detail": issue, "text": turn.text })),
            );
        }
        self.jsonl.log(
            "turn_execution",
            turn.round,
            Some(json!({
                "agent": turn.speaker,
                "persona": turn.persona,
                "content_length": turn.text.chars().count(),
            })),
        );
    }

    fn on_verdict(&mut self, session: &Session, verdict: &Verdict) {
        self.jsonl.log(
            "verdict",
            session.round_count(),
            Some(json!({ "session": session.id(), "verdict": verdict.to_client_json() })),
        );
        self.jsonl.close();

        let record = ArchiveRecord::new(session, verdict, self.timestamp.clone());
        match write_archive(&self.dir, &record) {
            Ok(path) => {
                info!(path = %path.display(), "debate archived");
                self.archive_path = Some(path);
            }
            Err(e) => warn!(error = %e, "failed to archive debate"),
        }
    }
}
