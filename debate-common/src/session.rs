use serde::Serialize;
use serde_json::Value;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// First `max_chars` characters of `s`, with `...` when something was cut.
pub fn preview_str(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}

// ============================================================================
// JSONL logger
// ============================================================================

#[derive(Serialize)]
struct LogEntry<'a> {
    ts: u64,
    event: &'a str,
    round: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

/// Append-only JSONL event log, one entry per line.
///
/// If the file cannot be opened the logger is inert and `log()` does nothing;
/// a broken log never fails a debate.
pub struct JsonlLogger {
    path: PathBuf,
    file: Option<Mutex<fs::File>>,
}

impl JsonlLogger {
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| tracing::warn!(path = %path.display(), error = %e, "JSONL log disabled"))
            .ok()
            .map(Mutex::new);
        Self { path, file }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_active(&self) -> bool {
        self.file.is_some()
    }

    pub fn log(&self, event: &str, round: u32, data: Option<Value>) {
        let Some(ref file_mutex) = self.file else {
            return;
        };
        let entry = LogEntry {
            ts: now_millis(),
            event,
            round,
            data,
        };
        let Ok(mut line) = serde_json::to_string(&entry) else {
            return;
        };
        line.push('\n');

        if let Ok(mut f) = file_mutex.lock() {
            let _ = f.write_all(line.as_bytes());
        }
    }

    pub fn close(&self) {
        if let Some(ref file_mutex) = self.file {
            if let Ok(mut f) = file_mutex.lock() {
                let _ = f.flush();
            }
        }
    }
}
