use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai";
pub const DEFAULT_MODEL: &str = "llama-3.3-70b-versatile";
pub const DEFAULT_TEMPERATURE: f32 = 0.6;
pub const DEFAULT_MAX_ROUNDS: u32 = 6;
pub const DEFAULT_LOG_DIR: &str = "logs";
pub const DEFAULT_LOG_LEVEL: &str = "info";

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no API key found. Set GROQ_API_KEY (or DEBATE_API_KEY), or write ~/.debate-arena/credentials.json")]
    MissingApiKey,
    #[error("invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },
    #[error("failed to create log directory {path}: {source}")]
    LogDir {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// What the turn validator does to a turn flagged as a repetition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepetitionPolicy {
    /// Flag the turn and append a visible note to its stored text.
    #[default]
    AppendNote,
    /// Flag the turn, leave the text untouched.
    AnnotateOnly,
}

impl FromStr for RepetitionPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "append_note" | "append-note" => Ok(Self::AppendNote),
            "annotate_only" | "annotate-only" => Ok(Self::AnnotateOnly),
            _ => Err(ConfigError::InvalidValue {
                key: "REPETITION_POLICY",
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebateConfig {
    pub base_url: String,
    #[serde(skip)]
    pub api_key: Option<String>,
    pub model: String,
    pub temperature: f32,
    pub max_rounds: u32,
    pub log_dir: PathBuf,
    pub log_level: String,
    pub repetition_policy: RepetitionPolicy,
}

impl Default for DebateConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            max_rounds: DEFAULT_MAX_ROUNDS,
            log_dir: PathBuf::from(DEFAULT_LOG_DIR),
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            repetition_policy: RepetitionPolicy::default(),
        }
    }
}

impl DebateConfig {
    /// OpenAI-compatible chat completions endpoint under `base_url`.
    pub fn chat_completions_url(&self) -> String {
        format!("{}/v1/chat/completions", self.base_url.trim_end_matches('/'))
    }

    pub fn require_api_key(&self) -> Result<&str, ConfigError> {
        self.api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or(ConfigError::MissingApiKey)
    }

    /// Create `log_dir` if needed and return it.
    pub fn ensure_log_dir(&self) -> Result<&Path, ConfigError> {
        std::fs::create_dir_all(&self.log_dir).map_err(|source| ConfigError::LogDir {
            path: self.log_dir.display().to_string(),
            source,
        })?;
        Ok(&self.log_dir)
    }
}

fn load_credentials_key() -> Result<String, String> {
    let home = dirs::home_dir().ok_or("No home directory")?;
    let creds_path = home.join(".debate-arena/credentials.json");

    let content = std::fs::read_to_string(&creds_path)
        .map_err(|e| format!("Failed to read {}: {}", creds_path.display(), e))?;

    let creds: serde_json::Value = serde_json::from_str(&content)
        .map_err(|e| format!("Invalid JSON in credentials: {}", e))?;

    creds
        .get("api_key")
        .and_then(|t| t.as_str())
        .map(|t| t.to_string())
        .ok_or_else(|| "api_key field not found in credentials.json".to_string())
}

/// Load configuration from the process environment.
///
/// A missing API key is not an error here; commands that call the model
/// check it with [`DebateConfig::require_api_key`].
pub fn load_config() -> Result<DebateConfig, ConfigError> {
    let mut config = load_config_from(|key| std::env::var(key).ok())?;
    if config.api_key.is_none() {
        config.api_key = load_credentials_key().ok();
    }
    Ok(config)
}

/// Build a config from an arbitrary variable lookup. Unset variables keep
/// their defaults; set but unparsable ones are rejected.
pub fn load_config_from<F>(lookup: F) -> Result<DebateConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = DebateConfig::default();
    let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

    config.api_key = get("GROQ_API_KEY").or_else(|| get("DEBATE_API_KEY"));

    if let Some(url) = get("DEBATE_BASE_URL") {
        config.base_url = url;
    }
    if let Some(model) = get("MODEL_NAME") {
        config.model = model;
    }
    if let Some(raw) = get("TEMPERATURE") {
        config.temperature = raw.parse().map_err(|_| ConfigError::InvalidValue {
            key: "TEMPERATURE",
            value: raw.clone(),
        })?;
    }
    if let Some(raw) = get("MAX_ROUNDS") {
        config.max_rounds = raw.parse().map_err(|_| ConfigError::InvalidValue {
            key: "MAX_ROUNDS",
            value: raw.clone(),
        })?;
    }
    if let Some(dir) = get("LOG_DIR") {
        config.log_dir = PathBuf::from(dir);
    }
    if let Some(level) = get("LOG_LEVEL") {
        config.log_level = level.to_ascii_lowercase();
    }
    if let Some(raw) = get("REPETITION_POLICY") {
        config.repetition_policy = raw.parse()?;
    }

    Ok(config)
}

/// HTTP client for model calls. Only the connect phase is bounded; streaming
/// reads are bounded by the SSE idle timeout instead.
pub fn build_http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}
