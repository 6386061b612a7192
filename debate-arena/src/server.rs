//! HTTP surface: health, persona catalogue, archived debates and a live
//! debate streamed as Server-Sent Events.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use axum::Router;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use crate::archive::{self, SessionLog};
use crate::generation::Generator;
use crate::observer::DebateObserver;
use crate::persona;
use crate::scheduler::DebateScheduler;
use crate::session::{AgentSlot, Session, SessionConfig, Turn, DEFAULT_MAX_ROUNDS};
use crate::validator::RepetitionPolicy;
use crate::verdict::Verdict;

pub const DEFAULT_PACING: Duration = Duration::from_millis(500);
/// Idle interval between SSE comment pings. A failed ping write is how a
/// vanished client is noticed while the next turn is still generating.
pub const DEFAULT_KEEP_ALIVE: Duration = Duration::from_secs(15);
const DONE_MARKER: &str = "[DONE]";

#[derive(Clone)]
pub struct AppState {
    generator: Arc<dyn Generator>,
    log_dir: PathBuf,
    policy: RepetitionPolicy,
    pacing: Duration,
    keep_alive: Duration,
}

impl AppState {
    pub fn new(generator: Arc<dyn Generator>, log_dir: impl Into<PathBuf>, policy: RepetitionPolicy) -> Self {
        Self {
            generator,
            log_dir: log_dir.into(),
            policy,
            pacing: DEFAULT_PACING,
            keep_alive: DEFAULT_KEEP_ALIVE,
        }
    }

    /// Delay after each streamed event.
    pub fn with_pacing(mut self, pacing: Duration) -> Self {
        self.pacing = pacing;
        self
    }

    pub fn with_keep_alive(mut self, interval: Duration) -> Self {
        self.keep_alive = interval;
        self
    }
}

/// One `data:` payload of the debate stream.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    Message { sender: AgentSlot, content: String },
    Verdict { winner: Value },
    Error { message: String },
}

struct ChannelObserver {
    tx: mpsc::UnboundedSender<StreamEvent>,
}

impl DebateObserver for ChannelObserver {
    fn on_turn(&mut self, turn: &Turn) {
        let _ = self.tx.send(StreamEvent::Message {
            sender: turn.speaker,
            content: turn.text.clone(),
        });
    }

    fn on_verdict(&mut self, _session: &Session, verdict: &Verdict) {
        let _ = self.tx.send(StreamEvent::Verdict {
            winner: verdict.to_client_json(),
        });
    }
}

/// Aborts the session task when the response stream is dropped, which is
/// what happens when the client disconnects.
struct AbortOnDrop(JoinHandle<()>);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

fn natural() -> String {
    "Natural".to_string()
}

fn default_rounds() -> u32 {
    DEFAULT_MAX_ROUNDS
}

#[derive(Debug, Deserialize)]
pub struct StartDebateParams {
    #[serde(default)]
    pub topic: String,
    #[serde(default = "natural")]
    pub agent_a: String,
    #[serde(default = "natural")]
    pub agent_b: String,
    #[serde(default = "default_rounds")]
    pub rounds: u32,
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/personas", get(personas))
        .route("/debates", get(debates))
        .route("/start_debate", get(start_debate))
        .layer(cors)
        .with_state(state)
}

pub async fn serve(state: AppState, addr: SocketAddr) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "listening");
    axum::serve(listener, router(state)).await
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn personas() -> Json<Vec<&'static str>> {
    Json(persona::catalogue())
}

/// GET /debates - archived debates, newest first.
async fn debates(State(state): State<AppState>) -> Result<Json<Vec<archive::ArchiveSummary>>, StatusCode> {
    archive::list_archives(&state.log_dir).map(Json).map_err(|e| {
        warn!(error = %e, "cannot list archives");
        StatusCode::INTERNAL_SERVER_ERROR
    })
}

/// GET /start_debate - runs one debate and streams it.
async fn start_debate(State(state): State<AppState>, Query(params): Query<StartDebateParams>) -> Response {
    let config = SessionConfig::new(params.topic.trim())
        .with_rounds(params.rounds)
        .with_personas(params.agent_a, params.agent_b);
    if let Err(e) = config.validate() {
        return (StatusCode::BAD_REQUEST, Json(json!({ "error": e.to_string() }))).into_response();
    }

    info!(topic = %config.topic, rounds = config.max_rounds, "debate requested");
    let (tx, mut rx) = mpsc::unbounded_channel();
    let pacing = state.pacing;
    let keep_alive = KeepAlive::new().interval(state.keep_alive);

    let task = tokio::spawn(async move {
        let mut observers: Vec<Box<dyn DebateObserver>> = vec![
            Box::new(ChannelObserver { tx: tx.clone() }),
            Box::new(SessionLog::create(state.log_dir.clone())),
        ];
        let result = match DebateScheduler::new(state.generator.clone(), config, state.policy) {
            Ok(scheduler) => scheduler.run(&mut observers).await.map(|_| ()),
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            warn!(error = %e, "debate failed");
            let _ = tx.send(StreamEvent::Error { message: e.to_string() });
        }
    });
    let guard = AbortOnDrop(task);

    let stream = async_stream::stream! {
        let _guard = guard;
        while let Some(event) = rx.recv().await {
            match serde_json::to_string(&event) {
                Ok(data) => yield Ok::<_, Infallible>(Event::default().data(data)),
                Err(e) => warn!(error = %e, "cannot encode stream event"),
            }
            tokio::time::sleep(pacing).await;
        }
        yield Ok(Event::default().data(DONE_MARKER));
    };

    Sse::new(stream).keep_alive(keep_alive).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_events_carry_a_type_tag() {
        let message = StreamEvent::Message {
            sender: AgentSlot::AgentB,
            content: "No.".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&message).unwrap(),
            json!({ "type": "message", "sender": "Agent B", "content": "No." })
        );

        let error = StreamEvent::Error { message: "boom".to_string() };
        assert_eq!(
            serde_json::to_value(&error).unwrap(),
            json!({ "type": "error", "message": "boom" })
        );
    }

    #[test]
    fn query_defaults_match_the_web_client() {
        let params: StartDebateParams = serde_json::from_value(json!({ "topic": "x" })).unwrap();
        assert_eq!(params.agent_a, "Natural");
        assert_eq!(params.agent_b, "Natural");
        assert_eq!(params.rounds, 6);
    }
}
