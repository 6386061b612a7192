use std::io::{self, BufRead, Write};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::{Args, Parser, Subcommand};
use debate_arena::archive::SessionLog;
use debate_arena::events::{self, TerminalPresenter};
use debate_arena::server::{self, AppState};
use debate_arena::{graph, persona, ChatGenerator, DebateObserver, DebateScheduler, SessionConfig};
use debate_common::config::{self, DebateConfig};
use tracing_subscriber::EnvFilter;

const EXIT_FAILURE: u8 = 1;
const EXIT_USAGE: u8 = 2;
const EXIT_INTERRUPTED: u8 = 130;

#[derive(Parser)]
#[command(name = "debate-arena")]
#[command(about = "Two AI agents debate a topic, then a judge scores them")]
struct Cli {
    /// Directory for session logs and debate archives
    #[arg(long, global = true, env = "LOG_DIR")]
    log_dir: Option<PathBuf>,

    /// Chat model used for both agents and the judge
    #[arg(long, global = true, env = "MODEL_NAME")]
    model: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run one debate in the terminal
    Run(RunArgs),
    /// Serve the HTTP/SSE API
    Serve(ServeArgs),
    /// Print the debate flow as a Mermaid graph
    Graph,
    /// List the available personas
    Personas,
}

#[derive(Args)]
struct RunArgs {
    /// Debate topic (prompted for when omitted)
    #[arg(long)]
    topic: Option<String>,

    /// Total number of agent turns before judging
    #[arg(long)]
    rounds: Option<u32>,

    /// Persona for Agent A (proposer)
    #[arg(long, default_value = persona::DEFAULT_PERSONA)]
    agent_a: String,

    /// Persona for Agent B (opponent)
    #[arg(long, default_value = persona::DEFAULT_PERSONA)]
    agent_b: String,

    /// Print the finished session as JSON instead of the live transcript
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct ServeArgs {
    /// Address to bind the server to
    #[arg(long, default_value = "127.0.0.1")]
    bind: String,

    /// Port to listen on
    #[arg(long, default_value = "8000")]
    port: u16,

    /// Delay between streamed events, in milliseconds
    #[arg(long, default_value = "500")]
    pacing_ms: u64,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.command {
        Command::Graph => {
            println!("{}", graph::mermaid());
            return ExitCode::SUCCESS;
        }
        Command::Personas => {
            for id in persona::catalogue() {
                println!("{}", id);
            }
            return ExitCode::SUCCESS;
        }
        Command::Run(_) | Command::Serve(_) => {}
    }

    let mut config = match config::load_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("[debate] Configuration error: {}", e);
            return ExitCode::from(EXIT_USAGE);
        }
    };
    if let Some(dir) = cli.log_dir {
        config.log_dir = dir;
    }
    if let Some(model) = cli.model {
        config.model = model;
    }
    init_tracing(&config.log_level);

    let code = match cli.command {
        Command::Run(args) => run_debate(args, config).await,
        Command::Serve(args) => serve(args, config).await,
        Command::Graph | Command::Personas => 0,
    };
    ExitCode::from(code)
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("debate_arena={level},debate_common={level}")));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn prompt(label: &str) -> String {
    print!("{}", label);
    let _ = io::stdout().flush();
    let mut line = String::new();
    let _ = io::stdin().lock().read_line(&mut line);
    line.trim().to_string()
}

/// Missing topic means interactive mode: ask for the topic, then the rounds.
fn resolve_topic_and_rounds(args: &RunArgs, config: &DebateConfig) -> (String, u32) {
    match &args.topic {
        Some(topic) => (topic.trim().to_string(), args.rounds.unwrap_or(config.max_rounds)),
        None => {
            let topic = prompt("Enter debate topic: ");
            let rounds = match args.rounds {
                Some(rounds) => rounds,
                None if topic.is_empty() => config.max_rounds,
                None => prompt(&format!("Enter max rounds (default {}): ", config.max_rounds))
                    .parse()
                    .unwrap_or(config.max_rounds),
            };
            (topic, rounds)
        }
    }
}

fn print_json(value: &serde_json::Value) {
    let json = serde_json::to_string_pretty(value)
        .unwrap_or_else(|e| format!("{{\"error\": \"Failed to serialize: {}\"}}", e));
    println!("{}", json);
}

async fn run_debate(args: RunArgs, config: DebateConfig) -> u8 {
    let (topic, rounds) = resolve_topic_and_rounds(&args, &config);
    let session_config = SessionConfig::new(topic)
        .with_rounds(rounds)
        .with_personas(args.agent_a.as_str(), args.agent_b.as_str());
    if let Err(e) = session_config.validate() {
        eprintln!("[debate] Topic cannot be empty ({}).", e);
        return EXIT_USAGE;
    }

    let generator = match ChatGenerator::from_config(&config) {
        Ok(generator) => Arc::new(generator),
        Err(e) => {
            eprintln!("[debate] Configuration error: {}", e);
            return EXIT_USAGE;
        }
    };

    let scheduler = match DebateScheduler::new(generator, session_config, config.repetition_policy) {
        Ok(scheduler) => scheduler,
        Err(e) => {
            eprintln!("[debate] Fatal error: {}", e);
            return EXIT_USAGE;
        }
    };

    events::emit_debate_started(scheduler.session().topic(), rounds);
    let mut log = SessionLog::create(&config.log_dir);
    let mut presenter = (!args.json).then(|| TerminalPresenter::new(io::stdout(), rounds));
    let mut observers: Vec<&mut dyn DebateObserver> = Vec::new();
    observers.push(&mut log);
    if let Some(presenter) = presenter.as_mut() {
        observers.push(presenter);
    }

    let start = Instant::now();
    let outcome = tokio::select! {
        result = scheduler.run(&mut observers) => Some(result),
        _ = tokio::signal::ctrl_c() => None,
    };

    match outcome {
        None => {
            events::emit_interrupted();
            EXIT_INTERRUPTED
        }
        Some(Ok(session)) => {
            events::emit_debate_completed(start.elapsed().as_millis() as u64, session.turns().len());
            events::emit_log_saved(log.jsonl_path(), log.archive_path());
            if args.json {
                print_json(&serde_json::json!({
                    "session": session,
                    "verdict": session.verdict().map(|v| v.to_client_json()),
                }));
            }
            0
        }
        Some(Err(e)) => {
            eprintln!("[debate] Fatal error: {}", e);
            if args.json {
                print_json(&serde_json::json!({
                    "error": e.to_string(),
                    "session": null,
                    "verdict": null,
                }));
            }
            EXIT_FAILURE
        }
    }
}

async fn serve(args: ServeArgs, config: DebateConfig) -> u8 {
    let addr: SocketAddr = match format!("{}:{}", args.bind, args.port).parse() {
        Ok(addr) => addr,
        Err(e) => {
            eprintln!("[debate] Invalid bind address: {}", e);
            return EXIT_USAGE;
        }
    };
    let generator = match ChatGenerator::from_config(&config) {
        Ok(generator) => Arc::new(generator),
        Err(e) => {
            eprintln!("[debate] Configuration error: {}", e);
            return EXIT_USAGE;
        }
    };

    let state = AppState::new(generator, config.log_dir.clone(), config.repetition_policy)
        .with_pacing(Duration::from_millis(args.pacing_ms));
    match server::serve(state, addr).await {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("[debate] Fatal error: {}", e);
            EXIT_FAILURE
        }
    }
}
