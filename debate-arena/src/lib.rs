pub mod archive;
pub mod error;
pub mod events;
pub mod generation;
pub mod graph;
pub mod observer;
pub mod persona;
pub mod scheduler;
pub mod server;
pub mod session;
pub mod validator;
pub mod verdict;

pub use error::DebateError;
pub use generation::{ChatGenerator, GenerationError, Generator};
pub use observer::DebateObserver;
pub use scheduler::{DebateScheduler, Phase};
pub use session::{AgentSlot, Session, SessionConfig, Turn, TurnFlag};
pub use verdict::{Verdict, Winner};
