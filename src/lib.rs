pub mod catalog;
pub mod cli;
pub mod config;
pub mod console;
pub mod error;
pub mod export;
pub mod orchestrator;
pub mod participant;
pub mod prompt;
pub mod providers;
pub mod render;
pub mod session;
pub mod stream;
pub mod transcript;

pub use catalog::{ModelCatalog, ModelEntry};
pub use config::AppConfig;
pub use error::ChatError;
pub use orchestrator::{Command, Orchestrator, SessionEvent};
pub use participant::{Participant, ParticipantId, Participants, Personality};
pub use providers::{ChatMessage, Role};
pub use session::{Mode, Session, TurnOutcome, TurnRequest};
pub use stream::{CompletionSource, SseDecoder, StreamingClient, StreamingClientConfig, NO_RESPONSE};
pub use transcript::{Transcript, Turn, TurnStatus};
