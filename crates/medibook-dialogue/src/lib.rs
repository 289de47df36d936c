//! Dialogue-state and tool-orchestration engine for appointment booking.
//!
//! Each inbound utterance runs through NLU, regex entity extraction and
//! doctor/slot matching, then the language model decides what to say and
//! which backend action to take. [`DialogueSession`] merges the three
//! sources into one slot-filling state and books as soon as enough is known.

pub mod decision;
pub mod error;
pub mod executor;
pub mod extract;
pub mod llm;
pub mod matcher;
pub mod nlu;
pub mod prompt;
pub mod registry;
pub mod render;
pub mod selection;
pub mod session;
pub mod types;
pub mod voice;

pub use decision::{parse_decision, Decision};
pub use error::DialogueError;
pub use executor::{ExecutorSettings, ToolExecutor};
pub use extract::extract_entities;
pub use llm::{LanguageModel, LlmError, MockLanguageModel, OllamaClient};
pub use matcher::match_doctor;
pub use nlu::NluClient;
pub use registry::SessionRegistry;
pub use selection::{parse_slot_selection, select_slot};
pub use session::{DialogueSession, SessionSettings};
pub use types::{
    AvailabilityArgs, Extraction, GeocodeArgs, Role, ScheduleArgs, SearchArgs, SessionState,
    ToolCall, ToolName, ToolResult, Turn, TurnContext, TurnReply, UserArgs,
};
pub use voice::{pcm16_to_f32, ScriptedTranscriber, Transcriber, VoiceBuffer};
