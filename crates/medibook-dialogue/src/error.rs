//! Error types for the dialogue engine.

use medibook_core::MedibookError;

/// Errors surfaced by the session registry and voice input.
///
/// Turn processing itself never fails; these cover input validation and
/// session bookkeeping around it.
#[derive(Debug, thiserror::Error)]
pub enum DialogueError {
    #[error("message cannot be empty")]
    EmptyMessage,
    #[error("message exceeds maximum length of {0} characters")]
    MessageTooLong(usize),
    #[error("session not found: {0}")]
    SessionNotFound(String),
    #[error("LLM error: {0}")]
    Llm(String),
    #[error("voice error: {0}")]
    Voice(String),
}

impl From<DialogueError> for MedibookError {
    fn from(err: DialogueError) -> Self {
        match err {
            DialogueError::Llm(msg) => MedibookError::Llm(msg),
            other => MedibookError::Api(other.to_string()),
        }
    }
}
