use thiserror::Error;

/// Top-level error type for the Medibook system.
///
/// Subsystem crates define their own error types and implement
/// `From<SubsystemError> for MedibookError` so that `?` works across
/// crate boundaries.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum MedibookError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Language model error: {0}")]
    Llm(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<toml::de::Error> for MedibookError {
    fn from(err: toml::de::Error) -> Self {
        MedibookError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for MedibookError {
    fn from(err: toml::ser::Error) -> Self {
        MedibookError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for MedibookError {
    fn from(err: serde_json::Error) -> Self {
        MedibookError::Serialization(err.to_string())
    }
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, MedibookError>;
