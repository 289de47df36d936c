//! Application state shared across all route handlers.

use std::sync::Arc;
use std::time::Instant;

use medibook_core::config::MedibookConfig;
use medibook_dialogue::{SessionRegistry, Transcriber};

/// Shared application state. Cheap to clone; every field is shared.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<MedibookConfig>,
    /// Dialogue sessions keyed by chat id or WebSocket connection.
    pub registry: Arc<SessionRegistry>,
    /// Speech-to-text engine; `None` disables audio input.
    pub transcriber: Option<Arc<dyn Transcriber>>,
    /// Server start time for uptime calculation.
    pub start_time: Instant,
}

impl AppState {
    pub fn new(config: MedibookConfig, registry: SessionRegistry) -> Self {
        Self {
            config: Arc::new(config),
            registry: Arc::new(registry),
            transcriber: None,
            start_time: Instant::now(),
        }
    }

    pub fn with_transcriber(mut self, transcriber: Arc<dyn Transcriber>) -> Self {
        self.transcriber = Some(transcriber);
        self
    }
}
