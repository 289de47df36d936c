//! Keyed registry of dialogue sessions.
//!
//! Sessions are created on first use and live until reset, evicted, or idle
//! past the configured timeout. Each session sits behind its own async mutex
//! so turns for one key run strictly in sequence while different keys run
//! in parallel.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex as AsyncMutex;

use medibook_backend::BookingBackend;
use medibook_core::config::MedibookConfig;
use medibook_core::Location;

use crate::error::DialogueError;
use crate::llm::LanguageModel;
use crate::session::{DialogueSession, SessionSettings};
use crate::types::TurnReply;

struct Entry {
    session: Arc<AsyncMutex<DialogueSession>>,
    last_active: DateTime<Utc>,
}

pub struct SessionRegistry {
    llm: Arc<dyn LanguageModel>,
    backend: Arc<dyn BookingBackend>,
    settings: SessionSettings,
    max_message_length: usize,
    idle_timeout: Duration,
    sessions: Mutex<HashMap<String, Entry>>,
}

impl SessionRegistry {
    pub fn new(
        llm: Arc<dyn LanguageModel>,
        backend: Arc<dyn BookingBackend>,
        config: &MedibookConfig,
    ) -> Self {
        let idle_minutes = i64::try_from(config.dialogue.session_idle_minutes).unwrap_or(i64::MAX);
        Self {
            llm,
            backend,
            settings: SessionSettings::from_config(config),
            max_message_length: config.dialogue.max_message_length,
            idle_timeout: Duration::try_minutes(idle_minutes).unwrap_or(Duration::MAX),
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Name of the language model sessions talk to.
    pub fn model(&self) -> &str {
        self.llm.model()
    }

    /// Get the session for `key`, creating it on first use.
    pub fn session(&self, key: &str) -> Arc<AsyncMutex<DialogueSession>> {
        let mut sessions = self.lock();
        let entry = sessions.entry(key.to_string()).or_insert_with(|| {
            tracing::debug!(session = %key, "Creating dialogue session");
            Entry {
                session: Arc::new(AsyncMutex::new(DialogueSession::new(
                    self.llm.clone(),
                    self.backend.clone(),
                    self.settings.clone(),
                ))),
                last_active: Utc::now(),
            }
        });
        entry.last_active = Utc::now();
        entry.session.clone()
    }

    /// Validate an utterance and run it through the session for `key`.
    pub async fn process_message(
        &self,
        key: &str,
        message: &str,
        location: Option<Location>,
    ) -> Result<TurnReply, DialogueError> {
        if message.trim().is_empty() {
            return Err(DialogueError::EmptyMessage);
        }
        if message.chars().count() > self.max_message_length {
            return Err(DialogueError::MessageTooLong(self.max_message_length));
        }

        let session = self.session(key);
        let mut session = session.lock().await;
        let reply = session.process_message(message, location).await;
        drop(session);

        self.touch(key);
        Ok(reply)
    }

    /// Reset an existing session to its initial state.
    pub async fn reset(&self, key: &str) -> Result<(), DialogueError> {
        let session = self
            .lock()
            .get(key)
            .map(|entry| entry.session.clone())
            .ok_or_else(|| DialogueError::SessionNotFound(key.to_string()))?;
        session.lock().await.reset();
        self.touch(key);
        tracing::info!(session = %key, "Dialogue session reset");
        Ok(())
    }

    /// Remove a session. Returns whether it existed.
    pub fn evict(&self, key: &str) -> bool {
        let removed = self.lock().remove(key).is_some();
        if removed {
            tracing::debug!(session = %key, "Dialogue session evicted");
        }
        removed
    }

    /// Remove sessions idle since before `now - idle_timeout`. Sessions
    /// with a turn in flight are kept.
    pub fn evict_idle(&self, now: DateTime<Utc>) -> usize {
        let mut sessions = self.lock();
        let before = sessions.len();
        sessions.retain(|_, entry| {
            now.signed_duration_since(entry.last_active) <= self.idle_timeout
                || Arc::strong_count(&entry.session) > 1
        });
        let evicted = before - sessions.len();
        if evicted > 0 {
            tracing::info!(evicted, remaining = sessions.len(), "Evicted idle sessions");
        }
        evicted
    }

    pub fn contains(&self, key: &str) -> bool {
        self.lock().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn touch(&self, key: &str) {
        if let Some(entry) = self.lock().get_mut(key) {
            entry.last_active = Utc::now();
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Entry>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
