//! Wrapper around the backend's NLU endpoint.
//!
//! NLU is advisory: any failure is logged and the turn proceeds without it.

use std::sync::Arc;

use medibook_backend::BookingBackend;
use medibook_core::NluResult;

/// Non-fatal NLU client.
#[derive(Clone)]
pub struct NluClient {
    backend: Arc<dyn BookingBackend>,
}

impl NluClient {
    pub fn new(backend: Arc<dyn BookingBackend>) -> Self {
        Self { backend }
    }

    /// Parse an utterance, returning `None` when the endpoint fails.
    pub async fn parse(&self, message: &str) -> Option<NluResult> {
        match self.backend.parse_message(message).await {
            Ok(result) => {
                tracing::debug!(
                    intent = ?result.intent,
                    specialty = ?result.entities.specialty,
                    has_date_range = result.entities.date_range.is_some(),
                    "NLU parsed utterance"
                );
                Some(result)
            }
            Err(e) => {
                tracing::warn!(error = %e, "NLU parsing failed; continuing without it");
                None
            }
        }
    }
}
