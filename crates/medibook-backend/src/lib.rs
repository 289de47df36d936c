//! Client for the booking backend.
//!
//! The backend exposes doctor search, availability, scheduling, geocoding
//! and NLU parsing over JSON/HTTP. The dialogue engine only sees the
//! [`BookingBackend`] trait; [`HttpBookingBackend`] talks to the real
//! service and [`MockBackend`] records calls for tests.

pub mod client;
pub mod error;
pub mod mock;

use async_trait::async_trait;
use serde_json::Value;

use medibook_core::{AppointmentRequest, AvailabilityRequest, Location, NluResult};

pub use client::HttpBookingBackend;
pub use error::BackendError;
pub use mock::{BackendCall, MockBackend};

/// Remote actions offered by the booking backend.
///
/// Action methods return the raw JSON payload so callers can both render
/// it and hand it back to the user untouched.
#[async_trait]
pub trait BookingBackend: Send + Sync {
    /// Base URL used in diagnostics.
    fn base_url(&self) -> &str;

    /// Probe the health endpoint. Any failure reads as unreachable.
    async fn health_check(&self) -> bool;

    async fn search_doctors(
        &self,
        specialty: &str,
        location: Location,
        radius_km: f64,
    ) -> Result<Value, BackendError>;

    async fn check_availability(&self, request: &AvailabilityRequest)
        -> Result<Value, BackendError>;

    async fn schedule_appointment(
        &self,
        request: &AppointmentRequest,
    ) -> Result<Value, BackendError>;

    async fn geocode(&self, query: &str) -> Result<Value, BackendError>;

    /// Run the backend's intent/entity parser over an utterance.
    async fn parse_message(&self, message: &str) -> Result<NluResult, BackendError>;
}
