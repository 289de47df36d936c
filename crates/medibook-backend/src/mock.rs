//! In-memory backend for tests.
//!
//! Responses are fixed at construction; every call is recorded so tests can
//! assert on what the dialogue engine asked for and how often.

use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{json, Value};

use medibook_core::{
    AppointmentConfirmation, AppointmentRequest, AvailabilityRequest, Doctor, GeocodeResult,
    Location, NluResult, Slot,
};

use crate::error::BackendError;
use crate::BookingBackend;

/// One recorded backend call.
#[derive(Clone, Debug, PartialEq)]
pub enum BackendCall {
    Health,
    SearchDoctors {
        specialty: String,
        location: Location,
        radius_km: f64,
    },
    CheckAvailability(AvailabilityRequest),
    ScheduleAppointment(AppointmentRequest),
    Geocode(String),
    ParseMessage(String),
}

/// Scriptable [`BookingBackend`] that never touches the network.
pub struct MockBackend {
    healthy: bool,
    doctors: Vec<Doctor>,
    slots: Vec<Slot>,
    confirmation: AppointmentConfirmation,
    geocode: GeocodeResult,
    nlu: Option<NluResult>,
    failure: Option<(u16, String)>,
    calls: Mutex<Vec<BackendCall>>,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBackend {
    /// A healthy backend with no doctors, no slots and an empty NLU result.
    pub fn new() -> Self {
        Self {
            healthy: true,
            doctors: Vec::new(),
            slots: Vec::new(),
            confirmation: AppointmentConfirmation {
                appointment_id: Some("apt-1".to_string()),
                calendar_link: None,
            },
            geocode: GeocodeResult::default(),
            nlu: Some(NluResult::default()),
            failure: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_doctors(mut self, doctors: Vec<Doctor>) -> Self {
        self.doctors = doctors;
        self
    }

    pub fn with_slots(mut self, slots: Vec<Slot>) -> Self {
        self.slots = slots;
        self
    }

    pub fn with_confirmation(mut self, confirmation: AppointmentConfirmation) -> Self {
        self.confirmation = confirmation;
        self
    }

    pub fn with_geocode(mut self, result: GeocodeResult) -> Self {
        self.geocode = result;
        self
    }

    pub fn with_nlu(mut self, nlu: NluResult) -> Self {
        self.nlu = Some(nlu);
        self
    }

    /// Make the NLU endpoint fail on every call.
    pub fn without_nlu(mut self) -> Self {
        self.nlu = None;
        self
    }

    /// Make the health probe fail.
    pub fn unhealthy(mut self) -> Self {
        self.healthy = false;
        self
    }

    /// Make every action (not the probe or NLU) fail with an HTTP status.
    pub fn failing_with(mut self, status: u16, body: &str) -> Self {
        self.failure = Some((status, body.to_string()));
        self
    }

    /// All calls recorded so far, in order.
    pub fn calls(&self) -> Vec<BackendCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Booking requests received so far.
    pub fn schedule_requests(&self) -> Vec<AppointmentRequest> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                BackendCall::ScheduleAppointment(req) => Some(req),
                _ => None,
            })
            .collect()
    }

    /// Number of doctor searches received so far.
    pub fn search_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, BackendCall::SearchDoctors { .. }))
            .count()
    }

    /// Number of health probes received so far.
    pub fn health_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, BackendCall::Health))
            .count()
    }

    fn record(&self, call: BackendCall) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
    }

    fn check_failure(&self) -> Result<(), BackendError> {
        match &self.failure {
            Some((status, body)) => Err(BackendError::status(*status, body)),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl BookingBackend for MockBackend {
    fn base_url(&self) -> &str {
        "mock://backend"
    }

    async fn health_check(&self) -> bool {
        self.record(BackendCall::Health);
        self.healthy
    }

    async fn search_doctors(
        &self,
        specialty: &str,
        location: Location,
        radius_km: f64,
    ) -> Result<Value, BackendError> {
        self.record(BackendCall::SearchDoctors {
            specialty: specialty.to_string(),
            location,
            radius_km,
        });
        self.check_failure()?;
        Ok(json!({ "doctors": self.doctors }))
    }

    async fn check_availability(
        &self,
        request: &AvailabilityRequest,
    ) -> Result<Value, BackendError> {
        self.record(BackendCall::CheckAvailability(request.clone()));
        self.check_failure()?;
        Ok(json!({ "slots": self.slots }))
    }

    async fn schedule_appointment(
        &self,
        request: &AppointmentRequest,
    ) -> Result<Value, BackendError> {
        self.record(BackendCall::ScheduleAppointment(request.clone()));
        self.check_failure()?;
        serde_json::to_value(&self.confirmation).map_err(|e| BackendError::Decode(e.to_string()))
    }

    async fn geocode(&self, query: &str) -> Result<Value, BackendError> {
        self.record(BackendCall::Geocode(query.to_string()));
        self.check_failure()?;
        serde_json::to_value(&self.geocode).map_err(|e| BackendError::Decode(e.to_string()))
    }

    async fn parse_message(&self, message: &str) -> Result<NluResult, BackendError> {
        self.record(BackendCall::ParseMessage(message.to_string()));
        self.nlu.clone().ok_or(BackendError::Connection {
            url: self.base_url().to_string(),
        })
    }
}
