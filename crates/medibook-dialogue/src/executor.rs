//! Tool executor: validates a tool call against session state, calls the
//! backend, and renders the outcome.
//!
//! Arguments resolve in a fixed order, first non-empty wins: the explicit
//! tool argument, then what NLU derived this turn, then session state.
//! Every failure, from a missing field to a refused connection, comes back
//! as [`ToolResult::Failure`] with a sentence fit to show the user.

use std::sync::Arc;

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use serde_json::Value;

use medibook_backend::{BackendError, BookingBackend};
use medibook_core::config::MedibookConfig;
use medibook_core::{
    AppointmentConfirmation, AppointmentRequest, AvailabilityRequest, AvailabilityResponse,
    DoctorSearchResponse, GeocodeResult, UserContact,
};

use crate::render;
use crate::types::{
    AvailabilityArgs, GeocodeArgs, ScheduleArgs, SearchArgs, SessionState, ToolCall, ToolName,
    ToolResult, TurnContext,
};

pub const CONNECTION_FAILED: &str = "Could not connect to API server. Please ensure:\n\
    1. API server is running\n\
    2. API_BASE_URL is set correctly\n\
    3. BACKEND_API_KEY is set if required";
pub const SPECIALTY_REQUIRED: &str = "Specialty is required. Please specify what type of doctor you're looking for (e.g., cardiologist, dentist).";
pub const LOCATION_REQUIRED: &str =
    "Location is required. Please provide coordinates or enable location access.";
pub const SELECT_DOCTOR_FIRST: &str =
    "Please select a doctor first. I can show you available doctors if you'd like.";
pub const AVAILABILITY_TIME_REQUIRED: &str =
    "Please specify when you'd like to check availability (e.g., tomorrow at 9 AM).";
pub const BOOKING_DOCTOR_REQUIRED: &str = "Please specify which doctor you'd like to book with. I can show you available doctors if you'd like.";
pub const BOOKING_TIME_REQUIRED: &str =
    "Please specify when you'd like the appointment (e.g., tomorrow at 9 AM).";
pub const NAME_REQUIRED: &str = "Please provide your name.";
pub const EMAIL_REQUIRED: &str = "Please provide your email address.";
pub const QUERY_REQUIRED: &str = "Location query is required";

/// Defaults and policy the executor applies to every call.
#[derive(Debug, Clone)]
pub struct ExecutorSettings {
    pub default_radius_km: f64,
    pub slot_minutes: u32,
    pub appointment_minutes: u32,
    pub max_listed_results: usize,
    pub clear_slots_on_doctor_change: bool,
}

impl Default for ExecutorSettings {
    fn default() -> Self {
        Self::from_config(&MedibookConfig::default())
    }
}

impl ExecutorSettings {
    pub fn from_config(config: &MedibookConfig) -> Self {
        Self {
            default_radius_km: config.backend.default_radius_km,
            slot_minutes: config.backend.slot_minutes,
            appointment_minutes: config.backend.appointment_minutes,
            max_listed_results: config.dialogue.max_listed_results,
            clear_slots_on_doctor_change: config.dialogue.clear_slots_on_doctor_change,
        }
    }
}

#[derive(Debug, thiserror::Error)]
enum ToolFailure {
    #[error("{0}")]
    Invalid(String),
    #[error("Tool execution failed: {0}")]
    Backend(#[from] BackendError),
}

impl ToolFailure {
    fn invalid(message: &str) -> Self {
        ToolFailure::Invalid(message.to_string())
    }
}

/// Runs tool calls for one dialogue session.
pub struct ToolExecutor {
    backend: Arc<dyn BookingBackend>,
    settings: ExecutorSettings,
    probed: bool,
}

impl ToolExecutor {
    pub fn new(backend: Arc<dyn BookingBackend>, settings: ExecutorSettings) -> Self {
        Self {
            backend,
            settings,
            probed: false,
        }
    }

    /// Whether the one-shot connectivity probe has run.
    pub fn probed(&self) -> bool {
        self.probed
    }

    /// Execute one tool call, mutating session state on success.
    pub async fn execute(
        &mut self,
        call: &ToolCall,
        state: &mut SessionState,
        turn: &TurnContext,
    ) -> ToolResult {
        if !self.probed {
            self.probed = true;
            if !self.backend.health_check().await {
                tracing::warn!(
                    url = %self.backend.base_url(),
                    "Booking backend unreachable on first tool call"
                );
                return ToolResult::failure(CONNECTION_FAILED);
            }
        }

        let tool = call.name();
        let outcome = match call {
            ToolCall::SearchDoctors(args) => self.search_doctors(args, state, turn).await,
            ToolCall::CheckAvailability(args) => self.check_availability(args, state, turn).await,
            ToolCall::ScheduleAppointment(args) => {
                self.schedule_appointment(args, state, turn).await
            }
            ToolCall::Geocode(args) => self.geocode(args).await,
        };

        match outcome {
            Ok(result) => {
                tracing::info!(tool = %tool, "Tool executed");
                result
            }
            Err(failure) => {
                match &failure {
                    ToolFailure::Invalid(_) => {
                        tracing::debug!(tool = %tool, reason = %failure, "Tool call incomplete")
                    }
                    ToolFailure::Backend(e) => {
                        tracing::warn!(tool = %tool, error = %e, "Tool execution failed")
                    }
                }
                ToolResult::failure(failure.to_string())
            }
        }
    }

    async fn search_doctors(
        &self,
        args: &SearchArgs,
        state: &mut SessionState,
        turn: &TurnContext,
    ) -> Result<ToolResult, ToolFailure> {
        let specialty = first_non_empty([
            args.specialty.as_deref(),
            turn.nlu_specialty(),
            state.specialty.as_deref(),
        ])
        .ok_or_else(|| ToolFailure::invalid(SPECIALTY_REQUIRED))?;
        let location = args
            .near
            .or(turn.location)
            .ok_or_else(|| ToolFailure::invalid(LOCATION_REQUIRED))?;
        let radius_km = args
            .radius_km
            .filter(|r| *r > 0.0)
            .unwrap_or(self.settings.default_radius_km);

        let payload = self
            .backend
            .search_doctors(&specialty, location, radius_km)
            .await?;
        let parsed: DoctorSearchResponse = decode(&payload)?;

        tracing::info!(
            specialty = %specialty,
            results = parsed.doctors.len(),
            "Doctor search completed"
        );
        let summary =
            render::render_search(&parsed.doctors, &specialty, self.settings.max_listed_results);
        state.specialty = Some(specialty);
        state.last_search_results = Some(parsed.doctors);

        Ok(ToolResult::Success {
            tool: ToolName::SearchDoctors,
            result: payload,
            summary,
        })
    }

    async fn check_availability(
        &self,
        args: &AvailabilityArgs,
        state: &mut SessionState,
        turn: &TurnContext,
    ) -> Result<ToolResult, ToolFailure> {
        let doctor_id = first_non_empty([
            args.doctor_id.as_deref(),
            state.selected_doctor_id.as_deref(),
        ])
        .ok_or_else(|| ToolFailure::invalid(SELECT_DOCTOR_FIRST))?;
        let (start, end) = resolve_window(
            args.start_utc.as_deref(),
            args.end_utc.as_deref(),
            turn,
            state,
        )
        .ok_or_else(|| ToolFailure::invalid(AVAILABILITY_TIME_REQUIRED))?;
        let end = match end {
            Some(end) => end,
            None => next_day(&start)?,
        };

        let request = AvailabilityRequest {
            doctor_id: doctor_id.clone(),
            start_range_utc: start,
            end_range_utc: end,
            slot_minutes: args
                .slot_minutes
                .filter(|m| *m > 0)
                .unwrap_or(self.settings.slot_minutes),
        };
        let payload = self.backend.check_availability(&request).await?;
        let parsed: AvailabilityResponse = decode(&payload)?;

        tracing::info!(doctor_id = %doctor_id, slots = parsed.slots.len(), "Availability checked");
        let summary = render::render_availability(&parsed.slots, self.settings.max_listed_results);
        state.select_doctor(&doctor_id, self.settings.clear_slots_on_doctor_change);
        state.available_slots = if parsed.slots.is_empty() {
            None
        } else {
            Some(parsed.slots)
        };

        Ok(ToolResult::Success {
            tool: ToolName::CheckAvailability,
            result: payload,
            summary,
        })
    }

    async fn schedule_appointment(
        &self,
        args: &ScheduleArgs,
        state: &mut SessionState,
        turn: &TurnContext,
    ) -> Result<ToolResult, ToolFailure> {
        let user = args.user.clone().unwrap_or_default();

        let doctor_id = first_non_empty([
            args.doctor_id.as_deref(),
            state.selected_doctor_id.as_deref(),
        ])
        .ok_or_else(|| ToolFailure::invalid(BOOKING_DOCTOR_REQUIRED))?;
        let (start, _) = resolve_window(args.start_utc.as_deref(), None, turn, state)
            .ok_or_else(|| ToolFailure::invalid(BOOKING_TIME_REQUIRED))?;
        let name = first_non_empty([
            user.name.as_deref(),
            turn.extraction.name.as_deref(),
            state.user_name.as_deref(),
        ])
        .ok_or_else(|| ToolFailure::invalid(NAME_REQUIRED))?;
        let email = first_non_empty([
            user.email.as_deref(),
            turn.extraction.email.as_deref(),
            state.user_email.as_deref(),
        ])
        .ok_or_else(|| ToolFailure::invalid(EMAIL_REQUIRED))?;

        let symptoms = args
            .symptoms
            .clone()
            .filter(|s| !s.is_empty())
            .or_else(|| state.symptoms.clone().map(|s| vec![s]));
        let request = AppointmentRequest {
            doctor_id: doctor_id.clone(),
            start_utc: start,
            user: UserContact { name, email },
            end_utc: first_non_empty([args.end_utc.as_deref()]),
            duration_minutes: Some(
                args.duration_minutes
                    .filter(|m| *m > 0)
                    .unwrap_or(self.settings.appointment_minutes),
            ),
            reason: first_non_empty([args.reason.as_deref(), state.reason.as_deref()]),
            notes: first_non_empty([args.notes.as_deref()]),
            symptoms,
        };

        let payload = self.backend.schedule_appointment(&request).await?;
        let parsed: AppointmentConfirmation = decode(&payload)?;

        tracing::info!(
            doctor_id = %doctor_id,
            appointment_id = ?parsed.appointment_id,
            "Appointment scheduled"
        );
        state.available_slots = None;

        Ok(ToolResult::Success {
            tool: ToolName::ScheduleAppointment,
            summary: render::render_confirmation(&parsed),
            result: payload,
        })
    }

    async fn geocode(&self, args: &GeocodeArgs) -> Result<ToolResult, ToolFailure> {
        let query = first_non_empty([args.query.as_deref()])
            .ok_or_else(|| ToolFailure::invalid(QUERY_REQUIRED))?;

        let payload = self.backend.geocode(&query).await?;
        let parsed: GeocodeResult = decode(&payload)?;

        Ok(ToolResult::Success {
            tool: ToolName::Geocode,
            summary: render::render_geocode(&parsed, &query),
            result: payload,
        })
    }
}

// =============================================================================
// Resolution helpers
// =============================================================================

fn first_non_empty<'a, I>(candidates: I) -> Option<String>
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    candidates
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

/// Pick the start time and, where known, the end time.
///
/// The start comes from the explicit argument, the NLU date range, or the
/// preferred time in state, in that order. An explicit end always wins;
/// otherwise the end travels with whichever window supplied the start.
fn resolve_window(
    explicit_start: Option<&str>,
    explicit_end: Option<&str>,
    turn: &TurnContext,
    state: &SessionState,
) -> Option<(String, Option<String>)> {
    let explicit_end = first_non_empty([explicit_end]);

    if let Some(start) = first_non_empty([explicit_start]) {
        return Some((start, explicit_end));
    }
    let window = turn.nlu_window().or(state.preferred_time.as_ref())?;
    let start = first_non_empty([Some(window.start.as_str())])?;
    let end = explicit_end.or_else(|| first_non_empty([window.end.as_deref()]));
    Some((start, end))
}

fn next_day(start: &str) -> Result<String, ToolFailure> {
    let parsed = DateTime::parse_from_rfc3339(start).map_err(|_| {
        ToolFailure::Invalid(format!(
            "I couldn't understand the start time '{start}'. Please give a date and time like 2025-03-01T09:00:00Z."
        ))
    })?;
    Ok((parsed.with_timezone(&Utc) + Duration::days(1)).to_rfc3339_opts(SecondsFormat::AutoSi, true))
}

fn decode<T: DeserializeOwned>(payload: &Value) -> Result<T, BackendError> {
    T::deserialize(payload).map_err(|e| BackendError::Decode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use medibook_backend::{BackendCall, MockBackend};
    use medibook_core::{Doctor, Location, NluEntities, NluResult, Slot, TimeWindow};

    use crate::types::{Extraction, UserArgs};

    fn doctor(id: &str, name: &str) -> Doctor {
        Doctor {
            id: id.to_string(),
            name: name.to_string(),
            ..Doctor::default()
        }
    }

    fn slot(start: &str, end: &str) -> Slot {
        Slot {
            start: start.to_string(),
            end: end.to_string(),
        }
    }

    fn executor(backend: &Arc<MockBackend>) -> ToolExecutor {
        ToolExecutor::new(backend.clone(), ExecutorSettings::default())
    }

    fn with_location() -> TurnContext {
        TurnContext {
            location: Some(Location::new(24.7, 46.7)),
            ..TurnContext::default()
        }
    }

    fn with_nlu(specialty: Option<&str>, window: Option<TimeWindow>) -> TurnContext {
        TurnContext {
            nlu: Some(NluResult {
                intent: None,
                entities: NluEntities {
                    specialty: specialty.map(str::to_string),
                    date_range: window,
                },
            }),
            ..TurnContext::default()
        }
    }

    fn booking_state() -> SessionState {
        SessionState {
            selected_doctor_id: Some("d1".to_string()),
            user_name: Some("Ahmed Ali".to_string()),
            user_email: Some("ahmed@example.com".to_string()),
            preferred_time: Some(TimeWindow::new("2025-03-01T09:00:00Z", None)),
            ..SessionState::default()
        }
    }

    fn schedule(args: ScheduleArgs) -> ToolCall {
        ToolCall::ScheduleAppointment(args)
    }

    // -------------------------------------------------------------------------
    // Connectivity probe
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_probe_runs_once() {
        let backend = Arc::new(MockBackend::new());
        let mut exec = executor(&backend);
        let mut state = SessionState::default();
        let call = ToolCall::Geocode(GeocodeArgs {
            query: Some("Riyadh".to_string()),
        });

        assert!(!exec.probed());
        exec.execute(&call, &mut state, &TurnContext::default()).await;
        exec.execute(&call, &mut state, &TurnContext::default()).await;
        assert!(exec.probed());
        assert_eq!(backend.health_count(), 1);
    }

    #[tokio::test]
    async fn test_failed_probe_reports_connection_then_proceeds() {
        let backend = Arc::new(MockBackend::new().unhealthy());
        let mut exec = executor(&backend);
        let mut state = SessionState::default();
        let call = ToolCall::Geocode(GeocodeArgs {
            query: Some("Riyadh".to_string()),
        });

        let first = exec.execute(&call, &mut state, &TurnContext::default()).await;
        assert_eq!(first.error(), Some(CONNECTION_FAILED));
        // No geocode call was made behind the failed probe.
        assert_eq!(backend.calls(), vec![BackendCall::Health]);

        let second = exec.execute(&call, &mut state, &TurnContext::default()).await;
        assert!(second.is_success());
        assert_eq!(backend.health_count(), 1);
    }

    // -------------------------------------------------------------------------
    // search_doctors
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_search_requires_specialty() {
        let backend = Arc::new(MockBackend::new());
        let mut state = SessionState::default();
        let result = executor(&backend)
            .execute(&ToolCall::SearchDoctors(SearchArgs::default()), &mut state, &with_location())
            .await;
        assert_eq!(result.error(), Some(SPECIALTY_REQUIRED));
        assert_eq!(backend.search_count(), 0);
    }

    #[tokio::test]
    async fn test_search_requires_location() {
        let backend = Arc::new(MockBackend::new());
        let mut state = SessionState::default();
        let call = ToolCall::SearchDoctors(SearchArgs {
            specialty: Some("dentist".to_string()),
            ..SearchArgs::default()
        });
        let result = executor(&backend)
            .execute(&call, &mut state, &TurnContext::default())
            .await;
        assert_eq!(result.error(), Some(LOCATION_REQUIRED));
    }

    #[tokio::test]
    async fn test_search_success_updates_state() {
        let backend = Arc::new(
            MockBackend::new()
                .with_doctors(vec![doctor("d1", "Dr. Amina Said"), doctor("d2", "Dr. Omar Noor")]),
        );
        let mut state = SessionState::default();
        let call = ToolCall::SearchDoctors(SearchArgs {
            specialty: Some("cardiologist".to_string()),
            ..SearchArgs::default()
        });
        let result = executor(&backend)
            .execute(&call, &mut state, &with_location())
            .await;

        assert_eq!(result.tool(), Some(ToolName::SearchDoctors));
        let summary = result.summary().unwrap();
        assert!(summary.starts_with("I found 2 doctor(s) matching your search:"));
        assert!(summary.contains("Dr. Amina Said"));
        assert!(summary.contains("Dr. Omar Noor"));
        assert_eq!(state.specialty.as_deref(), Some("cardiologist"));
        assert_eq!(state.last_search_results.as_ref().unwrap().len(), 2);

        match &backend.calls()[1] {
            BackendCall::SearchDoctors {
                specialty,
                location,
                radius_km,
            } => {
                assert_eq!(specialty, "cardiologist");
                assert_eq!(*location, Location::new(24.7, 46.7));
                assert_eq!(*radius_km, 10.0);
            }
            other => panic!("unexpected call: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_search_explicit_near_and_radius() {
        let backend = Arc::new(MockBackend::new());
        let mut state = SessionState::default();
        let call = ToolCall::SearchDoctors(SearchArgs {
            specialty: Some("dentist".to_string()),
            near: Some(Location::new(21.5, 39.2)),
            radius_km: Some(25.0),
        });
        executor(&backend)
            .execute(&call, &mut state, &with_location())
            .await;
        assert!(backend.calls().contains(&BackendCall::SearchDoctors {
            specialty: "dentist".to_string(),
            location: Location::new(21.5, 39.2),
            radius_km: 25.0,
        }));
    }

    #[tokio::test]
    async fn test_search_specialty_resolution_order() {
        let backend = Arc::new(MockBackend::new());
        let mut exec = executor(&backend);
        let mut state = SessionState {
            specialty: Some("dermatology".to_string()),
            ..SessionState::default()
        };
        let mut turn = with_nlu(Some("cardiology"), None);
        turn.location = Some(Location::new(0.0, 0.0));

        exec.execute(&ToolCall::SearchDoctors(SearchArgs::default()), &mut state, &turn)
            .await;
        assert_eq!(state.specialty.as_deref(), Some("cardiology"));

        let mut turn = with_location();
        turn.nlu = None;
        exec.execute(&ToolCall::SearchDoctors(SearchArgs::default()), &mut state, &turn)
            .await;
        let specialties: Vec<String> = backend
            .calls()
            .into_iter()
            .filter_map(|c| match c {
                BackendCall::SearchDoctors { specialty, .. } => Some(specialty),
                _ => None,
            })
            .collect();
        assert_eq!(specialties, vec!["cardiology", "cardiology"]);
    }

    #[tokio::test]
    async fn test_search_zero_results_sets_empty_list() {
        let backend = Arc::new(MockBackend::new());
        let mut state = SessionState::default();
        let call = ToolCall::SearchDoctors(SearchArgs {
            specialty: Some("cardiology".to_string()),
            ..SearchArgs::default()
        });
        let result = executor(&backend)
            .execute(&call, &mut state, &with_location())
            .await;
        assert!(result.summary().unwrap().contains("couldn't find"));
        assert_eq!(state.last_search_results, Some(vec![]));
    }

    #[tokio::test]
    async fn test_backend_failure_is_reported() {
        let backend = Arc::new(MockBackend::new().failing_with(500, "boom"));
        let mut state = SessionState::default();
        let call = ToolCall::SearchDoctors(SearchArgs {
            specialty: Some("cardiology".to_string()),
            ..SearchArgs::default()
        });
        let result = executor(&backend)
            .execute(&call, &mut state, &with_location())
            .await;
        assert_eq!(
            result.error(),
            Some("Tool execution failed: API request failed with status 500: boom")
        );
        assert!(state.last_search_results.is_none());
    }

    // -------------------------------------------------------------------------
    // check_availability
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_availability_requires_doctor() {
        let backend = Arc::new(MockBackend::new());
        let mut state = SessionState::default();
        let result = executor(&backend)
            .execute(
                &ToolCall::CheckAvailability(AvailabilityArgs::default()),
                &mut state,
                &TurnContext::default(),
            )
            .await;
        assert_eq!(result.error(), Some(SELECT_DOCTOR_FIRST));
    }

    #[tokio::test]
    async fn test_availability_requires_time() {
        let backend = Arc::new(MockBackend::new());
        let mut state = SessionState {
            selected_doctor_id: Some("d1".to_string()),
            ..SessionState::default()
        };
        let result = executor(&backend)
            .execute(
                &ToolCall::CheckAvailability(AvailabilityArgs::default()),
                &mut state,
                &TurnContext::default(),
            )
            .await;
        assert_eq!(result.error(), Some(AVAILABILITY_TIME_REQUIRED));
    }

    #[tokio::test]
    async fn test_availability_end_defaults_to_next_day() {
        let backend = Arc::new(MockBackend::new());
        let mut state = SessionState {
            selected_doctor_id: Some("d1".to_string()),
            ..SessionState::default()
        };
        let call = ToolCall::CheckAvailability(AvailabilityArgs {
            start_utc: Some("2025-03-01T09:00:00Z".to_string()),
            ..AvailabilityArgs::default()
        });
        executor(&backend)
            .execute(&call, &mut state, &TurnContext::default())
            .await;
        assert!(backend
            .calls()
            .contains(&BackendCall::CheckAvailability(AvailabilityRequest {
                doctor_id: "d1".to_string(),
                start_range_utc: "2025-03-01T09:00:00Z".to_string(),
                end_range_utc: "2025-03-02T09:00:00Z".to_string(),
                slot_minutes: 30,
            })));
    }

    #[tokio::test]
    async fn test_availability_uses_nlu_window() {
        let backend = Arc::new(MockBackend::new());
        let mut state = SessionState {
            selected_doctor_id: Some("d1".to_string()),
            preferred_time: Some(TimeWindow::new("2030-01-01T00:00:00Z", None)),
            ..SessionState::default()
        };
        let turn = with_nlu(
            None,
            Some(TimeWindow::new(
                "2025-03-01T08:00:00Z",
                Some("2025-03-01T12:00:00Z".to_string()),
            )),
        );
        executor(&backend)
            .execute(
                &ToolCall::CheckAvailability(AvailabilityArgs::default()),
                &mut state,
                &turn,
            )
            .await;
        let request = backend
            .calls()
            .into_iter()
            .find_map(|c| match c {
                BackendCall::CheckAvailability(req) => Some(req),
                _ => None,
            })
            .unwrap();
        assert_eq!(request.start_range_utc, "2025-03-01T08:00:00Z");
        assert_eq!(request.end_range_utc, "2025-03-01T12:00:00Z");
    }

    #[tokio::test]
    async fn test_availability_unparseable_start() {
        let backend = Arc::new(MockBackend::new());
        let mut state = SessionState {
            selected_doctor_id: Some("d1".to_string()),
            ..SessionState::default()
        };
        let call = ToolCall::CheckAvailability(AvailabilityArgs {
            start_utc: Some("tomorrow morning".to_string()),
            ..AvailabilityArgs::default()
        });
        let result = executor(&backend)
            .execute(&call, &mut state, &TurnContext::default())
            .await;
        assert!(result.error().unwrap().contains("tomorrow morning"));
    }

    #[tokio::test]
    async fn test_availability_success_stores_slots_and_doctor() {
        let backend = Arc::new(MockBackend::new().with_slots(vec![slot(
            "2025-03-01T09:00:00Z",
            "2025-03-01T09:30:00Z",
        )]));
        let mut state = SessionState {
            selected_doctor_id: Some("d1".to_string()),
            ..SessionState::default()
        };
        let call = ToolCall::CheckAvailability(AvailabilityArgs {
            doctor_id: Some("d2".to_string()),
            start_utc: Some("2025-03-01T00:00:00Z".to_string()),
            end_utc: Some("2025-03-01T23:59:59Z".to_string()),
            slot_minutes: Some(15),
        });
        let result = executor(&backend)
            .execute(&call, &mut state, &TurnContext::default())
            .await;

        assert!(result
            .summary()
            .unwrap()
            .contains("1. Saturday, March 01 at 09:00 AM - 09:30 AM"));
        assert_eq!(state.selected_doctor_id.as_deref(), Some("d2"));
        assert_eq!(state.available_slots.as_ref().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_availability_zero_slots_clears() {
        let backend = Arc::new(MockBackend::new());
        let mut state = SessionState {
            selected_doctor_id: Some("d1".to_string()),
            available_slots: Some(vec![slot("a", "b")]),
            ..SessionState::default()
        };
        let call = ToolCall::CheckAvailability(AvailabilityArgs {
            start_utc: Some("2025-03-01T00:00:00Z".to_string()),
            ..AvailabilityArgs::default()
        });
        let result = executor(&backend)
            .execute(&call, &mut state, &TurnContext::default())
            .await;
        assert!(result.summary().unwrap().starts_with("No available slots"));
        assert!(state.available_slots.is_none());
    }

    // -------------------------------------------------------------------------
    // schedule_appointment
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_schedule_missing_fields_reports_doctor_first() {
        let backend = Arc::new(MockBackend::new());
        let mut state = SessionState {
            preferred_time: Some(TimeWindow::new("2025-03-01T09:00:00Z", None)),
            ..SessionState::default()
        };
        let result = executor(&backend)
            .execute(&schedule(ScheduleArgs::default()), &mut state, &TurnContext::default())
            .await;
        assert_eq!(result.error(), Some(BOOKING_DOCTOR_REQUIRED));
    }

    #[tokio::test]
    async fn test_schedule_field_order() {
        let backend = Arc::new(MockBackend::new());
        let mut exec = executor(&backend);
        let turn = TurnContext::default();

        let mut state = booking_state();
        state.preferred_time = None;
        state.user_name = None;
        let result = exec.execute(&schedule(ScheduleArgs::default()), &mut state, &turn).await;
        assert_eq!(result.error(), Some(BOOKING_TIME_REQUIRED));

        let mut state = booking_state();
        state.user_name = None;
        state.user_email = None;
        let result = exec.execute(&schedule(ScheduleArgs::default()), &mut state, &turn).await;
        assert_eq!(result.error(), Some(NAME_REQUIRED));

        let mut state = booking_state();
        state.user_email = None;
        let result = exec.execute(&schedule(ScheduleArgs::default()), &mut state, &turn).await;
        assert_eq!(result.error(), Some(EMAIL_REQUIRED));

        assert!(backend.schedule_requests().is_empty());
    }

    #[tokio::test]
    async fn test_schedule_explicit_start_beats_nlu_and_state() {
        let backend = Arc::new(MockBackend::new());
        let mut state = booking_state();
        let turn = with_nlu(None, Some(TimeWindow::new("2025-03-01T11:00:00Z", None)));
        let call = schedule(ScheduleArgs {
            start_utc: Some("2025-03-01T10:00:00Z".to_string()),
            ..ScheduleArgs::default()
        });
        executor(&backend).execute(&call, &mut state, &turn).await;
        assert_eq!(backend.schedule_requests()[0].start_utc, "2025-03-01T10:00:00Z");
    }

    #[tokio::test]
    async fn test_schedule_nlu_start_beats_state() {
        let backend = Arc::new(MockBackend::new());
        let mut state = booking_state();
        let turn = with_nlu(None, Some(TimeWindow::new("2025-03-01T11:00:00Z", None)));
        executor(&backend)
            .execute(&schedule(ScheduleArgs::default()), &mut state, &turn)
            .await;
        assert_eq!(backend.schedule_requests()[0].start_utc, "2025-03-01T11:00:00Z");
    }

    #[tokio::test]
    async fn test_schedule_explicit_user_beats_state() {
        let backend = Arc::new(MockBackend::new());
        let mut state = booking_state();
        let turn = TurnContext {
            extraction: Extraction {
                email: Some("turn@example.com".to_string()),
                ..Extraction::default()
            },
            ..TurnContext::default()
        };
        let call = schedule(ScheduleArgs {
            user: Some(UserArgs {
                name: Some("Sara".to_string()),
                email: None,
            }),
            ..ScheduleArgs::default()
        });
        executor(&backend).execute(&call, &mut state, &turn).await;
        let request = &backend.schedule_requests()[0];
        assert_eq!(request.user.name, "Sara");
        assert_eq!(request.user.email, "turn@example.com");
    }

    #[tokio::test]
    async fn test_schedule_request_defaults_from_state() {
        let backend = Arc::new(MockBackend::new());
        let mut state = booking_state();
        state.symptoms = Some("chest pain".to_string());
        state.reason = Some("Patient reports: chest pain".to_string());
        executor(&backend)
            .execute(&schedule(ScheduleArgs::default()), &mut state, &TurnContext::default())
            .await;
        let request = &backend.schedule_requests()[0];
        assert_eq!(request.doctor_id, "d1");
        assert_eq!(request.duration_minutes, Some(30));
        assert_eq!(request.reason.as_deref(), Some("Patient reports: chest pain"));
        assert_eq!(request.symptoms, Some(vec!["chest pain".to_string()]));
        assert!(request.end_utc.is_none());
        assert!(request.notes.is_none());
    }

    #[tokio::test]
    async fn test_schedule_success_clears_slots() {
        let backend = Arc::new(MockBackend::new().with_confirmation(AppointmentConfirmation {
            appointment_id: Some("apt-77".to_string()),
            calendar_link: Some("https://cal.example/77".to_string()),
        }));
        let mut state = booking_state();
        state.available_slots = Some(vec![slot("a", "b")]);
        let result = executor(&backend)
            .execute(&schedule(ScheduleArgs::default()), &mut state, &TurnContext::default())
            .await;
        assert_eq!(result.tool(), Some(ToolName::ScheduleAppointment));
        let summary = result.summary().unwrap();
        assert!(summary.starts_with("✅ Appointment scheduled successfully!"));
        assert!(summary.contains("📋 Appointment ID: apt-77"));
        assert!(summary.contains("📅 Calendar link: https://cal.example/77"));
        assert!(state.available_slots.is_none());
    }

    // -------------------------------------------------------------------------
    // geocode
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_geocode_requires_query() {
        let backend = Arc::new(MockBackend::new());
        let mut state = SessionState::default();
        let result = executor(&backend)
            .execute(
                &ToolCall::Geocode(GeocodeArgs {
                    query: Some("  ".to_string()),
                }),
                &mut state,
                &TurnContext::default(),
            )
            .await;
        assert_eq!(result.error(), Some(QUERY_REQUIRED));
    }

    #[tokio::test]
    async fn test_geocode_success() {
        let backend = Arc::new(MockBackend::new().with_geocode(GeocodeResult {
            display_name: Some("Riyadh, Saudi Arabia".to_string()),
            lat: Some(24.7),
            lng: Some(46.7),
        }));
        let mut state = SessionState::default();
        let result = executor(&backend)
            .execute(
                &ToolCall::Geocode(GeocodeArgs {
                    query: Some("Riyadh".to_string()),
                }),
                &mut state,
                &TurnContext::default(),
            )
            .await;
        assert_eq!(result.summary(), Some("Found location: Riyadh, Saudi Arabia"));
        assert_eq!(state, SessionState::default());
    }

    // -------------------------------------------------------------------------
    // Helpers
    // -------------------------------------------------------------------------

    #[test]
    fn test_first_non_empty() {
        assert_eq!(
            first_non_empty([None, Some("  "), Some(" b "), Some("c")]),
            Some("b".to_string())
        );
        assert_eq!(first_non_empty([None, Some("")]), None);
    }

    #[test]
    fn test_next_day_keeps_fraction_and_normalises_offset() {
        assert_eq!(next_day("2025-03-01T09:00:00Z").unwrap(), "2025-03-02T09:00:00Z");
        assert_eq!(
            next_day("2025-03-01T09:00:00+03:00").unwrap(),
            "2025-03-02T06:00:00Z"
        );
        assert_eq!(
            next_day("2025-03-01T09:00:00.250Z").unwrap(),
            "2025-03-02T09:00:00.250Z"
        );
    }
}
