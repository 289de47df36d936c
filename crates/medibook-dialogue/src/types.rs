//! Dialogue types: conversation turns, session state, tool calls and results.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use medibook_core::{Doctor, Location, NluResult, Slot, TimeWindow};

// =============================================================================
// Conversation history
// =============================================================================

/// Speaker of a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::System => write!(f, "system"),
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// One entry of the conversation history, in chat-completion shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

// =============================================================================
// Session state
// =============================================================================

/// Slot-filling state accumulated across the turns of one conversation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    pub specialty: Option<String>,
    pub user_name: Option<String>,
    pub user_email: Option<String>,
    pub preferred_time: Option<TimeWindow>,
    pub last_search_results: Option<Vec<Doctor>>,
    pub selected_doctor_id: Option<String>,
    pub symptoms: Option<String>,
    pub reason: Option<String>,
    pub available_slots: Option<Vec<Slot>>,
}

impl SessionState {
    /// Select a doctor, returning whether the selection changed.
    ///
    /// Fetched slots belong to the previous doctor, so they are dropped on a
    /// change when `clear_slots` is set.
    pub fn select_doctor(&mut self, doctor_id: &str, clear_slots: bool) -> bool {
        if self.selected_doctor_id.as_deref() == Some(doctor_id) {
            return false;
        }
        self.selected_doctor_id = Some(doctor_id.to_string());
        if clear_slots && self.available_slots.take().is_some() {
            tracing::debug!("Cleared slots fetched for previous doctor");
        }
        true
    }

    /// Search results held from the last search, if any are non-empty.
    pub fn search_results(&self) -> Option<&[Doctor]> {
        self.last_search_results
            .as_deref()
            .filter(|doctors| !doctors.is_empty())
    }

    /// Slots held from the last availability check, if any are non-empty.
    pub fn slots(&self) -> Option<&[Slot]> {
        self.available_slots
            .as_deref()
            .filter(|slots| !slots.is_empty())
    }

    /// Whether a booking could be placed without asking anything else.
    pub fn ready_to_book(&self) -> bool {
        self.selected_doctor_id.is_some()
            && self.user_name.is_some()
            && self.user_email.is_some()
            && self.preferred_time.is_some()
    }
}

/// Fields pulled from one utterance by the entity extractor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    pub name: Option<String>,
    pub email: Option<String>,
    pub symptoms: Option<String>,
    pub reason: Option<String>,
}

/// Per-turn inputs the tool executor may draw on when resolving arguments.
#[derive(Debug, Clone, Default)]
pub struct TurnContext {
    pub nlu: Option<NluResult>,
    pub extraction: Extraction,
    pub location: Option<Location>,
}

impl TurnContext {
    pub fn nlu_specialty(&self) -> Option<&str> {
        self.nlu
            .as_ref()
            .and_then(|n| n.entities.specialty.as_deref())
            .filter(|s| !s.trim().is_empty())
    }

    pub fn nlu_window(&self) -> Option<&TimeWindow> {
        self.nlu
            .as_ref()
            .and_then(|n| n.entities.date_range.as_ref())
            .filter(|w| !w.start.trim().is_empty())
    }
}

// =============================================================================
// Tool calls
// =============================================================================

/// Backend actions the language model may request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolName {
    SearchDoctors,
    CheckAvailability,
    ScheduleAppointment,
    Geocode,
}

impl fmt::Display for ToolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ToolName::SearchDoctors => write!(f, "search_doctors"),
            ToolName::CheckAvailability => write!(f, "check_availability"),
            ToolName::ScheduleAppointment => write!(f, "schedule_appointment"),
            ToolName::Geocode => write!(f, "geocode"),
        }
    }
}

impl std::str::FromStr for ToolName {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "search_doctors" => Ok(ToolName::SearchDoctors),
            "check_availability" => Ok(ToolName::CheckAvailability),
            "schedule_appointment" => Ok(ToolName::ScheduleAppointment),
            "geocode" => Ok(ToolName::Geocode),
            _ => Err(format!("Unknown tool: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SearchArgs {
    pub specialty: Option<String>,
    pub near: Option<Location>,
    pub radius_km: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AvailabilityArgs {
    pub doctor_id: Option<String>,
    pub start_utc: Option<String>,
    pub end_utc: Option<String>,
    pub slot_minutes: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct UserArgs {
    pub name: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ScheduleArgs {
    pub doctor_id: Option<String>,
    pub start_utc: Option<String>,
    pub end_utc: Option<String>,
    pub user: Option<UserArgs>,
    pub duration_minutes: Option<u32>,
    pub reason: Option<String>,
    pub notes: Option<String>,
    pub symptoms: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct GeocodeArgs {
    #[serde(alias = "q")]
    pub query: Option<String>,
}

/// A typed backend action request.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolCall {
    SearchDoctors(SearchArgs),
    CheckAvailability(AvailabilityArgs),
    ScheduleAppointment(ScheduleArgs),
    Geocode(GeocodeArgs),
}

impl ToolCall {
    pub fn name(&self) -> ToolName {
        match self {
            ToolCall::SearchDoctors(_) => ToolName::SearchDoctors,
            ToolCall::CheckAvailability(_) => ToolName::CheckAvailability,
            ToolCall::ScheduleAppointment(_) => ToolName::ScheduleAppointment,
            ToolCall::Geocode(_) => ToolName::Geocode,
        }
    }

    /// Build a call from an untyped name and argument object.
    ///
    /// A `null` argument object reads as empty. Arguments of the wrong shape
    /// are rejected rather than partially applied.
    pub fn from_parts(name: &str, arguments: Value) -> Result<Self, String> {
        let tool: ToolName = name.parse()?;
        let arguments = if arguments.is_null() {
            Value::Object(Default::default())
        } else {
            arguments
        };
        let decode_err = |e: serde_json::Error| format!("Invalid arguments for {}: {}", tool, e);
        let call = match tool {
            ToolName::SearchDoctors => {
                ToolCall::SearchDoctors(serde_json::from_value(arguments).map_err(decode_err)?)
            }
            ToolName::CheckAvailability => {
                ToolCall::CheckAvailability(serde_json::from_value(arguments).map_err(decode_err)?)
            }
            ToolName::ScheduleAppointment => ToolCall::ScheduleAppointment(
                serde_json::from_value(arguments).map_err(decode_err)?,
            ),
            ToolName::Geocode => {
                ToolCall::Geocode(serde_json::from_value(arguments).map_err(decode_err)?)
            }
        };
        Ok(call)
    }
}

// =============================================================================
// Results
// =============================================================================

/// Outcome of one tool execution: a rendered summary plus the raw backend
/// payload, or a user-facing error. Never both.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ToolResult {
    Success {
        tool: ToolName,
        result: Value,
        summary: String,
    },
    Failure {
        error: String,
    },
}

impl ToolResult {
    pub fn failure(error: impl Into<String>) -> Self {
        ToolResult::Failure {
            error: error.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ToolResult::Success { .. })
    }

    pub fn tool(&self) -> Option<ToolName> {
        match self {
            ToolResult::Success { tool, .. } => Some(*tool),
            ToolResult::Failure { .. } => None,
        }
    }

    pub fn summary(&self) -> Option<&str> {
        match self {
            ToolResult::Success { summary, .. } => Some(summary),
            ToolResult::Failure { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            ToolResult::Success { .. } => None,
            ToolResult::Failure { error } => Some(error),
        }
    }
}

/// What one call to `process_message` hands back to the transport.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TurnReply {
    pub reply: String,
    pub tool_result: Option<ToolResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
