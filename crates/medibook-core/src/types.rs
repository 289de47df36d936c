use serde::{Deserialize, Deserializer, Serialize};

// =============================================================================
// Geography
// =============================================================================

/// A point on the map, as supplied by the caller or returned by geocoding.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Location {
    #[serde(alias = "latitude")]
    pub lat: f64,
    #[serde(alias = "longitude")]
    pub lng: f64,
}

impl Location {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

// =============================================================================
// Backend entities
// =============================================================================

/// A doctor as returned by the search endpoint. Read-only to the dialogue.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Doctor {
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specialty: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    /// Distance from the search origin in kilometres.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,
}

/// A bookable time slot. Timestamps are kept as the backend sent them
/// (RFC 3339) so they can be echoed back verbatim when booking.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    pub start: String,
    pub end: String,
}

/// A requested time range. `end` may be absent when only a start is known.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,
}

impl TimeWindow {
    pub fn new(start: impl Into<String>, end: Option<String>) -> Self {
        Self {
            start: start.into(),
            end,
        }
    }
}

impl From<&Slot> for TimeWindow {
    fn from(slot: &Slot) -> Self {
        Self {
            start: slot.start.clone(),
            end: Some(slot.end.clone()),
        }
    }
}

// =============================================================================
// NLU
// =============================================================================

/// Output of the external natural-language-understanding endpoint.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NluResult {
    #[serde(default)]
    pub intent: Option<String>,
    #[serde(default)]
    pub entities: NluEntities,
}

impl NluResult {
    /// Whether the NLU classified the utterance as a doctor search.
    pub fn is_search(&self) -> bool {
        self.intent.as_deref() == Some("search_doctors")
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NluEntities {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specialty: Option<String>,
    #[serde(
        default,
        rename = "dateRange",
        skip_serializing_if = "Option::is_none"
    )]
    pub date_range: Option<TimeWindow>,
}

// =============================================================================
// Backend request / response bodies
// =============================================================================

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DoctorSearchResponse {
    #[serde(default)]
    pub doctors: Vec<Doctor>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityRequest {
    pub doctor_id: String,
    pub start_range_utc: String,
    pub end_range_utc: String,
    pub slot_minutes: u32,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AvailabilityResponse {
    #[serde(default)]
    pub slots: Vec<Slot>,
}

/// Patient contact details attached to a booking.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserContact {
    pub name: String,
    pub email: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentRequest {
    pub doctor_id: String,
    pub start_utc: String,
    pub user: UserContact,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_utc: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_minutes: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symptoms: Option<Vec<String>>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentConfirmation {
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub appointment_id: Option<String>,
    #[serde(default)]
    pub calendar_link: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GeocodeResult {
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lng: Option<f64>,
}

// =============================================================================
// Serde helpers
// =============================================================================

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    String(String),
    Int(i64),
    Float(f64),
}

impl From<StringOrNumber> for String {
    fn from(value: StringOrNumber) -> Self {
        match value {
            StringOrNumber::String(s) => s,
            StringOrNumber::Int(n) => n.to_string(),
            StringOrNumber::Float(n) => n.to_string(),
        }
    }
}

/// Backends disagree on whether ids are strings or integers.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(StringOrNumber::deserialize(deserializer)?.into())
}

fn opt_string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<StringOrNumber>::deserialize(deserializer)?.map(String::from))
}
