//! Regex entity extraction from raw utterances.
//!
//! Pulls the patient's name, e-mail address and a free-text symptom
//! description out of a message. Pure functions; absent fields stay `None`.

use regex::Regex;
use std::sync::LazyLock;

use crate::types::Extraction;

// =============================================================================
// Compiled patterns
// =============================================================================

/// Name introductions, in priority order. The lead-in is case-insensitive;
/// the name itself must be one or more capitalised words.
static NAME_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    const NAME: &str = r"([A-Z][a-z]+(?:\s+[A-Z][a-z]+)*)";
    [
        r"(?i:\bmy\s+name\s+is)\s+",
        r"(?i:\bi['’]?m)\s+",
        r"(?i:\bi\s+am)\s+",
        r"(?i:\bname\s+is)\s+",
        r"(?i:\bcall\s+me)\s+",
    ]
    .iter()
    .map(|lead| Regex::new(&format!("{lead}{NAME}")).expect("Invalid name regex"))
    .collect()
});

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b").expect("Invalid email regex")
});

/// Symptom phrasings, in priority order. Each capture stops at the first
/// clause boundary: a period, "and", "my", or the end of the text.
static SYMPTOM_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    const BOUNDARY: &str = r"(?:\.|\band\b|\bmy\b|$)";
    [
        r"(?i)\bi\s+feel\s+(.+?)",
        r"(?i)\bi\s+have\s+(.+?)",
        r"(?i)\bsymptoms?(?:\s+(?:are|is)\s+|\s*:\s*)(.+?)",
        r"(?i)\bpain\s+(?:in|at)\s+(.+?)",
    ]
    .iter()
    .map(|p| Regex::new(&format!("{p}{BOUNDARY}")).expect("Invalid symptom regex"))
    .collect()
});

const REASON_PREFIX: &str = "Patient reports: ";

// =============================================================================
// Extraction
// =============================================================================

/// Extract every recognised entity from an utterance.
pub fn extract_entities(text: &str) -> Extraction {
    let symptoms = extract_symptoms(text);
    let reason = symptoms.as_ref().map(|s| format!("{REASON_PREFIX}{s}"));
    Extraction {
        name: extract_name(text),
        email: extract_email(text),
        symptoms,
        reason,
    }
}

/// First name introduced in the text, trying each phrasing in order.
pub fn extract_name(text: &str) -> Option<String> {
    NAME_PATTERNS
        .iter()
        .find_map(|re| re.captures(text))
        .map(|caps| collapse_whitespace(&caps[1]))
}

/// First e-mail address in the text.
pub fn extract_email(text: &str) -> Option<String> {
    EMAIL_PATTERN.find(text).map(|m| m.as_str().to_string())
}

/// First symptom description in the text, whitespace-normalised.
pub fn extract_symptoms(text: &str) -> Option<String> {
    SYMPTOM_PATTERNS.iter().find_map(|re| {
        re.captures(text)
            .map(|caps| collapse_whitespace(&caps[1]))
            .filter(|s| !s.is_empty())
    })
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
