//! Doctor name matching against the last search results.

use regex::Regex;
use std::sync::LazyLock;

use medibook_core::Doctor;

static TITLE_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^dr(?:\.\s*|\s+)").expect("Invalid title regex"));

/// Find the doctor an utterance refers to.
///
/// Doctors are tried in list order and the first hit wins, not the best
/// one. A doctor matches when the utterance and the full name contain one
/// another, or when the first name or the remaining name appears in the
/// utterance. A leading "Dr"/"Dr." title is ignored.
pub fn match_doctor<'a>(utterance: &str, doctors: &'a [Doctor]) -> Option<&'a str> {
    let message = utterance.trim().to_lowercase();
    if message.is_empty() {
        return None;
    }

    doctors
        .iter()
        .find(|doctor| name_matches(&message, &doctor.name))
        .map(|doctor| doctor.id.as_str())
}

fn name_matches(message: &str, name: &str) -> bool {
    let full = name.trim().to_lowercase();
    if full.is_empty() {
        return false;
    }
    if message.contains(&full) || contains_words(&full, message) {
        return true;
    }

    let bare = TITLE_PREFIX.replace(&full, "");
    let bare = bare.trim();
    if bare.is_empty() {
        return false;
    }
    if message.contains(bare) || contains_words(bare, message) {
        return true;
    }

    let mut parts = bare.split_whitespace();
    let first = parts.next().unwrap_or_default();
    let rest = parts.collect::<Vec<_>>().join(" ");

    (!first.is_empty() && message.contains(first)) || (!rest.is_empty() && message.contains(&rest))
}

/// Whether `needle`'s words appear as a contiguous run of `haystack`'s words.
fn contains_words(haystack: &str, needle: &str) -> bool {
    let words = |s: &str| -> Vec<String> {
        s.split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .map(str::to_string)
            .collect()
    };
    let hay = words(haystack);
    let needle = words(needle);
    !needle.is_empty() && hay.windows(needle.len()).any(|run| run == needle.as_slice())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doctor(id: &str, name: &str) -> Doctor {
        Doctor {
            id: id.to_string(),
            name: name.to_string(),
            ..Doctor::default()
        }
    }

    #[test]
    fn test_first_match_wins() {
        let doctors = vec![doctor("d1", "Dr. Amina Said"), doctor("d2", "Dr. Amina Noor")];
        assert_eq!(match_doctor("book with Amina", &doctors), Some("d1"));
    }

    #[test]
    fn test_last_name_match() {
        let doctors = vec![doctor("d1", "Dr. Amina Said"), doctor("d2", "Dr. Amina Noor")];
        assert_eq!(match_doctor("I'd like Noor", &doctors), Some("d2"));
    }

    #[test]
    fn test_full_name_with_title() {
        let doctors = vec![doctor("d1", "Dr Leila Benali")];
        assert_eq!(match_doctor("book for Dr Leila Benali", &doctors), Some("d1"));
    }

    #[test]
    fn test_utterance_contained_in_name() {
        let doctors = vec![doctor("d1", "Dr. Leila Benali")];
        assert_eq!(match_doctor("leila benali", &doctors), Some("d1"));
    }

    #[test]
    fn test_short_reply_inside_a_name_is_not_a_match() {
        let doctors = vec![doctor("d1", "Dr. Brooke Hale"), doctor("d2", "Dr. Yesenia Cruz")];
        assert_eq!(match_doctor("ok", &doctors), None);
        assert_eq!(match_doctor("yes", &doctors), None);
        assert_eq!(match_doctor("Brooke", &doctors), Some("d1"));
        assert_eq!(match_doctor("brooke hale", &doctors), Some("d1"));
    }

    #[test]
    fn test_contains_words_needs_whole_words() {
        assert!(contains_words("dr. brooke hale", "brooke hale"));
        assert!(contains_words("dr. brooke hale", "dr. brooke"));
        assert!(!contains_words("dr. brooke hale", "ok"));
        assert!(!contains_words("dr. brooke hale", "hale brooke"));
        assert!(!contains_words("dr. brooke hale", "  "));
    }

    #[test]
    fn test_case_insensitive() {
        let doctors = vec![doctor("d1", "DR. OMAR FAROUK")];
        assert_eq!(match_doctor("farouk please", &doctors), Some("d1"));
    }

    #[test]
    fn test_no_match() {
        let doctors = vec![doctor("d1", "Dr. Amina Said")];
        assert_eq!(match_doctor("what time is it", &doctors), None);
    }

    #[test]
    fn test_title_prefix_needs_separator() {
        assert_eq!(TITLE_PREFIX.replace("drew carter", ""), "drew carter");
        assert_eq!(TITLE_PREFIX.replace("dr. drew carter", ""), "drew carter");
        assert_eq!(TITLE_PREFIX.replace("dr.drew carter", ""), "drew carter");
        assert_eq!(TITLE_PREFIX.replace("dr drew carter", ""), "drew carter");

        let doctors = vec![doctor("d1", "Drew Carter")];
        assert_eq!(match_doctor("book with drew", &doctors), Some("d1"));
    }

    #[test]
    fn test_blank_names_skipped() {
        let doctors = vec![doctor("d0", "   "), doctor("d00", "Dr."), doctor("d1", "Dr. Amina Said")];
        assert_eq!(match_doctor("Amina", &doctors), Some("d1"));
    }

    #[test]
    fn test_empty_utterance() {
        let doctors = vec![doctor("d1", "Dr. Amina Said")];
        assert_eq!(match_doctor("   ", &doctors), None);
    }

    #[test]
    fn test_empty_list() {
        assert_eq!(match_doctor("Amina", &[]), None);
    }
}
