//! Slot-selection parsing ("book slot two", "the 3rd one", "first").

use regex::Regex;
use std::sync::LazyLock;

use medibook_core::Slot;

/// Number words in scan order: cardinals, then ordinals. The first word
/// present in the utterance wins.
const NUMBER_WORDS: [(&str, u32); 21] = [
    ("zero", 0),
    ("one", 1),
    ("two", 2),
    ("three", 3),
    ("four", 4),
    ("five", 5),
    ("six", 6),
    ("seven", 7),
    ("eight", 8),
    ("nine", 9),
    ("ten", 10),
    ("first", 1),
    ("second", 2),
    ("third", 3),
    ("fourth", 4),
    ("fifth", 5),
    ("sixth", 6),
    ("seventh", 7),
    ("eighth", 8),
    ("ninth", 9),
    ("tenth", 10),
];

static DIGITS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d+)\b").expect("Invalid digit regex"));

/// Parse a 1-based slot number from an utterance.
///
/// Number words are matched as whole words; failing that, the first
/// standalone run of digits is used. Out-of-range values are not filtered
/// here.
pub fn parse_slot_selection(text: &str) -> Option<u32> {
    let lower = text.to_lowercase();
    let words: Vec<&str> = lower
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();

    NUMBER_WORDS
        .iter()
        .find(|(word, _)| words.contains(word))
        .map(|(_, n)| *n)
        .or_else(|| {
            DIGITS
                .captures(&lower)
                .and_then(|caps| caps[1].parse::<u32>().ok())
        })
}

/// Resolve an utterance to one of the offered slots.
///
/// Returns the 1-based index and the slot when the parsed number is in range.
pub fn select_slot<'a>(text: &str, slots: &'a [Slot]) -> Option<(u32, &'a Slot)> {
    let n = parse_slot_selection(text)?;
    let index = usize::try_from(n).ok()?.checked_sub(1)?;
    slots.get(index).map(|slot| (n, slot))
}
