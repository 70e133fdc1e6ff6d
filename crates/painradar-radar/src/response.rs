//! Pulling structured payloads out of free-text model responses.
//!
//! Models wrap their answers in prose and code fences, so neither helper
//! expects the whole response to be valid JSON. Both return `None` rather than
//! an error; callers decide the fallback.

use std::sync::LazyLock;

use regex::Regex;

static SCORE_ARRAY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[[\d\s,]+\]").expect("valid score array regex"));

/// First bracketed list of non-negative integers, each clamped to `0..=100`.
///
/// Bracketed spans that are not comma-separated lists are skipped. Returns
/// `None` when no list exists or none holds a number.
#[must_use]
pub fn extract_score_array(text: &str) -> Option<Vec<u8>> {
    SCORE_ARRAY
        .find_iter(text)
        .find_map(|found| parse_score_list(found.as_str()))
}

fn parse_score_list(bracketed: &str) -> Option<Vec<u8>> {
    let inner = bracketed.trim_start_matches('[').trim_end_matches(']');
    let mut scores = Vec::new();
    for part in inner.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        // Whitespace-separated digits ("90 20") are not a list.
        let value: u64 = part.parse().ok()?;
        scores.push(u8::try_from(value.min(100)).unwrap_or(100));
    }
    if scores.is_empty() {
        None
    } else {
        Some(scores)
    }
}

/// First balanced `{...}` span that parses as a JSON object.
///
/// Each `{` is tried in order and parsing stops at the brace that closes it,
/// so prose or stray braces after the object are ignored.
#[must_use]
pub fn extract_json_object(text: &str) -> Option<serde_json::Value> {
    text.match_indices('{').find_map(|(start, _)| {
        let mut values =
            serde_json::Deserializer::from_str(&text[start..]).into_iter::<serde_json::Value>();
        match values.next() {
            Some(Ok(value)) if value.is_object() => Some(value),
            _ => None,
        }
    })
}
