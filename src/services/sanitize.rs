//! Form data sanitization.
//!
//! Submitted form fields are untrusted and arbitrarily shaped. This module
//! normalizes them into a bounded JSON object before persistence. It is a
//! pure function: no I/O, no clock, no randomness.

use serde_json::{Map, Value};

/// Maximum length of a single field value, in characters.
const MAX_VALUE_CHARS: usize = 10_000;

/// Sanitize raw form fields into a JSON object of strings.
///
/// Per value: strip NUL bytes, trim leading/trailing whitespace, truncate
/// to 10,000 characters. Keys pass through unchanged. When the same key is
/// submitted more than once the last occurrence wins.
///
/// The empty-payload check happens at the orchestrator, on the raw field
/// list, before this runs.
pub fn sanitize_form_data(fields: Vec<(String, String)>) -> Map<String, Value> {
    let mut sanitized = Map::new();
    for (key, value) in fields {
        let value = value.replace('\0', "");
        let value: String = value.trim().chars().take(MAX_VALUE_CHARS).collect();
        sanitized.insert(key, Value::String(value));
    }
    sanitized
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sanitize_one(value: &str) -> String {
        let map = sanitize_form_data(vec![("field".to_string(), value.to_string())]);
        map["field"].as_str().unwrap().to_string()
    }

    #[test]
    fn strips_nul_bytes() {
        assert_eq!(sanitize_one("he\0llo\0"), "hello");
    }

    #[test]
    fn trims_whitespace() {
        assert_eq!(sanitize_one("  padded value \n"), "padded value");
    }

    #[test]
    fn truncates_to_ten_thousand_chars() {
        let long = "x".repeat(MAX_VALUE_CHARS + 500);
        assert_eq!(sanitize_one(&long).chars().count(), MAX_VALUE_CHARS);
    }

    #[test]
    fn truncation_counts_chars_not_bytes() {
        let long = "é".repeat(MAX_VALUE_CHARS + 1);
        assert_eq!(sanitize_one(&long).chars().count(), MAX_VALUE_CHARS);
    }

    #[test]
    fn nul_stripped_before_trim() {
        // A NUL between spaces must not protect the whitespace from trimming.
        assert_eq!(sanitize_one(" \0 value \0 "), "value");
    }

    #[test]
    fn keys_pass_through_and_last_duplicate_wins() {
        let map = sanitize_form_data(vec![
            ("Weird Key!".to_string(), "first".to_string()),
            ("Weird Key!".to_string(), "second".to_string()),
        ]);
        assert_eq!(map.len(), 1);
        assert_eq!(map["Weird Key!"], Value::String("second".to_string()));
    }

    #[test]
    fn empty_input_yields_empty_map() {
        assert!(sanitize_form_data(Vec::new()).is_empty());
    }
}
