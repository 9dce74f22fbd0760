// Models module
// Request/response shapes plus the pure aggregation logic behind them

pub mod auth;
pub mod briefing;
pub mod catalog;
pub mod comment;
pub mod cutoff;
pub mod point;
pub mod post;
pub mod profile;
pub mod ranking;
pub mod upload;
pub mod verification;

use serde::{Deserialize, Deserializer};
use serde_json::Value;
use uuid::Uuid;

/// Fallback author shown when a name is missing or too short.
pub const ANONYMOUS_AUTHOR: &str = "익명";

/// Accepts only JSON strings; any other type deserializes as `None`.
/// Clients send loosely typed bodies, so a number in a text field is treated
/// as a missing field instead of rejecting the whole request.
pub fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(value)) => Some(value),
        _ => None,
    })
}

/// Trimmed value, or an empty string when absent.
pub fn trimmed(value: &Option<String>) -> String {
    value.as_deref().map(str::trim).unwrap_or_default().to_string()
}

/// Trimmed and cut to at most `max_chars` characters.
pub fn normalize_text(value: &Option<String>, max_chars: usize) -> String {
    trimmed(value).chars().take(max_chars).collect()
}

/// Trimmed, `None` when empty.
pub fn non_empty(value: &Option<String>) -> Option<String> {
    Some(trimmed(value)).filter(|value| !value.is_empty())
}

pub fn char_len(value: &str) -> usize {
    value.chars().count()
}

/// Numbers and numeric strings; everything else (including non-finite) is `None`.
pub fn finite_number(value: Option<&Value>) -> Option<f64> {
    let number = match value? {
        Value::Number(number) => number.as_f64()?,
        Value::String(text) => text.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    number.is_finite().then_some(number)
}

pub fn parse_uuid(value: &str) -> Option<Uuid> {
    Uuid::parse_str(value.trim()).ok()
}

/// Author names shorter than two characters are shown as anonymous.
pub fn resolve_author_name(raw: &Option<String>) -> String {
    let name = trimmed(raw);
    if char_len(&name) >= 2 {
        name
    } else {
        ANONYMOUS_AUTHOR.to_string()
    }
}

/// Author column as read from the store; missing or blank names read as anonymous.
pub fn stored_author_name(stored: Option<String>) -> String {
    match stored {
        Some(name) if !name.trim().is_empty() => name,
        _ => ANONYMOUS_AUTHOR.to_string(),
    }
}

/// View counter as read from the store; rows written before the default existed hold NULL.
pub fn stored_view_count(stored: Option<i32>) -> i32 {
    stored.unwrap_or(0).max(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Deserialize, Default)]
    struct Sample {
        #[serde(default, deserialize_with = "lenient_string")]
        name: Option<String>,
    }

    #[test]
    fn test_lenient_string() {
        let sample: Sample = serde_json::from_value(json!({ "name": "합격" })).unwrap();
        assert_eq!(sample.name.as_deref(), Some("합격"));

        let sample: Sample = serde_json::from_value(json!({ "name": 42 })).unwrap();
        assert!(sample.name.is_none());

        let sample: Sample = serde_json::from_value(json!({})).unwrap();
        assert!(sample.name.is_none());
    }

    #[test]
    fn test_normalize_text_counts_characters() {
        let value = Some("  가나다라마바사  ".to_string());
        assert_eq!(normalize_text(&value, 3), "가나다");
        assert_eq!(normalize_text(&None, 3), "");
    }

    #[test]
    fn test_finite_number() {
        assert_eq!(finite_number(Some(&json!(3))), Some(3.0));
        assert_eq!(finite_number(Some(&json!("2024"))), Some(2024.0));
        assert_eq!(finite_number(Some(&json!("abc"))), None);
        assert_eq!(finite_number(Some(&json!(null))), None);
        assert_eq!(finite_number(None), None);
    }

    #[test]
    fn test_resolve_author_name() {
        assert_eq!(resolve_author_name(&Some(" 김 ".to_string())), ANONYMOUS_AUTHOR);
        assert_eq!(resolve_author_name(&None), ANONYMOUS_AUTHOR);
        assert_eq!(resolve_author_name(&Some("편입러".to_string())), "편입러");
    }

    #[test]
    fn test_parse_uuid() {
        assert!(parse_uuid(" 123e4567-e89b-12d3-a456-426614174000 ").is_some());
        assert!(parse_uuid("not-a-uuid").is_none());
    }

    #[test]
    fn test_null_columns_read_as_defaults() {
        assert_eq!(stored_author_name(None), ANONYMOUS_AUTHOR);
        assert_eq!(stored_author_name(Some("   ".to_string())), ANONYMOUS_AUTHOR);
        assert_eq!(stored_author_name(Some("편입러".to_string())), "편입러");

        assert_eq!(stored_view_count(None), 0);
        assert_eq!(stored_view_count(Some(-3)), 0);
        assert_eq!(stored_view_count(Some(42)), 42);
    }
}
