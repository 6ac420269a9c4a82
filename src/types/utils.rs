//! Shared utility functions for loosely-typed JSON handling.

use serde_json::Value;

/// Name of a JSON value's type as reported in contract issues.
#[inline]
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Extract string array from JSON value by key.
#[inline]
pub fn json_string_array(value: &Value, key: &str) -> Vec<String> {
    value
        .get(key)
        .and_then(|v| v.as_array())
        .map(|arr| {
            arr.iter()
                .filter_map(|s| s.as_str().map(String::from))
                .collect()
        })
        .unwrap_or_default()
}

/// Count whitespace-separated words.
#[inline]
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_type_name() {
        assert_eq!(json_type_name(&json!(null)), "null");
        assert_eq!(json_type_name(&json!([1])), "array");
        assert_eq!(json_type_name(&json!({"a": 1})), "object");
        assert_eq!(json_type_name(&json!(1.5)), "number");
    }

    #[test]
    fn test_json_string_array_skips_non_strings() {
        let value = json!({"items": ["a", 1, "b"]});
        assert_eq!(json_string_array(&value, "items"), vec!["a", "b"]);
        assert!(json_string_array(&value, "missing").is_empty());
    }

    #[test]
    fn test_word_count() {
        assert_eq!(word_count("  one two\nthree\t four "), 4);
        assert_eq!(word_count(""), 0);
    }
}
