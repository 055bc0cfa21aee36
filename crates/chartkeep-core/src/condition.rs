//! Dependency condition paths
//!
//! A condition is a two-segment dot path (`redis.enabled`) evaluated against
//! the composed values of the parent chart. Missing paths include the
//! dependency; present values are coerced with a best-effort bool parse.

use serde_json::Value as JsonValue;

use crate::error::{CoreError, Result};

/// A parsed two-segment condition path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    /// Top-level key, usually the dependency name
    pub section: String,
    /// Key inside `section` holding the flag
    pub key: String,
}

impl Condition {
    /// Parse a raw condition string
    ///
    /// Returns `Ok(None)` when no condition is set. Anything other than
    /// exactly two non-empty segments is rejected.
    pub fn parse(raw: &str) -> Result<Option<Self>> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Ok(None);
        }

        let segments: Vec<&str> = raw.split('.').collect();
        match segments.as_slice() {
            [section, key] if !section.is_empty() && !key.is_empty() => Ok(Some(Self {
                section: (*section).to_string(),
                key: (*key).to_string(),
            })),
            _ => Err(CoreError::InvalidCondition {
                condition: raw.to_string(),
                segments: segments.len(),
            }),
        }
    }

    /// Evaluate against composed values
    pub fn evaluate(&self, values: &JsonValue) -> bool {
        let Some(JsonValue::Object(section)) = values.get(&self.section) else {
            return true;
        };

        match section.get(&self.key) {
            None | Some(JsonValue::Null) => true,
            Some(JsonValue::Bool(b)) => *b,
            Some(JsonValue::String(s)) => parse_bool(s).unwrap_or(false),
            Some(JsonValue::Number(n)) => match n.as_f64() {
                Some(f) if f == 1.0 => true,
                _ => false,
            },
            Some(_) => false,
        }
    }
}

impl std::fmt::Display for Condition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.section, self.key)
    }
}

/// Parse the boolean spellings accepted in chart values
pub fn parse_bool(s: &str) -> Option<bool> {
    match s {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}
