//! Schema checking for structured LLM output.
//!
//! Model responses are parsed to `serde_json::Value` first, checked against
//! the target type's declared shape, and only then decoded into the typed
//! struct. The check collects *every* violation as a field path plus the rule
//! it broke, so an exhausted retry can report the full diagnostic instead of
//! the first failing field.

use std::fmt;

use serde::de::DeserializeOwned;
use serde_json::Value;

/// One violated rule at one field path, e.g. `required_skills: expected an array`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldViolation {
    pub path: String,
    pub rule: String,
}

impl FieldViolation {
    pub fn new(path: impl Into<String>, rule: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            rule: rule.into(),
        }
    }
}

impl fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.rule)
    }
}

/// Renders a violation list as `"path: rule, path: rule"` for error messages.
pub fn join_violations(violations: &[FieldViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// A type the LLM can be asked to produce as structured JSON output.
///
/// `schema_check` must be side-effect free and must apply the same rules on
/// the live path and the offline fallback path.
pub trait ResponseSchema: DeserializeOwned {
    /// Returns every schema violation found in `value`; empty means valid.
    fn schema_check(value: &Value) -> Vec<FieldViolation>;
}

/// Requires a non-empty string at `path` (top-level field).
pub fn require_string(value: &Value, path: &str, out: &mut Vec<FieldViolation>) {
    match value.get(path) {
        None | Some(Value::Null) => out.push(FieldViolation::new(path, "required field is missing")),
        Some(Value::String(s)) if s.trim().is_empty() => {
            out.push(FieldViolation::new(path, "must not be empty"));
        }
        Some(Value::String(_)) => {}
        Some(_) => out.push(FieldViolation::new(path, "expected a string")),
    }
}

/// Requires an array of strings at `path`. Element violations carry indexed paths.
pub fn require_string_array(value: &Value, path: &str, out: &mut Vec<FieldViolation>) {
    match value.get(path) {
        None | Some(Value::Null) => out.push(FieldViolation::new(path, "required field is missing")),
        Some(Value::Array(items)) => {
            for (i, item) in items.iter().enumerate() {
                if !item.is_string() {
                    out.push(FieldViolation::new(
                        format!("{path}[{i}]"),
                        "expected a string",
                    ));
                }
            }
        }
        Some(_) => out.push(FieldViolation::new(path, "expected an array")),
    }
}

/// Requires a number at `path` within the closed interval `[min, max]`.
pub fn require_number_in_range(
    value: &Value,
    path: &str,
    min: f64,
    max: f64,
    out: &mut Vec<FieldViolation>,
) {
    match value.get(path).and_then(Value::as_f64) {
        None => match value.get(path) {
            None | Some(Value::Null) => {
                out.push(FieldViolation::new(path, "required field is missing"));
            }
            Some(_) => out.push(FieldViolation::new(path, "expected a number")),
        },
        Some(n) if n < min || n > max => {
            out.push(FieldViolation::new(
                path,
                format!("must be between {min} and {max}"),
            ));
        }
        Some(_) => {}
    }
}
