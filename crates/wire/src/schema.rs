//! Argument validation against a tool's declared input schema.
//!
//! Collaborator output is semi-trusted: arguments are checked against the
//! `{type: object, properties, required}` subset of JSON Schema before a call
//! is authorized or spawned. A mismatch is a protocol error, not a crash.

use crate::error::{Error, Result};
use serde_json::Value;

/// Validate `arguments` against `schema`.
///
/// Unknown schema keywords are ignored; an empty or non-object schema accepts
/// anything, matching how tools with free-form input declare themselves.
pub fn validate_arguments(schema: &Value, arguments: &Value) -> Result<()> {
    let Some(schema) = schema.as_object() else {
        return Ok(());
    };

    if schema.get("type").and_then(Value::as_str) == Some("object") && !arguments.is_object() {
        return Err(Error::SchemaMismatch(format!(
            "expected object arguments, got {}",
            type_name(arguments)
        )));
    }

    let args = arguments.as_object();

    if let Some(required) = schema.get("required").and_then(Value::as_array) {
        for key in required.iter().filter_map(Value::as_str) {
            if args.is_none_or(|a| !a.contains_key(key)) {
                return Err(Error::SchemaMismatch(format!(
                    "missing required argument '{key}'"
                )));
            }
        }
    }

    if let (Some(props), Some(args)) = (schema.get("properties").and_then(Value::as_object), args) {
        for (key, value) in args {
            let Some(expected) = props
                .get(key)
                .and_then(|p| p.get("type"))
                .and_then(Value::as_str)
            else {
                continue;
            };
            if !matches_type(value, expected) {
                return Err(Error::SchemaMismatch(format!(
                    "argument '{key}' should be {expected}, got {}",
                    type_name(value)
                )));
            }
        }
    }

    Ok(())
}

fn matches_type(value: &Value, expected: &str) -> bool {
    match expected {
        "string" => value.is_string(),
        "number" => value.is_number(),
        "integer" => value.is_i64() || value.is_u64(),
        "boolean" => value.is_boolean(),
        "array" => value.is_array(),
        "object" => value.is_object(),
        "null" => value.is_null(),
        _ => true,
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sum_schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "a": {"type": "number"},
                "b": {"type": "number"}
            },
            "required": ["a", "b"]
        })
    }

    #[test]
    fn accepts_valid_arguments() {
        assert!(validate_arguments(&sum_schema(), &json!({"a": 1, "b": 2.5})).is_ok());
    }

    #[test]
    fn rejects_missing_required() {
        let err = validate_arguments(&sum_schema(), &json!({"a": 1})).unwrap_err();
        assert!(err.to_string().contains("'b'"));
    }

    #[test]
    fn rejects_wrong_type() {
        let err = validate_arguments(&sum_schema(), &json!({"a": 1, "b": "two"})).unwrap_err();
        assert!(err.to_string().contains("should be number"));
    }

    #[test]
    fn rejects_non_object_arguments() {
        assert!(validate_arguments(&sum_schema(), &json!([1, 2])).is_err());
    }

    #[test]
    fn empty_schema_accepts_anything() {
        assert!(validate_arguments(&json!({}), &json!("free text")).is_ok());
        assert!(validate_arguments(&Value::Null, &json!({"x": 1})).is_ok());
    }

    #[test]
    fn extra_arguments_are_allowed() {
        assert!(validate_arguments(&sum_schema(), &json!({"a": 1, "b": 2, "c": 3})).is_ok());
    }
}
