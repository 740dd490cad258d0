//! Result extraction from Langflow run responses.
//!
//! A flow run answers with a nested document; the text we want lives at
//! `outputs[0].outputs[0].results.text.text`.

use crate::models::ResultValue;
use serde_json::Value;

/// Human-readable form of the result path, used in log messages.
pub const RESULT_PATH: &str = "outputs[0].outputs[0].results.text.text";

/// Walk the response down to the result field.
pub fn result_field(response: &Value) -> Option<&Value> {
    response
        .get("outputs")?
        .get(0)?
        .get("outputs")?
        .get(0)?
        .get("results")?
        .get("text")?
        .get("text")
}

/// Extract the result value, substituting `placeholder` when any path
/// segment is missing or the field is null.
pub fn extract_result_value(response: &Value, placeholder: &str) -> ResultValue {
    match result_field(response) {
        None | Some(Value::Null) => ResultValue::Placeholder(placeholder.to_string()),
        Some(Value::String(s)) => ResultValue::Text(s.clone()),
        Some(Value::Number(n)) => match n.as_f64() {
            Some(f) => ResultValue::Number(f),
            None => ResultValue::Text(n.to_string()),
        },
        Some(Value::Bool(b)) => ResultValue::Text(b.to_string()),
        Some(other) => ResultValue::Object(other.clone()),
    }
}

/// Count characters of the trimmed input.
pub fn character_count(text: &str) -> usize {
    text.trim().chars().count()
}
