//! JSON parser for the published source documents.

use anyhow::{Result, bail};
use serde_json::Value;

/// Parses a source document into its list of records.
///
/// Accepts a top-level array, or an object holding the array under
/// `records` as the daily case distribution is published.
///
/// # Errors
///
/// Returns an error if the text is not JSON or holds no record list.
pub fn parse_records(text: &str) -> Result<Vec<Value>> {
    match serde_json::from_str(text)? {
        Value::Array(records) => Ok(records),
        Value::Object(mut object) => match object.remove("records") {
            Some(Value::Array(records)) => Ok(records),
            _ => bail!("document object has no \"records\" array"),
        },
        other => bail!("expected a list of records, found {}", kind(&other)),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
