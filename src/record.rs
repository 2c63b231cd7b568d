use serde::Serialize;
use serde_json::Value;

use crate::error::SerializationError;

/// One input event: field names mapped to JSON values, in insertion order.
pub type Record = serde_json::Map<String, Value>;

/// Convert any serializable value into a [`Record`].
///
/// Fails with [`SerializationError::NotAnObject`] when the value is a
/// scalar or array, and with [`SerializationError::Json`] when part of it
/// has no JSON representation (for example a map keyed by tuples).
pub fn to_record<T: Serialize + ?Sized>(value: &T) -> Result<Record, SerializationError> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        other => Err(SerializationError::NotAnObject(kind_of(&other))),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
