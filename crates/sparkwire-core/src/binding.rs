//! Parameter normalization before submission.

use crate::value::Value;

/// Normalize one bound parameter for the RPC transports.
///
/// Numbers and booleans are widened to `Double` and timestamps become
/// millisecond-precision text. Everything else passes through unchanged.
pub fn normalize_binding(value: Value) -> Value {
    if let Value::Timestamp(_) = value {
        return match value.timestamp_millis_text() {
            Some(text) => Value::Text(text),
            None => value,
        };
    }
    if let Value::Bool(b) = value {
        return Value::Double(if b { 1.0 } else { 0.0 });
    }
    if value.is_numeric() {
        if let Some(v) = value.as_f64() {
            return Value::Double(v);
        }
    }
    value
}

/// Normalize every binding in order.
pub fn normalize_bindings(values: Vec<Value>) -> Vec<Value> {
    values.into_iter().map(normalize_binding).collect()
}
