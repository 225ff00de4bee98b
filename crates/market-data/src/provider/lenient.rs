//! Lenient readers for exchange payloads.
//!
//! NSE and BSE report the same field as a number on one endpoint and as a
//! formatted string (`"72,431.55"`, `"-"`) on another.

use serde_json::Value;

/// Read a JSON number or numeric string. Thousands separators are ignored;
/// blanks and placeholders like `"-"` read as `None`.
pub(crate) fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let cleaned: String = s.chars().filter(|c| *c != ',').collect();
            cleaned.trim().parse::<f64>().ok()
        }
        _ => None,
    }
    .filter(|v| v.is_finite())
}

/// Read a non-negative count.
pub(crate) fn as_u32(value: &Value) -> Option<u32> {
    as_f64(value)
        .filter(|v| *v >= 0.0 && *v <= u32::MAX as f64)
        .map(|v| v.round() as u32)
}

pub(crate) fn as_u64(value: &Value) -> Option<u64> {
    as_f64(value).filter(|v| *v >= 0.0).map(|v| v.round() as u64)
}

/// Look up `key` on an object, case-insensitively.
pub(crate) fn field<'a>(object: &'a Value, key: &str) -> Option<&'a Value> {
    let map = object.as_object()?;
    map.get(key).or_else(|| {
        map.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v)
    })
}
