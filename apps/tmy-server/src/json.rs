use serde_json::{Map, Value as JsonValue};

/// Coerces provider metadata into a JSON object.
///
/// Objects pass through untouched; `null` becomes an empty object and any other
/// scalar or array is kept under a `value` key so the response shape stays stable.
pub fn normalize_meta(value: JsonValue) -> Map<String, JsonValue> {
    match value {
        JsonValue::Object(map) => map,
        JsonValue::Null => Map::new(),
        other => {
            let mut map = Map::new();
            map.insert("value".to_string(), other);
            map
        }
    }
}

/// Numeric view of a metadata or row value. Strings are trimmed and parsed;
/// anything non-finite is treated as missing.
pub fn finite_number(value: &JsonValue) -> Option<f64> {
    let number = match value {
        JsonValue::Number(n) => n.as_f64()?,
        JsonValue::String(s) => s.trim().parse::<f64>().ok()?,
        JsonValue::Bool(b) => f64::from(u8::from(*b)),
        _ => return None,
    };
    number.is_finite().then_some(number)
}
