use serde_json::Value;

/// True when the payload's `secret` field equals the configured secret.
/// A missing or non-string field never matches.
pub fn secret_matches(payload: &Value, expected: &str) -> bool {
    let Some(given) = payload.get("secret").and_then(Value::as_str) else {
        return false;
    };
    constant_time_eq(given.as_bytes(), expected.as_bytes())
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
