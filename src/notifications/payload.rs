//! Payload decoding helpers.
//!
//! Payloads arrive as raw text. Some publishers encode the JSON object a
//! second time, so a JSON string whose content is itself an object or array
//! is unwrapped once.

use serde_json::Value;

/// Placeholder for a missing id, status or user.
pub const UNKNOWN: &str = "desconhecido";

pub fn decode_payload(raw: &str) -> Result<Value, serde_json::Error> {
    let value: Value = serde_json::from_str(raw)?;
    if let Value::String(inner) = &value {
        if let Ok(nested @ (Value::Object(_) | Value::Array(_))) = serde_json::from_str::<Value>(inner) {
            return Ok(nested);
        }
    }
    Ok(value)
}

/// Render an id field that may be a number or a string.
pub fn id_field(payload: &Value, key: &str) -> Option<String> {
    match payload.get(key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Auction id: `leilao_id`, falling back to `id`.
pub fn auction_id(payload: &Value) -> String {
    id_field(payload, "leilao_id")
        .or_else(|| id_field(payload, "id"))
        .unwrap_or_else(|| UNKNOWN.to_string())
}

pub fn text_field(payload: &Value, key: &str) -> Option<String> {
    payload
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// `R$150.50` style amount; `R$?` when the field is missing or not numeric.
pub fn money_field(payload: &Value, key: &str) -> String {
    let amount = match payload.get(key) {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match amount.filter(|v| v.is_finite()) {
        Some(v) => format!("R${v:.2}"),
        None => "R$?".to_string(),
    }
}
