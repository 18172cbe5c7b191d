use base64::prelude::*;
use chrono::SecondsFormat;
use serde_json::{Map, Number, json};

use super::{Document, Value};

impl Value {
    /// Converts to JSON, writing extended types in their `{"$sigil": ...}` form.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::MinValue => json!({ "$minValue": 1 }),
            Value::Null => serde_json::Value::Null,
            Value::Int32(n) => json!(n),
            Value::Int64(n) => json!(n),
            Value::Double(n) => Number::from_f64(*n)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::Decimal(d) => json!({ "$numberDecimal": d.as_str() }),
            Value::String(s) => json!(s.as_str()),
            Value::Document(doc) => serde_json::Value::Object(
                doc.iter()
                    .map(|(k, v)| (k.to_string(), v.to_json()))
                    .collect::<Map<_, _>>(),
            ),
            Value::Array(array) => serde_json::Value::Array(array.iter().map(Value::to_json).collect()),
            Value::Binary(bytes) => json!({ "$binary": BASE64_STANDARD.encode(bytes) }),
            Value::ObjectId(oid) => json!({ "$oid": oid.to_string() }),
            Value::Guid(guid) => json!({ "$guid": guid.to_string() }),
            Value::Boolean(b) => json!(b),
            Value::DateTime(dt) => json!({ "$date": dt.to_rfc3339_opts(SecondsFormat::Millis, true) }),
            Value::MaxValue => json!({ "$maxValue": 1 }),
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        Value::from(&value)
    }
}

impl From<&serde_json::Value> for Value {
    fn from(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Boolean(*b),
            serde_json::Value::Number(n) => match (n.as_i64(), n.as_f64()) {
                (Some(i), _) => i32::try_from(i).map(Value::Int32).unwrap_or(Value::Int64(i)),
                (None, Some(f)) => Value::Double(f),
                (None, None) => Value::Null,
            },
            serde_json::Value::String(s) => Value::from(s.as_str()),
            serde_json::Value::Array(items) => items.iter().map(Value::from).collect::<Vec<_>>().into(),
            serde_json::Value::Object(map) => {
                if map.len() == 1
                    && let Some((key, payload)) = map.iter().next()
                    && let Some(value) = sigil_payload(payload).and_then(|p| Value::from_sigil(key, &p))
                {
                    return value;
                }

                Value::Document(map.iter().map(|(k, v)| (k.as_str(), Value::from(v))).collect::<Document>())
            }
        }
    }
}

fn sigil_payload(payload: &serde_json::Value) -> Option<String> {
    match payload {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
