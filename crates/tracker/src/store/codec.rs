//! Conversion between plain JSON and Firestore typed values.
//!
//! Firestore's REST API wraps every value in a single-key object naming its
//! type (`{"integerValue": "42"}`). Documents are decoded into plain
//! `serde_json` values so the rest of the tracker never sees the wrapping.

use ops_cost_core::Document;
use serde_json::{Map, Number, Value};

/// Decode a typed value into plain JSON.
///
/// Unknown value kinds decode as `null`.
#[must_use]
pub fn decode_value(typed: &Value) -> Value {
    let Some((kind, inner)) = typed.as_object().and_then(|obj| obj.iter().next()) else {
        return Value::Null;
    };

    match kind.as_str() {
        "stringValue" | "timestampValue" | "referenceValue" | "bytesValue" => match inner {
            Value::String(s) => Value::String(s.clone()),
            _ => Value::Null,
        },
        "integerValue" => decode_integer(inner),
        "doubleValue" => match inner {
            Value::Number(n) => Value::Number(n.clone()),
            // NaN and the infinities arrive as strings and have no JSON form.
            _ => Value::Null,
        },
        "booleanValue" => match inner {
            Value::Bool(b) => Value::Bool(*b),
            _ => Value::Null,
        },
        "geoPointValue" => inner.clone(),
        "mapValue" => {
            let fields = inner
                .get("fields")
                .and_then(Value::as_object)
                .cloned()
                .unwrap_or_default();
            Value::Object(decode_fields(&fields))
        }
        "arrayValue" => {
            let values = inner
                .get("values")
                .and_then(Value::as_array)
                .map(|values| values.iter().map(decode_value).collect())
                .unwrap_or_default();
            Value::Array(values)
        }
        _ => Value::Null,
    }
}

/// Integers travel as decimal strings to survive 64-bit range.
fn decode_integer(inner: &Value) -> Value {
    match inner {
        Value::String(s) => s
            .parse::<i64>()
            .map(|i| Value::Number(i.into()))
            .or_else(|_| s.parse::<u64>().map(|u| Value::Number(u.into())))
            .unwrap_or_else(|_| Value::String(s.clone())),
        Value::Number(n) => Value::Number(n.clone()),
        _ => Value::Null,
    }
}

/// Decode a `fields` map into a document.
#[must_use]
pub fn decode_fields(fields: &Map<String, Value>) -> Document {
    fields
        .iter()
        .map(|(name, typed)| (name.clone(), decode_value(typed)))
        .collect()
}

/// Encode plain JSON as a typed value.
///
/// Integral numbers become `integerValue`, everything else numeric becomes
/// `doubleValue`.
#[must_use]
pub fn encode_value(value: &Value) -> Value {
    let mut typed = Map::new();
    match value {
        Value::Null => {
            typed.insert("nullValue".to_string(), Value::Null);
        }
        Value::Bool(b) => {
            typed.insert("booleanValue".to_string(), Value::Bool(*b));
        }
        Value::Number(n) => {
            if n.is_i64() || n.is_u64() {
                typed.insert("integerValue".to_string(), Value::String(n.to_string()));
            } else {
                let double = n
                    .as_f64()
                    .and_then(Number::from_f64)
                    .map_or(Value::Null, Value::Number);
                typed.insert("doubleValue".to_string(), double);
            }
        }
        Value::String(s) => {
            typed.insert("stringValue".to_string(), Value::String(s.clone()));
        }
        Value::Array(values) => {
            let mut array = Map::new();
            array.insert(
                "values".to_string(),
                Value::Array(values.iter().map(encode_value).collect()),
            );
            typed.insert("arrayValue".to_string(), Value::Object(array));
        }
        Value::Object(map) => {
            let mut inner = Map::new();
            inner.insert("fields".to_string(), Value::Object(encode_fields(map)));
            typed.insert("mapValue".to_string(), Value::Object(inner));
        }
    }
    Value::Object(typed)
}

/// Encode a document as a `fields` map.
#[must_use]
pub fn encode_fields(document: &Document) -> Map<String, Value> {
    document
        .iter()
        .map(|(name, value)| (name.clone(), encode_value(value)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_scalar_kinds() {
        assert_eq!(decode_value(&json!({"stringValue": "OPS-1"})), json!("OPS-1"));
        assert_eq!(decode_value(&json!({"integerValue": "12500"})), json!(12500));
        assert_eq!(decode_value(&json!({"integerValue": "-3"})), json!(-3));
        assert_eq!(decode_value(&json!({"doubleValue": 33.3})), json!(33.3));
        assert_eq!(decode_value(&json!({"doubleValue": "NaN"})), Value::Null);
        assert_eq!(decode_value(&json!({"booleanValue": true})), json!(true));
        assert_eq!(decode_value(&json!({"nullValue": null})), Value::Null);
        assert_eq!(
            decode_value(&json!({"timestampValue": "2026-10-18T09:15:00Z"})),
            json!("2026-10-18T09:15:00Z")
        );
        assert_eq!(
            decode_value(&json!({"referenceValue": "projects/p/databases/(default)/documents/ops_no/1"})),
            json!("projects/p/databases/(default)/documents/ops_no/1")
        );
        assert_eq!(decode_value(&json!({"bytesValue": "AAEC"})), json!("AAEC"));
        assert_eq!(
            decode_value(&json!({"geoPointValue": {"latitude": 28.6, "longitude": 77.2}})),
            json!({"latitude": 28.6, "longitude": 77.2})
        );
        assert_eq!(decode_value(&json!({"mysteryValue": 1})), Value::Null);
    }

    #[test]
    fn test_decode_nested_kinds() {
        let typed = json!({
            "mapValue": {"fields": {
                "sizes": {"arrayValue": {"values": [
                    {"integerValue": "5"},
                    {"stringValue": "8x10"}
                ]}},
                "empty": {"arrayValue": {}},
                "inner": {"mapValue": {}}
            }}
        });

        assert_eq!(
            decode_value(&typed),
            json!({"sizes": [5, "8x10"], "empty": [], "inner": {}})
        );
    }

    #[test]
    fn test_encode_numbers() {
        assert_eq!(encode_value(&json!(200)), json!({"integerValue": "200"}));
        assert_eq!(encode_value(&json!(-50)), json!({"integerValue": "-50"}));
        assert_eq!(encode_value(&json!(33.3)), json!({"doubleValue": 33.3}));
    }

    #[test]
    fn test_encode_fields_document() {
        let document = json!({
            "opsNo": "OPS-1",
            "totalCost": 200,
            "marginPercent": 33.3,
            "note": null,
            "flags": [true],
            "extra": {"a": "b"}
        });
        let fields = encode_fields(document.as_object().unwrap_or(&Map::new()));

        assert_eq!(
            Value::Object(fields.clone()),
            json!({
                "opsNo": {"stringValue": "OPS-1"},
                "totalCost": {"integerValue": "200"},
                "marginPercent": {"doubleValue": 33.3},
                "note": {"nullValue": null},
                "flags": {"arrayValue": {"values": [{"booleanValue": true}]}},
                "extra": {"mapValue": {"fields": {"a": {"stringValue": "b"}}}}
            })
        );

        // What we write reads back the same.
        assert_eq!(Value::Object(decode_fields(&fields)), document);
    }
}
