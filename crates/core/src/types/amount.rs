//! Lenient decoding of numeric amounts.
//!
//! Documents in the remote collections are schema-on-read: a cost field may be
//! an integer, a double, a numeric string, `null`, or missing entirely. Every
//! one of those decodes to a [`Decimal`], falling back to zero.

use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use serde::{Deserialize, Deserializer, Serializer};
use serde_json::Value;

/// Parse user-entered text into an amount.
///
/// Everything except ASCII digits, `.` and `-` is stripped first (so
/// `"₹1,250"` parses as `1250`), then the longest numeric prefix is parsed.
/// Anything unparsable becomes zero.
#[must_use]
pub fn parse_amount(input: &str) -> Decimal {
    let cleaned: String = input
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();

    let mut end = 0;
    let mut seen_digit = false;
    let mut seen_dot = false;
    for (i, c) in cleaned.char_indices() {
        match c {
            '-' if i == 0 => {}
            '.' if !seen_dot => seen_dot = true,
            c if c.is_ascii_digit() => seen_digit = true,
            _ => break,
        }
        end = i + c.len_utf8();
    }

    if !seen_digit {
        return Decimal::ZERO;
    }

    let prefix = cleaned.get(..end).unwrap_or_default();
    let prefix = prefix.trim_end_matches('.');
    let normalized = match prefix.strip_prefix('-') {
        Some(rest) if rest.starts_with('.') => format!("-0{rest}"),
        _ if prefix.starts_with('.') => format!("0{prefix}"),
        _ => prefix.to_string(),
    };

    normalized.parse::<Decimal>().unwrap_or(Decimal::ZERO)
}

/// Convert an arbitrary JSON value into an amount.
#[must_use]
pub fn decimal_from_json(value: &Value) -> Decimal {
    match value {
        Value::Number(n) => n
            .as_i64()
            .map(Decimal::from)
            .or_else(|| n.as_u64().map(Decimal::from))
            .or_else(|| n.as_f64().and_then(Decimal::from_f64))
            .unwrap_or(Decimal::ZERO),
        Value::String(s) => parse_amount(s),
        _ => Decimal::ZERO,
    }
}

/// Deserialize an amount, treating `null` and junk as zero.
///
/// Pair with `#[serde(default)]` so a missing field is zero too.
///
/// # Errors
///
/// Only fails if the underlying deserializer fails to produce any value.
pub fn lenient<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().map_or(Decimal::ZERO, decimal_from_json))
}

/// Deserialize an optional amount. `null`, booleans and containers become `None`.
///
/// # Errors
///
/// Only fails if the underlying deserializer fails to produce any value.
pub fn lenient_opt<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(v @ (Value::Number(_) | Value::String(_))) => Some(decimal_from_json(&v)),
        _ => None,
    })
}

/// Text of a scalar value. Containers and `null` have none.
fn scalar_text(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Deserialize a string field that some writers store as a number.
///
/// # Errors
///
/// Only fails if the underlying deserializer fails to produce any value.
pub fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(scalar_text).unwrap_or_default())
}

/// Deserialize an optional string field. Numbers and booleans become their
/// text; `null`, empty strings and containers become `None`.
///
/// # Errors
///
/// Only fails if the underlying deserializer fails to produce any value.
pub fn lenient_opt_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(scalar_text).filter(|s| !s.is_empty()))
}

/// Serialize an amount as a JSON number.
///
/// # Errors
///
/// Propagates serializer errors.
pub fn as_number<S>(value: &Decimal, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    if value.fract().is_zero()
        && let Ok(whole) = i64::try_from(value.trunc())
    {
        return serializer.serialize_i64(whole);
    }
    rust_decimal::serde::float::serialize(value, serializer)
}
