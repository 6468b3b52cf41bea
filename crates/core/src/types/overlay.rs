//! Cost overlay records owned by this system.

use chrono::{DateTime, SecondsFormat, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::amount;
use super::order::lenient_ops_no;
use super::{CostBreakdown, Document, OpsNo};
use crate::format::calculate_percentage;

/// Values derived from the seven cost fields and the purchase-order value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CostTotals {
    #[serde(serialize_with = "amount::as_number")]
    pub total_cost: Decimal,
    #[serde(serialize_with = "amount::as_number")]
    pub margin: Decimal,
    /// Margin as a percentage of the PO value, rounded to one decimal.
    #[serde(serialize_with = "amount::as_number")]
    pub margin_percent: Decimal,
}

impl CostTotals {
    /// Compute totals. Margin and margin percent are zero unless the PO value
    /// is positive.
    #[must_use]
    pub fn compute(costs: &CostBreakdown, po_value: Decimal) -> Self {
        let total_cost = costs.total();
        if po_value <= Decimal::ZERO {
            return Self {
                total_cost,
                margin: Decimal::ZERO,
                margin_percent: Decimal::ZERO,
            };
        }

        let margin = po_value - total_cost;
        Self {
            total_cost,
            margin,
            margin_percent: calculate_percentage(margin, po_value),
        }
    }
}

/// The persisted cost record for one order.
///
/// Only the cost fields are authoritative when read back; the derived totals
/// are recomputed from them on every write.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CostOverlay {
    #[serde(default, deserialize_with = "lenient_ops_no")]
    pub ops_no: OpsNo,
    #[serde(default, deserialize_with = "amount::lenient_string")]
    pub buyer_name: String,
    #[serde(default, deserialize_with = "amount::lenient_string")]
    pub buyer_code: String,
    #[serde(default, deserialize_with = "amount::lenient")]
    pub po_value: Decimal,
    #[serde(flatten)]
    pub costs: CostBreakdown,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Wire shape of an overlay write.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct OverlayRecord<'a> {
    ops_no: &'a OpsNo,
    buyer_name: &'a str,
    buyer_code: &'a str,
    #[serde(serialize_with = "amount::as_number")]
    po_value: Decimal,
    #[serde(flatten)]
    costs: &'a CostBreakdown,
    #[serde(flatten)]
    totals: CostTotals,
    #[serde(serialize_with = "iso_timestamp")]
    updated_at: Option<DateTime<Utc>>,
}

impl CostOverlay {
    /// Decode an overlay from a stored document.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be coerced into an overlay.
    pub fn from_document(key: &str, document: Document) -> Result<Self, serde_json::Error> {
        let mut overlay: Self = serde_json::from_value(serde_json::Value::Object(document))?;
        if overlay.ops_no.is_empty() {
            overlay.ops_no = OpsNo::new(key);
        }
        Ok(overlay)
    }

    /// Derived totals for the current cost fields.
    #[must_use]
    pub fn totals(&self) -> CostTotals {
        CostTotals::compute(&self.costs, self.po_value)
    }

    /// Encode this overlay as a document for upserting, totals included.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_document(&self) -> Result<Document, serde_json::Error> {
        let record = OverlayRecord {
            ops_no: &self.ops_no,
            buyer_name: &self.buyer_name,
            buyer_code: &self.buyer_code,
            po_value: self.po_value,
            costs: &self.costs,
            totals: self.totals(),
            updated_at: self.updated_at,
        };
        match serde_json::to_value(record)? {
            serde_json::Value::Object(map) => Ok(map),
            other => Err(serde::ser::Error::custom(format!(
                "overlay serialized to non-object: {other}"
            ))),
        }
    }
}

/// Accepts an RFC 3339 string; anything else is treated as absent.
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => DateTime::parse_from_rfc3339(&s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        _ => None,
    })
}

/// Writes `2026-10-18T09:15:00.000Z`, the same shape `Date.toISOString` produces.
#[allow(clippy::ref_option)]
fn iso_timestamp<S>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match value {
        Some(dt) => serializer.serialize_str(&dt.to_rfc3339_opts(SecondsFormat::Millis, true)),
        None => serializer.serialize_none(),
    }
}
