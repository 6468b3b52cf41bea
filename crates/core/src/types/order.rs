//! Production orders as published by the external orders system.

use std::borrow::Borrow;
use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

use super::Document;
use super::amount;

/// An OPS number, the key shared by an order and its cost overlay.
///
/// Ordering is plain lexical (byte-wise) string comparison, so `"OPS-10"`
/// sorts before `"OPS-2"`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OpsNo(String);

impl OpsNo {
    /// Wrap a raw order number.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The raw order number.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True for an empty or blank order number.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

/// Deserialize an order number stored as text, a number or `null`.
///
/// Anything without text decodes as empty so the caller can fall back to the
/// document key.
pub(crate) fn lenient_ops_no<'de, D>(deserializer: D) -> Result<OpsNo, D::Error>
where
    D: Deserializer<'de>,
{
    amount::lenient_string(deserializer).map(OpsNo)
}

impl fmt::Display for OpsNo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for OpsNo {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for OpsNo {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl Borrow<str> for OpsNo {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Order lifecycle status.
///
/// The orders system may introduce new values at any time, so this wraps the
/// raw string rather than enumerating it. Known values get nicer labels.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderStatus(String);

impl OrderStatus {
    pub const ACTIVE: &'static str = "active";
    pub const IN_PRODUCTION: &'static str = "in_production";
    pub const SHIPPED: &'static str = "shipped";
    pub const COMPLETED: &'static str = "completed";
    pub const CANCELLED: &'static str = "cancelled";

    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Display text, e.g. `"In Production"`.
    #[must_use]
    pub fn label(&self) -> String {
        match self.0.as_str() {
            Self::ACTIVE => "Active".to_string(),
            Self::IN_PRODUCTION => "In Production".to_string(),
            Self::SHIPPED => "Shipped".to_string(),
            Self::COMPLETED => "Completed".to_string(),
            Self::CANCELLED => "Cancelled".to_string(),
            other => other.replace('_', " "),
        }
    }

    /// CSS badge class for the status pill.
    #[must_use]
    pub fn badge_class(&self) -> &'static str {
        match self.0.as_str() {
            Self::SHIPPED | Self::COMPLETED => "badge-success",
            Self::IN_PRODUCTION => "badge-info",
            Self::CANCELLED => "badge-danger",
            _ => "badge-neutral",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A production order record. Read-only for this system.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    #[serde(default, deserialize_with = "lenient_ops_no")]
    pub ops_no: OpsNo,
    #[serde(default, deserialize_with = "amount::lenient_string")]
    pub buyer_name: String,
    #[serde(default, deserialize_with = "amount::lenient_string")]
    pub buyer_code: String,
    #[serde(default, deserialize_with = "amount::lenient_opt_string", skip_serializing_if = "Option::is_none")]
    pub po_number: Option<String>,
    /// Purchase-order (selling) value. Zero when unset.
    #[serde(default, deserialize_with = "amount::lenient", serialize_with = "amount::as_number")]
    pub po_value: Decimal,
    #[serde(default, deserialize_with = "amount::lenient_opt", skip_serializing_if = "Option::is_none")]
    pub total_pcs: Option<Decimal>,
    #[serde(default, deserialize_with = "amount::lenient_opt", skip_serializing_if = "Option::is_none")]
    pub total_sqm: Option<Decimal>,
    #[serde(default, deserialize_with = "amount::lenient_opt_string", skip_serializing_if = "Option::is_none")]
    pub ship_date: Option<String>,
    #[serde(default, deserialize_with = "amount::lenient_opt_string", skip_serializing_if = "Option::is_none")]
    pub order_confirmation_date: Option<String>,
    #[serde(default, deserialize_with = "amount::lenient_opt_string", skip_serializing_if = "Option::is_none")]
    pub merchant_code: Option<String>,
    #[serde(default, deserialize_with = "amount::lenient_opt_string", skip_serializing_if = "Option::is_none")]
    pub managed_by: Option<String>,
    #[serde(default, deserialize_with = "amount::lenient_opt_string", skip_serializing_if = "Option::is_none")]
    pub order_type: Option<String>,
    #[serde(default, deserialize_with = "amount::lenient_opt_string", skip_serializing_if = "Option::is_none")]
    pub company_code: Option<String>,
    #[serde(default, deserialize_with = "lenient_status", skip_serializing_if = "Option::is_none")]
    pub status: Option<OrderStatus>,
}

fn lenient_status<'de, D>(deserializer: D) -> Result<Option<OrderStatus>, D::Error>
where
    D: Deserializer<'de>,
{
    amount::lenient_opt_string(deserializer).map(|s| s.map(OrderStatus))
}

impl Order {
    /// Decode an order from a stored document.
    ///
    /// The order number comes from the `opsNo` field; documents without one
    /// fall back to their document key.
    ///
    /// # Errors
    ///
    /// Returns an error if serde rejects the document. Every field is coerced
    /// from whatever scalar it holds, so this is not expected in practice.
    pub fn from_document(key: &str, document: Document) -> Result<Self, serde_json::Error> {
        let mut order: Self = serde_json::from_value(serde_json::Value::Object(document))?;
        if order.ops_no.is_empty() {
            order.ops_no = OpsNo::new(key);
        }
        Ok(order)
    }

    /// An order known only by its document key.
    #[must_use]
    pub fn keyed(key: &str) -> Self {
        Self {
            ops_no: OpsNo::new(key),
            ..Self::default()
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn document(value: serde_json::Value) -> Document {
        match value {
            serde_json::Value::Object(map) => map,
            _ => panic!("expected an object"),
        }
    }

    #[test]
    fn test_ops_no_orders_lexically() {
        let mut numbers = vec![
            OpsNo::from("OPS-10"),
            OpsNo::from("OPS-2"),
            OpsNo::from("OPS-9"),
        ];
        numbers.sort();
        let sorted: Vec<&str> = numbers.iter().map(OpsNo::as_str).collect();
        assert_eq!(sorted, ["OPS-10", "OPS-2", "OPS-9"]);
    }

    #[test]
    fn test_order_from_document() {
        let order = Order::from_document(
            "doc-1",
            document(json!({
                "opsNo": "OPS-1042",
                "buyerName": "Loom & Co",
                "buyerCode": "LC",
                "poValue": 12500.5,
                "totalPcs": 40,
                "totalSqm": "118.25",
                "status": "in_production",
                "shipDate": "2026-11-02",
                "someNewField": {"nested": true}
            })),
        )
        .unwrap();

        assert_eq!(order.ops_no.as_str(), "OPS-1042");
        assert_eq!(order.buyer_name, "Loom & Co");
        assert_eq!(order.po_value, dec!(12500.5));
        assert_eq!(order.total_pcs, Some(dec!(40)));
        assert_eq!(order.total_sqm, Some(dec!(118.25)));
        assert_eq!(order.status.as_ref().unwrap().label(), "In Production");
        assert_eq!(order.ship_date.as_deref(), Some("2026-11-02"));
    }

    #[test]
    fn test_order_falls_back_to_document_key() {
        let order = Order::from_document("OPS-7", document(json!({"buyerCode": 17}))).unwrap();
        assert_eq!(order.ops_no.as_str(), "OPS-7");
        assert_eq!(order.buyer_code, "17");
        assert_eq!(order.po_value, Decimal::ZERO);
        assert!(order.status.is_none());
    }

    #[test]
    fn test_order_coerces_scalar_attributes() {
        let order = Order::from_document(
            "OPS-5",
            document(json!({
                "opsNo": null,
                "poNumber": 4_501_234,
                "merchantCode": 17,
                "companyCode": "",
                "shipDate": {"seconds": 1_790_000_000},
                "status": "shipped"
            })),
        )
        .unwrap();

        assert_eq!(order.ops_no.as_str(), "OPS-5");
        assert_eq!(order.po_number.as_deref(), Some("4501234"));
        assert_eq!(order.merchant_code.as_deref(), Some("17"));
        assert!(order.company_code.is_none());
        assert!(order.ship_date.is_none());
        assert_eq!(order.status.unwrap().label(), "Shipped");
    }

    #[test]
    fn test_numeric_and_blank_ops_no() {
        let numeric = Order::from_document("doc", document(json!({"opsNo": 1042}))).unwrap();
        assert_eq!(numeric.ops_no.as_str(), "1042");

        let blank = Order::from_document("OPS-8", document(json!({"opsNo": "  "}))).unwrap();
        assert_eq!(blank.ops_no.as_str(), "OPS-8");
    }

    #[test]
    fn test_unknown_status_is_kept_verbatim() {
        let status = OrderStatus::new("on_hold");
        assert_eq!(status.label(), "on hold");
        assert_eq!(status.badge_class(), "badge-neutral");
        assert_eq!(status.as_str(), "on_hold");
    }
}
