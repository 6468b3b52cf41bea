//! Merging orders with their cost overlays.
//!
//! Orders are authoritative and read-only; overlays carry the seven editable
//! cost amounts. A [`CostSheet`] holds one [`CostRow`] per order, built fresh on
//! every load and edited in place until a row is saved.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

use crate::format::calculate_percentage;
use crate::types::amount;
use crate::types::{CostBreakdown, CostField, CostOverlay, CostTotals, Document, OpsNo, Order};

/// Documents of one collection, keyed by document key.
pub type DocumentSet = BTreeMap<String, Document>;

/// One editable row: order display attributes plus its cost amounts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CostRow {
    pub ops_no: OpsNo,
    pub buyer_name: String,
    pub buyer_code: String,
    #[serde(serialize_with = "amount::as_number")]
    pub po_value: Decimal,
    #[serde(flatten)]
    pub costs: CostBreakdown,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl CostRow {
    /// Build a row from an order and its overlay, if any.
    #[must_use]
    pub fn new(order: &Order, overlay: Option<&CostOverlay>) -> Self {
        Self {
            ops_no: order.ops_no.clone(),
            buyer_name: order.buyer_name.clone(),
            buyer_code: order.buyer_code.clone(),
            po_value: order.po_value,
            costs: overlay.map(|o| o.costs).unwrap_or_default(),
            updated_at: overlay.and_then(|o| o.updated_at),
        }
    }

    #[must_use]
    pub fn totals(&self) -> CostTotals {
        CostTotals::compute(&self.costs, self.po_value)
    }

    /// True when any cost amount is above zero.
    #[must_use]
    pub fn has_costs(&self) -> bool {
        self.costs.has_costs()
    }

    /// The overlay record to persist for this row, stamped with `now`.
    #[must_use]
    pub fn to_overlay(&self, now: DateTime<Utc>) -> CostOverlay {
        CostOverlay {
            ops_no: self.ops_no.clone(),
            buyer_name: self.buyer_name.clone(),
            buyer_code: self.buyer_code.clone(),
            po_value: self.po_value,
            costs: self.costs,
            updated_at: Some(now),
        }
    }

    fn matches(&self, needle: &str) -> bool {
        self.ops_no.as_str().to_lowercase().contains(needle)
            || self.buyer_name.to_lowercase().contains(needle)
    }
}

/// Decode the order collection.
///
/// Every document yields an order. One that cannot be decoded at all is kept
/// under its document key with no attributes.
#[must_use]
pub fn decode_orders(documents: DocumentSet) -> Vec<Order> {
    documents
        .into_iter()
        .map(|(key, document)| {
            Order::from_document(&key, document).unwrap_or_else(|e| {
                tracing::warn!(key = %key, error = %e, "Malformed order document, keeping key only");
                Order::keyed(&key)
            })
        })
        .collect()
}

/// Decode the overlay collection, keyed by document key.
#[must_use]
pub fn decode_overlays(documents: DocumentSet) -> HashMap<String, CostOverlay> {
    documents
        .into_iter()
        .filter_map(
            |(key, document)| match CostOverlay::from_document(&key, document) {
                Ok(overlay) => Some((key, overlay)),
                Err(e) => {
                    tracing::warn!(key = %key, error = %e, "Skipping malformed cost document");
                    None
                }
            },
        )
        .collect()
}

/// Merge orders with overlays into a sheet.
///
/// Every order yields exactly one row. Overlays are matched by document key
/// against the order number; those with no matching order are dropped. Rows
/// are sorted by order number, descending, byte-wise; ties keep input order.
#[must_use]
pub fn merge(orders: Vec<Order>, overlays: &HashMap<String, CostOverlay>) -> CostSheet {
    let mut rows: Vec<CostRow> = orders
        .iter()
        .map(|order| CostRow::new(order, overlays.get(order.ops_no.as_str())))
        .collect();
    rows.sort_by(|a, b| b.ops_no.cmp(&a.ops_no));

    let orders: HashMap<OpsNo, Order> = orders
        .into_iter()
        .map(|order| (order.ops_no.clone(), order))
        .collect();

    let orphans = overlays
        .keys()
        .filter(|key| !orders.contains_key(key.as_str()))
        .count();
    if orphans > 0 {
        tracing::debug!(orphans, "Dropped cost overlays with no matching order");
    }

    CostSheet { rows, orders }
}

/// Aggregate figures for the dashboard header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CostStats {
    pub total_orders: usize,
    pub orders_with_costs: usize,
    #[serde(serialize_with = "amount::as_number")]
    pub total_revenue: Decimal,
    #[serde(serialize_with = "amount::as_number")]
    pub total_costs: Decimal,
    /// Mean margin percent over rows with costs and a positive PO value.
    #[serde(serialize_with = "amount::as_number")]
    pub average_margin_percent: Decimal,
    pub top_category: Option<CostField>,
}

/// One category's share of all recorded costs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryShare {
    pub field: CostField,
    pub label: &'static str,
    pub color: &'static str,
    #[serde(serialize_with = "amount::as_number")]
    pub amount: Decimal,
    #[serde(serialize_with = "amount::as_number")]
    pub percentage: Decimal,
}

/// The in-memory working set.
#[derive(Debug, Clone, Default)]
pub struct CostSheet {
    rows: Vec<CostRow>,
    orders: HashMap<OpsNo, Order>,
}

impl CostSheet {
    #[must_use]
    pub fn rows(&self) -> &[CostRow] {
        &self.rows
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    #[must_use]
    pub fn row(&self, ops_no: &str) -> Option<&CostRow> {
        self.rows.iter().find(|row| row.ops_no.as_str() == ops_no)
    }

    /// The full order record behind a row.
    #[must_use]
    pub fn order(&self, ops_no: &str) -> Option<&Order> {
        self.orders.get(ops_no)
    }

    /// Set one cost field on the matching row. Returns the updated row, or
    /// `None` if no row has that order number.
    pub fn update_field(
        &mut self,
        ops_no: &str,
        field: CostField,
        value: Decimal,
    ) -> Option<&CostRow> {
        let row = self
            .rows
            .iter_mut()
            .find(|row| row.ops_no.as_str() == ops_no)?;
        row.costs.set(field, value);
        Some(&*row)
    }

    /// Record a successful save on the matching row.
    pub fn mark_saved(&mut self, ops_no: &str, at: DateTime<Utc>) {
        if let Some(row) = self
            .rows
            .iter_mut()
            .find(|row| row.ops_no.as_str() == ops_no)
        {
            row.updated_at = Some(at);
        }
    }

    /// Rows whose order number or buyer name contains `term`, ignoring case.
    #[must_use]
    pub fn search(&self, term: &str) -> Vec<&CostRow> {
        let needle = term.trim().to_lowercase();
        if needle.is_empty() {
            return self.rows.iter().collect();
        }
        self.rows.iter().filter(|row| row.matches(&needle)).collect()
    }

    /// Sum of total cost across every row.
    #[must_use]
    pub fn grand_total(&self) -> Decimal {
        self.rows.iter().map(|row| row.costs.total()).sum()
    }

    /// Per-category sums across every row.
    fn category_totals(&self) -> CostBreakdown {
        let mut sums = CostBreakdown::default();
        for row in &self.rows {
            for (field, amount) in row.costs.iter() {
                sums.set(field, sums.get(field) + amount);
            }
        }
        sums
    }

    #[must_use]
    pub fn stats(&self) -> CostStats {
        let sums = self.category_totals();
        let total_costs = sums.total();

        let margins: Vec<Decimal> = self
            .rows
            .iter()
            .filter(|row| row.has_costs() && row.po_value > Decimal::ZERO)
            .map(|row| row.totals().margin_percent)
            .collect();
        let average_margin_percent = if margins.is_empty() {
            Decimal::ZERO
        } else {
            (margins.iter().sum::<Decimal>() / Decimal::from(margins.len()))
                .round_dp_with_strategy(1, RoundingStrategy::MidpointAwayFromZero)
        };

        // First category wins a tie.
        let top_category = sums
            .iter()
            .filter(|(_, amount)| *amount > Decimal::ZERO)
            .fold(None, |best: Option<(CostField, Decimal)>, (field, amount)| match best {
                Some((_, top)) if top >= amount => best,
                _ => Some((field, amount)),
            })
            .map(|(field, _)| field);

        CostStats {
            total_orders: self.rows.len(),
            orders_with_costs: self.rows.iter().filter(|row| row.has_costs()).count(),
            total_revenue: self.rows.iter().map(|row| row.po_value).sum(),
            total_costs,
            average_margin_percent,
            top_category,
        }
    }

    /// Each category's amount and share of total cost.
    #[must_use]
    pub fn breakdown(&self) -> Vec<CategoryShare> {
        let sums = self.category_totals();
        let total = sums.total();
        sums.iter()
            .map(|(field, amount)| CategoryShare {
                field,
                label: field.label(),
                color: field.color(),
                amount,
                percentage: calculate_percentage(amount, total),
            })
            .collect()
    }
}
