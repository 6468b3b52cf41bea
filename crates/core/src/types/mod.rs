//! Domain types for orders and their cost overlays.

pub mod amount;
pub mod cost;
pub mod order;
pub mod overlay;

pub use amount::parse_amount;
pub use cost::{CostBreakdown, CostField, UnknownCostField};
pub use order::{OpsNo, Order, OrderStatus};
pub use overlay::{CostOverlay, CostTotals};

/// A decoded remote document: field name to plain JSON value.
pub type Document = serde_json::Map<String, serde_json::Value>;
