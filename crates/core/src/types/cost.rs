//! The seven cost categories tracked per order.

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::amount;

/// One of the seven cost categories.
///
/// This is a closed set: every category-specific operation is a total match
/// over the variants, so an unknown field name can only exist as a parse error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CostField {
    MaterialPurchase,
    Dyeing,
    Weaving,
    Finishing,
    Rework,
    PackingLabels,
    Shipping,
}

impl CostField {
    /// All categories in display order.
    pub const ALL: [Self; 7] = [
        Self::MaterialPurchase,
        Self::Dyeing,
        Self::Weaving,
        Self::Finishing,
        Self::Rework,
        Self::PackingLabels,
        Self::Shipping,
    ];

    /// Document field name, also used in URLs.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::MaterialPurchase => "materialPurchase",
            Self::Dyeing => "dyeing",
            Self::Weaving => "weaving",
            Self::Finishing => "finishing",
            Self::Rework => "rework",
            Self::PackingLabels => "packingLabels",
            Self::Shipping => "shipping",
        }
    }

    /// Human-readable column label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::MaterialPurchase => "Material Purchase",
            Self::Dyeing => "Dyeing",
            Self::Weaving => "Weaving",
            Self::Finishing => "Finishing",
            Self::Rework => "Rework",
            Self::PackingLabels => "Packing + Labels",
            Self::Shipping => "Shipping",
        }
    }

    /// Accent color for charts and column headers.
    #[must_use]
    pub const fn color(self) -> &'static str {
        match self {
            Self::MaterialPurchase => "#3B82F6",
            Self::Dyeing => "#8B5CF6",
            Self::Weaving => "#10B981",
            Self::Finishing => "#F59E0B",
            Self::Rework => "#EF4444",
            Self::PackingLabels => "#06B6D4",
            Self::Shipping => "#EC4899",
        }
    }
}

impl fmt::Display for CostField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Returned when a string does not name a cost category.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown cost field: {0}")]
pub struct UnknownCostField(pub String);

impl FromStr for CostField {
    type Err = UnknownCostField;

    /// Accepts the document key (`packingLabels`) or its snake/kebab-case
    /// spelling (`packing_labels`, `packing-labels`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let folded: String = s
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .flat_map(char::to_lowercase)
            .collect();

        Self::ALL
            .into_iter()
            .find(|field| field.key().to_lowercase() == folded)
            .ok_or_else(|| UnknownCostField(s.to_string()))
    }
}

/// The seven cost amounts for one order.
///
/// Missing or malformed values decode as zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CostBreakdown {
    #[serde(default, deserialize_with = "amount::lenient", serialize_with = "amount::as_number")]
    pub material_purchase: Decimal,
    #[serde(default, deserialize_with = "amount::lenient", serialize_with = "amount::as_number")]
    pub dyeing: Decimal,
    #[serde(default, deserialize_with = "amount::lenient", serialize_with = "amount::as_number")]
    pub weaving: Decimal,
    #[serde(default, deserialize_with = "amount::lenient", serialize_with = "amount::as_number")]
    pub finishing: Decimal,
    #[serde(default, deserialize_with = "amount::lenient", serialize_with = "amount::as_number")]
    pub rework: Decimal,
    #[serde(default, deserialize_with = "amount::lenient", serialize_with = "amount::as_number")]
    pub packing_labels: Decimal,
    #[serde(default, deserialize_with = "amount::lenient", serialize_with = "amount::as_number")]
    pub shipping: Decimal,
}

impl CostBreakdown {
    /// Read one category.
    #[must_use]
    pub const fn get(&self, field: CostField) -> Decimal {
        match field {
            CostField::MaterialPurchase => self.material_purchase,
            CostField::Dyeing => self.dyeing,
            CostField::Weaving => self.weaving,
            CostField::Finishing => self.finishing,
            CostField::Rework => self.rework,
            CostField::PackingLabels => self.packing_labels,
            CostField::Shipping => self.shipping,
        }
    }

    /// Replace one category. Negative values are stored as given.
    pub fn set(&mut self, field: CostField, value: Decimal) {
        let slot = match field {
            CostField::MaterialPurchase => &mut self.material_purchase,
            CostField::Dyeing => &mut self.dyeing,
            CostField::Weaving => &mut self.weaving,
            CostField::Finishing => &mut self.finishing,
            CostField::Rework => &mut self.rework,
            CostField::PackingLabels => &mut self.packing_labels,
            CostField::Shipping => &mut self.shipping,
        };
        *slot = value;
    }

    /// Iterate `(field, amount)` pairs in display order.
    pub fn iter(&self) -> impl Iterator<Item = (CostField, Decimal)> + '_ {
        CostField::ALL.into_iter().map(|field| (field, self.get(field)))
    }

    /// Sum of all seven categories.
    #[must_use]
    pub fn total(&self) -> Decimal {
        self.iter().map(|(_, amount)| amount).sum()
    }

    /// True when at least one category is strictly positive.
    #[must_use]
    pub fn has_costs(&self) -> bool {
        self.iter().any(|(_, amount)| amount > Decimal::ZERO)
    }
}
