//! Data table component types.
//!
//! These types define the column layout of the cost table. The template walks
//! the columns for the header and uses the cost columns for editable cells.

use ops_cost_core::CostField;
use serde::Serialize;

/// How a column's cells are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    /// Plain text (order number, buyer).
    Text,
    /// Read-only amount.
    Amount,
    /// Editable cost amount.
    Cost,
}

/// Column definition for a data table.
#[derive(Debug, Clone, Serialize)]
pub struct TableColumn {
    /// Unique key for the column. For cost columns, the document field name.
    pub key: String,
    /// Display label for the column header.
    pub label: String,
    pub kind: ColumnKind,
    /// Swatch color shown next to the header.
    pub color: Option<String>,
}

impl TableColumn {
    /// Create a text column.
    #[must_use]
    pub fn text(key: &str, label: &str) -> Self {
        Self {
            key: key.to_string(),
            label: label.to_string(),
            kind: ColumnKind::Text,
            color: None,
        }
    }

    /// Create a read-only, right-aligned amount column.
    #[must_use]
    pub fn amount(key: &str, label: &str) -> Self {
        Self {
            kind: ColumnKind::Amount,
            ..Self::text(key, label)
        }
    }

    /// Create an editable column for one cost category.
    #[must_use]
    pub fn cost(field: CostField) -> Self {
        Self {
            key: field.key().to_string(),
            label: field.label().to_string(),
            kind: ColumnKind::Cost,
            color: Some(field.color().to_string()),
        }
    }

    #[must_use]
    pub fn is_numeric(&self) -> bool {
        self.kind != ColumnKind::Text
    }
}

/// Configuration for a data table.
#[derive(Debug, Clone, Serialize)]
pub struct DataTableConfig {
    /// Unique table identifier.
    pub table_id: String,
    /// Column definitions.
    pub columns: Vec<TableColumn>,
    /// Search placeholder text.
    pub search_placeholder: String,
    /// Title for empty state.
    pub empty_title: String,
    /// Description for empty state.
    pub empty_description: Option<String>,
}

impl DataTableConfig {
    /// Create a new data table configuration.
    #[must_use]
    pub fn new(table_id: &str) -> Self {
        Self {
            table_id: table_id.to_string(),
            columns: vec![],
            search_placeholder: "Search...".to_string(),
            empty_title: "No items found".to_string(),
            empty_description: None,
        }
    }

    /// Add a column.
    #[must_use]
    pub fn column(mut self, column: TableColumn) -> Self {
        self.columns.push(column);
        self
    }

    /// Set search placeholder.
    #[must_use]
    pub fn search_placeholder(mut self, placeholder: &str) -> Self {
        self.search_placeholder = placeholder.to_string();
        self
    }

    /// Set empty state configuration.
    #[must_use]
    pub fn empty_state(mut self, title: &str, description: Option<&str>) -> Self {
        self.empty_title = title.to_string();
        self.empty_description = description.map(ToString::to_string);
        self
    }

    /// Number of columns, for `colspan` on full-width rows.
    #[must_use]
    pub fn width(&self) -> usize {
        self.columns.len()
    }
}

/// Build the cost table configuration.
#[must_use]
pub fn cost_table_config() -> DataTableConfig {
    let config = DataTableConfig::new("costs")
        .column(TableColumn::text("opsNo", "OPS No"))
        .column(TableColumn::text("buyer", "Buyer"))
        .column(TableColumn::amount("poValue", "PO Value"));

    CostField::ALL
        .into_iter()
        .fold(config, |config, field| config.column(TableColumn::cost(field)))
        .column(TableColumn::amount("totalCost", "Total Cost"))
        .column(TableColumn::amount("margin", "Margin"))
        .column(TableColumn::amount("marginPercent", "Margin %"))
        .search_placeholder("Search by OPS number, buyer or code...")
        .empty_state("No orders found", Some("Try a different search or reload"))
}
