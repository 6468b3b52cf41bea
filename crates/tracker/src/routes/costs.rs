//! Cost table route handlers.
//!
//! The table is rendered once in full. A cell edit answers with out-of-band
//! swaps for the row's derived cells only, so the inputs (and whatever the user
//! is typing into the next one) are never replaced.

use std::fmt::Write as _;

use askama::Template;
use axum::{
    Form, Router,
    extract::{Path, Query, State},
    response::{Html, Redirect},
    routing::{get, post},
};
use ops_cost_core::{CategoryShare, CostField, CostRow, CostStats, Order};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::instrument;

use super::render;
use crate::components::{DataTableConfig, cost_table_config};
use crate::error::AppError;
use crate::filters;
use crate::middleware::RequireUnlocked;
use crate::services::{LoadStatus, SaveStatus};
use crate::state::AppState;

// =============================================================================
// Query Parameters
// =============================================================================

/// Query parameters for the cost table.
#[derive(Debug, Default, Deserialize)]
pub struct TableQuery {
    pub q: Option<String>,
    /// Set by the reload redirect when the store could not be read.
    pub reload: Option<String>,
}

/// Form data for one cell edit.
#[derive(Debug, Deserialize)]
pub struct CellForm {
    #[serde(default)]
    pub value: String,
}

// =============================================================================
// View Types
// =============================================================================

/// One editable cell.
#[derive(Debug, Clone)]
pub struct CostCellView {
    pub key: &'static str,
    pub label: &'static str,
    pub amount: Decimal,
}

/// Cost row view for templates.
#[derive(Debug, Clone)]
pub struct CostRowView {
    pub ops_no: String,
    /// Hex form of the order number, safe in element ids and CSS selectors.
    pub dom_key: String,
    pub buyer_name: String,
    pub buyer_code: String,
    pub po_value: Decimal,
    pub cells: Vec<CostCellView>,
    pub total_cost: Decimal,
    pub margin: Decimal,
    pub margin_percent: Decimal,
    pub margin_negative: bool,
    pub has_costs: bool,
    pub updated_at: Option<String>,
    /// The last save of this row failed; the values shown are unsaved.
    pub save_failed: bool,
}

impl From<&CostRow> for CostRowView {
    fn from(row: &CostRow) -> Self {
        let totals = row.totals();
        Self {
            ops_no: row.ops_no.to_string(),
            dom_key: dom_key(row.ops_no.as_str()),
            buyer_name: row.buyer_name.clone(),
            buyer_code: row.buyer_code.clone(),
            po_value: row.po_value,
            cells: row
                .costs
                .iter()
                .map(|(field, amount)| CostCellView {
                    key: field.key(),
                    label: field.label(),
                    amount,
                })
                .collect(),
            total_cost: totals.total_cost,
            margin: totals.margin,
            margin_percent: totals.margin_percent,
            margin_negative: totals.margin < Decimal::ZERO,
            has_costs: row.has_costs(),
            updated_at: row.updated_at.map(|at| at.to_rfc3339()),
            save_failed: false,
        }
    }
}

fn dom_key(ops_no: &str) -> String {
    ops_no
        .bytes()
        .fold(String::with_capacity(ops_no.len() * 2), |mut out, b| {
            let _ = write!(out, "{b:02x}");
            out
        })
}

/// Dashboard header figures.
#[derive(Debug, Clone)]
pub struct StatsView {
    pub total_orders: usize,
    pub orders_with_costs: usize,
    pub total_revenue: Decimal,
    pub total_costs: Decimal,
    pub average_margin_percent: Decimal,
    pub top_category: Option<&'static str>,
}

impl From<CostStats> for StatsView {
    fn from(stats: CostStats) -> Self {
        Self {
            total_orders: stats.total_orders,
            orders_with_costs: stats.orders_with_costs,
            total_revenue: stats.total_revenue,
            total_costs: stats.total_costs,
            average_margin_percent: stats.average_margin_percent,
            top_category: stats.top_category.map(CostField::label),
        }
    }
}

// =============================================================================
// Templates
// =============================================================================

/// Cost table page.
#[derive(Template)]
#[template(path = "costs/index.html")]
struct CostsIndexTemplate {
    table: DataTableConfig,
    rows: Vec<CostRowView>,
    query: String,
    total_rows: usize,
    grand_total: Decimal,
    stats: StatsView,
    breakdown: Vec<CategoryShare>,
    reload_failed: bool,
    /// Rows are rendered in place, not swapped out of band.
    oob: bool,
}

/// Derived cells of one row, swapped out of band after a cell edit.
#[derive(Template)]
#[template(path = "partials/cell_saved.html")]
struct CellSavedTemplate {
    row: CostRowView,
    oob: bool,
}

impl CellSavedTemplate {
    const fn new(row: CostRowView) -> Self {
        Self { row, oob: true }
    }
}

/// Order detail panel.
#[derive(Template)]
#[template(path = "partials/detail.html")]
struct OrderDetailTemplate {
    order: Order,
    row: CostRowView,
}

// =============================================================================
// Router
// =============================================================================

/// Build the cost table router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(index))
        .route("/reload", post(reload))
        .route("/orders/{ops_no}", get(order_detail))
        .route("/costs/{ops_no}/{field}", post(update_cell))
}

// =============================================================================
// Handlers
// =============================================================================

/// Cost table with search.
///
/// GET /?q=
#[instrument(skip_all)]
async fn index(
    State(state): State<AppState>,
    _unlocked: RequireUnlocked,
    Query(query): Query<TableQuery>,
) -> Result<Html<String>, AppError> {
    let term = query.q.unwrap_or_default();
    let sheet = state.costs().sheet().await;

    let template = CostsIndexTemplate {
        table: cost_table_config(),
        rows: sheet.search(&term).into_iter().map(CostRowView::from).collect(),
        query: term,
        total_rows: sheet.len(),
        grand_total: sheet.grand_total(),
        stats: sheet.stats().into(),
        breakdown: sheet.breakdown(),
        reload_failed: query.reload.as_deref() == Some("failed"),
        oob: false,
    };
    drop(sheet);

    render(&template)
}

/// Reload rows from the store. Unsaved edits are discarded.
///
/// POST /reload
#[instrument(skip_all)]
async fn reload(State(state): State<AppState>, _unlocked: RequireUnlocked) -> Redirect {
    match state.costs().load().await {
        LoadStatus::Loaded { .. } => Redirect::to("/"),
        LoadStatus::Failed => Redirect::to("/?reload=failed"),
    }
}

/// Order detail panel.
///
/// GET /orders/{ops_no}
#[instrument(skip(state))]
async fn order_detail(
    State(state): State<AppState>,
    _unlocked: RequireUnlocked,
    Path(ops_no): Path<String>,
) -> Result<Html<String>, AppError> {
    let sheet = state.costs().sheet().await;
    let (Some(order), Some(row)) = (sheet.order(&ops_no), sheet.row(&ops_no)) else {
        return Err(AppError::NotFound(format!("order {ops_no}")));
    };

    let template = OrderDetailTemplate {
        order: order.clone(),
        row: CostRowView::from(row),
    };
    drop(sheet);

    render(&template)
}

/// Edit one cell and save the row, as the cell does when it loses focus.
///
/// POST /costs/{ops_no}/{field}
#[instrument(skip(state, form))]
async fn update_cell(
    State(state): State<AppState>,
    _unlocked: RequireUnlocked,
    Path((ops_no, field)): Path<(String, String)>,
    Form(form): Form<CellForm>,
) -> Result<Html<String>, AppError> {
    let field: CostField = field
        .parse()
        .map_err(|e: ops_cost_core::UnknownCostField| AppError::BadRequest(e.to_string()))?;

    let (row, status) = state.costs().edit_and_save(&ops_no, field, &form.value).await;
    let Some(row) = row else {
        return Err(AppError::NotFound(format!("order {ops_no}")));
    };

    let mut view = CostRowView::from(&row);
    view.save_failed = status == SaveStatus::Failed;
    render(&CellSavedTemplate::new(view))
}
