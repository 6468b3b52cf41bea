//! JSON API for scripts and the CLI-less automation path.
//!
//! Same operations as the HTML table, without templates. Amounts go out as
//! JSON numbers.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use ops_cost_core::types::amount::{self, decimal_from_json};
use ops_cost_core::{CategoryShare, CostField, CostRow, CostStats, CostTotals};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::costs::TableQuery;
use crate::error::AppError;
use crate::middleware::RequireUnlocked;
use crate::services::SaveStatus;
use crate::state::AppState;

/// A row with its derived totals.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RowResponse {
    #[serde(flatten)]
    pub row: CostRow,
    #[serde(flatten)]
    pub totals: CostTotals,
    pub has_costs: bool,
}

impl From<CostRow> for RowResponse {
    fn from(row: CostRow) -> Self {
        Self {
            totals: row.totals(),
            has_costs: row.has_costs(),
            row,
        }
    }
}

/// Body of a field update.
#[derive(Debug, Deserialize)]
pub struct FieldUpdate {
    /// A number, or text such as `"₹1,200"`.
    #[serde(default)]
    pub value: serde_json::Value,
}

/// Result of a save.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveResponse {
    pub ops_no: String,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row: Option<RowResponse>,
}

/// Dashboard figures.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    #[serde(flatten)]
    pub stats: CostStats,
    #[serde(serialize_with = "amount::as_number")]
    pub grand_total: Decimal,
    pub breakdown: Vec<CategoryShare>,
}

/// Build the API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/costs", get(list_costs))
        .route("/api/costs/{ops_no}/{field}", put(update_field))
        .route("/api/costs/{ops_no}/save", post(save_row))
        .route("/api/stats", get(stats))
}

/// Merged rows, optionally filtered.
///
/// GET /api/costs?q=
#[instrument(skip_all)]
async fn list_costs(
    State(state): State<AppState>,
    _unlocked: RequireUnlocked,
    Query(query): Query<TableQuery>,
) -> Json<Vec<RowResponse>> {
    let sheet = state.costs().sheet().await;
    let rows = sheet
        .search(query.q.as_deref().unwrap_or_default())
        .into_iter()
        .cloned()
        .map(RowResponse::from)
        .collect();
    Json(rows)
}

/// Set one field in memory. Nothing is written until the row is saved.
///
/// PUT /api/costs/{ops_no}/{field}
#[instrument(skip(state, body))]
async fn update_field(
    State(state): State<AppState>,
    _unlocked: RequireUnlocked,
    Path((ops_no, field)): Path<(String, String)>,
    Json(body): Json<FieldUpdate>,
) -> Result<Json<RowResponse>, AppError> {
    let field: CostField = field
        .parse()
        .map_err(|e: ops_cost_core::UnknownCostField| AppError::BadRequest(e.to_string()))?;

    state
        .costs()
        .update_field(&ops_no, field, decimal_from_json(&body.value))
        .await
        .map(|row| Json(row.into()))
        .ok_or_else(|| AppError::NotFound(format!("order {ops_no}")))
}

/// Save one row.
///
/// POST /api/costs/{ops_no}/save
#[instrument(skip(state))]
async fn save_row(
    State(state): State<AppState>,
    _unlocked: RequireUnlocked,
    Path(ops_no): Path<String>,
) -> Response {
    let status = state.costs().save(&ops_no).await;
    let (code, label) = match status {
        SaveStatus::Saved => (StatusCode::OK, "saved"),
        SaveStatus::Superseded => (StatusCode::OK, "superseded"),
        SaveStatus::Failed => (StatusCode::BAD_GATEWAY, "failed"),
        SaveStatus::NotFound => (StatusCode::NOT_FOUND, "not_found"),
    };

    let row = state.costs().row(&ops_no).await.map(RowResponse::from);
    let body = SaveResponse {
        ops_no,
        status: label,
        row,
    };
    (code, Json(body)).into_response()
}

/// Dashboard figures.
///
/// GET /api/stats
#[instrument(skip_all)]
async fn stats(State(state): State<AppState>, _unlocked: RequireUnlocked) -> Json<StatsResponse> {
    let sheet = state.costs().sheet().await;
    Json(StatsResponse {
        stats: sheet.stats(),
        grand_total: sheet.grand_total(),
        breakdown: sheet.breakdown(),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use ops_cost_core::{CostBreakdown, OpsNo};
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn test_row_response_shape() {
        let mut costs = CostBreakdown::default();
        costs.set(CostField::Dyeing, dec!(50));
        let row = CostRow {
            ops_no: OpsNo::new("OPS-3"),
            buyer_name: "Acme".to_string(),
            buyer_code: "AC".to_string(),
            po_value: dec!(200),
            costs,
            updated_at: None,
        };

        let value = serde_json::to_value(RowResponse::from(row)).unwrap();
        assert_eq!(value["opsNo"], json!("OPS-3"));
        assert_eq!(value["dyeing"], json!(50));
        assert_eq!(value["totalCost"], json!(50));
        assert_eq!(value["margin"], json!(150));
        assert_eq!(value["marginPercent"], json!(75));
        assert_eq!(value["hasCosts"], json!(true));
        assert!(value.get("updatedAt").is_none());
    }
}
