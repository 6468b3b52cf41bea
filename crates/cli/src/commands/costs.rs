//! `list`, `show`, `set` and `stats`: the cost sheet from a terminal.
//!
//! # Environment Variables
//!
//! - `FIRESTORE_PROJECT_ID`, `FIRESTORE_API_KEY` and friends, as for the web
//!   server

use std::sync::Arc;

use ops_cost_core::format::{format_date, format_inr, format_percent};
use ops_cost_core::gate::UnlockFlag;
use ops_cost_core::{CostField, CostRow, CostSheet, Order};
use ops_cost_tracker::config::{FirestoreConfig, SaveMode};
use ops_cost_tracker::services::{CostService, LoadStatus, SaveStatus};
use ops_cost_tracker::store::FirestoreClient;

use super::CliError;
use super::flag::FileFlag;

/// Refuse to run unless the gate has been unlocked.
async fn require_unlocked() -> Result<(), CliError> {
    if FileFlag::from_env()?.is_set().await? {
        Ok(())
    } else {
        Err(CliError::Locked)
    }
}

/// Unlock check, then a freshly loaded service.
async fn loaded_service() -> Result<CostService, CliError> {
    require_unlocked().await?;

    let config = FirestoreConfig::from_env()?;
    let orders = config.orders_collection.clone();
    let costs = config.costs_collection.clone();
    let store = Arc::new(FirestoreClient::new(config)?);

    let service = CostService::new(store, orders, costs, SaveMode::Serialized);
    match service.load().await {
        LoadStatus::Loaded { rows } => {
            tracing::debug!(rows, "Cost sheet loaded");
            Ok(service)
        }
        LoadStatus::Failed => Err(CliError::LoadFailed),
    }
}

/// Print rows, newest order number first.
pub async fn list(search: Option<&str>) -> Result<(), CliError> {
    let service = loaded_service().await?;
    let sheet = service.sheet().await;
    let rows = sheet.search(search.unwrap_or_default());

    println!("{}", header_line());
    for row in &rows {
        println!("{}", row_line(row));
    }
    println!("{} of {} orders, grand total {}", rows.len(), sheet.len(), format_inr(sheet.grand_total()));
    Ok(())
}

/// Print one order with its costs.
pub async fn show(ops_no: &str) -> Result<(), CliError> {
    let service = loaded_service().await?;
    let sheet = service.sheet().await;
    let (Some(order), Some(row)) = (sheet.order(ops_no), sheet.row(ops_no)) else {
        return Err(CliError::NotFound(ops_no.to_string()));
    };

    for line in detail_lines(order, row) {
        println!("{line}");
    }
    Ok(())
}

/// Set one cost field and save the row.
pub async fn set(ops_no: &str, field: &str, value: &str) -> Result<(), CliError> {
    let field: CostField = field.parse()?;
    let service = loaded_service().await?;

    let (row, status) = service.edit_and_save(ops_no, field, value).await;
    match (row, status) {
        (Some(row), SaveStatus::Saved | SaveStatus::Superseded) => {
            let totals = row.totals();
            println!(
                "{ops_no}: {} = {}, total cost {}, margin {} ({})",
                field.label(),
                format_inr(row.costs.get(field)),
                format_inr(totals.total_cost),
                format_inr(totals.margin),
                format_percent(totals.margin_percent),
            );
            Ok(())
        }
        (_, SaveStatus::Failed) => Err(CliError::SaveFailed(ops_no.to_string())),
        _ => Err(CliError::NotFound(ops_no.to_string())),
    }
}

/// Print dashboard figures and the category breakdown.
pub async fn stats() -> Result<(), CliError> {
    let service = loaded_service().await?;
    let sheet = service.sheet().await;
    for line in stats_lines(&sheet) {
        println!("{line}");
    }
    Ok(())
}

fn header_line() -> String {
    format!(
        "{:<14} {:<24} {:>14} {:>14} {:>14} {:>8}",
        "OPS No", "Buyer", "PO Value", "Total Cost", "Margin", "Margin %"
    )
}

fn row_line(row: &CostRow) -> String {
    let totals = row.totals();
    format!(
        "{:<14} {:<24} {:>14} {:>14} {:>14} {:>8}",
        row.ops_no.as_str(),
        row.buyer_name,
        format_inr(row.po_value),
        format_inr(totals.total_cost),
        format_inr(totals.margin),
        format_percent(totals.margin_percent),
    )
}

fn detail_lines(order: &Order, row: &CostRow) -> Vec<String> {
    let optional = |value: Option<&String>| value.map_or_else(|| "-".to_string(), Clone::clone);
    let date = |value: Option<&String>| value.map_or_else(|| "-".to_string(), |d| format_date(d));

    let mut lines = vec![
        format!("{} ({} / {})", order.ops_no, order.buyer_name, order.buyer_code),
        format!("  PO number      {}", optional(order.po_number.as_ref())),
        format!("  PO value       {}", format_inr(order.po_value)),
        format!("  Confirmed      {}", date(order.order_confirmation_date.as_ref())),
        format!("  Ship date      {}", date(order.ship_date.as_ref())),
        format!(
            "  Status         {}",
            order.status.as_ref().map_or_else(|| "-".to_string(), |s| s.label())
        ),
        String::new(),
    ];

    lines.extend(
        row.costs
            .iter()
            .map(|(field, amount)| format!("  {:<18} {:>14}", field.label(), format_inr(amount))),
    );

    let totals = row.totals();
    lines.push(format!("  {:<18} {:>14}", "Total Cost", format_inr(totals.total_cost)));
    lines.push(format!(
        "  {:<18} {:>14} ({})",
        "Margin",
        format_inr(totals.margin),
        format_percent(totals.margin_percent)
    ));
    if let Some(at) = row.updated_at {
        lines.push(format!("  Last saved {}", format_date(&at.to_rfc3339())));
    }
    lines
}

fn stats_lines(sheet: &CostSheet) -> Vec<String> {
    let stats = sheet.stats();
    let mut lines = vec![
        format!("Orders           {}", stats.total_orders),
        format!("With costs       {}", stats.orders_with_costs),
        format!("Revenue          {}", format_inr(stats.total_revenue)),
        format!("Costs            {}", format_inr(stats.total_costs)),
        format!("Average margin   {}", format_percent(stats.average_margin_percent)),
        format!(
            "Top category     {}",
            stats.top_category.map_or("-", CostField::label)
        ),
    ];

    let breakdown = sheet.breakdown();
    if !breakdown.is_empty() {
        lines.push(String::new());
        lines.extend(breakdown.iter().map(|share| {
            format!(
                "  {:<18} {:>14} {:>7}",
                share.label,
                format_inr(share.amount),
                format_percent(share.percentage)
            )
        }));
    }
    lines
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use ops_cost_core::reconcile::merge;
    use ops_cost_core::{CostOverlay, OpsNo};
    use rust_decimal::Decimal;
    use std::collections::HashMap;

    fn order(ops_no: &str, po: i64) -> Order {
        Order {
            ops_no: OpsNo::new(ops_no),
            buyer_name: "Acme".to_string(),
            buyer_code: "AC".to_string(),
            po_value: Decimal::from(po),
            ship_date: Some("2026-11-02".to_string()),
            ..Order::default()
        }
    }

    fn sheet() -> CostSheet {
        let mut overlays = HashMap::new();
        let mut overlay = CostOverlay {
            ops_no: OpsNo::new("OPS-1"),
            ..CostOverlay::default()
        };
        overlay.costs.set(CostField::Weaving, Decimal::from(200));
        overlays.insert("OPS-1".to_string(), overlay);
        merge(vec![order("OPS-1", 300), order("OPS-2", 100)], &overlays)
    }

    #[test]
    fn test_row_line_formats_amounts() {
        let sheet = sheet();
        let line = row_line(sheet.row("OPS-1").unwrap());
        assert!(line.starts_with("OPS-1"));
        assert!(line.contains("₹300"));
        assert!(line.contains("₹200"));
        assert!(line.contains("33.3%"));
    }

    #[test]
    fn test_detail_lines() {
        let sheet = sheet();
        let lines = detail_lines(sheet.order("OPS-1").unwrap(), sheet.row("OPS-1").unwrap());
        assert_eq!(lines[0], "OPS-1 (Acme / AC)");
        assert!(lines.iter().any(|l| l.contains("02 Nov 2026")));
        assert!(lines.iter().any(|l| l.contains("Weaving") && l.contains("₹200")));
        assert!(lines.iter().any(|l| l.contains("PO number") && l.ends_with('-')));
    }

    #[test]
    fn test_stats_lines() {
        let lines = stats_lines(&sheet());
        assert!(lines.contains(&"Orders           2".to_string()));
        assert!(lines.contains(&"With costs       1".to_string()));
        assert!(lines.contains(&"Top category     Weaving".to_string()));
    }
}
