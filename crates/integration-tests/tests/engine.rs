//! Load and save behavior of the cost service over an in-memory store.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use ops_cost_core::CostField;
use ops_cost_integration_tests::{COSTS, ORDERS, seeded_store};
use ops_cost_tracker::config::SaveMode;
use ops_cost_tracker::services::{CostService, LoadStatus, SaveStatus};
use ops_cost_tracker::store::MemoryStore;
use rust_decimal_macros::dec;
use serde_json::json;

fn service(store: &Arc<MemoryStore>, mode: SaveMode) -> Arc<CostService> {
    Arc::new(CostService::new(Arc::clone(store) as _, ORDERS, COSTS, mode))
}

async fn settle() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}

#[tokio::test]
async fn test_load_merges_orders_with_overlays() {
    let store = seeded_store().await;
    let service = service(&store, SaveMode::Serialized);

    assert_eq!(service.load().await, LoadStatus::Loaded { rows: 3 });

    let sheet = service.sheet().await;
    let order: Vec<&str> = sheet.rows().iter().map(|r| r.ops_no.as_str()).collect();
    assert_eq!(order, ["OPS-2", "OPS-10", "OPS-1"]);

    let row = sheet.row("OPS-1").unwrap();
    assert_eq!(row.buyer_name, "Acme Rugs");
    assert_eq!(row.costs.material_purchase, dec!(100));
    assert_eq!(row.costs.dyeing, dec!(50));
    assert_eq!(row.costs.packing_labels, dec!(25));
    assert_eq!(row.totals().total_cost, dec!(200));
    assert_eq!(row.totals().margin_percent, dec!(33.3));
    assert!(row.updated_at.is_some());

    // No overlay: all zero.
    let bare = sheet.row("OPS-2").unwrap();
    assert!(!bare.has_costs());
    assert_eq!(bare.totals().total_cost, dec!(0));

    // The overlay without an order is not a row.
    assert!(sheet.row("OPS-99").is_none());
}

#[tokio::test]
async fn test_failed_load_keeps_previous_rows() {
    let store = seeded_store().await;
    let service = service(&store, SaveMode::Serialized);
    service.load().await;

    store.set_fail_on_fetch(true);
    assert_eq!(service.load().await, LoadStatus::Failed);
    assert_eq!(service.sheet().await.len(), 3);
}

#[tokio::test]
async fn test_reload_discards_unsaved_edits() {
    let store = seeded_store().await;
    let service = service(&store, SaveMode::Serialized);
    service.load().await;

    service.update_field("OPS-2", CostField::Shipping, dec!(40)).await.unwrap();
    service.load().await;
    assert_eq!(service.row("OPS-2").await.unwrap().costs.shipping, dec!(0));
}

#[tokio::test]
async fn test_failed_save_keeps_edit_in_memory() {
    let store = seeded_store().await;
    let service = service(&store, SaveMode::Serialized);
    service.load().await;

    store.set_fail_on_upsert(true);
    let (row, status) = service.edit_and_save("OPS-2", CostField::Rework, "75").await;

    assert_eq!(status, SaveStatus::Failed);
    assert!(status.is_failure());
    let row = row.unwrap();
    assert_eq!(row.costs.rework, dec!(75));
    assert!(row.updated_at.is_none());
    assert!(store.writes().await.is_empty());
    assert!(store.get(COSTS, "OPS-2").await.is_none());
}

#[tokio::test]
async fn test_save_is_idempotent_apart_from_timestamp() {
    let store = seeded_store().await;
    let service = service(&store, SaveMode::Serialized);
    service.load().await;

    assert_eq!(service.save("OPS-1").await, SaveStatus::Saved);
    assert_eq!(service.save("OPS-1").await, SaveStatus::Saved);

    let writes = store.writes().await;
    assert_eq!(writes.len(), 2);
    let strip = |mut doc: ops_cost_core::Document| {
        doc.remove("updatedAt");
        doc
    };
    assert_eq!(strip(writes[0].document.clone()), strip(writes[1].document.clone()));
    assert_eq!(writes[1].document["buyerName"], json!("Acme Rugs"));
    assert_eq!(writes[1].document["marginPercent"], json!(33.3));
}

#[tokio::test]
async fn test_serialized_saves_collapse_queued_requests() {
    let store = seeded_store().await;
    let service = service(&store, SaveMode::Serialized);
    service.load().await;

    store.pause_upserts();

    let spawn_save = || {
        let service = Arc::clone(&service);
        tokio::spawn(async move { service.save("OPS-2").await })
    };

    let first = spawn_save();
    while store.upserts_started() < 1 {
        tokio::task::yield_now().await;
    }

    service.update_field("OPS-2", CostField::Dyeing, dec!(10)).await.unwrap();
    let second = spawn_save();
    settle().await;

    service.update_field("OPS-2", CostField::Dyeing, dec!(20)).await.unwrap();
    let third = spawn_save();
    settle().await;

    // Still only the first write has started.
    assert_eq!(store.upserts_started(), 1);
    store.resume_upserts();

    assert_eq!(first.await.unwrap(), SaveStatus::Saved);
    assert_eq!(second.await.unwrap(), SaveStatus::Superseded);
    assert_eq!(third.await.unwrap(), SaveStatus::Saved);

    let writes = store.writes().await;
    assert_eq!(writes.len(), 2);
    assert_eq!(writes[0].document["dyeing"], json!(0));
    assert_eq!(writes[1].document["dyeing"], json!(20));
    assert_eq!(store.get(COSTS, "OPS-2").await.unwrap()["totalCost"], json!(20));
}

#[tokio::test]
async fn test_concurrent_mode_writes_every_request() {
    let store = seeded_store().await;
    let service = service(&store, SaveMode::Concurrent);
    service.load().await;

    store.pause_upserts();
    let saves: Vec<_> = (0..3)
        .map(|_| {
            let service = Arc::clone(&service);
            tokio::spawn(async move { service.save("OPS-10").await })
        })
        .collect();
    settle().await;
    assert_eq!(store.upserts_started(), 3);

    store.resume_upserts();
    for save in saves {
        assert_eq!(save.await.unwrap(), SaveStatus::Saved);
    }
    assert_eq!(store.writes().await.len(), 3);

    // poValue 0: no margin percent.
    let stored = store.get(COSTS, "OPS-10").await.unwrap();
    assert_eq!(stored["margin"], json!(0));
    assert_eq!(stored["marginPercent"], json!(0));
}
