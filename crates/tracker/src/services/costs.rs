//! The load/edit/save loop over the two collections.
//!
//! Store failures never escape this service: loads keep the previous rows and
//! saves keep the edited row in memory. Both log the error and report a
//! status so the caller can show an indicator.

use std::sync::Arc;

use chrono::Utc;
use ops_cost_core::reconcile::{decode_orders, decode_overlays, merge};
use ops_cost_core::{CostField, CostRow, CostSheet, parse_amount};
use rust_decimal::Decimal;
use tokio::sync::{RwLock, RwLockReadGuard};
use tracing::instrument;

use super::save_queue::{Queued, SaveQueue};
use crate::config::SaveMode;
use crate::store::{DocumentStore, StoreError};

/// Outcome of a load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadStatus {
    /// The sheet was replaced with `rows` fresh rows.
    Loaded { rows: usize },
    /// Reading failed; the previous rows are still in place.
    Failed,
}

/// Outcome of a save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveStatus {
    Saved,
    /// A newer save for the same order replaced this one before it started.
    Superseded,
    /// The write failed; the edited row is still in memory.
    Failed,
    /// No row has that order number.
    NotFound,
}

impl SaveStatus {
    #[must_use]
    pub const fn is_failure(&self) -> bool {
        matches!(self, Self::Failed)
    }
}

/// Cost sheet service shared by the web handlers and the CLI.
pub struct CostService {
    store: Arc<dyn DocumentStore>,
    orders_collection: String,
    costs_collection: String,
    save_mode: SaveMode,
    sheet: RwLock<CostSheet>,
    queue: SaveQueue,
}

impl std::fmt::Debug for CostService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CostService")
            .field("orders_collection", &self.orders_collection)
            .field("costs_collection", &self.costs_collection)
            .field("save_mode", &self.save_mode)
            .finish_non_exhaustive()
    }
}

impl CostService {
    #[must_use]
    pub fn new(
        store: Arc<dyn DocumentStore>,
        orders_collection: impl Into<String>,
        costs_collection: impl Into<String>,
        save_mode: SaveMode,
    ) -> Self {
        Self {
            store,
            orders_collection: orders_collection.into(),
            costs_collection: costs_collection.into(),
            save_mode,
            sheet: RwLock::new(CostSheet::default()),
            queue: SaveQueue::new(),
        }
    }

    /// Read access to the current rows.
    pub async fn sheet(&self) -> RwLockReadGuard<'_, CostSheet> {
        self.sheet.read().await
    }

    /// A copy of one row.
    pub async fn row(&self, ops_no: &str) -> Option<CostRow> {
        self.sheet.read().await.row(ops_no).cloned()
    }

    /// Read both collections and rebuild the sheet.
    ///
    /// Unsaved edits are discarded on success. On failure the previous rows
    /// are kept.
    #[instrument(skip(self))]
    pub async fn load(&self) -> LoadStatus {
        match self.fetch_sheet().await {
            Ok(sheet) => {
                let rows = sheet.len();
                *self.sheet.write().await = sheet;
                tracing::info!(rows, "Cost sheet loaded");
                LoadStatus::Loaded { rows }
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to load cost sheet");
                LoadStatus::Failed
            }
        }
    }

    async fn fetch_sheet(&self) -> Result<CostSheet, StoreError> {
        let costs = self.store.fetch_all(&self.costs_collection).await?;
        let orders = self.store.fetch_all(&self.orders_collection).await?;
        Ok(merge(decode_orders(orders), &decode_overlays(costs)))
    }

    /// Set one field in memory. Nothing is written.
    pub async fn update_field(
        &self,
        ops_no: &str,
        field: CostField,
        value: Decimal,
    ) -> Option<CostRow> {
        self.sheet
            .write()
            .await
            .update_field(ops_no, field, value)
            .cloned()
    }

    /// Parse text input, set the field and save the row, as a cell edit does
    /// when it loses focus.
    pub async fn edit_and_save(
        &self,
        ops_no: &str,
        field: CostField,
        input: &str,
    ) -> (Option<CostRow>, SaveStatus) {
        if self.update_field(ops_no, field, parse_amount(input)).await.is_none() {
            return (None, SaveStatus::NotFound);
        }
        let status = self.save(ops_no).await;
        (self.row(ops_no).await, status)
    }

    /// Persist one row with freshly computed totals.
    ///
    /// The row is read when the write starts, so a save that waited behind
    /// another one still sends the latest values.
    #[instrument(skip(self))]
    pub async fn save(&self, ops_no: &str) -> SaveStatus {
        if self.row(ops_no).await.is_none() {
            return SaveStatus::NotFound;
        }

        match self.save_mode {
            SaveMode::Concurrent => self.write_row(ops_no).await,
            SaveMode::Serialized => match self.queue.run(ops_no, || self.write_row(ops_no)).await {
                Queued::Ran(status) => status,
                Queued::Superseded => SaveStatus::Superseded,
            },
        }
    }

    async fn write_row(&self, ops_no: &str) -> SaveStatus {
        let Some(row) = self.row(ops_no).await else {
            return SaveStatus::NotFound;
        };

        let now = Utc::now();
        let document = match row.to_overlay(now).to_document() {
            Ok(document) => document,
            Err(e) => {
                tracing::error!(ops_no, error = %e, "Failed to encode cost overlay");
                return SaveStatus::Failed;
            }
        };

        match self
            .store
            .upsert(&self.costs_collection, row.ops_no.as_str(), document)
            .await
        {
            Ok(()) => {
                self.sheet.write().await.mark_saved(ops_no, now);
                tracing::info!(ops_no, total_cost = %row.totals().total_cost, "Costs saved");
                SaveStatus::Saved
            }
            Err(e) => {
                tracing::error!(ops_no, error = %e, "Failed to save costs");
                SaveStatus::Failed
            }
        }
    }
}
