//! In-memory document store for tests and offline runs.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use ops_cost_core::{Document, DocumentSet};
use tokio::sync::{RwLock, watch};

use super::{DocumentStore, StoreError};

/// A completed upsert.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedWrite {
    pub collection: String,
    pub key: String,
    pub document: Document,
}

/// Document store that keeps collections in memory.
///
/// Failures can be switched on per operation, and upserts can be paused to
/// hold a write in flight.
#[derive(Debug)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, DocumentSet>>,
    writes: RwLock<Vec<RecordedWrite>>,
    upserts_started: AtomicUsize,
    fail_on_fetch: AtomicBool,
    fail_on_upsert: AtomicBool,
    paused: watch::Sender<bool>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self {
            collections: RwLock::default(),
            writes: RwLock::default(),
            upserts_started: AtomicUsize::new(0),
            fail_on_fetch: AtomicBool::new(false),
            fail_on_upsert: AtomicBool::new(false),
            paused: watch::Sender::new(false),
        }
    }
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a document without recording a write.
    pub async fn insert(&self, collection: &str, key: &str, document: Document) {
        self.collections
            .write()
            .await
            .entry(collection.to_string())
            .or_default()
            .insert(key.to_string(), document);
    }

    /// Current contents of one document.
    pub async fn get(&self, collection: &str, key: &str) -> Option<Document> {
        self.collections
            .read()
            .await
            .get(collection)
            .and_then(|docs| docs.get(key))
            .cloned()
    }

    /// Every upsert that completed, in order.
    pub async fn writes(&self) -> Vec<RecordedWrite> {
        self.writes.read().await.clone()
    }

    /// Upserts that have begun, including paused and failed ones.
    pub fn upserts_started(&self) -> usize {
        self.upserts_started.load(Ordering::SeqCst)
    }

    pub fn set_fail_on_fetch(&self, fail: bool) {
        self.fail_on_fetch.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_on_upsert(&self, fail: bool) {
        self.fail_on_upsert.store(fail, Ordering::SeqCst);
    }

    /// Hold upserts until [`resume_upserts`](Self::resume_upserts).
    pub fn pause_upserts(&self) {
        self.paused.send_replace(true);
    }

    pub fn resume_upserts(&self) {
        self.paused.send_replace(false);
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn fetch_all(&self, collection: &str) -> Result<DocumentSet, StoreError> {
        if self.fail_on_fetch.load(Ordering::SeqCst) {
            return Err(StoreError::Request(format!(
                "fetch of {collection} failed (simulated)"
            )));
        }

        Ok(self
            .collections
            .read()
            .await
            .get(collection)
            .cloned()
            .unwrap_or_default())
    }

    async fn upsert(
        &self,
        collection: &str,
        key: &str,
        document: Document,
    ) -> Result<(), StoreError> {
        self.upserts_started.fetch_add(1, Ordering::SeqCst);

        let mut paused = self.paused.subscribe();
        // The sender lives in self, so the channel cannot close here.
        let _ = paused.wait_for(|held| !*held).await;

        if self.fail_on_upsert.load(Ordering::SeqCst) {
            return Err(StoreError::Api {
                status: 503,
                message: format!("write to {collection}/{key} failed (simulated)"),
            });
        }

        self.insert(collection, key, document.clone()).await;
        self.writes.write().await.push(RecordedWrite {
            collection: collection.to_string(),
            key: key.to_string(),
            document,
        });
        Ok(())
    }
}
