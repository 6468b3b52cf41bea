//! Remote document store access.
//!
//! The tracker needs exactly two operations: read a whole collection and
//! upsert one document by key. [`DocumentStore`] is that seam; the Firestore
//! REST client implements it for real deployments and [`MemoryStore`] for
//! tests and offline use.

use async_trait::async_trait;
use ops_cost_core::{Document, DocumentSet};
use thiserror::Error;

pub mod codec;
pub mod firestore;
pub mod memory;

pub use firestore::FirestoreClient;
pub use memory::MemoryStore;

/// Errors that can occur when talking to the document store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// HTTP request failed before a response arrived.
    #[error("Store request failed: {0}")]
    Request(String),

    /// Failed to read or parse the response body.
    #[error("Store response error: {0}")]
    Response(String),

    /// The store answered with an error status.
    #[error("Store API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// A document could not be encoded or decoded.
    #[error("Store decode error: {0}")]
    Decode(String),

    /// Client could not be configured.
    #[error("Store configuration error: {0}")]
    Config(String),
}

/// Read-all and upsert-one over named collections.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Every document in `collection`, keyed by document key.
    ///
    /// Implementations that page internally must return the full collection.
    async fn fetch_all(&self, collection: &str) -> Result<DocumentSet, StoreError>;

    /// Create or fully replace the document at `key`.
    async fn upsert(&self, collection: &str, key: &str, document: Document)
    -> Result<(), StoreError>;
}
