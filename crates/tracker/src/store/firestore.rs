//! Firestore REST v1 client.
//!
//! Lists whole collections (following `nextPageToken`) and upserts single
//! documents with `PATCH`, which replaces the stored document outright.

use std::time::Duration;

use async_trait::async_trait;
use ops_cost_core::{Document, DocumentSet};
use reqwest::{Client, Response};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::{debug, error, instrument};
use url::Url;

use super::codec::{decode_fields, encode_fields};
use super::{DocumentStore, StoreError};
use crate::config::{FirestoreConfig, api_key_param};

/// Documents requested per list call.
const PAGE_SIZE: &str = "300";

/// Per-request timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListDocumentsResponse {
    #[serde(default)]
    documents: Vec<FirestoreDocument>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FirestoreDocument {
    name: String,
    #[serde(default)]
    fields: Map<String, Value>,
}

impl FirestoreDocument {
    /// The document key: the last segment of its resource name.
    fn key(&self) -> &str {
        self.name.rsplit('/').next().unwrap_or(&self.name)
    }
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// Firestore REST client.
#[derive(Clone)]
pub struct FirestoreClient {
    client: Client,
    config: FirestoreConfig,
}

impl std::fmt::Debug for FirestoreClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FirestoreClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl FirestoreClient {
    /// Create a new client.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Config` if the HTTP client cannot be built or the
    /// base URL is not a valid absolute URL.
    pub fn new(config: FirestoreConfig) -> Result<Self, StoreError> {
        Url::parse(&config.base_url)
            .map_err(|e| StoreError::Config(format!("invalid base URL: {e}")))?;

        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| StoreError::Config(e.to_string()))?;

        Ok(Self { client, config })
    }

    #[must_use]
    pub const fn config(&self) -> &FirestoreConfig {
        &self.config
    }

    /// `{base}/projects/{project}/databases/{db}/documents/{segments...}`
    fn documents_url(&self, segments: &[&str]) -> Result<Url, StoreError> {
        let mut url = Url::parse(&self.config.base_url)
            .map_err(|e| StoreError::Config(format!("invalid base URL: {e}")))?;
        url.path_segments_mut()
            .map_err(|()| StoreError::Config("base URL cannot have a path".to_string()))?
            .pop_if_empty()
            .extend([
                "projects",
                self.config.project_id.as_str(),
                "databases",
                self.config.database.as_str(),
                "documents",
            ])
            .extend(segments);
        Ok(url)
    }

    /// Map a response to `T`, turning error statuses into `StoreError::Api`.
    async fn parse<T: DeserializeOwned>(response: Response) -> Result<T, StoreError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorEnvelope>(&body)
                .map(|envelope| envelope.error.message)
                .unwrap_or(body);
            error!(status = status.as_u16(), message = %message, "Firestore API error");
            return Err(StoreError::Api {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json()
            .await
            .map_err(|e| StoreError::Response(e.to_string()))
    }
}

#[async_trait]
impl DocumentStore for FirestoreClient {
    #[instrument(skip(self), fields(collection = %collection))]
    async fn fetch_all(&self, collection: &str) -> Result<DocumentSet, StoreError> {
        let mut documents = DocumentSet::new();
        let mut page_token: Option<String> = None;
        let mut pages = 0_usize;

        loop {
            let mut url = self.documents_url(&[collection])?;
            {
                let mut query = url.query_pairs_mut();
                query.append_pair("pageSize", PAGE_SIZE);
                if let Some(token) = &page_token {
                    query.append_pair("pageToken", token);
                }
                if let Some(key) = api_key_param(&self.config) {
                    query.append_pair("key", key);
                }
            }

            let response = self
                .client
                .get(url)
                .send()
                .await
                .map_err(|e| StoreError::Request(e.to_string()))?;
            let page: ListDocumentsResponse = Self::parse(response).await?;
            pages += 1;

            for document in page.documents {
                documents.insert(document.key().to_string(), decode_fields(&document.fields));
            }

            match page.next_page_token.filter(|token| !token.is_empty()) {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        debug!(count = documents.len(), pages, "Fetched collection");
        Ok(documents)
    }

    #[instrument(skip(self, document), fields(collection = %collection, key = %key))]
    async fn upsert(
        &self,
        collection: &str,
        key: &str,
        document: Document,
    ) -> Result<(), StoreError> {
        let mut url = self.documents_url(&[collection, key])?;
        if let Some(api_key) = api_key_param(&self.config) {
            url.query_pairs_mut().append_pair("key", api_key);
        }

        let body = serde_json::json!({ "fields": encode_fields(&document) });

        let response = self
            .client
            .patch(url)
            .json(&body)
            .send()
            .await
            .map_err(|e| StoreError::Request(e.to_string()))?;
        let _stored: Value = Self::parse(response).await?;

        debug!("Document upserted");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use secrecy::SecretString;

    #[test]
    fn test_documents_url() {
        let client = FirestoreClient::new(FirestoreConfig::new("eastern")).unwrap();
        let url = client.documents_url(&["ops_costs", "OPS-1"]).unwrap();
        assert_eq!(
            url.as_str(),
            "https://firestore.googleapis.com/v1/projects/eastern/databases/(default)/documents/ops_costs/OPS-1"
        );
    }

    #[test]
    fn test_documents_url_escapes_keys() {
        let mut config = FirestoreConfig::new("eastern");
        config.base_url = "http://127.0.0.1:8080".to_string();
        let client = FirestoreClient::new(config).unwrap();

        let url = client.documents_url(&["ops_costs", "OPS 1/2"]).unwrap();
        assert_eq!(
            url.as_str(),
            "http://127.0.0.1:8080/projects/eastern/databases/(default)/documents/ops_costs/OPS%201%2F2"
        );
    }

    #[test]
    fn test_document_key_from_name() {
        let document = FirestoreDocument {
            name: "projects/p/databases/(default)/documents/ops_no/OPS-42".to_string(),
            fields: Map::new(),
        };
        assert_eq!(document.key(), "OPS-42");
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let mut config = FirestoreConfig::new("eastern");
        config.api_key = Some(SecretString::from("AIzaSyB3k9Qm2Lx7Vt"));
        let client = FirestoreClient::new(config).unwrap();

        let debug = format!("{client:?}");
        assert!(!debug.contains("AIzaSyB3k9Qm2Lx7Vt"));
    }

    #[test]
    fn test_rejects_invalid_base_url() {
        let mut config = FirestoreConfig::new("eastern");
        config.base_url = "not a url".to_string();
        assert!(matches!(
            FirestoreClient::new(config),
            Err(StoreError::Config(_))
        ));
    }
}
