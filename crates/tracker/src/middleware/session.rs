//! Session middleware configuration.
//!
//! The unlock flag lives in the session, so the cookie is long-lived (365 days
//! of inactivity). Sessions are kept in memory and, when a file is configured,
//! mirrored to JSON so unlocks survive a restart.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tower_sessions::cookie::time::{Duration, OffsetDateTime};
use tower_sessions::session::{Id, Record};
use tower_sessions::session_store::{self, SessionStore};
use tower_sessions::{Expiry, SessionManagerLayer};

use crate::config::TrackerConfig;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "ops_cost_session";

/// Session expiry after inactivity (365 days).
const SESSION_EXPIRY_DAYS: i64 = 365;

/// Session store backed by a map, optionally persisted to a JSON file.
#[derive(Debug, Clone, Default)]
pub struct JsonSessionStore {
    path: Option<PathBuf>,
    records: Arc<Mutex<HashMap<Id, Record>>>,
}

impl JsonSessionStore {
    /// A store that forgets everything on restart.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Open (or start) a file-backed store.
    ///
    /// A missing file starts empty. An unreadable file is logged and replaced
    /// on the next write.
    pub async fn open(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let records = match tokio::fs::read(&path).await {
            Ok(bytes) => match serde_json::from_slice::<Vec<Record>>(&bytes) {
                Ok(records) => {
                    let now = OffsetDateTime::now_utc();
                    records
                        .into_iter()
                        .filter(|record| record.expiry_date > now)
                        .map(|record| (record.id, record))
                        .collect()
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Ignoring unreadable session file");
                    HashMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Could not read session file");
                HashMap::new()
            }
        };

        tracing::debug!(sessions = records.len(), path = %path.display(), "Session store opened");
        Self {
            path: Some(path),
            records: Arc::new(Mutex::new(records)),
        }
    }

    /// Write every record to the backing file, if there is one.
    async fn persist(&self, records: &HashMap<Id, Record>) -> session_store::Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let all: Vec<&Record> = records.values().collect();
        let bytes = serde_json::to_vec(&all)
            .map_err(|e| session_store::Error::Encode(e.to_string()))?;

        let tmp = path.with_extension("tmp");
        tokio::fs::write(&tmp, bytes)
            .await
            .map_err(|e| session_store::Error::Backend(e.to_string()))?;
        tokio::fs::rename(&tmp, path)
            .await
            .map_err(|e| session_store::Error::Backend(e.to_string()))
    }
}

#[async_trait]
impl SessionStore for JsonSessionStore {
    async fn create(&self, record: &mut Record) -> session_store::Result<()> {
        let mut records = self.records.lock().await;
        while records.contains_key(&record.id) {
            record.id = Id::default();
        }
        records.insert(record.id, record.clone());
        self.persist(&records).await
    }

    async fn save(&self, record: &Record) -> session_store::Result<()> {
        let mut records = self.records.lock().await;
        records.insert(record.id, record.clone());
        self.persist(&records).await
    }

    async fn load(&self, session_id: &Id) -> session_store::Result<Option<Record>> {
        let records = self.records.lock().await;
        Ok(records
            .get(session_id)
            .filter(|record| record.expiry_date > OffsetDateTime::now_utc())
            .cloned())
    }

    async fn delete(&self, session_id: &Id) -> session_store::Result<()> {
        let mut records = self.records.lock().await;
        records.remove(session_id);
        self.persist(&records).await
    }
}

/// Build the session store the configuration asks for.
pub async fn create_session_store(config: &TrackerConfig) -> JsonSessionStore {
    match &config.session_file {
        Some(path) => JsonSessionStore::open(path).await,
        None => JsonSessionStore::in_memory(),
    }
}

/// Create the session layer.
#[must_use]
pub fn create_session_layer(
    store: JsonSessionStore,
    config: &TrackerConfig,
) -> SessionManagerLayer<JsonSessionStore> {
    SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(Duration::days(SESSION_EXPIRY_DAYS)))
        .with_secure(config.is_secure())
        .with_same_site(tower_sessions::cookie::SameSite::Strict)
        .with_http_only(true)
        .with_path("/")
}
