//! The unlock flag, kept in a small JSON file between CLI runs.
//!
//! # Environment Variables
//!
//! - `TRACKER_STATE_DIR` - directory for the flag file
//!   (default `$HOME/.local/state/ops-cost-tracker`)

use std::path::{Path, PathBuf};

use ops_cost_core::gate::{UNLOCK_FLAG_KEY, UnlockFlag};
use serde_json::{Map, Value};
use thiserror::Error;

const FLAG_FILE: &str = "flags.json";

/// Errors reading or writing the flag file.
#[derive(Debug, Error)]
pub enum FlagError {
    /// No state directory could be determined.
    #[error("Cannot locate state directory: set TRACKER_STATE_DIR or HOME")]
    NoStateDir,

    #[error("Flag file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Flag file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Unlock flag persisted as `{"ops_cost_auth": true}`.
#[derive(Debug, Clone)]
pub struct FileFlag {
    path: PathBuf,
}

impl FileFlag {
    /// Flag stored in `dir`.
    #[must_use]
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(FLAG_FILE),
        }
    }

    /// Flag stored in the configured state directory.
    ///
    /// # Errors
    ///
    /// Returns `FlagError::NoStateDir` if neither variable is set.
    pub fn from_env() -> Result<Self, FlagError> {
        let dir = std::env::var_os("TRACKER_STATE_DIR")
            .filter(|dir| !dir.is_empty())
            .map(PathBuf::from)
            .or_else(|| {
                std::env::var_os("HOME")
                    .map(|home| PathBuf::from(home).join(".local/state/ops-cost-tracker"))
            })
            .ok_or(FlagError::NoStateDir)?;
        Ok(Self::in_dir(dir))
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read(&self) -> Result<Map<String, Value>, FlagError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Map::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn write(&self, flags: &Map<String, Value>) -> Result<(), FlagError> {
        if let Some(dir) = self.path.parent() {
            tokio::fs::create_dir_all(dir).await?;
        }
        tokio::fs::write(&self.path, serde_json::to_vec_pretty(flags)?).await?;
        Ok(())
    }
}

impl UnlockFlag for FileFlag {
    type Error = FlagError;

    async fn is_set(&self) -> Result<bool, FlagError> {
        Ok(self
            .read()
            .await?
            .get(UNLOCK_FLAG_KEY)
            .and_then(Value::as_bool)
            .unwrap_or(false))
    }

    async fn set(&self) -> Result<(), FlagError> {
        let mut flags = self.read().await?;
        flags.insert(UNLOCK_FLAG_KEY.to_string(), Value::Bool(true));
        self.write(&flags).await
    }

    async fn clear(&self) -> Result<(), FlagError> {
        let mut flags = self.read().await?;
        if flags.remove(UNLOCK_FLAG_KEY).is_some() {
            self.write(&flags).await?;
        }
        Ok(())
    }
}
