//! Tracker configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `FIRESTORE_PROJECT_ID` - Project that hosts the order and cost collections
//!
//! ## Optional
//! - `FIRESTORE_API_KEY` - Web API key, sent as the `key` query parameter
//! - `FIRESTORE_DATABASE` - Database ID (default: `(default)`)
//! - `FIRESTORE_BASE_URL` - REST endpoint (default: <https://firestore.googleapis.com/v1>)
//! - `ORDERS_COLLECTION` - Order collection (default: `ops_no`)
//! - `COSTS_COLLECTION` - Cost overlay collection (default: `ops_costs`)
//! - `TRACKER_HOST` - Bind address (default: 127.0.0.1)
//! - `TRACKER_PORT` - Listen port (default: 3002)
//! - `TRACKER_BASE_URL` - Public URL (default: `http://{host}:{port}`)
//! - `TRACKER_PIN` - Four-digit access PIN (default: 1234)
//! - `TRACKER_SAVE_MODE` - `serialized` or `concurrent` (default: serialized)
//! - `TRACKER_SESSION_FILE` - Persist sessions to this JSON file
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` / `SENTRY_TRACES_SAMPLE_RATE` - 0.0 to 1.0 (default: 1.0)
//! - `LOG_FORMAT` - `json` for structured logs, anything else for text

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;

use ops_cost_core::gate::{DEFAULT_PIN, Pin};
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

pub const DEFAULT_FIRESTORE_BASE_URL: &str = "https://firestore.googleapis.com/v1";
pub const DEFAULT_ORDERS_COLLECTION: &str = "ops_no";
pub const DEFAULT_COSTS_COLLECTION: &str = "ops_costs";

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "dummy",
    "xxx",
    "todo",
    "insert",
    "put-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// How saves for the same order are coordinated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SaveMode {
    /// One write in flight per order; newer saves supersede queued ones.
    #[default]
    Serialized,
    /// Every save writes immediately; the last write to land wins.
    Concurrent,
}

impl FromStr for SaveMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "serialized" | "serial" => Ok(Self::Serialized),
            "concurrent" => Ok(Self::Concurrent),
            other => Err(format!("expected 'serialized' or 'concurrent', got '{other}'")),
        }
    }
}

/// Document store connection settings.
#[derive(Clone)]
pub struct FirestoreConfig {
    pub project_id: String,
    pub database: String,
    pub base_url: String,
    pub api_key: Option<SecretString>,
    pub orders_collection: String,
    pub costs_collection: String,
}

impl std::fmt::Debug for FirestoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FirestoreConfig")
            .field("project_id", &self.project_id)
            .field("database", &self.database)
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("orders_collection", &self.orders_collection)
            .field("costs_collection", &self.costs_collection)
            .finish()
    }
}

impl FirestoreConfig {
    /// Settings for a given project with every optional value at its default.
    #[must_use]
    pub fn new(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            database: "(default)".to_string(),
            base_url: DEFAULT_FIRESTORE_BASE_URL.to_string(),
            api_key: None,
            orders_collection: DEFAULT_ORDERS_COLLECTION.to_string(),
            costs_collection: DEFAULT_COSTS_COLLECTION.to_string(),
        }
    }

    /// Load document store settings from environment.
    ///
    /// Shared with the CLI, which talks to the same collections.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the project is missing or the API key looks
    /// like a placeholder.
    pub fn from_env() -> Result<Self, ConfigError> {
        let project_id = get_required_env("FIRESTORE_PROJECT_ID")?;
        let api_key = match get_optional_env("FIRESTORE_API_KEY") {
            Some(key) => {
                validate_api_key(&key, "FIRESTORE_API_KEY")?;
                Some(SecretString::from(key))
            }
            None => None,
        };

        Ok(Self {
            project_id,
            database: get_env_or_default("FIRESTORE_DATABASE", "(default)"),
            base_url: get_env_or_default("FIRESTORE_BASE_URL", DEFAULT_FIRESTORE_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
            api_key,
            orders_collection: get_env_or_default("ORDERS_COLLECTION", DEFAULT_ORDERS_COLLECTION),
            costs_collection: get_env_or_default("COSTS_COLLECTION", DEFAULT_COSTS_COLLECTION),
        })
    }
}

/// Tracker application configuration.
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL
    pub base_url: String,
    /// Access PIN
    pub pin: Pin,
    /// Save coordination
    pub save_mode: SaveMode,
    /// JSON file for persisted sessions; in-memory when unset
    pub session_file: Option<PathBuf>,
    /// Document store settings
    pub firestore: FirestoreConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g., "development", "production")
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate (0.0 to 1.0)
    pub sentry_sample_rate: f32,
    /// Sentry traces sample rate (0.0 to 1.0)
    pub sentry_traces_sample_rate: f32,
    /// Emit JSON logs
    pub json_logs: bool,
}

impl TrackerConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let host = get_env_or_default("TRACKER_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("TRACKER_HOST".to_string(), e.to_string()))?;
        let port = get_env_or_default("TRACKER_PORT", "3002")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("TRACKER_PORT".to_string(), e.to_string()))?;
        let base_url = get_optional_env("TRACKER_BASE_URL")
            .unwrap_or_else(|| format!("http://{}", SocketAddr::new(host, port)));

        let pin = Pin::new(&get_env_or_default("TRACKER_PIN", DEFAULT_PIN))
            .map_err(|e| ConfigError::InvalidEnvVar("TRACKER_PIN".to_string(), e.to_string()))?;
        let save_mode = get_env_or_default("TRACKER_SAVE_MODE", "serialized")
            .parse::<SaveMode>()
            .map_err(|e| ConfigError::InvalidEnvVar("TRACKER_SAVE_MODE".to_string(), e))?;
        let session_file = get_optional_env("TRACKER_SESSION_FILE").map(PathBuf::from);

        let firestore = FirestoreConfig::from_env()?;

        let sentry_dsn = get_optional_env("SENTRY_DSN");
        let sentry_environment = get_optional_env("SENTRY_ENVIRONMENT");
        let sentry_sample_rate = get_optional_env("SENTRY_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);
        let sentry_traces_sample_rate = get_optional_env("SENTRY_TRACES_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);
        let json_logs = get_optional_env("LOG_FORMAT").is_some_and(|f| f.eq_ignore_ascii_case("json"));

        Ok(Self {
            host,
            port,
            base_url,
            pin,
            save_mode,
            session_file,
            firestore,
            sentry_dsn,
            sentry_environment,
            sentry_sample_rate,
            sentry_traces_sample_rate,
            json_logs,
        })
    }

    /// Configuration for tests and local tooling: loopback, default PIN,
    /// in-memory sessions, no Sentry.
    #[must_use]
    pub fn local(firestore: FirestoreConfig) -> Self {
        Self {
            host: IpAddr::from([127, 0, 0, 1]),
            port: 3002,
            base_url: "http://127.0.0.1:3002".to_string(),
            pin: Pin::default(),
            save_mode: SaveMode::default(),
            session_file: None,
            firestore,
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 1.0,
            json_logs: false,
        }
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether the session cookie should be marked `Secure`.
    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable. Empty values count as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

/// Reject API keys that are obviously placeholders.
fn validate_api_key(key: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = key.to_lowercase();
    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }
    Ok(())
}

/// Expose the API key for building a request URL.
pub(crate) fn api_key_param(config: &FirestoreConfig) -> Option<&str> {
    config.api_key.as_ref().map(|key| key.expose_secret())
}
