//! HTTP middleware for the tracker.
//!
//! # Layer order (outermost first)
//!
//! 1. Sentry layers (capture errors, transactions)
//! 2. `TraceLayer` (request spans with status and latency)
//! 3. Session layer (tower-sessions, long-lived cookie)
//!
//! The unlock check is an extractor ([`auth::RequireUnlocked`]) rather than a
//! layer so `/health` and the PIN routes stay open.

pub mod auth;
pub mod session;

pub use auth::{RequireUnlocked, SessionFlag};
pub use session::{JsonSessionStore, create_session_layer, create_session_store};
