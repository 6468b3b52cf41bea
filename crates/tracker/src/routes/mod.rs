//! HTTP route handlers for the tracker.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                     - Health check (registered in main)
//!
//! # Gate
//! GET  /auth/pin                   - PIN page
//! POST /auth/pin                   - Submit PIN
//! POST /auth/logout                - Lock
//!
//! # Cost table (HTML + HTMX)
//! GET  /                           - Cost table (?q= search)
//! POST /reload                     - Reload rows from the store
//! GET  /orders/{ops_no}            - Order detail panel
//! POST /costs/{ops_no}/{field}     - Edit one cell and save the row
//!
//! # JSON API
//! GET  /api/costs                  - Merged rows
//! PUT  /api/costs/{ops_no}/{field} - Update one field in memory
//! POST /api/costs/{ops_no}/save    - Save a row
//! GET  /api/stats                  - Dashboard figures
//! ```

pub mod api;
pub mod auth;
pub mod costs;

use askama::Template;
use axum::{Router, response::Html};

use crate::error::AppError;
use crate::state::AppState;

/// Build the complete router, minus health and static files.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(auth::router())
        .merge(costs::router())
        .merge(api::router())
}

/// Render a template, turning failures into a 500.
pub(crate) fn render(template: &impl Template) -> Result<Html<String>, AppError> {
    template
        .render()
        .map(Html)
        .map_err(|e| AppError::Internal(format!("template: {e}")))
}
