//! PIN gate route handlers.
//!
//! The page posts the four digits as `d0`..`d3`; scripts and tests may send a
//! single `pin` field instead.

use std::time::Instant;

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};
use ops_cost_core::gate::{
    AccessGate, PIN_LENGTH, PinOutcome, REJECT_RESET_DELAY, UnlockFlag,
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::error::AppError;
use crate::middleware::SessionFlag;
use crate::middleware::auth::PIN_PAGE;
use crate::services::LoadStatus;
use crate::state::AppState;

/// PIN page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/pin.html")]
struct PinPageTemplate {
    slots: Vec<usize>,
    error: bool,
    reset_delay_ms: u128,
}

impl PinPageTemplate {
    fn new(error: bool) -> Self {
        Self {
            slots: (0..PIN_LENGTH).collect(),
            error,
            reset_delay_ms: REJECT_RESET_DELAY.as_millis(),
        }
    }
}

/// Form data for a PIN attempt.
#[derive(Debug, Default, Deserialize)]
pub struct PinForm {
    pub pin: Option<String>,
    pub d0: Option<String>,
    pub d1: Option<String>,
    pub d2: Option<String>,
    pub d3: Option<String>,
}

impl PinForm {
    /// The attempted code: `pin` if present, otherwise the digit fields
    /// joined in slot order.
    fn code(&self) -> String {
        if let Some(pin) = self.pin.as_deref().filter(|p| !p.is_empty()) {
            return pin.to_string();
        }
        [&self.d0, &self.d1, &self.d2, &self.d3]
            .into_iter()
            .filter_map(|d| d.as_deref())
            .collect()
    }
}

/// Build the auth router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route(PIN_PAGE, get(pin_page).post(submit_pin))
        .route("/auth/logout", post(logout))
}

/// Render the PIN page, or skip it when already unlocked.
///
/// GET /auth/pin
async fn pin_page(session: Session) -> Result<Response, AppError> {
    if SessionFlag::new(session).is_set().await? {
        return Ok(Redirect::to("/").into_response());
    }
    Ok(PinPageTemplate::new(false).into_response())
}

/// Check a PIN attempt.
///
/// POST /auth/pin
#[instrument(skip_all)]
async fn submit_pin(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<PinForm>,
) -> Result<Response, AppError> {
    let mut gate = AccessGate::new(state.pin().clone(), SessionFlag::new(session));

    match gate.submit(&form.code(), Instant::now()).await? {
        PinOutcome::Accepted => {
            // Fresh rows for the newly unlocked session.
            if state.costs().load().await == LoadStatus::Failed {
                tracing::warn!("Unlocked with a stale cost sheet");
            }
            Ok(Redirect::to("/").into_response())
        }
        outcome => {
            tracing::info!(?outcome, "PIN attempt rejected");
            Ok((StatusCode::UNAUTHORIZED, PinPageTemplate::new(true)).into_response())
        }
    }
}

/// Lock and return to the PIN page.
///
/// POST /auth/logout
async fn logout(State(state): State<AppState>, session: Session) -> Result<Redirect, AppError> {
    AccessGate::new(state.pin().clone(), SessionFlag::new(session))
        .lock()
        .await?;
    Ok(Redirect::to(PIN_PAGE))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_prefers_pin_field() {
        let form = PinForm {
            pin: Some("4321".to_string()),
            d0: Some("1".to_string()),
            ..PinForm::default()
        };
        assert_eq!(form.code(), "4321");
    }

    #[test]
    fn test_code_joins_digit_fields() {
        let form = PinForm {
            pin: Some(String::new()),
            d0: Some("1".to_string()),
            d1: Some("2".to_string()),
            d2: Some("3".to_string()),
            d3: Some("4".to_string()),
        };
        assert_eq!(form.code(), "1234");
    }

    #[test]
    fn test_missing_digits_give_short_code() {
        let form = PinForm {
            d0: Some("1".to_string()),
            d2: Some("3".to_string()),
            ..PinForm::default()
        };
        assert_eq!(form.code(), "13");
    }

    #[test]
    fn test_pin_page_renders_slots() {
        let html = PinPageTemplate::new(true).render().unwrap_or_default();
        assert!(html.contains("name=\"d0\""));
        assert!(html.contains("name=\"d3\""));
        assert!(html.contains("pin-error"));
    }
}
