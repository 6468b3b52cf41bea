//! Unlock checks for route handlers.
//!
//! The unlock flag is a boolean in the browser session. [`SessionFlag`]
//! exposes it to the access gate; [`RequireUnlocked`] guards every route that
//! shows or edits cost data.

use axum::{
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use ops_cost_core::gate::{UNLOCK_FLAG_KEY, UnlockFlag};
use tower_sessions::Session;

/// Path of the PIN page.
pub const PIN_PAGE: &str = "/auth/pin";

/// Unlock flag stored in the session.
#[derive(Debug, Clone)]
pub struct SessionFlag(Session);

impl SessionFlag {
    #[must_use]
    pub const fn new(session: Session) -> Self {
        Self(session)
    }
}

impl UnlockFlag for SessionFlag {
    type Error = tower_sessions::session::Error;

    async fn is_set(&self) -> Result<bool, Self::Error> {
        Ok(self.0.get::<bool>(UNLOCK_FLAG_KEY).await?.unwrap_or(false))
    }

    async fn set(&self) -> Result<(), Self::Error> {
        // New id on privilege change.
        self.0.cycle_id().await?;
        self.0.insert(UNLOCK_FLAG_KEY, true).await
    }

    async fn clear(&self) -> Result<(), Self::Error> {
        self.0.remove::<bool>(UNLOCK_FLAG_KEY).await?;
        Ok(())
    }
}

/// Extractor that requires the gate to be unlocked.
///
/// If it is locked, HTML requests are redirected to the PIN page and API
/// requests get 401 Unauthorized.
#[derive(Debug, Clone, Copy)]
pub struct RequireUnlocked;

/// Returned when the gate is locked.
#[derive(Debug)]
pub enum LockedRejection {
    /// Redirect to the PIN page (for HTML requests).
    RedirectToPin,
    /// Unauthorized response (for API requests).
    Unauthorized,
}

impl IntoResponse for LockedRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToPin => Redirect::to(PIN_PAGE).into_response(),
            Self::Unauthorized => StatusCode::UNAUTHORIZED.into_response(),
        }
    }
}

impl<S> FromRequestParts<S> for RequireUnlocked
where
    S: Send + Sync,
{
    type Rejection = LockedRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let is_api = parts.uri.path().starts_with("/api/");
        let rejection = || {
            if is_api {
                LockedRejection::Unauthorized
            } else {
                LockedRejection::RedirectToPin
            }
        };

        // Get the session from extensions (set by SessionManagerLayer)
        let session = parts
            .extensions
            .get::<Session>()
            .cloned()
            .ok_or(LockedRejection::Unauthorized)?;

        let unlocked = SessionFlag::new(session)
            .is_set()
            .await
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Could not read unlock flag");
                false
            });

        if unlocked { Ok(Self) } else { Err(rejection()) }
    }
}
