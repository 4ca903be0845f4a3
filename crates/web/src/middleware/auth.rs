//! Authentication extractors.
//!
//! `RequireAuth` guards every dashboard page and the JSON API. It also keeps
//! the backend access token fresh: when it expires within
//! [`REFRESH_MARGIN_SECS`](crate::models::session::REFRESH_MARGIN_SECS), the
//! refresh token is exchanged and the session rewritten. A failed refresh
//! signs the seller out.

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use chrono::Utc;
use tower_sessions::Session;

use crate::error::{clear_sentry_user, set_sentry_user};
use crate::models::{CurrentUser, session_keys};
use crate::state::AppState;

/// Extractor that requires a signed-in seller.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(
///     RequireAuth(user): RequireAuth,
/// ) -> impl IntoResponse {
///     format!("Hello, {}!", user.display_name())
/// }
/// ```
pub struct RequireAuth(pub CurrentUser);

/// Error returned when authentication is required but nobody is signed in.
#[derive(Debug)]
pub enum AuthRejection {
    /// Redirect to the login page, returning to `next` afterwards.
    /// `expired` adds the session-expired notice.
    RedirectToLogin { next: String, expired: bool },
    /// Unauthorized response (for API requests).
    Unauthorized,
}

impl AuthRejection {
    fn for_request(parts: &Parts) -> Self {
        Self::build(parts, false)
    }

    fn expired(parts: &Parts) -> Self {
        Self::build(parts, true)
    }

    fn build(parts: &Parts, expired: bool) -> Self {
        if parts.uri.path().starts_with("/api/") {
            return Self::Unauthorized;
        }
        let next = parts
            .uri
            .path_and_query()
            .map_or_else(|| "/dashboard".to_string(), ToString::to_string);
        Self::RedirectToLogin { next, expired }
    }
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToLogin { next, expired } => {
                let error = if expired { "error=expired&" } else { "" };
                Redirect::to(&format!(
                    "/auth/login?{error}next={}",
                    urlencoding::encode(&next)
                ))
                .into_response()
            }
            Self::Unauthorized => StatusCode::UNAUTHORIZED.into_response(),
        }
    }
}

impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let session = parts
            .extensions
            .get::<Session>()
            .cloned()
            .ok_or(AuthRejection::Unauthorized)?;

        let mut user: CurrentUser = session
            .get(session_keys::CURRENT_USER)
            .await
            .ok()
            .flatten()
            .ok_or_else(|| AuthRejection::for_request(parts))?;

        if user.needs_refresh(Utc::now()) {
            let state = AppState::from_ref(state);
            match state.backend().refresh_session(&user.refresh_token).await {
                Ok(fresh) => {
                    user.apply_refresh(fresh);
                    if let Err(e) = set_current_user(&session, &user).await {
                        tracing::error!(error = %e, "Failed to store refreshed session");
                    }
                    tracing::debug!(user_id = %user.id, "Access token refreshed");
                }
                Err(e) => {
                    tracing::warn!(user_id = %user.id, error = %e, "Token refresh failed, signing out");
                    if let Err(e) = clear_current_user(&session).await {
                        tracing::error!(error = %e, "Failed to clear session");
                    }
                    clear_sentry_user();
                    return Err(AuthRejection::expired(parts));
                }
            }
        }

        set_sentry_user(&user.id, Some(&user.email));
        Ok(Self(user))
    }
}

/// Extractor that optionally gets the signed-in seller.
///
/// Unlike `RequireAuth`, this never rejects and never refreshes tokens; the
/// marketing pages only use it to switch navigation links.
pub struct OptionalAuth(pub Option<CurrentUser>);

impl<S> FromRequestParts<S> for OptionalAuth
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = match parts.extensions.get::<Session>() {
            Some(session) => session
                .get::<CurrentUser>(session_keys::CURRENT_USER)
                .await
                .ok()
                .flatten(),
            None => None,
        };

        Ok(Self(user))
    }
}

/// Helper to set the current seller in the session.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_user(
    session: &Session,
    user: &CurrentUser,
) -> Result<(), tower_sessions::session::Error> {
    session.insert(session_keys::CURRENT_USER, user).await
}

/// Helper to clear the current seller from the session (logout).
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_current_user(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session
        .remove::<CurrentUser>(session_keys::CURRENT_USER)
        .await?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::Request;

    use super::*;

    fn parts(uri: &str) -> Parts {
        Request::builder().uri(uri).body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_pages_redirect_with_next() {
        let rejection = AuthRejection::for_request(&parts("/dashboard/products?status=draft"));
        let response = rejection.into_response();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers()["location"],
            "/auth/login?next=%2Fdashboard%2Fproducts%3Fstatus%3Ddraft"
        );
    }

    #[test]
    fn test_api_gets_401() {
        let rejection = AuthRejection::for_request(&parts("/api/stats"));
        assert_eq!(rejection.into_response().status(), StatusCode::UNAUTHORIZED);
        let rejection = AuthRejection::expired(&parts("/api/stats"));
        assert_eq!(rejection.into_response().status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_expired_session_carries_notice() {
        let response = AuthRejection::expired(&parts("/dashboard/stores")).into_response();
        assert_eq!(
            response.headers()["location"],
            "/auth/login?error=expired&next=%2Fdashboard%2Fstores"
        );
    }
}
