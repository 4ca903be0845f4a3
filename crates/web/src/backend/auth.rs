//! Auth API: password sign-in, sign-up, token refresh, and recovery.
//!
//! Credentials never touch this application's storage. The auth service
//! issues a short-lived access token plus a single-use refresh token; both
//! live in the server-side session.

use chrono::{DateTime, Duration, TimeZone, Utc};
use gainsy_core::{Email, UserId};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::instrument;

use super::{BackendClient, BackendError, with_retry};

/// Lifetime assumed when the auth service omits both expiry fields.
const DEFAULT_EXPIRES_IN_SECS: i64 = 3600;

/// A signed-in user's tokens.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthSession {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
    pub user: AuthUser,
}

impl std::fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSession")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .field("user", &self.user)
            .finish()
    }
}

/// User record returned by the auth service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: UserId,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub user_metadata: UserMetadata,
}

impl AuthUser {
    /// Display name from metadata, if set.
    #[must_use]
    pub fn full_name(&self) -> Option<&str> {
        self.user_metadata
            .full_name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
    }
}

/// Free-form profile data stored alongside the auth user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
}

/// Result of a sign-up request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignUpOutcome {
    /// The project auto-confirms accounts; the user is signed in.
    SignedIn(AuthSession),
    /// A confirmation email was sent; no session yet.
    ConfirmationRequired { email: String },
}

/// Token endpoint response.
#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    expires_at: Option<i64>,
    user: AuthUser,
}

impl TokenResponse {
    fn into_session(self, now: DateTime<Utc>) -> AuthSession {
        let expires_at = self
            .expires_at
            .and_then(|ts| Utc.timestamp_opt(ts, 0).single())
            .unwrap_or_else(|| expiry_after(now, self.expires_in));
        AuthSession {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at,
            user: self.user,
        }
    }
}

/// `now + expires_in`, using the default lifetime when the value is missing,
/// non-positive, or out of range.
fn expiry_after(now: DateTime<Utc>, expires_in: Option<i64>) -> DateTime<Utc> {
    let fallback = now + Duration::seconds(DEFAULT_EXPIRES_IN_SECS);
    expires_in
        .filter(|secs| *secs > 0)
        .and_then(Duration::try_seconds)
        .and_then(|ttl| now.checked_add_signed(ttl))
        .unwrap_or(fallback)
}

impl BackendClient {
    /// Exchange email and password for a session.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Api`] with status 400 for bad credentials.
    #[instrument(skip(self, password), fields(email = %email))]
    pub async fn sign_in_with_password(
        &self,
        email: &Email,
        password: &str,
    ) -> Result<AuthSession, BackendError> {
        let body = json!({ "email": email.as_str(), "password": password });
        self.token_grant("password", &body).await
    }

    /// Exchange a refresh token for a new session.
    ///
    /// Refresh tokens are single-use; the returned session carries the
    /// replacement.
    ///
    /// # Errors
    ///
    /// Returns a [`BackendError`] when the token is expired, reused, or revoked.
    #[instrument(skip_all)]
    pub async fn refresh_session(&self, refresh_token: &str) -> Result<AuthSession, BackendError> {
        let body = json!({ "refresh_token": refresh_token });
        self.token_grant("refresh_token", &body).await
    }

    /// Create an account.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Conflict`] when the email is already
    /// registered.
    #[instrument(skip(self, password, full_name), fields(email = %email))]
    pub async fn sign_up(
        &self,
        email: &Email,
        password: &str,
        full_name: Option<&str>,
    ) -> Result<SignUpOutcome, BackendError> {
        let url = self.auth_endpoint("signup")?;
        let body = json!({
            "email": email.as_str(),
            "password": password,
            "data": UserMetadata { full_name: full_name.map(ToString::to_string) },
        });

        let policy = self.policy().single_attempt();
        let raw: serde_json::Value = with_retry(&policy, "signup", || {
            let request = self
                .request(Method::POST, url.clone(), self.anon_token())
                .json(&body);
            async move { Self::handle_response(request.send().await?).await }
        })
        .await?;

        signup_outcome(raw, Utc::now())
    }

    /// Revoke the session's refresh tokens.
    ///
    /// # Errors
    ///
    /// Returns a [`BackendError`] on failure. An already-invalid token is not
    /// an error.
    #[instrument(skip_all)]
    pub async fn sign_out(&self, access_token: &str) -> Result<(), BackendError> {
        let url = self.auth_endpoint("logout")?;
        let policy = self.policy().single_attempt();
        let result = with_retry(&policy, "logout", || {
            let request = self.request(Method::POST, url.clone(), access_token);
            async move { Self::handle_empty(request.send().await?).await }
        })
        .await;

        match result {
            Err(BackendError::Unauthorized | BackendError::NotFound(_)) | Ok(()) => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Send a password-reset email.
    ///
    /// The auth service answers the same whether or not the address exists.
    ///
    /// # Errors
    ///
    /// Returns a [`BackendError`] on failure.
    #[instrument(skip(self), fields(email = %email))]
    pub async fn recover_password(&self, email: &Email) -> Result<(), BackendError> {
        let url = self.auth_endpoint("recover")?;
        let body = json!({ "email": email.as_str() });
        let policy = self.policy().single_attempt();
        with_retry(&policy, "recover", || {
            let request = self
                .request(Method::POST, url.clone(), self.anon_token())
                .json(&body);
            async move { Self::handle_empty(request.send().await?).await }
        })
        .await
    }

    /// Replace the user's profile metadata.
    ///
    /// # Errors
    ///
    /// Returns a [`BackendError`] on failure.
    #[instrument(skip_all)]
    pub async fn update_user_metadata(
        &self,
        access_token: &str,
        metadata: &UserMetadata,
    ) -> Result<AuthUser, BackendError> {
        let url = self.auth_endpoint("user")?;
        let body = json!({ "data": metadata });
        with_retry(self.policy(), "update_user", || {
            let request = self
                .request(Method::PUT, url.clone(), access_token)
                .json(&body);
            async move { Self::handle_response(request.send().await?).await }
        })
        .await
    }

    async fn token_grant(
        &self,
        grant_type: &str,
        body: &serde_json::Value,
    ) -> Result<AuthSession, BackendError> {
        let mut url = self.auth_endpoint("token")?;
        url.query_pairs_mut().append_pair("grant_type", grant_type);

        let policy = self.policy().single_attempt();
        let token: TokenResponse = with_retry(&policy, grant_type, || {
            let request = self
                .request(Method::POST, url.clone(), self.anon_token())
                .json(body);
            async move { Self::handle_response(request.send().await?).await }
        })
        .await?;

        Ok(token.into_session(Utc::now()))
    }
}

/// Sign-up answers with a session when auto-confirm is on, otherwise with
/// the bare user record.
fn signup_outcome(raw: serde_json::Value, now: DateTime<Utc>) -> Result<SignUpOutcome, BackendError> {
    if raw.get("access_token").is_some() {
        let token: TokenResponse = serde_json::from_value(raw)
            .map_err(|e| BackendError::Parse(format!("Invalid sign-up session: {e}")))?;
        return Ok(SignUpOutcome::SignedIn(token.into_session(now)));
    }

    let user: AuthUser = serde_json::from_value(raw)
        .map_err(|e| BackendError::Parse(format!("Invalid sign-up user: {e}")))?;
    Ok(SignUpOutcome::ConfirmationRequired { email: user.email })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const USER_ID: &str = "6a1e5000-0000-4000-8000-000000000001";

    fn now() -> DateTime<Utc> {
        Utc.timestamp_opt(1_717_200_000, 0).single().unwrap()
    }

    fn token_json(expires_at: Option<i64>) -> serde_json::Value {
        json!({
            "access_token": "at",
            "token_type": "bearer",
            "expires_in": 120,
            "expires_at": expires_at,
            "refresh_token": "rt",
            "user": {
                "id": USER_ID,
                "email": "maker@example.com",
                "user_metadata": { "full_name": "Rowan Maker" }
            }
        })
    }

    #[test]
    fn test_expiry_prefers_absolute_timestamp() {
        let token: TokenResponse =
            serde_json::from_value(token_json(Some(1_717_203_600))).unwrap();
        let session = token.into_session(now());
        assert_eq!(session.expires_at.timestamp(), 1_717_203_600);
        assert_eq!(session.user.full_name(), Some("Rowan Maker"));
    }

    #[test]
    fn test_expiry_falls_back_to_expires_in() {
        let token: TokenResponse = serde_json::from_value(token_json(None)).unwrap();
        let session = token.into_session(now());
        assert_eq!(session.expires_at, now() + Duration::seconds(120));
    }

    #[test]
    fn test_absurd_expires_in_uses_default() {
        for secs in [i64::MAX, i64::MIN, -5, 0] {
            assert_eq!(
                expiry_after(now(), Some(secs)),
                now() + Duration::seconds(DEFAULT_EXPIRES_IN_SECS),
                "{secs}"
            );
        }
        assert_eq!(
            expiry_after(now(), None),
            now() + Duration::seconds(DEFAULT_EXPIRES_IN_SECS)
        );
    }

    #[test]
    fn test_signup_with_session() {
        let outcome = signup_outcome(token_json(None), now()).unwrap();
        assert!(matches!(outcome, SignUpOutcome::SignedIn(s) if s.refresh_token == "rt"));
    }

    #[test]
    fn test_signup_requiring_confirmation() {
        let raw = json!({
            "id": USER_ID,
            "email": "maker@example.com",
            "confirmation_sent_at": "2024-06-01T00:00:00Z",
            "user_metadata": {}
        });
        let outcome = signup_outcome(raw, now()).unwrap();
        assert_eq!(
            outcome,
            SignUpOutcome::ConfirmationRequired {
                email: "maker@example.com".to_string()
            }
        );
    }

    #[test]
    fn test_blank_full_name_is_none() {
        let user = AuthUser {
            id: UserId::new(gainsy_core::fixed_uuid(1)),
            email: "maker@example.com".to_string(),
            user_metadata: UserMetadata {
                full_name: Some("  ".to_string()),
            },
        };
        assert_eq!(user.full_name(), None);
    }

    #[test]
    fn test_debug_redacts_tokens() {
        let token: TokenResponse = serde_json::from_value(token_json(None)).unwrap();
        let debug_output = format!("{:?}", token.into_session(now()));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("\"at\""));
    }
}
