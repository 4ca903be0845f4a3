//! Session-related types.
//!
//! Types stored in the session for authentication state. Sessions live
//! server-side; the cookie only carries the session ID.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use gainsy_core::UserId;

use crate::backend::AuthSession;

/// Refresh the access token when it expires within this many seconds.
pub const REFRESH_MARGIN_SECS: i64 = 60;

/// Session-stored seller identity and auth tokens.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CurrentUser {
    pub id: UserId,
    pub email: String,
    pub full_name: Option<String>,
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
}

impl CurrentUser {
    /// Name to greet the seller with.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.full_name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(&self.email)
    }

    /// Whether the access token expires within the refresh margin.
    #[must_use]
    pub fn needs_refresh(&self, now: DateTime<Utc>) -> bool {
        self.expires_at - now <= Duration::seconds(REFRESH_MARGIN_SECS)
    }

    /// Replace tokens from a refreshed session, keeping a locally edited
    /// name when the auth service returns none.
    pub fn apply_refresh(&mut self, session: AuthSession) {
        if let Some(name) = session.user.full_name() {
            self.full_name = Some(name.to_string());
        }
        self.email = session.user.email;
        self.access_token = session.access_token;
        self.refresh_token = session.refresh_token;
        self.expires_at = session.expires_at;
    }
}

impl From<AuthSession> for CurrentUser {
    fn from(session: AuthSession) -> Self {
        let full_name = session.user.full_name().map(ToString::to_string);
        Self {
            id: session.user.id,
            email: session.user.email,
            full_name,
            access_token: session.access_token,
            refresh_token: session.refresh_token,
            expires_at: session.expires_at,
        }
    }
}

impl std::fmt::Debug for CurrentUser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CurrentUser")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("full_name", &self.full_name)
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Session keys for authentication data.
pub mod keys {
    /// Key for storing the current signed-in seller.
    pub const CURRENT_USER: &str = "current_user";
}
