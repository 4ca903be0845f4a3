//! Session middleware configuration.
//!
//! Sessions are held in memory on the server. The cookie carries only a
//! signed session ID; tokens for the hosted backend never leave the server.

use secrecy::ExposeSecret;
use tower_sessions::cookie::Key;
use tower_sessions::service::SignedCookie;
use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer};

use crate::config::WebConfig;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "gainsy_session";

/// Session expiry time in seconds (7 days).
const SESSION_EXPIRY_SECONDS: i64 = 7 * 24 * 60 * 60;

/// Bytes of key material the cookie signer needs.
const KEY_LEN: usize = 64;

/// Session layer type used by the router.
pub type WebSessionLayer = SessionManagerLayer<MemoryStore, SignedCookie>;

/// Create the session layer backed by an in-memory store.
#[must_use]
pub fn create_session_layer(config: &WebConfig) -> WebSessionLayer {
    SessionManagerLayer::new(MemoryStore::default())
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(SESSION_EXPIRY_SECONDS),
        ))
        .with_secure(config.is_secure())
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
        .with_signed(signing_key(config.session_secret.expose_secret()))
}

/// Stretch the configured secret to the signer's key length.
///
/// The secret is validated to at least 32 high-entropy characters at startup.
fn signing_key(secret: &str) -> Key {
    let material: Vec<u8> = secret.bytes().cycle().take(KEY_LEN).collect();
    Key::from(&material)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signing_key_is_deterministic() {
        let a = signing_key("aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6%");
        let b = signing_key("aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6%");
        assert_eq!(a.master(), b.master());
        assert_eq!(a.master().len(), KEY_LEN);
    }
}
