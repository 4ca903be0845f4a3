//! Web configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `GAINSY_BASE_URL` - Public URL of the site
//! - `GAINSY_SESSION_SECRET` - Session secret (min 32 chars, high entropy)
//! - `GAINSY_BACKEND_URL` - Hosted backend project URL
//! - `GAINSY_BACKEND_ANON_KEY` - Hosted backend public (anon) API key
//!
//! ## Optional
//! - `GAINSY_HOST` - Bind address (default: 127.0.0.1)
//! - `GAINSY_PORT` - Listen port (default: 3000)
//! - `GAINSY_DEMO_FALLBACK` - Show demo data when reads fail (default: true)
//! - `GAINSY_BACKEND_TIMEOUT_MS` - Per-attempt backend timeout (default: 8000)
//! - `GAINSY_BACKEND_RETRIES` - Retries after a failed backend call (default: 2)
//! - `GAINSY_LOG_FORMAT` - `json` or `text` (default: json on Fly.io, else text)
//! - `GAINSY_TRUSTED_PROXY_HEADER` - Header carrying the client IP set by the
//!   reverse proxy, or `none` (default: `fly-client-ip` on Fly.io, else none)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use axum::http::HeaderName;
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use url::Url;

const MIN_SESSION_SECRET_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
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

/// Web application configuration.
#[derive(Debug, Clone)]
pub struct WebConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the site
    pub base_url: String,
    /// Session signing secret
    pub session_secret: SecretString,
    /// Hosted backend configuration
    pub backend: BackendConfig,
    /// Substitute demo records when a dashboard read fails
    pub demo_fallback: bool,
    /// Emit JSON logs instead of text
    pub json_logs: bool,
    /// Proxy-written header the rate limiters key on, if any
    pub trusted_proxy_header: Option<HeaderName>,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
    /// Fraction of errors sent to Sentry
    pub sentry_sample_rate: f32,
    /// Fraction of transactions traced
    pub sentry_traces_sample_rate: f32,
}

/// Hosted backend configuration.
///
/// Implements `Debug` manually to redact the API key.
#[derive(Clone)]
pub struct BackendConfig {
    /// Project URL, e.g. `https://abcd.supabase.co`
    pub url: Url,
    /// Public (anon) API key, sent as `apikey` on every request
    pub anon_key: SecretString,
    /// Per-attempt timeout
    pub timeout: Duration,
    /// Retries after the first attempt
    pub retries: u32,
}

impl std::fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendConfig")
            .field("url", &self.url.as_str())
            .field("anon_key", &"[REDACTED]")
            .field("timeout", &self.timeout)
            .field("retries", &self.retries)
            .finish()
    }
}

impl WebConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through a variable lookup function.
    ///
    /// # Errors
    ///
    /// Same as [`WebConfig::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let env = Env(&lookup);

        let host = env.parsed::<IpAddr>("GAINSY_HOST", "127.0.0.1")?;
        let port = env.parsed::<u16>("GAINSY_PORT", "3000")?;
        let base_url = env.required("GAINSY_BASE_URL")?;
        Url::parse(&base_url)
            .map_err(|e| ConfigError::InvalidEnvVar("GAINSY_BASE_URL".to_string(), e.to_string()))?;

        let session_secret = env.validated_secret("GAINSY_SESSION_SECRET")?;
        validate_session_secret(&session_secret, "GAINSY_SESSION_SECRET")?;

        let backend = BackendConfig::load(&env)?;
        let demo_fallback = env.flag("GAINSY_DEMO_FALLBACK", true)?;

        let json_logs = match env.optional("GAINSY_LOG_FORMAT").as_deref() {
            Some("json") => true,
            Some("text") => false,
            Some(other) => {
                return Err(ConfigError::InvalidEnvVar(
                    "GAINSY_LOG_FORMAT".to_string(),
                    format!("expected json or text, got {other}"),
                ));
            }
            None => env.optional("FLY_APP_NAME").is_some(),
        };

        let trusted_proxy_header = match env.optional("GAINSY_TRUSTED_PROXY_HEADER") {
            Some(raw) if raw.trim().eq_ignore_ascii_case("none") => None,
            Some(raw) => {
                let name = HeaderName::try_from(raw.trim().to_ascii_lowercase()).map_err(|e| {
                    ConfigError::InvalidEnvVar(
                        "GAINSY_TRUSTED_PROXY_HEADER".to_string(),
                        e.to_string(),
                    )
                })?;
                Some(name)
            }
            None => env
                .optional("FLY_APP_NAME")
                .map(|_| HeaderName::from_static("fly-client-ip")),
        };

        Ok(Self {
            host,
            port,
            base_url,
            session_secret,
            backend,
            demo_fallback,
            json_logs,
            trusted_proxy_header,
            sentry_dsn: env.optional("SENTRY_DSN"),
            sentry_environment: env.optional("SENTRY_ENVIRONMENT"),
            sentry_sample_rate: env.parsed("SENTRY_SAMPLE_RATE", "1.0")?,
            sentry_traces_sample_rate: env.parsed("SENTRY_TRACES_SAMPLE_RATE", "0.1")?,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether the site is served over HTTPS.
    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

impl BackendConfig {
    /// Load only the backend settings, for tools that never serve HTTP.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a backend variable is missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load backend settings through a variable lookup function.
    ///
    /// # Errors
    ///
    /// Same as [`BackendConfig::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        Self::load(&Env(&lookup))
    }

    fn load(env: &Env<'_>) -> Result<Self, ConfigError> {
        let raw_url = env.required("GAINSY_BACKEND_URL")?;
        let url = Url::parse(raw_url.trim_end_matches('/')).map_err(|e| {
            ConfigError::InvalidEnvVar("GAINSY_BACKEND_URL".to_string(), e.to_string())
        })?;

        // The anon key is public by design, so only presence is checked.
        let anon_key = SecretString::from(env.required("GAINSY_BACKEND_ANON_KEY")?);

        let timeout_ms = env.parsed::<u64>("GAINSY_BACKEND_TIMEOUT_MS", "8000")?;
        if timeout_ms == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "GAINSY_BACKEND_TIMEOUT_MS".to_string(),
                "must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            url,
            anon_key,
            timeout: Duration::from_millis(timeout_ms),
            retries: env.parsed("GAINSY_BACKEND_RETRIES", "2")?,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Variable lookup with typed accessors.
struct Env<'a>(&'a dyn Fn(&str) -> Option<String>);

impl Env<'_> {
    /// Get a required variable.
    fn required(&self, key: &str) -> Result<String, ConfigError> {
        self.optional(key)
            .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
    }

    /// Get an optional variable; blank counts as unset.
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|v| !v.trim().is_empty())
    }

    /// Get a variable with a default value.
    fn or_default(&self, key: &str, default: &str) -> String {
        self.optional(key).unwrap_or_else(|| default.to_string())
    }

    /// Parse a variable, falling back to `default`.
    fn parsed<T>(&self, key: &str, default: &str) -> Result<T, ConfigError>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        self.or_default(key, default)
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    }

    /// Parse a boolean flag (`true/false`, `1/0`, `yes/no`, `on/off`).
    fn flag(&self, key: &str, default: bool) -> Result<bool, ConfigError> {
        let Some(raw) = self.optional(key) else {
            return Ok(default);
        };
        match raw.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(true),
            "false" | "0" | "no" | "off" => Ok(false),
            other => Err(ConfigError::InvalidEnvVar(
                key.to_string(),
                format!("expected a boolean, got {other}"),
            )),
        }
    }

    /// Load and validate a secret.
    fn validated_secret(&self, key: &str) -> Result<SecretString, ConfigError> {
        let value = self.required(key)?;
        validate_secret_strength(&value, key)?;
        Ok(SecretString::from(value))
    }
}

/// Validate that a session secret meets minimum length requirements.
fn validate_session_secret(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.len() < MIN_SESSION_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_SESSION_SECRET_LENGTH,
                value.len()
            ),
        ));
    }
    Ok(())
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}
