//! Hosted backend client (table API + auth API over HTTP).
//!
//! The backend is a Supabase-style service: a PostgREST table API under
//! `/rest/v1/{table}` and a GoTrue auth API under `/auth/v1/*`. Every request
//! carries the project's public key in the `apikey` header and a bearer
//! token. Dashboard calls pass the signed-in user's access token so the
//! backend's row-level security applies.
//!
//! # Layout
//!
//! - [`BackendClient`] - table operations (this module)
//! - [`auth`] - sign in, sign up, refresh, sign out, recovery
//! - [`tables`] - typed per-table access scoped to one user
//! - [`retry`] - timeout and retry wrapper applied to every call
//! - [`filter`] - query-string filters

pub mod auth;
pub mod filter;
pub mod retry;
pub mod tables;

pub use auth::{AuthSession, AuthUser, SignUpOutcome, UserMetadata};
pub use filter::Filter;
pub use retry::{RetryPolicy, with_retry};
pub use tables::{AlertTable, ContactMessage, ContactTable, ProductTable, StoreTable, TemplateTable};

use std::sync::Arc;

use reqwest::{Method, RequestBuilder, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::instrument;
use url::Url;

use crate::config::BackendConfig;

/// Default wait when a 429 carries no usable `Retry-After`.
const DEFAULT_RETRY_AFTER_SECS: u64 = 1;

/// Errors that can occur when talking to the hosted backend.
#[derive(Debug, Error)]
pub enum BackendError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Missing, expired, or rejected credentials.
    #[error("Unauthorized")]
    Unauthorized,

    /// Row or endpoint not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate limited by the backend.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// The call did not finish within the configured timeout.
    #[error("Request timed out")]
    Timeout,

    /// Failed to parse a response or build a request.
    #[error("Parse error: {0}")]
    Parse(String),

    /// The write conflicts with existing data (duplicate, constraint).
    #[error("Conflict: {0}")]
    Conflict(String),
}

impl BackendError {
    /// Whether a retry might succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http(e) => !(e.is_builder() || e.is_decode() || e.is_redirect()),
            Self::Api { status, .. } => *status >= 500,
            Self::RateLimited(_) | Self::Timeout => true,
            Self::Unauthorized | Self::NotFound(_) | Self::Parse(_) | Self::Conflict(_) => false,
        }
    }
}

/// Hosted backend client.
///
/// Cheap to clone; all clones share one connection pool.
#[derive(Clone)]
pub struct BackendClient {
    inner: Arc<BackendClientInner>,
}

struct BackendClientInner {
    client: reqwest::Client,
    base_url: Url,
    rest_url: Url,
    auth_url: Url,
    anon_key: SecretString,
    policy: RetryPolicy,
}

impl BackendClient {
    /// Create a new backend client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build or the configured URL
    /// cannot be a base.
    pub fn new(config: &BackendConfig) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("gainsy/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(config.timeout)
            .build()?;

        let base_url = with_trailing_slash(&config.url);
        let rest_url = base_url
            .join("rest/v1/")
            .map_err(|e| BackendError::Parse(format!("Invalid backend URL: {e}")))?;
        let auth_url = base_url
            .join("auth/v1/")
            .map_err(|e| BackendError::Parse(format!("Invalid backend URL: {e}")))?;

        Ok(Self {
            inner: Arc::new(BackendClientInner {
                client,
                base_url,
                rest_url,
                auth_url,
                anon_key: config.anon_key.clone(),
                policy: RetryPolicy::from_config(config),
            }),
        })
    }

    /// Retry policy applied to calls.
    #[must_use]
    pub fn policy(&self) -> &RetryPolicy {
        &self.inner.policy
    }

    /// The public project key, usable as a bearer token for anonymous calls.
    #[must_use]
    pub fn anon_token(&self) -> &str {
        self.inner.anon_key.expose_secret()
    }

    /// Project base URL.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    // =========================================================================
    // Table API
    // =========================================================================

    /// Fetch rows matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns a [`BackendError`] once retries are exhausted.
    #[instrument(skip(self, filter, token))]
    pub async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        filter: &Filter,
        token: &str,
    ) -> Result<Vec<T>, BackendError> {
        let url = self.table_url(table, filter)?;
        with_retry(self.policy(), table, || {
            let request = self.request(Method::GET, url.clone(), token);
            async move { Self::handle_response(request.send().await?).await }
        })
        .await
    }

    /// Fetch the first row matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::NotFound`] when no row matches.
    pub async fn select_one<T: DeserializeOwned>(
        &self,
        table: &str,
        filter: &Filter,
        token: &str,
    ) -> Result<T, BackendError> {
        let filter = filter.clone().limit(1);
        self.select(table, &filter, token)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| BackendError::NotFound(table.to_string()))
    }

    /// Insert one row and return it as stored.
    ///
    /// Inserts are not idempotent, so they get a single attempt.
    ///
    /// # Errors
    ///
    /// Returns a [`BackendError`] on failure.
    #[instrument(skip(self, body, token))]
    pub async fn insert<T, B>(&self, table: &str, body: &B, token: &str) -> Result<T, BackendError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let url = self.table_url(table, &Filter::new())?;
        let policy = self.policy().single_attempt();
        let rows: Vec<T> = with_retry(&policy, table, || {
            let request = self
                .request(Method::POST, url.clone(), token)
                .header("Prefer", "return=representation")
                .json(body);
            async move { Self::handle_response(request.send().await?).await }
        })
        .await?;

        rows.into_iter()
            .next()
            .ok_or_else(|| BackendError::Parse(format!("Insert into {table} returned no row")))
    }

    /// Insert one or more rows without reading them back.
    ///
    /// Used with the anon key, which may write but not read.
    ///
    /// # Errors
    ///
    /// Returns a [`BackendError`] on failure.
    #[instrument(skip(self, body, token))]
    pub async fn insert_minimal<B>(
        &self,
        table: &str,
        body: &B,
        token: &str,
    ) -> Result<(), BackendError>
    where
        B: Serialize + ?Sized,
    {
        let url = self.table_url(table, &Filter::new())?;
        let policy = self.policy().single_attempt();
        with_retry(&policy, table, || {
            let request = self
                .request(Method::POST, url.clone(), token)
                .header("Prefer", "return=minimal")
                .json(body);
            async move { Self::handle_empty(request.send().await?).await }
        })
        .await
    }

    /// Update rows matching `filter` and return them.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::NotFound`] when nothing matched.
    #[instrument(skip(self, filter, body, token))]
    pub async fn update_where<T, B>(
        &self,
        table: &str,
        filter: &Filter,
        body: &B,
        token: &str,
    ) -> Result<Vec<T>, BackendError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let url = self.table_url(table, filter)?;
        let rows: Vec<T> = with_retry(self.policy(), table, || {
            let request = self
                .request(Method::PATCH, url.clone(), token)
                .header("Prefer", "return=representation")
                .json(body);
            async move { Self::handle_response(request.send().await?).await }
        })
        .await?;

        if rows.is_empty() {
            return Err(BackendError::NotFound(table.to_string()));
        }
        Ok(rows)
    }

    /// Delete rows matching `filter`, returning how many were removed.
    /// Made once, never retried.
    ///
    /// # Errors
    ///
    /// Returns a [`BackendError`] on failure.
    #[instrument(skip(self, filter, token))]
    pub async fn delete_where(
        &self,
        table: &str,
        filter: &Filter,
        token: &str,
    ) -> Result<usize, BackendError> {
        let url = self.table_url(table, &filter.clone().columns("id"))?;
        // A retry after a lost response would find nothing left to delete.
        let policy = self.policy().single_attempt();
        let rows: Vec<serde_json::Value> = with_retry(&policy, table, || {
            let request = self
                .request(Method::DELETE, url.clone(), token)
                .header("Prefer", "return=representation");
            async move { Self::handle_response(request.send().await?).await }
        })
        .await?;
        Ok(rows.len())
    }

    /// Count rows matching `filter` without fetching them.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Parse`] when the response lacks a usable
    /// `Content-Range` header.
    #[instrument(skip(self, filter, token))]
    pub async fn count(
        &self,
        table: &str,
        filter: &Filter,
        token: &str,
    ) -> Result<u64, BackendError> {
        let url = self.table_url(table, &filter.clone().columns("id"))?;
        with_retry(self.policy(), table, || {
            let request = self
                .request(Method::HEAD, url.clone(), token)
                .header("Prefer", "count=exact");
            async move {
                let response = request.send().await?;
                if !response.status().is_success() {
                    return Err(Self::parse_error(response).await);
                }
                response
                    .headers()
                    .get("content-range")
                    .and_then(|v| v.to_str().ok())
                    .and_then(parse_content_range_total)
                    .ok_or_else(|| BackendError::Parse("Missing Content-Range total".to_string()))
            }
        })
        .await
    }

    /// Check that the backend is reachable and accepts the project key.
    ///
    /// # Errors
    ///
    /// Returns a [`BackendError`] when the health endpoint fails.
    #[instrument(skip(self))]
    pub async fn ping(&self) -> Result<(), BackendError> {
        let url = self.auth_endpoint("health")?;
        let policy = self.policy().single_attempt();
        with_retry(&policy, "ping", || {
            let request = self.request(Method::GET, url.clone(), self.anon_token());
            async move { Self::handle_empty(request.send().await?).await }
        })
        .await
    }

    // =========================================================================
    // Request plumbing
    // =========================================================================

    /// Start a request with the project key and bearer token.
    fn request(&self, method: Method, url: Url, token: &str) -> RequestBuilder {
        self.inner
            .client
            .request(method, url)
            .header("apikey", self.inner.anon_key.expose_secret())
            .bearer_auth(token)
    }

    fn table_url(&self, table: &str, filter: &Filter) -> Result<Url, BackendError> {
        let mut url = self
            .inner
            .rest_url
            .join(table)
            .map_err(|e| BackendError::Parse(format!("Invalid table name {table}: {e}")))?;
        if !filter.pairs().is_empty() {
            url.query_pairs_mut().extend_pairs(filter.pairs());
        }
        Ok(url)
    }

    fn auth_endpoint(&self, path: &str) -> Result<Url, BackendError> {
        self.inner
            .auth_url
            .join(path)
            .map_err(|e| BackendError::Parse(format!("Invalid auth path {path}: {e}")))
    }

    /// Parse a successful JSON response.
    async fn handle_response<T: DeserializeOwned>(response: Response) -> Result<T, BackendError> {
        if response.status().is_success() {
            return response
                .json()
                .await
                .map_err(|e| BackendError::Parse(format!("Failed to parse response: {e}")));
        }

        Err(Self::parse_error(response).await)
    }

    /// Accept any successful response, ignoring its body.
    async fn handle_empty(response: Response) -> Result<(), BackendError> {
        if response.status().is_success() {
            return Ok(());
        }
        Err(Self::parse_error(response).await)
    }

    /// Map an error response to a [`BackendError`].
    async fn parse_error(response: Response) -> BackendError {
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.trim().parse().ok())
                .unwrap_or(DEFAULT_RETRY_AFTER_SECS);
            return BackendError::RateLimited(retry_after);
        }

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return BackendError::Unauthorized;
        }

        let path = response.url().path().to_string();
        let body = response.text().await.unwrap_or_default();
        let message = error_message(&body);

        match status {
            StatusCode::NOT_FOUND => BackendError::NotFound(path),
            StatusCode::CONFLICT => BackendError::Conflict(message),
            StatusCode::UNPROCESSABLE_ENTITY if message.to_lowercase().contains("already") => {
                BackendError::Conflict(message)
            }
            _ => BackendError::Api {
                status: status.as_u16(),
                message,
            },
        }
    }
}

impl std::fmt::Debug for BackendClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendClient")
            .field("base_url", &self.inner.base_url.as_str())
            .field("policy", &self.inner.policy)
            .finish_non_exhaustive()
    }
}

fn with_trailing_slash(url: &Url) -> Url {
    let mut url = url.clone();
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

/// Total from a `Content-Range` header such as `0-24/3573` or `*/0`.
fn parse_content_range_total(header: &str) -> Option<u64> {
    header.rsplit_once('/')?.1.trim().parse().ok()
}

/// Human-readable message from an error body.
///
/// The table API uses `message`, the auth API uses `msg`,
/// `error_description`, or `error`.
fn error_message(body: &str) -> String {
    let parsed: Option<serde_json::Value> = serde_json::from_str(body).ok();
    parsed
        .as_ref()
        .and_then(|json| {
            ["message", "msg", "error_description", "error"]
                .iter()
                .find_map(|key| json.get(*key).and_then(serde_json::Value::as_str))
        })
        .map_or_else(
            || {
                let trimmed = body.trim();
                if trimmed.is_empty() {
                    "Unknown error".to_string()
                } else {
                    trimmed.chars().take(300).collect()
                }
            },
            ToString::to_string,
        )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn config(url: &str) -> BackendConfig {
        BackendConfig {
            url: Url::parse(url).unwrap(),
            anon_key: SecretString::from("anon"),
            timeout: Duration::from_secs(2),
            retries: 1,
        }
    }

    #[tokio::test]
    async fn test_delete_is_not_retried() {
        use std::sync::Arc;
        use std::sync::atomic::{AtomicUsize, Ordering};

        use axum::{Router, http::StatusCode, routing::any};

        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let app = Router::new().route(
            "/rest/v1/{table}",
            any(move || {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    StatusCode::SERVICE_UNAVAILABLE
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        let mut config = config(&format!("http://{addr}"));
        config.retries = 2;
        let client = BackendClient::new(&config).unwrap();

        let result = client
            .delete_where("stores", &Filter::new().eq("id", "s1"), "token")
            .await;
        assert!(result.is_err());
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        let _: Result<Vec<serde_json::Value>, _> =
            client.select("stores", &Filter::new(), "token").await;
        assert_eq!(hits.load(Ordering::SeqCst), 4, "reads still retry");
    }

    #[test]
    fn test_endpoint_urls() {
        let client = BackendClient::new(&config("https://abcd.supabase.co")).unwrap();
        let url = client
            .table_url("stores", &Filter::new().eq("user_id", "u1"))
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://abcd.supabase.co/rest/v1/stores?user_id=eq.u1"
        );
        assert_eq!(
            client.auth_endpoint("token").unwrap().as_str(),
            "https://abcd.supabase.co/auth/v1/token"
        );
    }

    #[test]
    fn test_base_path_is_kept() {
        let client = BackendClient::new(&config("http://127.0.0.1:9999/project")).unwrap();
        let url = client.table_url("products", &Filter::new()).unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:9999/project/rest/v1/products");
    }

    #[test]
    fn test_policy_from_config() {
        let client = BackendClient::new(&config("https://abcd.supabase.co")).unwrap();
        assert_eq!(client.policy().attempts, 2);
        assert_eq!(client.policy().timeout, Duration::from_secs(2));
    }

    #[test]
    fn test_parse_content_range_total() {
        assert_eq!(parse_content_range_total("0-24/3573"), Some(3573));
        assert_eq!(parse_content_range_total("*/0"), Some(0));
        assert_eq!(parse_content_range_total("0-24/*"), None);
        assert_eq!(parse_content_range_total("garbage"), None);
    }

    #[test]
    fn test_error_message_sources() {
        assert_eq!(
            error_message(r#"{"code":"23505","message":"duplicate key value"}"#),
            "duplicate key value"
        );
        assert_eq!(
            error_message(r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#),
            "Invalid login credentials"
        );
        assert_eq!(error_message(r#"{"msg":"User already registered"}"#), "User already registered");
        assert_eq!(error_message(""), "Unknown error");
        assert_eq!(error_message("Bad Gateway"), "Bad Gateway");
    }

    #[test]
    fn test_retryable_classification() {
        assert!(BackendError::Timeout.is_retryable());
        assert!(BackendError::RateLimited(1).is_retryable());
        assert!(
            BackendError::Api {
                status: 502,
                message: String::new()
            }
            .is_retryable()
        );
        assert!(
            !BackendError::Api {
                status: 400,
                message: String::new()
            }
            .is_retryable()
        );
        assert!(!BackendError::Unauthorized.is_retryable());
        assert!(!BackendError::Conflict("dup".to_string()).is_retryable());
    }

    #[test]
    fn test_debug_hides_key() {
        let client = BackendClient::new(&config("https://abcd.supabase.co")).unwrap();
        let debug_output = format!("{client:?}");
        assert!(debug_output.contains("abcd.supabase.co"));
        assert!(!debug_output.contains("anon\""));
    }
}
