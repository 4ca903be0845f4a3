//! Integration test harness for Gainsy.
//!
//! Each test starts a [`FakeBackend`] and a real `gainsy-web` router on
//! random loopback ports, then drives the site over HTTP with a cookie-aware
//! client that does not follow redirects.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p gainsy-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `marketing` - Public pages, contact form, health checks, headers
//! - `auth` - Login, sign-up, logout, password recovery, rate limits
//! - `dashboard` - Seller CRUD, previews, analytics, alerts, demo fallback

pub mod fake_backend;

use std::collections::HashMap;
use std::net::SocketAddr;

use gainsy_web::config::WebConfig;
use gainsy_web::state::AppState;
use reqwest::{Client, Response, redirect};

pub use fake_backend::{ANON_KEY, FakeBackend};

/// Session secret accepted by the config validator.
const SESSION_SECRET: &str = "k3Jd9xQ2mV7pL4wZ8rT1yB6nF0hG5sCa";

/// Password used for seeded test accounts.
pub const PASSWORD: &str = "correct-horse-battery";

/// A running app plus its fake backend.
pub struct TestApp {
    pub addr: SocketAddr,
    pub client: Client,
    pub backend: FakeBackend,
}

impl TestApp {
    /// Start an app with demo fallback enabled.
    pub async fn spawn() -> Self {
        Self::spawn_with(true).await
    }

    /// Start an app, choosing whether failed reads show demo data.
    ///
    /// # Panics
    ///
    /// Panics if configuration, state, or the listener cannot be set up.
    pub async fn spawn_with(demo_fallback: bool) -> Self {
        let backend = FakeBackend::start().await;

        let mut vars: HashMap<&str, String> = HashMap::new();
        vars.insert("GAINSY_BASE_URL", "http://127.0.0.1".to_string());
        vars.insert("GAINSY_SESSION_SECRET", SESSION_SECRET.to_string());
        vars.insert("GAINSY_BACKEND_URL", backend.url().to_string());
        vars.insert("GAINSY_BACKEND_ANON_KEY", ANON_KEY.to_string());
        vars.insert("GAINSY_BACKEND_TIMEOUT_MS", "2000".to_string());
        vars.insert("GAINSY_BACKEND_RETRIES", "0".to_string());
        vars.insert("GAINSY_DEMO_FALLBACK", demo_fallback.to_string());
        let config = WebConfig::from_lookup(|key| vars.get(key).cloned()).expect("test config");

        let state = AppState::new(config).expect("app state");
        let app = gainsy_web::app(state);

        let listener = tokio::net::TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0)))
            .await
            .expect("bind app");
        let addr = listener.local_addr().expect("app address");
        tokio::spawn(async move {
            axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await
            .ok();
        });

        let client = Client::builder()
            .cookie_store(true)
            .redirect(redirect::Policy::none())
            .build()
            .expect("http client");

        Self {
            addr,
            client,
            backend,
        }
    }

    /// Absolute URL for `path`.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    /// GET `path`.
    ///
    /// # Panics
    ///
    /// Panics if the request cannot be sent.
    pub async fn get(&self, path: &str) -> Response {
        self.client
            .get(self.url(path))
            .send()
            .await
            .expect("GET request")
    }

    /// POST a urlencoded form to `path`.
    ///
    /// # Panics
    ///
    /// Panics if the request cannot be sent.
    pub async fn post_form(&self, path: &str, form: &[(&str, &str)]) -> Response {
        self.client
            .post(self.url(path))
            .form(form)
            .send()
            .await
            .expect("POST request")
    }

    /// Create a seller in the backend and sign in as them.
    ///
    /// # Panics
    ///
    /// Panics if the sign-in does not redirect to the dashboard.
    pub async fn signed_in_seller(&self, email: &str) -> uuid::Uuid {
        let id = self.backend.add_user(email, PASSWORD, Some("Test Seller"));
        let response = self
            .post_form("/auth/login", &[("email", email), ("password", PASSWORD)])
            .await;
        assert_eq!(location(&response), "/dashboard", "sign-in should succeed");
        id
    }
}

/// The `Location` header of a redirect, or an empty string.
#[must_use]
pub fn location(response: &Response) -> String {
    response
        .headers()
        .get("location")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}
