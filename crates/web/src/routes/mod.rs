//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! # Marketing
//! GET  /                               - Home page
//! GET  /features                       - Features
//! GET  /pricing                        - Pricing tiers
//! GET  /about                          - About
//! GET  /contact                        - Contact form
//! POST /contact                        - Submit contact form (rate limited)
//!
//! # Auth
//! GET  /auth/login                     - Login page
//! POST /auth/login                     - Login action (rate limited)
//! GET  /auth/signup                    - Signup page
//! POST /auth/signup                    - Signup action (rate limited)
//! GET  /auth/forgot-password           - Password reset request page
//! POST /auth/forgot-password           - Send reset email (rate limited)
//! POST /auth/logout                    - Logout action
//!
//! # Dashboard (requires auth)
//! GET  /dashboard                      - Overview
//! GET  /dashboard/stores               - Store list
//! POST /dashboard/stores               - Create store
//! GET  /dashboard/stores/new           - New store form
//! GET  /dashboard/stores/{id}/edit     - Edit store form
//! POST /dashboard/stores/{id}          - Update store
//! POST /dashboard/stores/{id}/delete   - Delete store
//! GET  /dashboard/products             - Product list (?store= to filter)
//! POST /dashboard/products             - Create product
//! GET  /dashboard/products/new         - New product form
//! GET  /dashboard/products/{id}/edit   - Edit product form
//! POST /dashboard/products/{id}        - Update product
//! POST /dashboard/products/{id}/delete - Delete product
//! GET  /dashboard/templates            - Template list
//! POST /dashboard/templates            - Create template
//! GET  /dashboard/templates/new        - New template form
//! GET  /dashboard/templates/{id}/edit  - Edit template form
//! GET  /dashboard/templates/{id}/preview - Render against a product
//! POST /dashboard/templates/{id}       - Update template
//! POST /dashboard/templates/{id}/delete - Delete template
//! GET  /dashboard/analytics            - Performance by range
//! POST /dashboard/alerts/{id}/dismiss  - Resolve a system alert
//! GET  /dashboard/settings             - Account settings
//! POST /dashboard/settings             - Update display name
//!
//! # API (requires auth)
//! GET  /api/stats                      - Dashboard stats as JSON
//! ```

pub mod alerts;
pub mod analytics;
pub mod api;
pub mod auth;
pub mod dashboard;
pub mod fallback;
pub mod marketing;
pub mod products;
pub mod settings;
pub mod stores;
pub mod templates;

use axum::{
    Router,
    routing::{get, post},
};

use crate::config::WebConfig;
use crate::middleware::{ClientIpKeyExtractor, auth_rate_limiter, contact_rate_limiter};
use crate::state::AppState;

/// Create the marketing routes router.
pub fn marketing_routes(keys: &ClientIpKeyExtractor) -> Router<AppState> {
    Router::new()
        .route("/", get(marketing::home))
        .route("/features", get(marketing::features))
        .route("/pricing", get(marketing::pricing))
        .route("/about", get(marketing::about))
        .route(
            "/contact",
            get(marketing::contact_page)
                .merge(post(marketing::contact).layer(contact_rate_limiter(keys.clone()))),
        )
}

/// Create the auth routes router.
///
/// Only submissions are rate limited; the pages stay reachable.
pub fn auth_routes(keys: &ClientIpKeyExtractor) -> Router<AppState> {
    Router::new()
        .route(
            "/login",
            get(auth::login_page).merge(post(auth::login).layer(auth_rate_limiter(keys.clone()))),
        )
        .route(
            "/signup",
            get(auth::signup_page).merge(post(auth::signup).layer(auth_rate_limiter(keys.clone()))),
        )
        .route(
            "/forgot-password",
            get(auth::forgot_password_page)
                .merge(post(auth::forgot_password).layer(auth_rate_limiter(keys.clone()))),
        )
        .route("/logout", post(auth::logout))
}

/// Create the store routes router.
pub fn store_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(stores::index).post(stores::create))
        .route("/new", get(stores::new))
        .route("/{id}", post(stores::update))
        .route("/{id}/edit", get(stores::edit))
        .route("/{id}/delete", post(stores::delete))
}

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index).post(products::create))
        .route("/new", get(products::new))
        .route("/{id}", post(products::update))
        .route("/{id}/edit", get(products::edit))
        .route("/{id}/delete", post(products::delete))
}

/// Create the template routes router.
pub fn template_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(templates::index).post(templates::create))
        .route("/new", get(templates::new))
        .route("/{id}", post(templates::update))
        .route("/{id}/edit", get(templates::edit))
        .route("/{id}/preview", get(templates::preview))
        .route("/{id}/delete", post(templates::delete))
}

/// Create the dashboard routes router.
pub fn dashboard_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(dashboard::overview))
        .nest("/stores", store_routes())
        .nest("/products", product_routes())
        .nest("/templates", template_routes())
        .route("/analytics", get(analytics::index))
        .route("/alerts/{id}/dismiss", post(alerts::dismiss))
        .route("/settings", get(settings::show).post(settings::update))
}

/// Create the JSON API routes router.
pub fn api_routes() -> Router<AppState> {
    Router::new().route("/stats", get(api::stats))
}

/// Create all routes for the site.
pub fn routes(config: &WebConfig) -> Router<AppState> {
    let keys = ClientIpKeyExtractor::new(config.trusted_proxy_header.clone());
    Router::new()
        .merge(marketing_routes(&keys))
        .nest("/auth", auth_routes(&keys))
        .nest("/dashboard", dashboard_routes())
        .nest("/api", api_routes())
        .fallback(marketing::not_found)
}
