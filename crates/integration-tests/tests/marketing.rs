//! Public site: pages, contact form, health checks, and response headers.

#![allow(clippy::unwrap_used)]

use gainsy_integration_tests::{TestApp, location};
use reqwest::StatusCode;

#[tokio::test]
async fn test_marketing_pages_render() {
    let app = TestApp::spawn().await;

    for (path, needle) in [
        ("/", "Gainsy"),
        ("/features", "Features"),
        ("/pricing", "Pricing"),
        ("/about", "About"),
        ("/contact", "<form"),
    ] {
        let response = app.get(path).await;
        assert_eq!(response.status(), StatusCode::OK, "{path}");
        let body = response.text().await.unwrap();
        assert!(body.contains(needle), "{path} should mention {needle}");
    }
}

#[tokio::test]
async fn test_header_shows_dashboard_link_when_signed_in() {
    let app = TestApp::spawn().await;
    let body = app.get("/").await.text().await.unwrap();
    assert!(body.contains("/auth/login"));

    app.signed_in_seller("maker@example.com").await;
    let body = app.get("/").await.text().await.unwrap();
    assert!(body.contains("/dashboard"));
}

#[tokio::test]
async fn test_unknown_path_is_a_404_page() {
    let app = TestApp::spawn().await;
    let response = app.get("/no-such-page").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = response.text().await.unwrap();
    assert!(body.contains("<html"));
}

#[tokio::test]
async fn test_contact_submission_is_stored() {
    let app = TestApp::spawn().await;

    let response = app
        .post_form(
            "/contact",
            &[
                ("name", "Ada Potter"),
                ("email", "ada@example.com"),
                ("subject", "Pricing question"),
                ("message", "Do you support more than three shops?"),
            ],
        )
        .await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/contact?success=sent");

    let rows = app.backend.rows("contact_messages");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["email"], "ada@example.com");
    assert_eq!(rows[0]["subject"], "Pricing question");

    let page = app.get("/contact?success=sent").await.text().await.unwrap();
    assert!(page.contains("Thanks"));
}

#[tokio::test]
async fn test_contact_rejects_missing_message() {
    let app = TestApp::spawn().await;

    let response = app
        .post_form(
            "/contact",
            &[("name", "Ada Potter"), ("email", "ada@example.com"), ("message", "  ")],
        )
        .await;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = response.text().await.unwrap();
    assert!(body.contains("Message"));
    assert!(body.contains("Ada Potter"), "form input is kept");
    assert!(app.backend.rows("contact_messages").is_empty());
}

#[tokio::test]
async fn test_contact_backend_failure_keeps_form() {
    let app = TestApp::spawn().await;
    app.backend.set_fail_writes(true);

    let response = app
        .post_form(
            "/contact",
            &[
                ("name", "Ada Potter"),
                ("email", "ada@example.com"),
                ("message", "Hello there"),
            ],
        )
        .await;

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let body = response.text().await.unwrap();
    assert!(body.contains("Hello there"));
}

#[tokio::test]
async fn test_contact_is_rate_limited() {
    let app = TestApp::spawn().await;
    let form = [
        ("name", "Ada Potter"),
        ("email", "ada@example.com"),
        ("message", "Hello"),
    ];

    for _ in 0..3 {
        let response = app.post_form("/contact", &form).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
    }
    let response = app.post_form("/contact", &form).await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

    // The page itself stays reachable.
    assert_eq!(app.get("/contact").await.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_health_endpoints() {
    let app = TestApp::spawn().await;

    let response = app.get("/health").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await.unwrap(), "ok");

    assert_eq!(app.get("/health/ready").await.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_readiness_fails_when_backend_is_down() {
    let app = TestApp::spawn().await;
    app.backend.set_unhealthy(true);

    assert_eq!(
        app.get("/health/ready").await.status(),
        StatusCode::SERVICE_UNAVAILABLE
    );
    // Liveness does not depend on the backend.
    assert_eq!(app.get("/health").await.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_security_headers_and_request_id() {
    let app = TestApp::spawn().await;
    let response = app.get("/").await;

    let headers = response.headers();
    assert_eq!(headers.get("x-content-type-options").unwrap(), "nosniff");
    assert_eq!(headers.get("x-frame-options").unwrap(), "DENY");
    assert!(headers.get("content-security-policy").is_some());
    assert!(headers.get("x-request-id").is_some());
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let app = TestApp::spawn().await;
    let response = app
        .client
        .get(app.url("/"))
        .header("x-request-id", "trace-abc-123")
        .send()
        .await
        .unwrap();
    assert_eq!(response.headers().get("x-request-id").unwrap(), "trace-abc-123");
}

#[tokio::test]
async fn test_static_stylesheet_is_served() {
    let app = TestApp::spawn().await;
    let response = app.get("/static/css/main.css").await;
    assert_eq!(response.status(), StatusCode::OK);
}
