//! Seller dashboard: CRUD, previews, analytics, alerts, settings, fallback.

#![allow(clippy::unwrap_used)]

use gainsy_integration_tests::{TestApp, location};
use reqwest::StatusCode;
use serde_json::{Value, json};
use uuid::Uuid;

fn store_row(user_id: Uuid, name: &str, shop: &str) -> Value {
    json!({
        "user_id": user_id,
        "name": name,
        "etsy_shop_name": shop,
        "currency": "USD",
        "status": "active",
    })
}

fn product_row(user_id: Uuid, store_id: &Value, title: &str, quantity: i32) -> Value {
    json!({
        "user_id": user_id,
        "store_id": store_id,
        "title": title,
        "price": "24.00",
        "currency": "USD",
        "quantity": quantity,
        "tags": ["ceramic", "mug"],
        "status": "active",
        "views": 200,
        "favorites": 12,
        "sales": 8,
        "revenue": "192.00",
    })
}

// =============================================================================
// Stores
// =============================================================================

#[tokio::test]
async fn test_store_lifecycle() {
    let app = TestApp::spawn().await;
    let user_id = app.signed_in_seller("maker@example.com").await;

    let response = app.get("/dashboard/stores/new").await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .post_form(
            "/dashboard/stores",
            &[
                ("name", "Clay Corner"),
                ("etsy_shop_name", "ClayCorner"),
                ("currency", "USD"),
                ("status", "active"),
            ],
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/dashboard/stores?notice=created");

    let rows = app.backend.rows("stores");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["user_id"], json!(user_id));
    let id = rows[0]["id"].as_str().unwrap().to_string();

    let list = app.get("/dashboard/stores?notice=created").await;
    let body = list.text().await.unwrap();
    assert!(body.contains("Clay Corner"));
    assert!(body.contains("Store created."));

    let edit = app.get(&format!("/dashboard/stores/{id}/edit")).await;
    assert_eq!(edit.status(), StatusCode::OK);
    assert!(edit.text().await.unwrap().contains("ClayCorner"));

    let response = app
        .post_form(
            &format!("/dashboard/stores/{id}"),
            &[
                ("name", "Clay Corner Studio"),
                ("etsy_shop_name", "ClayCorner"),
                ("status", "paused"),
            ],
        )
        .await;
    assert_eq!(location(&response), "/dashboard/stores?notice=updated");
    let rows = app.backend.rows("stores");
    assert_eq!(rows[0]["name"], "Clay Corner Studio");
    assert_eq!(rows[0]["status"], "paused");

    let response = app
        .post_form(&format!("/dashboard/stores/{id}/delete"), &[])
        .await;
    assert_eq!(location(&response), "/dashboard/stores?notice=deleted");
    assert!(app.backend.rows("stores").is_empty());
}

#[tokio::test]
async fn test_store_validation_keeps_input() {
    let app = TestApp::spawn().await;
    app.signed_in_seller("maker@example.com").await;

    let response = app
        .post_form(
            "/dashboard/stores",
            &[("name", "Clay Corner"), ("etsy_shop_name", "")],
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = response.text().await.unwrap();
    assert!(body.contains("Clay Corner"));
    assert!(app.backend.rows("stores").is_empty());
}

#[tokio::test]
async fn test_duplicate_shop_is_a_conflict() {
    let app = TestApp::spawn().await;
    let user_id = app.signed_in_seller("maker@example.com").await;
    app.backend
        .insert_row("stores", store_row(user_id, "Clay Corner", "ClayCorner"));

    let response = app
        .post_form(
            "/dashboard/stores",
            &[("name", "Second"), ("etsy_shop_name", "claycorner")],
        )
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = response.text().await.unwrap();
    assert!(body.contains("already exists"));
    assert_eq!(app.backend.rows("stores").len(), 1);
}

#[tokio::test]
async fn test_malformed_id_is_not_found() {
    let app = TestApp::spawn().await;
    app.signed_in_seller("maker@example.com").await;

    let response = app.get("/dashboard/stores/not-a-uuid/edit").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_other_sellers_store_is_not_editable() {
    let app = TestApp::spawn().await;
    app.signed_in_seller("maker@example.com").await;
    let other = app.backend.add_user("other@example.com", "irrelevant", None);
    let row = app
        .backend
        .insert_row("stores", store_row(other, "Not Yours", "NotYours"));
    let id = row["id"].as_str().unwrap();

    let response = app.get(&format!("/dashboard/stores/{id}/edit")).await;
    assert_eq!(location(&response), "/dashboard/stores?error=not_found");

    let response = app
        .post_form(&format!("/dashboard/stores/{id}/delete"), &[])
        .await;
    assert_eq!(location(&response), "/dashboard/stores?error=not_found");
    assert_eq!(app.backend.rows("stores").len(), 1);
}

// =============================================================================
// Products
// =============================================================================

#[tokio::test]
async fn test_product_lifecycle_and_store_filter() {
    let app = TestApp::spawn().await;
    let user_id = app.signed_in_seller("maker@example.com").await;
    let first = app
        .backend
        .insert_row("stores", store_row(user_id, "Clay Corner", "ClayCorner"));
    let second = app
        .backend
        .insert_row("stores", store_row(user_id, "Paper Trail", "PaperTrail"));
    app.backend.insert_row(
        "products",
        product_row(user_id, &second["id"], "Letterpress Card", 20),
    );

    let first_id = first["id"].as_str().unwrap();
    let response = app
        .post_form(
            "/dashboard/products",
            &[
                ("store_id", first_id),
                ("title", "Speckled Mug"),
                ("price", "$32.50"),
                ("quantity", "4"),
                ("tags", "mug, ceramic, Mug"),
                ("status", "active"),
            ],
        )
        .await;
    assert_eq!(location(&response), "/dashboard/products?notice=created");

    let created = app
        .backend
        .rows("products")
        .into_iter()
        .find(|p| p["title"] == "Speckled Mug")
        .unwrap();
    assert_eq!(created["store_id"], first["id"]);
    assert_eq!(created["tags"], json!(["mug", "ceramic"]));

    let all = app.get("/dashboard/products").await.text().await.unwrap();
    assert!(all.contains("Speckled Mug"));
    assert!(all.contains("Letterpress Card"));

    let filtered = app
        .get(&format!("/dashboard/products?store={first_id}"))
        .await
        .text()
        .await
        .unwrap();
    assert!(filtered.contains("Speckled Mug"));
    assert!(!filtered.contains("Letterpress Card"));

    let id = created["id"].as_str().unwrap();
    let response = app
        .post_form(&format!("/dashboard/products/{id}/delete"), &[])
        .await;
    assert_eq!(location(&response), "/dashboard/products?notice=deleted");
    assert_eq!(app.backend.rows("products").len(), 1);
}

#[tokio::test]
async fn test_list_pages_tolerate_garbled_query_strings() {
    let app = TestApp::spawn().await;
    let user_id = app.signed_in_seller("maker@example.com").await;
    let store = app
        .backend
        .insert_row("stores", store_row(user_id, "Clay Corner", "ClayCorner"));
    app.backend.insert_row(
        "products",
        product_row(user_id, &store["id"], "Speckled Mug", 3),
    );

    for query in ["page=abc", "dir=ASC", "page=-1", "page=", "per_page=x", "sort=nope&dir="] {
        for list in ["products", "stores", "templates"] {
            let response = app.get(&format!("/dashboard/{list}?{query}")).await;
            assert_eq!(response.status(), StatusCode::OK, "{list}?{query}");
        }
    }

    let body = app
        .get("/dashboard/products?page=abc")
        .await
        .text()
        .await
        .unwrap();
    assert!(body.contains("Speckled Mug"));
}

#[tokio::test]
async fn test_product_price_must_be_a_number() {
    let app = TestApp::spawn().await;
    let user_id = app.signed_in_seller("maker@example.com").await;
    let store = app
        .backend
        .insert_row("stores", store_row(user_id, "Clay Corner", "ClayCorner"));

    let response = app
        .post_form(
            "/dashboard/products",
            &[
                ("store_id", store["id"].as_str().unwrap()),
                ("title", "Speckled Mug"),
                ("price", "cheap"),
            ],
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(response.text().await.unwrap().contains("Price"));
    assert!(app.backend.rows("products").is_empty());
}

// =============================================================================
// Templates
// =============================================================================

#[tokio::test]
async fn test_template_create_and_preview() {
    let app = TestApp::spawn().await;
    let user_id = app.signed_in_seller("maker@example.com").await;
    let store = app
        .backend
        .insert_row("stores", store_row(user_id, "Clay Corner", "ClayCorner"));
    app.backend.insert_row(
        "products",
        product_row(user_id, &store["id"], "Speckled Mug", 3),
    );

    let response = app
        .post_form(
            "/dashboard/templates",
            &[
                ("name", "Mug title"),
                ("category", "title"),
                ("content", "{title} from {store} in {glaze}"),
                ("is_default", "on"),
            ],
        )
        .await;
    assert_eq!(location(&response), "/dashboard/templates?notice=created");

    let rows = app.backend.rows("templates");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["is_default"], true);
    let id = rows[0]["id"].as_str().unwrap();

    let response = app
        .get(&format!("/dashboard/templates/{id}/preview"))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response.text().await.unwrap();
    assert!(body.contains("Speckled Mug from Clay Corner in {glaze}"));
    assert!(body.contains("Unknown placeholders"));
}

#[tokio::test]
async fn test_template_requires_content() {
    let app = TestApp::spawn().await;
    app.signed_in_seller("maker@example.com").await;

    let response = app
        .post_form(
            "/dashboard/templates",
            &[("name", "Empty"), ("category", "description"), ("content", "   ")],
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(app.backend.rows("templates").is_empty());
}

// =============================================================================
// Overview, analytics, alerts, settings
// =============================================================================

#[tokio::test]
async fn test_overview_lists_alerts_and_dismisses_them() {
    let app = TestApp::spawn().await;
    let user_id = app.signed_in_seller("maker@example.com").await;
    let own = app.backend.insert_row(
        "system_alerts",
        json!({
            "user_id": user_id,
            "severity": "warning",
            "title": "Etsy token expiring",
            "message": "Reconnect your shop this week.",
            "is_resolved": false,
        }),
    );
    app.backend.insert_row(
        "system_alerts",
        json!({
            "user_id": null,
            "severity": "info",
            "title": "Scheduled maintenance",
            "message": "Sync pauses Sunday night.",
            "is_resolved": false,
        }),
    );
    let other = app.backend.add_user("other@example.com", "irrelevant", None);
    app.backend.insert_row(
        "system_alerts",
        json!({
            "user_id": other,
            "severity": "critical",
            "title": "Someone else entirely",
            "message": "Not for this seller.",
            "is_resolved": false,
        }),
    );

    let body = app.get("/dashboard").await.text().await.unwrap();
    assert!(body.contains("Etsy token expiring"));
    assert!(body.contains("Scheduled maintenance"));
    assert!(!body.contains("Someone else entirely"));

    let id = own["id"].as_str().unwrap();
    let response = app
        .post_form(&format!("/dashboard/alerts/{id}/dismiss"), &[])
        .await;
    assert_eq!(location(&response), "/dashboard?notice=dismissed");

    let body = app.get("/dashboard?notice=dismissed").await.text().await.unwrap();
    assert!(!body.contains("Etsy token expiring"));
    assert!(body.contains("Alert dismissed."));
}

#[tokio::test]
async fn test_only_own_alerts_can_be_dismissed() {
    let app = TestApp::spawn().await;
    app.signed_in_seller("maker@example.com").await;
    // Even with a policy that lets every seller write every alert.
    app.backend.set_open_alerts(true);

    let other = app.backend.add_user("other@example.com", "irrelevant", None);
    let theirs = app.backend.insert_row(
        "system_alerts",
        json!({
            "user_id": other,
            "severity": "critical",
            "title": "Someone else entirely",
            "message": "Not for this seller.",
            "is_resolved": false,
        }),
    );
    let global = app.backend.insert_row(
        "system_alerts",
        json!({
            "user_id": null,
            "severity": "info",
            "title": "Scheduled maintenance",
            "message": "Sync pauses Sunday night.",
            "is_resolved": false,
        }),
    );

    let body = app.get("/dashboard").await.text().await.unwrap();
    assert!(body.contains("Scheduled maintenance"));
    let global_id = global["id"].as_str().unwrap();
    assert!(!body.contains(&format!("/dashboard/alerts/{global_id}/dismiss")));

    for alert in [&theirs, &global] {
        let id = alert["id"].as_str().unwrap();
        let response = app
            .post_form(&format!("/dashboard/alerts/{id}/dismiss"), &[])
            .await;
        assert_eq!(location(&response), "/dashboard?error=dismiss_failed");
    }

    assert!(
        app.backend
            .rows("system_alerts")
            .iter()
            .all(|a| a["is_resolved"] == false)
    );
}

#[tokio::test]
async fn test_analytics_ranges() {
    let app = TestApp::spawn().await;
    let user_id = app.signed_in_seller("maker@example.com").await;
    let store = app
        .backend
        .insert_row("stores", store_row(user_id, "Clay Corner", "ClayCorner"));
    app.backend.insert_row(
        "products",
        product_row(user_id, &store["id"], "Speckled Mug", 3),
    );

    for range in ["7d", "30d", "90d", "all", "bogus"] {
        let response = app.get(&format!("/dashboard/analytics?range={range}")).await;
        assert_eq!(response.status(), StatusCode::OK, "{range}");
        let body = response.text().await.unwrap();
        assert!(body.contains("Clay Corner"), "{range}");
    }
}

#[tokio::test]
async fn test_settings_update_display_name() {
    let app = TestApp::spawn().await;
    app.signed_in_seller("maker@example.com").await;

    let body = app.get("/dashboard/settings").await.text().await.unwrap();
    assert!(body.contains("maker@example.com"));

    let response = app
        .post_form("/dashboard/settings", &[("full_name", "Ada Potter")])
        .await;
    assert_eq!(location(&response), "/dashboard/settings?notice=saved");
    assert_eq!(
        app.backend.full_name("maker@example.com").as_deref(),
        Some("Ada Potter")
    );

    let body = app.get("/dashboard").await.text().await.unwrap();
    assert!(body.contains("Ada Potter"));
}

// =============================================================================
// Read failures
// =============================================================================

#[tokio::test]
async fn test_failed_reads_show_demo_data_when_enabled() {
    let app = TestApp::spawn_with(true).await;
    app.signed_in_seller("maker@example.com").await;
    app.backend.set_fail_reads(true);

    let response = app.get("/dashboard/stores").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response.text().await.unwrap();
    assert!(body.contains("Showing demo data."));
    assert!(body.contains(&gainsy_core::demo::stores()[1].name));
}

#[tokio::test]
async fn test_failed_reads_show_error_when_demo_disabled() {
    let app = TestApp::spawn_with(false).await;
    app.signed_in_seller("maker@example.com").await;
    app.backend.set_fail_reads(true);

    let response = app.get("/dashboard/stores").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response.text().await.unwrap();
    assert!(body.contains("load your latest data"));
    assert!(!body.contains("Showing demo data."));
    assert!(!body.contains(&gainsy_core::demo::stores()[1].name));
}

// =============================================================================
// JSON API
// =============================================================================

#[tokio::test]
async fn test_stats_api_is_cached_until_a_write() {
    let app = TestApp::spawn().await;
    let user_id = app.signed_in_seller("maker@example.com").await;
    let store = app
        .backend
        .insert_row("stores", store_row(user_id, "Clay Corner", "ClayCorner"));
    app.backend.insert_row(
        "products",
        product_row(user_id, &store["id"], "Speckled Mug", 3),
    );

    let stats: Value = app.get("/api/stats").await.json().await.unwrap();
    assert_eq!(stats["total_stores"], 1);
    assert_eq!(stats["total_products"], 1);
    assert_eq!(stats["low_stock_products"], 1);
    assert_eq!(stats["total_sales"], 8);

    // A row written behind the app's back stays hidden until the cache is
    // invalidated.
    app.backend
        .insert_row("stores", store_row(user_id, "Paper Trail", "PaperTrail"));
    let stats: Value = app.get("/api/stats").await.json().await.unwrap();
    assert_eq!(stats["total_stores"], 1);

    app.post_form(
        "/dashboard/stores",
        &[("name", "Third"), ("etsy_shop_name", "ThirdShop")],
    )
    .await;
    let stats: Value = app.get("/api/stats").await.json().await.unwrap();
    assert_eq!(stats["total_stores"], 3);
}

#[tokio::test]
async fn test_overview_stats_match_the_rows_it_lists() {
    let app = TestApp::spawn().await;
    let user_id = app.signed_in_seller("maker@example.com").await;
    app.backend
        .insert_row("stores", store_row(user_id, "Clay Corner", "ClayCorner"));

    let stats: Value = app.get("/api/stats").await.json().await.unwrap();
    assert_eq!(stats["active_stores"], 1);

    app.backend
        .insert_row("stores", store_row(user_id, "Paper Trail", "PaperTrail"));
    let body = app.get("/dashboard").await.text().await.unwrap();
    assert!(body.contains("2 active"));

    // The overview's fresh numbers replace the older cached ones.
    let stats: Value = app.get("/api/stats").await.json().await.unwrap();
    assert_eq!(stats["active_stores"], 2);
}

#[tokio::test]
async fn test_stats_api_reports_backend_failure() {
    let app = TestApp::spawn().await;
    app.signed_in_seller("maker@example.com").await;
    app.backend.set_fail_reads(true);

    let response = app.get("/api/stats").await;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
}
