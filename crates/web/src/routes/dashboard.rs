//! Dashboard overview plus the pieces every dashboard page shares.

use std::collections::HashMap;
use std::str::FromStr;

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use chrono::{DateTime, Utc};
use gainsy_core::{
    DashboardStats, Product, Store, StoreId, SystemAlert, demo, stats::top_products,
};
use serde::Deserialize;
use tracing::instrument;

use crate::backend::{AlertTable, BackendError, ProductTable, StoreTable};
use crate::error::AppError;
use crate::filters;
use crate::middleware::RequireAuth;
use crate::models::CurrentUser;
use crate::state::AppState;

use super::fallback::{Banner, combined_banner, load};

const RECENT_PRODUCTS: usize = 5;
const LOW_STOCK_SHOWN: usize = 5;
const TOP_SELLERS: usize = 3;

// =============================================================================
// Shared
// =============================================================================

/// Sidebar and header data for dashboard pages.
#[derive(Debug, Clone)]
pub struct Nav {
    pub user_name: String,
    pub email: String,
    /// Section highlighted in the sidebar.
    pub active: &'static str,
}

impl Nav {
    #[must_use]
    pub fn new(user: &CurrentUser, active: &'static str) -> Self {
        Self {
            user_name: user.display_name().to_string(),
            email: user.email.clone(),
            active,
        }
    }
}

/// `?notice=` / `?error=` codes set by redirects after a write.
#[derive(Debug, Default, Deserialize)]
pub struct NoticeQuery {
    pub notice: Option<String>,
    pub error: Option<String>,
}

impl NoticeQuery {
    /// Banner for the codes, naming the record kind (e.g. `"Store"`).
    #[must_use]
    pub fn banner(&self, noun: &str) -> Option<Banner> {
        if let Some(code) = self.error.as_deref() {
            let message = match code {
                "delete_failed" => format!("{noun} could not be deleted. Please try again."),
                "not_found" => format!("{noun} not found. It may have been deleted."),
                "dismiss_failed" => "That alert could not be dismissed.".to_string(),
                _ => "Something went wrong. Please try again.".to_string(),
            };
            return Some(Banner::error(message));
        }

        let message = match self.notice.as_deref()? {
            "created" => format!("{noun} created."),
            "updated" => format!("{noun} saved."),
            "deleted" => format!("{noun} deleted."),
            "dismissed" => "Alert dismissed.".to_string(),
            "saved" => "Settings saved.".to_string(),
            _ => return None,
        };
        Some(Banner::success(message))
    }
}

/// Parse a path ID, treating malformed IDs as missing records.
///
/// # Errors
///
/// Returns [`AppError::NotFound`] when `raw` is not a valid ID.
pub fn parse_id<T: FromStr>(raw: &str, what: &str) -> Result<T, AppError> {
    raw.parse()
        .map_err(|_| AppError::NotFound(format!("{what} {raw}")))
}

/// Short date for tables, e.g. `Mar 4, 2024`.
#[must_use]
pub fn short_date(at: DateTime<Utc>) -> String {
    at.format("%b %-d, %Y").to_string()
}

/// Store names by ID, for labelling products.
#[must_use]
pub fn store_names(stores: &[Store]) -> HashMap<StoreId, String> {
    stores.iter().map(|s| (s.id, s.name.clone())).collect()
}

/// A `<select>` option in an entity form.
#[derive(Debug, Clone)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
    pub selected: bool,
}

impl SelectOption {
    #[must_use]
    pub fn new(value: &str, label: &str, current: &str) -> Self {
        Self {
            value: value.to_string(),
            label: label.to_string(),
            selected: value.eq_ignore_ascii_case(current.trim()),
        }
    }
}

/// Status and message for a failed write.
pub fn write_failure(error: BackendError, action: &str) -> (StatusCode, String) {
    let app = AppError::from(error);
    let status = app.status();
    if status.is_server_error() {
        tracing::error!(error = %app, action, "Backend write failed");
    } else {
        tracing::warn!(error = %app, action, "Backend write rejected");
    }
    let message = match &app {
        AppError::Backend(BackendError::Conflict(_)) => {
            format!("Could not {action}: a record with those details already exists.")
        }
        _ => format!("Could not {action}: {}.", app.public_message()),
    };
    (status, message)
}

/// Label for a product's store when the store isn't loaded.
pub const UNKNOWN_STORE: &str = "Unknown store";

// =============================================================================
// Overview
// =============================================================================

/// One row in the recent-products and low-stock lists.
#[derive(Debug, Clone)]
pub struct ProductSummary {
    pub id: String,
    pub title: String,
    pub store_name: String,
    pub price: String,
    pub quantity: i32,
    pub status_label: &'static str,
    pub status_badge: &'static str,
    pub revenue: String,
    pub sales: i64,
}

impl ProductSummary {
    fn new(product: &Product, names: &HashMap<StoreId, String>) -> Self {
        Self {
            id: product.id.to_string(),
            title: product.title.clone(),
            store_name: names
                .get(&product.store_id)
                .cloned()
                .unwrap_or_else(|| UNKNOWN_STORE.to_string()),
            price: product.listing_price().display(),
            quantity: product.quantity,
            status_label: product.status.label(),
            status_badge: product.status.badge_class(),
            revenue: product.revenue_price().display(),
            sales: product.sales,
        }
    }
}

/// An alert as shown on the overview.
#[derive(Debug, Clone)]
pub struct AlertView {
    pub id: String,
    pub title: String,
    pub message: String,
    pub severity_label: &'static str,
    pub severity_class: &'static str,
    pub created: String,
    /// Global alerts have no dismiss button.
    pub dismissible: bool,
}

impl From<&SystemAlert> for AlertView {
    fn from(alert: &SystemAlert) -> Self {
        Self {
            dismissible: !alert.is_global(),
            id: alert.id.to_string(),
            title: alert.title.clone(),
            message: alert.message.clone(),
            severity_label: alert.severity.label(),
            severity_class: alert.severity.badge_class(),
            created: short_date(alert.created_at),
        }
    }
}

/// Overview query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct OverviewQuery {
    pub welcome: Option<String>,
}

/// Dashboard overview template.
#[derive(Template, WebTemplate)]
#[template(path = "dashboard/overview.html")]
pub struct OverviewTemplate {
    pub nav: Nav,
    pub banners: Vec<Banner>,
    pub stats: DashboardStats,
    pub revenue: String,
    pub alerts: Vec<AlertView>,
    pub recent_products: Vec<ProductSummary>,
    pub low_stock: Vec<ProductSummary>,
    pub top_sellers: Vec<ProductSummary>,
    pub has_stores: bool,
}

/// Newest products first.
fn recent(products: &[Product], n: usize) -> Vec<&Product> {
    let mut sorted: Vec<&Product> = products.iter().collect();
    sorted.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    sorted.truncate(n);
    sorted
}

/// Display the dashboard overview.
///
/// Stores, products, and alerts load concurrently. Headline stats are
/// computed from the same rows the page lists, and refresh the per-seller
/// cache when both reads were live.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn overview(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Query(notice): Query<NoticeQuery>,
    Query(query): Query<OverviewQuery>,
) -> impl IntoResponse {
    let backend = state.backend();
    let token = user.access_token.as_str();
    let store_table = StoreTable::new(backend, user.id, token);
    let product_table = ProductTable::new(backend, user.id, token);
    let alert_table = AlertTable::new(backend, user.id, token);

    let generation = state.stats_generation(user.id).await;
    let (stores, products, alerts) = tokio::join!(
        load(&state, "stores", store_table.list(), demo::stores),
        load(&state, "products", product_table.list(), demo::products),
        load(&state, "alerts", alert_table.list_active(), demo::alerts),
    );

    let stats = DashboardStats::compute(&stores.data, &products.data);
    if stores.error.is_none() && products.error.is_none() {
        state
            .cache_stats(user.id, generation, stats.clone())
            .await;
    }

    let mut banners: Vec<Banner> = Vec::new();
    if query.welcome.is_some() {
        banners.push(Banner::success(
            "Welcome to Gainsy! Add your first store to get started.".to_string(),
        ));
    }
    banners.extend(notice.banner("Alert"));
    banners.extend(combined_banner(&stores, &products));

    let names = store_names(&stores.data);
    let summarize = |list: Vec<&Product>| -> Vec<ProductSummary> {
        list.into_iter()
            .map(|p| ProductSummary::new(p, &names))
            .collect()
    };

    let low_stock = products
        .data
        .iter()
        .filter(|p| p.is_low_stock())
        .take(LOW_STOCK_SHOWN)
        .collect();

    OverviewTemplate {
        nav: Nav::new(&user, "overview"),
        banners,
        revenue: stats.revenue().display(),
        stats,
        alerts: alerts.data.iter().map(AlertView::from).collect(),
        recent_products: summarize(recent(&products.data, RECENT_PRODUCTS)),
        low_stock: summarize(low_stock),
        top_sellers: summarize(top_products(&products.data, TOP_SELLERS)),
        has_stores: !stores.data.is_empty(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use gainsy_core::ProductId;

    use super::*;

    #[test]
    fn test_notice_banners() {
        let query = NoticeQuery {
            notice: Some("created".to_string()),
            error: None,
        };
        let banner = query.banner("Store").unwrap();
        assert_eq!(banner.kind, "success");
        assert_eq!(banner.message, "Store created.");

        let query = NoticeQuery {
            notice: Some("created".to_string()),
            error: Some("delete_failed".to_string()),
        };
        assert_eq!(query.banner("Product").unwrap().kind, "error");

        let query = NoticeQuery {
            notice: Some("bogus".to_string()),
            error: None,
        };
        assert!(query.banner("Store").is_none());
    }

    #[test]
    fn test_parse_id_maps_garbage_to_not_found() {
        let err = parse_id::<ProductId>("not-a-uuid", "Product").unwrap_err();
        assert_eq!(err.status(), axum::http::StatusCode::NOT_FOUND);

        let id = demo::products()[0].id;
        assert_eq!(parse_id::<ProductId>(&id.to_string(), "Product").unwrap(), id);
    }

    #[test]
    fn test_recent_is_newest_first() {
        let products = demo::products();
        let newest = recent(&products, 2);
        assert_eq!(newest.len(), 2);
        assert!(newest[0].created_at >= newest[1].created_at);
        assert!(products.iter().all(|p| p.created_at <= newest[0].created_at));
    }

    #[test]
    fn test_product_summary_labels_unknown_store() {
        let product = &demo::products()[0];
        let summary = ProductSummary::new(product, &HashMap::new());
        assert_eq!(summary.store_name, UNKNOWN_STORE);

        let names = store_names(&demo::stores());
        let summary = ProductSummary::new(product, &names);
        assert_ne!(summary.store_name, UNKNOWN_STORE);
    }

    #[test]
    fn test_write_failure_messages() {
        let (status, message) = write_failure(
            BackendError::Conflict("duplicate key".to_string()),
            "add the store",
        );
        assert_eq!(status, StatusCode::CONFLICT);
        assert!(message.contains("already exists"));

        let (status, _) = write_failure(BackendError::Timeout, "save the store");
        assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
    }

    #[test]
    fn test_short_date() {
        assert_eq!(short_date(demo::reference_time()), "Jun 1, 2024");
    }
}
