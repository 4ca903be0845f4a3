//! Analytics page: store and product performance over a date range.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use chrono::Utc;
use gainsy_core::{
    AnalyticsRange, DashboardStats, ProductPerformance, StorePerformance, demo,
};
use serde::Deserialize;
use tracing::instrument;

use crate::backend::{ProductTable, StoreTable};
use crate::filters;
use crate::middleware::RequireAuth;
use crate::state::AppState;

use super::dashboard::Nav;
use super::fallback::{Banner, combined_banner, load};

const TOP_PRODUCTS: usize = 10;

/// Analytics query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct AnalyticsQuery {
    pub range: Option<String>,
}

impl AnalyticsQuery {
    /// Requested range; missing or unknown values mean the default.
    #[must_use]
    pub fn range(&self) -> AnalyticsRange {
        self.range
            .as_deref()
            .and_then(|r| r.parse().ok())
            .unwrap_or_default()
    }
}

/// Range selector entry.
#[derive(Debug, Clone)]
pub struct RangeOption {
    pub value: &'static str,
    pub label: &'static str,
    pub selected: bool,
}

/// Store performance row for display.
#[derive(Debug, Clone)]
pub struct StoreRow {
    pub name: String,
    pub status_label: &'static str,
    pub status_badge: &'static str,
    pub product_count: usize,
    pub active_products: usize,
    pub views: i64,
    pub sales: i64,
    pub revenue: String,
    pub conversion_rate: f64,
}

impl From<StorePerformance> for StoreRow {
    fn from(row: StorePerformance) -> Self {
        Self {
            name: row.name,
            status_label: row.status.label(),
            status_badge: row.status.badge_class(),
            product_count: row.product_count,
            active_products: row.active_products,
            views: row.views,
            sales: row.sales,
            revenue: row.revenue.display(),
            conversion_rate: row.conversion_rate,
        }
    }
}

/// Product performance row for display.
#[derive(Debug, Clone)]
pub struct ProductRow {
    pub rank: usize,
    pub title: String,
    pub store_name: String,
    pub views: i64,
    pub favorites: i64,
    pub sales: i64,
    pub revenue: String,
    pub conversion_rate: f64,
}

/// Analytics page template.
#[derive(Template, WebTemplate)]
#[template(path = "dashboard/analytics.html")]
pub struct AnalyticsTemplate {
    pub nav: Nav,
    pub banners: Vec<Banner>,
    pub ranges: Vec<RangeOption>,
    pub range_label: &'static str,
    pub totals: DashboardStats,
    pub revenue: String,
    pub stores: Vec<StoreRow>,
    pub products: Vec<ProductRow>,
}

/// Display analytics for the selected range.
///
/// The range narrows products by listing date; stores are always shown.
/// Demo data is measured from its own reference time so the ranges stay
/// meaningful.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn index(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Query(query): Query<AnalyticsQuery>,
) -> impl IntoResponse {
    let range = query.range();
    let backend = state.backend();
    let token = user.access_token.as_str();
    let store_table = StoreTable::new(backend, user.id, token);
    let product_table = ProductTable::new(backend, user.id, token);

    let (stores, products) = tokio::join!(
        load(&state, "stores", store_table.list(), demo::stores),
        load(&state, "products", product_table.list(), demo::products),
    );

    let banners = combined_banner(&stores, &products).into_iter().collect();
    let now = if products.is_demo() {
        demo::reference_time()
    } else {
        Utc::now()
    };
    let in_range = range.filter(products.data, now);

    let totals = DashboardStats::compute(&stores.data, &in_range);
    let product_rows = ProductPerformance::top(&in_range, &stores.data, TOP_PRODUCTS)
        .into_iter()
        .enumerate()
        .map(|(i, row)| ProductRow {
            rank: i + 1,
            title: row.title,
            store_name: row.store_name,
            views: row.views,
            favorites: row.favorites,
            sales: row.sales,
            revenue: row.revenue.display(),
            conversion_rate: row.conversion_rate,
        })
        .collect();

    AnalyticsTemplate {
        nav: Nav::new(&user, "analytics"),
        banners,
        ranges: AnalyticsRange::ALL
            .into_iter()
            .map(|r| RangeOption {
                value: r.as_str(),
                label: r.label(),
                selected: r == range,
            })
            .collect(),
        range_label: range.label(),
        revenue: totals.revenue().display(),
        totals,
        stores: StorePerformance::compute(&stores.data, &in_range)
            .into_iter()
            .map(StoreRow::from)
            .collect(),
        products: product_rows,
    }
}
