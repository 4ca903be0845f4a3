//! Dashboard and analytics aggregation.
//!
//! Everything here is computed from rows already fetched for the page; the
//! backend is never asked to aggregate.

use std::collections::HashMap;

use chrono::{DateTime, TimeDelta, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::entities::product::percentage;
use crate::entities::{Product, Store};
use crate::types::{CurrencyCode, Price, ProductId, ProductStatus, StoreId, StoreStatus};

/// Headline numbers for the dashboard overview.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardStats {
    pub total_stores: usize,
    pub active_stores: usize,
    pub total_products: usize,
    pub active_products: usize,
    pub draft_products: usize,
    pub low_stock_products: usize,
    pub total_views: i64,
    pub total_favorites: i64,
    pub total_sales: i64,
    pub total_revenue: Decimal,
    /// Currency most products are priced in; revenue is summed as-is.
    pub currency: CurrencyCode,
    /// Sales per view, as a percentage.
    pub conversion_rate: f64,
}

impl DashboardStats {
    /// Aggregate over a seller's stores and products.
    #[must_use]
    pub fn compute(stores: &[Store], products: &[Product]) -> Self {
        let total_views: i64 = products.iter().map(|p| p.views).sum();
        let total_sales: i64 = products.iter().map(|p| p.sales).sum();

        Self {
            total_stores: stores.len(),
            active_stores: stores
                .iter()
                .filter(|s| s.status == StoreStatus::Active)
                .count(),
            total_products: products.len(),
            active_products: count_status(products, ProductStatus::Active),
            draft_products: count_status(products, ProductStatus::Draft),
            low_stock_products: products.iter().filter(|p| p.is_low_stock()).count(),
            total_views,
            total_favorites: products.iter().map(|p| p.favorites).sum(),
            total_sales,
            total_revenue: products.iter().map(|p| p.revenue).sum(),
            currency: dominant_currency(products),
            conversion_rate: percentage(total_sales, total_views),
        }
    }

    /// Total revenue with currency.
    #[must_use]
    pub const fn revenue(&self) -> Price {
        Price::new(self.total_revenue, self.currency)
    }

    /// Conversion rate rounded for display, e.g. `2.4%`.
    #[must_use]
    pub fn conversion_display(&self) -> String {
        format!("{:.1}%", self.conversion_rate)
    }
}

fn count_status(products: &[Product], status: ProductStatus) -> usize {
    products.iter().filter(|p| p.status == status).count()
}

/// Most common product currency, defaulting to USD.
fn dominant_currency(products: &[Product]) -> CurrencyCode {
    let mut counts: HashMap<CurrencyCode, usize> = HashMap::new();
    for p in products {
        *counts.entry(p.currency).or_insert(0) += 1;
    }
    CurrencyCode::ALL
        .into_iter()
        .max_by_key(|c| (counts.get(c).copied().unwrap_or(0), std::cmp::Reverse(*c as u8)))
        .filter(|c| counts.contains_key(c))
        .unwrap_or_default()
}

/// Reporting window for the analytics page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AnalyticsRange {
    #[serde(rename = "7d")]
    Week,
    #[default]
    #[serde(rename = "30d")]
    Month,
    #[serde(rename = "90d")]
    Quarter,
    #[serde(rename = "all")]
    All,
}

impl AnalyticsRange {
    /// Every range, in selector order.
    pub const ALL: [Self; 4] = [Self::Week, Self::Month, Self::Quarter, Self::All];

    /// Query-string value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Week => "7d",
            Self::Month => "30d",
            Self::Quarter => "90d",
            Self::All => "all",
        }
    }

    /// Selector label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Week => "Last 7 days",
            Self::Month => "Last 30 days",
            Self::Quarter => "Last 90 days",
            Self::All => "All time",
        }
    }

    /// Start of the window, or `None` for all time.
    #[must_use]
    pub fn since(self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let days = match self {
            Self::Week => 7,
            Self::Month => 30,
            Self::Quarter => 90,
            Self::All => return None,
        };
        Some(now - TimeDelta::days(days))
    }

    /// Keep products listed within the window.
    #[must_use]
    pub fn filter(self, products: Vec<Product>, now: DateTime<Utc>) -> Vec<Product> {
        match self.since(now) {
            Some(since) => products
                .into_iter()
                .filter(|p| p.created_at >= since)
                .collect(),
            None => products,
        }
    }
}

impl std::str::FromStr for AnalyticsRange {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|r| r.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("invalid range: {s}"))
    }
}

/// Per-product analytics row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductPerformance {
    pub product_id: ProductId,
    pub title: String,
    pub store_name: String,
    pub views: i64,
    pub favorites: i64,
    pub sales: i64,
    pub revenue: Price,
    pub conversion_rate: f64,
}

impl ProductPerformance {
    /// Rows for the top `n` products, labelled with their store names.
    #[must_use]
    pub fn top(products: &[Product], stores: &[Store], n: usize) -> Vec<Self> {
        let names: HashMap<StoreId, &str> =
            stores.iter().map(|s| (s.id, s.name.as_str())).collect();

        top_products(products, n)
            .into_iter()
            .map(|p| Self {
                product_id: p.id,
                title: p.title.clone(),
                store_name: names
                    .get(&p.store_id)
                    .map_or_else(|| "Unknown store".to_string(), ToString::to_string),
                views: p.views,
                favorites: p.favorites,
                sales: p.sales,
                revenue: p.revenue_price(),
                conversion_rate: p.conversion_rate(),
            })
            .collect()
    }
}

/// The `n` best sellers: revenue descending, then sales, then title.
#[must_use]
pub fn top_products(products: &[Product], n: usize) -> Vec<&Product> {
    let mut ranked: Vec<&Product> = products.iter().collect();
    ranked.sort_by(|a, b| {
        b.revenue
            .cmp(&a.revenue)
            .then_with(|| b.sales.cmp(&a.sales))
            .then_with(|| a.title.cmp(&b.title))
    });
    ranked.truncate(n);
    ranked
}

/// Per-store analytics row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StorePerformance {
    pub store_id: StoreId,
    pub name: String,
    pub status: StoreStatus,
    pub product_count: usize,
    pub active_products: usize,
    pub views: i64,
    pub sales: i64,
    pub revenue: Price,
    pub conversion_rate: f64,
}

impl StorePerformance {
    /// One row per store, highest revenue first. Products whose store is not
    /// in `stores` are ignored.
    #[must_use]
    pub fn compute(stores: &[Store], products: &[Product]) -> Vec<Self> {
        let mut rows: Vec<Self> = stores
            .iter()
            .map(|store| {
                let owned: Vec<&Product> =
                    products.iter().filter(|p| p.store_id == store.id).collect();
                let views = owned.iter().map(|p| p.views).sum();
                let sales = owned.iter().map(|p| p.sales).sum();
                Self {
                    store_id: store.id,
                    name: store.name.clone(),
                    status: store.status,
                    product_count: owned.len(),
                    active_products: owned
                        .iter()
                        .filter(|p| p.status == ProductStatus::Active)
                        .count(),
                    views,
                    sales,
                    revenue: Price::new(owned.iter().map(|p| p.revenue).sum(), store.currency),
                    conversion_rate: percentage(sales, views),
                }
            })
            .collect();

        rows.sort_by(|a, b| {
            b.revenue
                .amount
                .cmp(&a.revenue.amount)
                .then_with(|| a.name.cmp(&b.name))
        });
        rows
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::demo;

    #[test]
    fn test_compute_matches_manual_sums() {
        let stores = demo::stores();
        let products = demo::products();
        let stats = DashboardStats::compute(&stores, &products);

        assert_eq!(stats.total_stores, stores.len());
        assert_eq!(stats.total_products, products.len());
        assert_eq!(
            stats.total_sales,
            products.iter().map(|p| p.sales).sum::<i64>()
        );
        assert_eq!(
            stats.total_revenue,
            products.iter().map(|p| p.revenue).sum::<Decimal>()
        );
        assert!(stats.active_products + stats.draft_products <= stats.total_products);
    }

    #[test]
    fn test_compute_empty() {
        let stats = DashboardStats::compute(&[], &[]);
        assert_eq!(stats.total_products, 0);
        assert!(stats.conversion_rate.abs() < f64::EPSILON);
        assert_eq!(stats.currency, CurrencyCode::Usd);
        assert_eq!(stats.revenue().display(), "$0.00");
        assert_eq!(stats.conversion_display(), "0.0%");
    }

    #[test]
    fn test_dominant_currency() {
        let mut products = demo::products();
        for p in &mut products {
            p.currency = CurrencyCode::Gbp;
        }
        assert_eq!(dominant_currency(&products), CurrencyCode::Gbp);
    }

    #[test]
    fn test_top_products_ordering() {
        let top = ProductPerformance::top(&demo::products(), &demo::stores(), 3);
        assert!(top.len() <= 3);
        assert!(
            top.windows(2)
                .all(|w| w[0].revenue.amount >= w[1].revenue.amount)
        );
        assert!(top.iter().all(|row| row.store_name != "Unknown store"));
    }

    #[test]
    fn test_top_products_breaks_revenue_ties_by_sales() {
        let mut products = demo::products();
        for p in &mut products {
            p.revenue = Decimal::ONE_HUNDRED;
        }
        let top = top_products(&products, 2);
        assert_eq!(top.len(), 2);
        assert!(top[0].sales >= top[1].sales);
        assert!(top_products(&products, 0).is_empty());
    }

    #[test]
    fn test_store_performance_covers_every_store() {
        let stores = demo::stores();
        let rows = StorePerformance::compute(&stores, &demo::products());
        assert_eq!(rows.len(), stores.len());
        let counted: usize = rows.iter().map(|r| r.product_count).sum();
        assert_eq!(counted, demo::products().len());
    }

    #[test]
    fn test_range_filter() {
        let now = demo::reference_time();
        let all = demo::products();
        let week = AnalyticsRange::Week.filter(all.clone(), now);
        assert!(week.iter().all(|p| p.created_at >= now - TimeDelta::days(7)));
        assert_eq!(AnalyticsRange::All.filter(all.clone(), now).len(), all.len());
        assert_eq!("90D".parse::<AnalyticsRange>().unwrap(), AnalyticsRange::Quarter);
        assert!("1y".parse::<AnalyticsRange>().is_err());
    }
}
