//! Product (Etsy listing) records.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{ValidationError, contains_ci, require_text};
use crate::listing::{Listable, SortDirection};
use crate::types::{CurrencyCode, Price, ProductId, ProductStatus, StoreId, UserId};

/// Etsy listing limits.
pub const TITLE_MAX: usize = 140;
pub const DESCRIPTION_MAX: usize = 10_000;
pub const MAX_TAGS: usize = 13;
pub const TAG_MAX: usize = 20;
pub const QUANTITY_MAX: i32 = 999;

/// Active listings at or below this quantity count as low stock.
pub const LOW_STOCK_THRESHOLD: i32 = 5;

/// A product listed in one of the seller's stores (`products` table).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub user_id: UserId,
    pub store_id: StoreId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub price: Decimal,
    #[serde(default)]
    pub currency: CurrencyCode,
    #[serde(default)]
    pub quantity: i32,
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub status: ProductStatus,
    #[serde(default)]
    pub views: i64,
    #[serde(default)]
    pub favorites: i64,
    #[serde(default)]
    pub sales: i64,
    #[serde(default)]
    pub revenue: Decimal,
    #[serde(default)]
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Listing price with currency.
    #[must_use]
    pub const fn listing_price(&self) -> Price {
        Price::new(self.price, self.currency)
    }

    /// Lifetime revenue with currency.
    #[must_use]
    pub const fn revenue_price(&self) -> Price {
        Price::new(self.revenue, self.currency)
    }

    /// Sales per view as a percentage; zero when there are no views.
    #[must_use]
    pub fn conversion_rate(&self) -> f64 {
        percentage(self.sales, self.views)
    }

    /// Whether this is an active listing running out of stock.
    #[must_use]
    pub fn is_low_stock(&self) -> bool {
        self.status == ProductStatus::Active && self.quantity <= LOW_STOCK_THRESHOLD
    }
}

/// `part / whole * 100`, or zero when `whole` is not positive.
#[allow(clippy::cast_precision_loss)] // Listing counters stay far below 2^52
pub(crate) fn percentage(part: i64, whole: i64) -> f64 {
    if whole <= 0 {
        return 0.0;
    }
    part as f64 / whole as f64 * 100.0
}

impl Listable for Product {
    const SORT_KEYS: &'static [&'static str] = &[
        "created", "updated", "title", "price", "quantity", "views", "sales", "revenue",
    ];
    const DEFAULT_SORT: &'static str = "created";
    const DEFAULT_DIRECTION: SortDirection = SortDirection::Desc;

    fn matches_search(&self, needle: &str) -> bool {
        contains_ci(&self.title, needle)
            || self.sku.as_deref().is_some_and(|s| contains_ci(s, needle))
            || self.tags.iter().any(|t| contains_ci(t, needle))
    }

    fn status_key(&self) -> &str {
        self.status.as_str()
    }

    fn compare_by(&self, other: &Self, key: &str) -> Ordering {
        match key {
            "title" => self.title.to_lowercase().cmp(&other.title.to_lowercase()),
            "price" => self.price.cmp(&other.price),
            "quantity" => self.quantity.cmp(&other.quantity),
            "views" => self.views.cmp(&other.views),
            "sales" => self.sales.cmp(&other.sales),
            "revenue" => self.revenue.cmp(&other.revenue),
            "updated" => self.updated_at.cmp(&other.updated_at),
            _ => self.created_at.cmp(&other.created_at),
        }
    }
}

/// Editable product columns, sent on insert and update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductDraft {
    pub store_id: StoreId,
    pub title: String,
    pub description: String,
    pub price: Decimal,
    pub currency: CurrencyCode,
    pub quantity: i32,
    pub sku: Option<String>,
    pub tags: Vec<String>,
    pub status: ProductStatus,
    pub image_url: Option<String>,
}

impl ProductDraft {
    /// Split a comma-separated tag field, trimming and dropping blanks and
    /// case-insensitive duplicates.
    #[must_use]
    pub fn parse_tags(raw: &str) -> Vec<String> {
        let mut tags: Vec<String> = Vec::new();
        for tag in raw.split(',').map(str::trim).filter(|t| !t.is_empty()) {
            if !tags.iter().any(|t| t.eq_ignore_ascii_case(tag)) {
                tags.push(tag.to_string());
            }
        }
        tags
    }

    /// Trim text fields and validate.
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] found.
    pub fn normalized(mut self) -> Result<Self, ValidationError> {
        self.title = self.title.trim().to_string();
        self.description = self.description.trim().to_string();
        self.sku = super::non_blank(self.sku.as_deref());
        self.image_url = super::non_blank(self.image_url.as_deref());
        self.validate()?;
        Ok(self)
    }

    /// Validate against Etsy's listing limits.
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] found.
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text(&self.title, "Title", TITLE_MAX)?;

        if self.description.chars().count() > DESCRIPTION_MAX {
            return Err(ValidationError::TooLong {
                field: "Description",
                max: DESCRIPTION_MAX,
            });
        }

        if self.price <= Decimal::ZERO {
            return Err(ValidationError::OutOfRange {
                field: "Price",
                message: "must be greater than zero",
            });
        }

        if !(0..=QUANTITY_MAX).contains(&self.quantity) {
            return Err(ValidationError::OutOfRange {
                field: "Quantity",
                message: "must be between 0 and 999",
            });
        }

        if self.tags.len() > MAX_TAGS {
            return Err(ValidationError::OutOfRange {
                field: "Tags",
                message: "are limited to 13 per listing",
            });
        }
        if self.tags.iter().any(|t| t.chars().count() > TAG_MAX) {
            return Err(ValidationError::TooLong {
                field: "Each tag",
                max: TAG_MAX,
            });
        }

        Ok(())
    }
}

impl From<&Product> for ProductDraft {
    fn from(product: &Product) -> Self {
        Self {
            store_id: product.store_id,
            title: product.title.clone(),
            description: product.description.clone(),
            price: product.price,
            currency: product.currency,
            quantity: product.quantity,
            sku: product.sku.clone(),
            tags: product.tags.clone(),
            status: product.status,
            image_url: product.image_url.clone(),
        }
    }
}
