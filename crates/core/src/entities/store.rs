//! Etsy store records.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ValidationError, contains_ci, require_text};
use crate::listing::{Listable, SortDirection};
use crate::types::{CurrencyCode, StoreId, StoreStatus, UserId};

/// Etsy shop names are 4-20 letters or digits.
const SHOP_NAME_MIN: usize = 4;
const SHOP_NAME_MAX: usize = 20;
const STORE_NAME_MAX: usize = 80;

/// A seller's connected Etsy store (`stores` table).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Store {
    pub id: StoreId,
    pub user_id: UserId,
    /// Seller-facing display name.
    pub name: String,
    /// Shop name as it appears in `etsy.com/shop/<name>`.
    pub etsy_shop_name: String,
    #[serde(default)]
    pub shop_url: Option<String>,
    #[serde(default)]
    pub currency: CurrencyCode,
    #[serde(default)]
    pub status: StoreStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Store {
    /// Public Etsy URL, falling back to the canonical shop path.
    #[must_use]
    pub fn public_url(&self) -> String {
        self.shop_url
            .clone()
            .unwrap_or_else(|| format!("https://www.etsy.com/shop/{}", self.etsy_shop_name))
    }
}

impl Listable for Store {
    const SORT_KEYS: &'static [&'static str] = &["created", "updated", "name", "status"];
    const DEFAULT_SORT: &'static str = "created";
    const DEFAULT_DIRECTION: SortDirection = SortDirection::Desc;

    fn matches_search(&self, needle: &str) -> bool {
        contains_ci(&self.name, needle) || contains_ci(&self.etsy_shop_name, needle)
    }

    fn status_key(&self) -> &str {
        self.status.as_str()
    }

    fn compare_by(&self, other: &Self, key: &str) -> Ordering {
        match key {
            "name" => self.name.to_lowercase().cmp(&other.name.to_lowercase()),
            "status" => self.status.as_str().cmp(other.status.as_str()),
            "updated" => self.updated_at.cmp(&other.updated_at),
            _ => self.created_at.cmp(&other.created_at),
        }
    }
}

/// Editable store columns, sent on insert and update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreDraft {
    pub name: String,
    pub etsy_shop_name: String,
    pub shop_url: Option<String>,
    pub currency: CurrencyCode,
    pub status: StoreStatus,
}

impl StoreDraft {
    /// Trim text fields and validate.
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] found.
    pub fn normalized(mut self) -> Result<Self, ValidationError> {
        self.name = self.name.trim().to_string();
        self.etsy_shop_name = self.etsy_shop_name.trim().to_string();
        self.shop_url = super::non_blank(self.shop_url.as_deref());
        self.validate()?;
        Ok(self)
    }

    /// Validate field formats.
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] found.
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text(&self.name, "Store name", STORE_NAME_MAX)?;

        let shop = self.etsy_shop_name.trim();
        if shop.is_empty() {
            return Err(ValidationError::Required("Etsy shop name"));
        }
        let len = shop.chars().count();
        if !(SHOP_NAME_MIN..=SHOP_NAME_MAX).contains(&len)
            || !shop.chars().all(|c| c.is_ascii_alphanumeric())
        {
            return Err(ValidationError::InvalidFormat {
                field: "Etsy shop name",
                message: "must be 4-20 letters or numbers",
            });
        }

        if let Some(raw) = &self.shop_url {
            let valid = url::Url::parse(raw.trim())
                .is_ok_and(|u| matches!(u.scheme(), "http" | "https") && u.host().is_some());
            if !valid {
                return Err(ValidationError::InvalidFormat {
                    field: "Shop URL",
                    message: "must be a full http(s) URL",
                });
            }
        }

        Ok(())
    }
}

impl From<&Store> for StoreDraft {
    fn from(store: &Store) -> Self {
        Self {
            name: store.name.clone(),
            etsy_shop_name: store.etsy_shop_name.clone(),
            shop_url: store.shop_url.clone(),
            currency: store.currency,
            status: store.status,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn draft() -> StoreDraft {
        StoreDraft {
            name: "  Moss & Fern ".to_string(),
            etsy_shop_name: "MossAndFern".to_string(),
            shop_url: Some("  ".to_string()),
            currency: CurrencyCode::Usd,
            status: StoreStatus::Active,
        }
    }

    #[test]
    fn test_normalized_trims_and_drops_blank_url() {
        let d = draft().normalized().unwrap();
        assert_eq!(d.name, "Moss & Fern");
        assert_eq!(d.shop_url, None);
    }

    #[test]
    fn test_shop_name_rules() {
        let mut d = draft();
        d.etsy_shop_name = "abc".to_string();
        assert!(matches!(
            d.validate(),
            Err(ValidationError::InvalidFormat { .. })
        ));
        d.etsy_shop_name = "has space".to_string();
        assert!(d.validate().is_err());
        d.etsy_shop_name = String::new();
        assert_eq!(
            d.validate(),
            Err(ValidationError::Required("Etsy shop name"))
        );
    }

    #[test]
    fn test_shop_url_must_be_http() {
        let mut d = draft();
        d.shop_url = Some("ftp://etsy.com/shop/x".to_string());
        assert!(d.validate().is_err());
        d.shop_url = Some("https://www.etsy.com/shop/MossAndFern".to_string());
        assert!(d.validate().is_ok());
    }

    #[test]
    fn test_deserialize_backend_row_with_defaults() {
        let row = serde_json::json!({
            "id": "6a1e5000-0000-4000-8000-000000000101",
            "user_id": "6a1e5000-0000-4000-8000-000000000001",
            "name": "Moss & Fern",
            "etsy_shop_name": "MossAndFern",
            "created_at": "2024-03-01T10:00:00+00:00",
            "updated_at": "2024-03-02T10:00:00+00:00"
        });
        let store: Store = serde_json::from_value(row).unwrap();
        assert_eq!(store.status, StoreStatus::Active);
        assert_eq!(store.currency, CurrencyCode::Usd);
        assert_eq!(store.public_url(), "https://www.etsy.com/shop/MossAndFern");
    }
}
