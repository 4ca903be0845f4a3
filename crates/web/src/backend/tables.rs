//! Typed access to the seller-owned tables.
//!
//! Every query carries the seller's access token, so the backend's row-level
//! security is the real gate. The `user_id` filters here keep results scoped
//! even when a policy is looser than expected.

use std::fmt::Display;
use std::marker::PhantomData;

use chrono::{DateTime, Utc};
use gainsy_core::{
    AlertId, Email, Product, ProductDraft, ProductId, SortDirection, Store, StoreDraft, StoreId,
    SystemAlert, Template, TemplateDraft, TemplateId, UserId,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::json;

use super::{BackendClient, BackendError, Filter};

/// A record stored in a table with a `user_id` owner column.
pub trait OwnedRecord: DeserializeOwned + Send {
    /// Table name.
    const TABLE: &'static str;
    /// Column listed newest-first by default.
    const ORDER_BY: &'static str;
    /// Primary key type.
    type Id: Display + Copy + Send + Sync;
    /// Editable columns.
    type Draft: Serialize + Sync;
}

impl OwnedRecord for Store {
    const TABLE: &'static str = "stores";
    const ORDER_BY: &'static str = "created_at";
    type Id = StoreId;
    type Draft = StoreDraft;
}

impl OwnedRecord for Product {
    const TABLE: &'static str = "products";
    const ORDER_BY: &'static str = "created_at";
    type Id = ProductId;
    type Draft = ProductDraft;
}

impl OwnedRecord for Template {
    const TABLE: &'static str = "templates";
    const ORDER_BY: &'static str = "updated_at";
    type Id = TemplateId;
    type Draft = TemplateDraft;
}

/// Insert body: the draft plus its owner.
#[derive(Serialize)]
struct NewRow<'a, D> {
    user_id: UserId,
    #[serde(flatten)]
    draft: &'a D,
}

/// Update body: the draft plus a fresh modification time.
#[derive(Serialize)]
struct ChangedRow<'a, D> {
    #[serde(flatten)]
    draft: &'a D,
    updated_at: DateTime<Utc>,
}

/// CRUD for one seller's rows in one table.
pub struct OwnedTable<'a, R> {
    client: &'a BackendClient,
    user_id: UserId,
    token: &'a str,
    _record: PhantomData<fn() -> R>,
}

/// The seller's stores.
pub type StoreTable<'a> = OwnedTable<'a, Store>;
/// The seller's products.
pub type ProductTable<'a> = OwnedTable<'a, Product>;
/// The seller's listing templates.
pub type TemplateTable<'a> = OwnedTable<'a, Template>;

impl<'a, R: OwnedRecord> OwnedTable<'a, R> {
    /// Scope the table to `user_id`, authenticating with `token`.
    #[must_use]
    pub const fn new(client: &'a BackendClient, user_id: UserId, token: &'a str) -> Self {
        Self {
            client,
            user_id,
            token,
            _record: PhantomData,
        }
    }

    fn owned(&self) -> Filter {
        Filter::new().eq("user_id", self.user_id)
    }

    fn by_id(&self, id: R::Id) -> Filter {
        Filter::new().eq("id", id).eq("user_id", self.user_id)
    }

    /// All of the seller's rows, newest first.
    ///
    /// # Errors
    ///
    /// Returns a [`BackendError`] when the read fails.
    pub async fn list(&self) -> Result<Vec<R>, BackendError> {
        let filter = self.owned().order(R::ORDER_BY, SortDirection::Desc);
        self.client.select(R::TABLE, &filter, self.token).await
    }

    /// One row by ID.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::NotFound`] when the row does not exist or
    /// belongs to someone else.
    pub async fn get(&self, id: R::Id) -> Result<R, BackendError> {
        self.client
            .select_one(R::TABLE, &self.by_id(id), self.token)
            .await
    }

    /// Number of rows the seller owns.
    ///
    /// # Errors
    ///
    /// Returns a [`BackendError`] when the count fails.
    pub async fn count(&self) -> Result<u64, BackendError> {
        self.client.count(R::TABLE, &self.owned(), self.token).await
    }

    /// Insert a row owned by the seller.
    ///
    /// # Errors
    ///
    /// Returns a [`BackendError`] when the insert is rejected.
    pub async fn create(&self, draft: &R::Draft) -> Result<R, BackendError> {
        let body = NewRow {
            user_id: self.user_id,
            draft,
        };
        self.client.insert(R::TABLE, &body, self.token).await
    }

    /// Insert several rows in one request.
    ///
    /// # Errors
    ///
    /// Returns a [`BackendError`] when the insert is rejected.
    pub async fn create_many(&self, drafts: &[R::Draft]) -> Result<(), BackendError> {
        if drafts.is_empty() {
            return Ok(());
        }
        let rows: Vec<NewRow<'_, R::Draft>> = drafts
            .iter()
            .map(|draft| NewRow {
                user_id: self.user_id,
                draft,
            })
            .collect();
        self.client
            .insert_minimal(R::TABLE, &rows, self.token)
            .await
    }

    /// Replace a row's editable columns.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::NotFound`] when the row does not exist or
    /// belongs to someone else.
    pub async fn update(&self, id: R::Id, draft: &R::Draft) -> Result<R, BackendError> {
        let body = ChangedRow {
            draft,
            updated_at: Utc::now(),
        };
        self.client
            .update_where(R::TABLE, &self.by_id(id), &body, self.token)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| BackendError::NotFound(R::TABLE.to_string()))
    }

    /// Delete a row.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::NotFound`] when nothing was deleted.
    pub async fn delete(&self, id: R::Id) -> Result<(), BackendError> {
        match self
            .client
            .delete_where(R::TABLE, &self.by_id(id), self.token)
            .await?
        {
            0 => Err(BackendError::NotFound(R::TABLE.to_string())),
            _ => Ok(()),
        }
    }
}

impl ProductTable<'_> {
    /// Products listed in one store.
    ///
    /// # Errors
    ///
    /// Returns a [`BackendError`] when the read fails.
    pub async fn list_for_store(&self, store_id: StoreId) -> Result<Vec<Product>, BackendError> {
        let filter = self
            .owned()
            .eq("store_id", store_id)
            .order(Product::ORDER_BY, SortDirection::Desc);
        self.client.select(Product::TABLE, &filter, self.token).await
    }
}

// =============================================================================
// Alerts
// =============================================================================

/// System alerts visible to one seller.
pub struct AlertTable<'a> {
    client: &'a BackendClient,
    user_id: UserId,
    token: &'a str,
}

impl<'a> AlertTable<'a> {
    const TABLE: &'static str = "system_alerts";

    #[must_use]
    pub const fn new(client: &'a BackendClient, user_id: UserId, token: &'a str) -> Self {
        Self {
            client,
            user_id,
            token,
        }
    }

    /// Unresolved alerts for this seller plus global ones, most severe first.
    ///
    /// # Errors
    ///
    /// Returns a [`BackendError`] when the read fails.
    pub async fn list_active(&self) -> Result<Vec<SystemAlert>, BackendError> {
        let filter = Filter::new()
            .any_of(&[
                format!("user_id.eq.{}", self.user_id),
                "user_id.is.null".to_string(),
            ])
            .eq("is_resolved", false)
            .order("created_at", SortDirection::Desc);
        let alerts = self.client.select(Self::TABLE, &filter, self.token).await?;
        Ok(SystemAlert::active_for(alerts, self.user_id))
    }

    /// Mark one of this seller's own alerts resolved. Global alerts are
    /// never matched.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::NotFound`] when the alert is missing, global,
    /// or belongs to another seller.
    pub async fn dismiss(&self, id: AlertId) -> Result<(), BackendError> {
        let filter = Filter::new().eq("id", id).eq("user_id", self.user_id);
        let _: Vec<SystemAlert> = self
            .client
            .update_where(Self::TABLE, &filter, &json!({ "is_resolved": true }), self.token)
            .await?;
        Ok(())
    }
}

// =============================================================================
// Contact messages
// =============================================================================

/// A message from the public contact form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContactMessage {
    pub name: String,
    pub email: Email,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    pub message: String,
}

/// Write-only access to `contact_messages` with the public key.
pub struct ContactTable<'a> {
    client: &'a BackendClient,
}

impl<'a> ContactTable<'a> {
    const TABLE: &'static str = "contact_messages";

    #[must_use]
    pub const fn new(client: &'a BackendClient) -> Self {
        Self { client }
    }

    /// Store a contact message.
    ///
    /// # Errors
    ///
    /// Returns a [`BackendError`] when the insert is rejected.
    pub async fn submit(&self, message: &ContactMessage) -> Result<(), BackendError> {
        self.client
            .insert_minimal(Self::TABLE, message, self.client.anon_token())
            .await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use gainsy_core::demo;

    use super::*;

    #[test]
    fn test_new_row_flattens_draft_with_owner() {
        let store = &demo::stores()[0];
        let draft = StoreDraft::from(store);
        let body = serde_json::to_value(NewRow {
            user_id: store.user_id,
            draft: &draft,
        })
        .unwrap();
        assert_eq!(body["user_id"], json!(store.user_id.to_string()));
        assert_eq!(body["etsy_shop_name"], json!(store.etsy_shop_name));
        assert_eq!(body["status"], json!("active"));
        assert!(body.get("id").is_none());
    }

    #[test]
    fn test_changed_row_sets_updated_at() {
        let template = &demo::templates()[0];
        let draft = TemplateDraft::from(template);
        let body = serde_json::to_value(ChangedRow {
            draft: &draft,
            updated_at: demo::reference_time(),
        })
        .unwrap();
        assert_eq!(body["name"], json!(template.name));
        assert!(body["updated_at"].as_str().unwrap().starts_with("2024-06-01"));
        assert!(body.get("user_id").is_none());
    }

    #[test]
    fn test_contact_message_omits_blank_subject() {
        let message = ContactMessage {
            name: "Ada".to_string(),
            email: Email::parse("ada@example.com").unwrap(),
            subject: None,
            message: "Hello".to_string(),
        };
        let body = serde_json::to_value(&message).unwrap();
        assert_eq!(body["email"], json!("ada@example.com"));
        assert!(body.get("subject").is_none());
    }
}
