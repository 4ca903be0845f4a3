//! Seed a seller account with the built-in demo data.
//!
//! # Usage
//!
//! ```bash
//! gainsy seed --email maker@example.com --password '...'
//! ```
//!
//! Signs in as the seller, then inserts the demo stores, products and
//! templates under their account. Stores are created one at a time so each
//! product can be pointed at its new store; products and templates go in as
//! single bulk inserts.
//!
//! # Environment Variables
//!
//! - `GAINSY_BACKEND_URL` - Hosted backend project URL
//! - `GAINSY_BACKEND_ANON_KEY` - Hosted backend public (anon) API key
//! - `GAINSY_SEED_PASSWORD` - Used when `--password` is omitted

use std::collections::HashMap;

use gainsy_core::{Email, ProductDraft, StoreDraft, StoreId, TemplateDraft, demo};
use gainsy_web::backend::{ProductTable, StoreTable, TemplateTable};
use secrecy::{ExposeSecret, SecretString};

use super::{CommandError, connect};

/// What a seed run inserted.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub stores: usize,
    pub products: usize,
    pub templates: usize,
}

/// Insert demo data for the seller identified by `email`.
///
/// # Errors
///
/// Returns an error if sign-in fails, the account already has stores and
/// `force` is false, or any insert fails. Stores inserted before a failure
/// are left in place.
pub async fn run(
    email: &str,
    password: &SecretString,
    force: bool,
) -> Result<SeedSummary, CommandError> {
    let email = Email::parse(email).map_err(|e| CommandError::InvalidArgument(e.to_string()))?;
    let client = connect()?;

    let session = client
        .sign_in_with_password(&email, password.expose_secret())
        .await?;
    let user_id = session.user.id;
    let token = session.access_token.as_str();
    tracing::info!(%user_id, "Signed in");

    let stores = StoreTable::new(&client, user_id, token);
    let existing = stores.count().await?;
    if existing > 0 && !force {
        return Err(CommandError::AlreadySeeded(email.to_string(), existing));
    }

    let mut store_ids: HashMap<StoreId, StoreId> = HashMap::new();
    for store in demo::stores() {
        let created = stores.create(&StoreDraft::from(&store)).await?;
        tracing::info!(store = %created.name, id = %created.id, "Store created");
        store_ids.insert(store.id, created.id);
    }

    let products = remap_products(&store_ids);
    ProductTable::new(&client, user_id, token)
        .create_many(&products)
        .await?;
    tracing::info!(count = products.len(), "Products created");

    let templates: Vec<TemplateDraft> = demo::templates()
        .iter()
        .map(TemplateDraft::from)
        .collect();
    TemplateTable::new(&client, user_id, token)
        .create_many(&templates)
        .await?;
    tracing::info!(count = templates.len(), "Templates created");

    if let Err(e) = client.sign_out(token).await {
        tracing::warn!(error = %e, "Sign-out after seeding failed");
    }

    Ok(SeedSummary {
        stores: store_ids.len(),
        products: products.len(),
        templates: templates.len(),
    })
}

/// Demo product drafts pointed at the newly created stores.
///
/// Products whose demo store was not created are skipped.
fn remap_products(store_ids: &HashMap<StoreId, StoreId>) -> Vec<ProductDraft> {
    demo::products()
        .iter()
        .filter_map(|product| {
            let store_id = *store_ids.get(&product.store_id)?;
            Some(ProductDraft {
                store_id,
                ..ProductDraft::from(product)
            })
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_remap_products_points_at_new_stores() {
        let demo_stores = demo::stores();
        let store_ids: HashMap<StoreId, StoreId> = demo_stores
            .iter()
            .map(|s| (s.id, StoreId::random()))
            .collect();

        let drafts = remap_products(&store_ids);
        assert_eq!(drafts.len(), demo::products().len());
        assert!(
            drafts
                .iter()
                .all(|d| store_ids.values().any(|id| *id == d.store_id))
        );
    }

    #[test]
    fn test_remap_products_skips_missing_stores() {
        let first = demo::stores()[0].id;
        let store_ids = HashMap::from([(first, StoreId::random())]);

        let drafts = remap_products(&store_ids);
        let expected = demo::products()
            .iter()
            .filter(|p| p.store_id == first)
            .count();
        assert_eq!(drafts.len(), expected);
    }
}
