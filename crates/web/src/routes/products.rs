//! Product management route handlers.

use std::collections::HashMap;

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use gainsy_core::{
    CurrencyCode, ListQuery, Page, Product, ProductDraft, ProductId, ProductStatus, Store,
    StoreId, ValidationError, demo, listing,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::instrument;

use crate::backend::{BackendError, ProductTable, StoreTable};
use crate::components::{DataTableConfig, FilterOption, TableColumn, TableFilter, TableView};
use crate::error::{AppError, add_breadcrumb};
use crate::filters;
use crate::middleware::RequireAuth;
use crate::state::AppState;

use super::dashboard::{
    Nav, NoticeQuery, SelectOption, UNKNOWN_STORE, parse_id, store_names, write_failure,
};
use super::fallback::{Banner, Loaded, combined_banner, load};

const BASE_PATH: &str = "/dashboard/products";

fn table_config(stores: &[Store]) -> DataTableConfig {
    DataTableConfig::new(BASE_PATH)
        .column(TableColumn::sortable("title", "Product"))
        .column(TableColumn::new("Store"))
        .column(TableColumn::sortable("price", "Price").numeric())
        .column(TableColumn::sortable("quantity", "Stock").numeric())
        .column(TableColumn::sortable("views", "Views").numeric())
        .column(TableColumn::sortable("sales", "Sales").numeric())
        .column(TableColumn::sortable("revenue", "Revenue").numeric())
        .column(TableColumn::new("Status"))
        .filter(TableFilter::select(
            "status",
            "Status",
            ProductStatus::ALL
                .iter()
                .map(|s| FilterOption::new(s.as_str(), s.label()))
                .collect(),
        ))
        .filter(TableFilter::select(
            "store",
            "Store",
            stores
                .iter()
                .map(|s| FilterOption::new(&s.id.to_string(), &s.name))
                .collect(),
        ))
        .search_placeholder("Search by title, SKU, or tag...")
        .empty_state(
            "No products found",
            Some("Add a product or adjust your filters."),
        )
}

// =============================================================================
// List
// =============================================================================

/// Extra list filter: one store's products.
#[derive(Debug, Default, Deserialize)]
pub struct StoreFilterQuery {
    pub store: Option<String>,
}

impl StoreFilterQuery {
    /// Selected store; blank, `all`, or malformed values mean every store.
    fn store_id(&self) -> Option<StoreId> {
        self.store
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty() && !s.eq_ignore_ascii_case("all"))
            .and_then(|s| s.parse().ok())
    }
}

/// Product row as rendered in the list.
#[derive(Debug, Clone)]
pub struct ProductRow {
    pub id: String,
    pub title: String,
    pub sku: Option<String>,
    pub store_name: String,
    pub price: String,
    pub quantity: i32,
    pub low_stock: bool,
    pub views: i64,
    pub sales: i64,
    pub revenue: String,
    pub status_label: &'static str,
    pub status_badge: &'static str,
    pub image_url: Option<String>,
}

impl ProductRow {
    fn new(product: &Product, names: &HashMap<StoreId, String>) -> Self {
        Self {
            id: product.id.to_string(),
            title: product.title.clone(),
            sku: product.sku.clone(),
            store_name: names
                .get(&product.store_id)
                .cloned()
                .unwrap_or_else(|| UNKNOWN_STORE.to_string()),
            price: product.listing_price().display(),
            quantity: product.quantity,
            low_stock: product.is_low_stock(),
            views: product.views,
            sales: product.sales,
            revenue: product.revenue_price().display(),
            status_label: product.status.label(),
            status_badge: product.status.badge_class(),
            image_url: product.image_url.clone(),
        }
    }
}

/// Product list template.
#[derive(Template, WebTemplate)]
#[template(path = "dashboard/products/list.html")]
pub struct ProductListTemplate {
    pub nav: Nav,
    pub banners: Vec<Banner>,
    pub table: TableView,
    pub rows: Vec<ProductRow>,
}

/// List the seller's products, optionally for one store.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn index(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Query(query): Query<ListQuery>,
    Query(filter): Query<StoreFilterQuery>,
    Query(notice): Query<NoticeQuery>,
) -> impl IntoResponse {
    let backend = state.backend();
    let token = user.access_token.as_str();
    let store_table = StoreTable::new(backend, user.id, token);
    let product_table = ProductTable::new(backend, user.id, token);
    let store_id = filter.store_id();

    let products_read = async {
        match store_id {
            Some(id) => product_table.list_for_store(id).await,
            None => product_table.list().await,
        }
    };
    let demo_products = move || {
        demo::products()
            .into_iter()
            .filter(|p| store_id.is_none_or(|id| p.store_id == id))
            .collect()
    };

    let (stores, products) = tokio::join!(
        load(&state, "stores", store_table.list(), demo::stores),
        load(&state, "products", products_read, demo_products),
    );

    let mut banners: Vec<Banner> = notice.banner("Product").into_iter().collect();
    banners.extend(combined_banner(&stores, &products));

    let page: Page<Product> = listing::apply(products.data, &query);
    let extra = [("store", store_id.map(|id| id.to_string()))];
    let table = table_config(&stores.data).view::<Product, _>(&query, &extra, &page);
    let names = store_names(&stores.data);
    let rows = page.items.iter().map(|p| ProductRow::new(p, &names)).collect();

    ProductListTemplate {
        nav: Nav::new(&user, "products"),
        banners,
        table,
        rows,
    }
}

// =============================================================================
// Form
// =============================================================================

/// Product form data as submitted.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProductForm {
    pub store_id: String,
    pub title: String,
    pub description: String,
    pub price: String,
    pub currency: String,
    pub quantity: String,
    pub sku: String,
    /// Comma-separated.
    pub tags: String,
    pub status: String,
    pub image_url: String,
}

impl ProductForm {
    /// Parse and validate into a draft.
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] found.
    pub fn to_draft(&self) -> Result<ProductDraft, ValidationError> {
        let store_id: StoreId = self
            .store_id
            .trim()
            .parse()
            .map_err(|_| ValidationError::Required("Store"))?;

        let price_text = self.price.trim().trim_start_matches('$').replace(',', "");
        if price_text.is_empty() {
            return Err(ValidationError::Required("Price"));
        }
        let price: Decimal = price_text
            .parse()
            .map_err(|_| ValidationError::InvalidFormat {
                field: "Price",
                message: "must be a number like 24.00",
            })?;

        let quantity = match self.quantity.trim() {
            "" => 0,
            raw => raw.parse().map_err(|_| ValidationError::InvalidFormat {
                field: "Quantity",
                message: "must be a whole number",
            })?,
        };

        let currency = match self.currency.trim() {
            "" => CurrencyCode::default(),
            raw => raw.parse().map_err(|_| ValidationError::InvalidFormat {
                field: "Currency",
                message: "is not supported",
            })?,
        };

        let status = match self.status.trim() {
            "" => ProductStatus::default(),
            raw => raw.parse().map_err(|_| ValidationError::InvalidFormat {
                field: "Status",
                message: "is not recognized",
            })?,
        };

        ProductDraft {
            store_id,
            title: self.title.clone(),
            description: self.description.clone(),
            price: price.round_dp(2),
            currency,
            quantity,
            sku: Some(self.sku.clone()),
            tags: ProductDraft::parse_tags(&self.tags),
            status,
            image_url: Some(self.image_url.clone()),
        }
        .normalized()
    }
}

impl From<&Product> for ProductForm {
    fn from(product: &Product) -> Self {
        Self {
            store_id: product.store_id.to_string(),
            title: product.title.clone(),
            description: product.description.clone(),
            price: product.price.round_dp(2).to_string(),
            currency: product.currency.code().to_string(),
            quantity: product.quantity.to_string(),
            sku: product.sku.clone().unwrap_or_default(),
            tags: product.tags.join(", "),
            status: product.status.as_str().to_string(),
            image_url: product.image_url.clone().unwrap_or_default(),
        }
    }
}

/// Product create/edit form template.
#[derive(Template, WebTemplate)]
#[template(path = "dashboard/products/form.html")]
pub struct ProductFormTemplate {
    pub nav: Nav,
    pub banners: Vec<Banner>,
    pub title: &'static str,
    pub action: String,
    pub form: ProductForm,
    pub stores: Vec<SelectOption>,
    pub currencies: Vec<SelectOption>,
    pub statuses: Vec<SelectOption>,
    pub is_edit: bool,
}

impl ProductFormTemplate {
    fn new(nav: Nav, form: ProductForm, stores: &Loaded<Vec<Store>>, edit: Option<ProductId>) -> Self {
        let currency = match form.currency.as_str() {
            "" => CurrencyCode::default().code().to_string(),
            c => c.to_string(),
        };
        let status = match form.status.as_str() {
            "" => ProductStatus::default().as_str().to_string(),
            s => s.to_string(),
        };
        Self {
            nav,
            banners: stores.banner().into_iter().collect(),
            title: if edit.is_some() { "Edit product" } else { "Add product" },
            action: edit.map_or_else(|| BASE_PATH.to_string(), |id| format!("{BASE_PATH}/{id}")),
            stores: stores
                .data
                .iter()
                .map(|s| SelectOption::new(&s.id.to_string(), &s.name, &form.store_id))
                .collect(),
            currencies: CurrencyCode::ALL
                .iter()
                .map(|c| SelectOption::new(c.code(), c.code(), &currency))
                .collect(),
            statuses: ProductStatus::ALL
                .iter()
                .map(|s| SelectOption::new(s.as_str(), s.label(), &status))
                .collect(),
            is_edit: edit.is_some(),
            form,
        }
    }

    fn with_error(mut self, message: String) -> Self {
        self.banners.push(Banner::error(message));
        self
    }
}

/// Stores for the form's selector. Forms never offer demo stores.
async fn form_stores(table: &StoreTable<'_>) -> Loaded<Vec<Store>> {
    Loaded::resolve(table.list().await, "stores", false, Vec::new)
}

fn form_error(status: StatusCode, template: ProductFormTemplate, message: String) -> Response {
    (status, template.with_error(message)).into_response()
}

/// Query for the new-product form.
#[derive(Debug, Default, Deserialize)]
pub struct NewProductQuery {
    /// Preselected store.
    pub store: Option<String>,
}

/// Display the new-product form.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn new(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Query(query): Query<NewProductQuery>,
) -> impl IntoResponse {
    let table = StoreTable::new(state.backend(), user.id, &user.access_token);
    let stores = form_stores(&table).await;
    let form = ProductForm {
        store_id: query.store.unwrap_or_default(),
        ..ProductForm::default()
    };
    ProductFormTemplate::new(Nav::new(&user, "products"), form, &stores, None)
}

/// Create a product.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Form(form): Form<ProductForm>,
) -> Response {
    let backend = state.backend();
    let token = user.access_token.as_str();
    let stores = form_stores(&StoreTable::new(backend, user.id, token)).await;
    let template = ProductFormTemplate::new(Nav::new(&user, "products"), form.clone(), &stores, None);

    let draft = match form.to_draft() {
        Ok(draft) => draft,
        Err(e) => return form_error(StatusCode::UNPROCESSABLE_ENTITY, template, e.to_string()),
    };

    match ProductTable::new(backend, user.id, token).create(&draft).await {
        Ok(product) => {
            state.invalidate_stats(user.id).await;
            add_breadcrumb(
                "products",
                "Product created",
                Some(&[("product_id", product.id.to_string().as_str())]),
            );
            tracing::info!(product_id = %product.id, "Product created");
            Redirect::to(&format!("{BASE_PATH}?notice=created")).into_response()
        }
        Err(e) => {
            let (status, message) = write_failure(e, "add the product");
            form_error(status, template, message)
        }
    }
}

/// Display the edit form for a product.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn edit(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let id: ProductId = parse_id(&id, "Product")?;
    let backend = state.backend();
    let token = user.access_token.as_str();
    let store_table = StoreTable::new(backend, user.id, token);
    let product_table = ProductTable::new(backend, user.id, token);

    let (product, stores) = tokio::join!(product_table.get(id), form_stores(&store_table));
    match product {
        Ok(product) => Ok(ProductFormTemplate::new(
            Nav::new(&user, "products"),
            ProductForm::from(&product),
            &stores,
            Some(id),
        )
        .into_response()),
        Err(BackendError::NotFound(_)) => {
            Ok(Redirect::to(&format!("{BASE_PATH}?error=not_found")).into_response())
        }
        Err(e) => Err(e.into()),
    }
}

/// Save changes to a product.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn update(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<String>,
    Form(form): Form<ProductForm>,
) -> Result<Response, AppError> {
    let id: ProductId = parse_id(&id, "Product")?;
    let backend = state.backend();
    let token = user.access_token.as_str();
    let stores = form_stores(&StoreTable::new(backend, user.id, token)).await;
    let template =
        ProductFormTemplate::new(Nav::new(&user, "products"), form.clone(), &stores, Some(id));

    let draft = match form.to_draft() {
        Ok(draft) => draft,
        Err(e) => {
            return Ok(form_error(
                StatusCode::UNPROCESSABLE_ENTITY,
                template,
                e.to_string(),
            ));
        }
    };

    match ProductTable::new(backend, user.id, token).update(id, &draft).await {
        Ok(_) => {
            state.invalidate_stats(user.id).await;
            tracing::info!(product_id = %id, "Product updated");
            Ok(Redirect::to(&format!("{BASE_PATH}?notice=updated")).into_response())
        }
        Err(BackendError::NotFound(_)) => {
            Ok(Redirect::to(&format!("{BASE_PATH}?error=not_found")).into_response())
        }
        Err(e) => {
            let (status, message) = write_failure(e, "save the product");
            Ok(form_error(status, template, message))
        }
    }
}

/// Delete a product.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn delete(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<String>,
) -> Result<Redirect, AppError> {
    let id: ProductId = parse_id(&id, "Product")?;
    let table = ProductTable::new(state.backend(), user.id, &user.access_token);
    match table.delete(id).await {
        Ok(()) => {
            state.invalidate_stats(user.id).await;
            tracing::info!(product_id = %id, "Product deleted");
            Ok(Redirect::to(&format!("{BASE_PATH}?notice=deleted")))
        }
        Err(BackendError::NotFound(_)) => {
            Ok(Redirect::to(&format!("{BASE_PATH}?error=not_found")))
        }
        Err(e) => {
            tracing::warn!(product_id = %id, error = %e, "Product delete failed");
            Ok(Redirect::to(&format!("{BASE_PATH}?error=delete_failed")))
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn form() -> ProductForm {
        ProductForm::from(&demo::products()[0])
    }

    #[test]
    fn test_form_round_trips_product() {
        let product = &demo::products()[0];
        let draft = ProductForm::from(product).to_draft().unwrap();
        assert_eq!(draft, ProductDraft::from(product).normalized().unwrap());
    }

    #[test]
    fn test_price_accepts_symbols_and_grouping() {
        let mut f = form();
        f.price = " $1,249.5 ".to_string();
        assert_eq!(f.to_draft().unwrap().price, Decimal::new(124_950, 2));
    }

    #[test]
    fn test_bad_numbers_rejected() {
        let mut f = form();
        f.price = "cheap".to_string();
        assert!(matches!(
            f.to_draft(),
            Err(ValidationError::InvalidFormat { field: "Price", .. })
        ));

        let mut f = form();
        f.quantity = "2.5".to_string();
        assert!(matches!(
            f.to_draft(),
            Err(ValidationError::InvalidFormat { field: "Quantity", .. })
        ));

        let mut f = form();
        f.store_id = String::new();
        assert_eq!(f.to_draft(), Err(ValidationError::Required("Store")));
    }

    #[test]
    fn test_tags_are_split() {
        let mut f = form();
        f.tags = "mug, Mug, ceramic,,".to_string();
        assert_eq!(f.to_draft().unwrap().tags, vec!["mug", "ceramic"]);
    }

    #[test]
    fn test_store_filter_query() {
        let id = demo::stores()[1].id;
        let q = StoreFilterQuery {
            store: Some(id.to_string()),
        };
        assert_eq!(q.store_id(), Some(id));

        for raw in ["", "all", "not-an-id"] {
            let q = StoreFilterQuery {
                store: Some(raw.to_string()),
            };
            assert_eq!(q.store_id(), None);
        }
    }

    #[test]
    fn test_row_flags_low_stock() {
        let names = store_names(&demo::stores());
        let products = demo::products();
        let low = products.iter().find(|p| p.is_low_stock()).unwrap();
        let row = ProductRow::new(low, &names);
        assert!(row.low_stock);
        assert_ne!(row.store_name, UNKNOWN_STORE);
    }
}
