//! Store management route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use gainsy_core::{
    CurrencyCode, ListQuery, Page, Product, Store, StoreDraft, StoreId, StoreStatus,
    ValidationError, demo, listing,
};
use serde::Deserialize;
use tracing::instrument;

use crate::backend::{BackendError, ProductTable, StoreTable};
use crate::components::{DataTableConfig, FilterOption, TableColumn, TableFilter, TableView};
use crate::error::{AppError, add_breadcrumb};
use crate::middleware::RequireAuth;
use crate::state::AppState;

use super::dashboard::{Nav, NoticeQuery, SelectOption, parse_id, short_date, write_failure};
use super::fallback::{Banner, combined_banner, load};

const BASE_PATH: &str = "/dashboard/stores";

fn table_config() -> DataTableConfig {
    DataTableConfig::new(BASE_PATH)
        .column(TableColumn::sortable("name", "Store"))
        .column(TableColumn::new("Etsy shop"))
        .column(TableColumn::sortable("status", "Status"))
        .column(TableColumn::new("Products").numeric())
        .column(TableColumn::sortable("created", "Connected"))
        .filter(TableFilter::select(
            "status",
            "Status",
            StoreStatus::ALL
                .iter()
                .map(|s| FilterOption::new(s.as_str(), s.label()))
                .collect(),
        ))
        .search_placeholder("Search stores...")
        .empty_state(
            "No stores yet",
            Some("Connect your first Etsy shop to start tracking listings."),
        )
}

// =============================================================================
// List
// =============================================================================

/// Store row as rendered in the list.
#[derive(Debug, Clone)]
pub struct StoreRow {
    pub id: String,
    pub name: String,
    pub etsy_shop_name: String,
    pub public_url: String,
    pub currency: &'static str,
    pub status_label: &'static str,
    pub status_badge: &'static str,
    pub product_count: usize,
    pub connected: String,
}

impl StoreRow {
    fn new(store: &Store, products: &[Product]) -> Self {
        Self {
            id: store.id.to_string(),
            name: store.name.clone(),
            etsy_shop_name: store.etsy_shop_name.clone(),
            public_url: store.public_url(),
            currency: store.currency.code(),
            status_label: store.status.label(),
            status_badge: store.status.badge_class(),
            product_count: products.iter().filter(|p| p.store_id == store.id).count(),
            connected: short_date(store.created_at),
        }
    }
}

/// Store list template.
#[derive(Template, WebTemplate)]
#[template(path = "dashboard/stores/list.html")]
pub struct StoreListTemplate {
    pub nav: Nav,
    pub banners: Vec<Banner>,
    pub table: TableView,
    pub rows: Vec<StoreRow>,
}

/// List the seller's stores.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn index(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Query(query): Query<ListQuery>,
    Query(notice): Query<NoticeQuery>,
) -> impl IntoResponse {
    let backend = state.backend();
    let token = user.access_token.as_str();
    let store_table = StoreTable::new(backend, user.id, token);
    let product_table = ProductTable::new(backend, user.id, token);

    let (stores, products) = tokio::join!(
        load(&state, "stores", store_table.list(), demo::stores),
        load(&state, "products", product_table.list(), demo::products),
    );

    let mut banners: Vec<Banner> = notice.banner("Store").into_iter().collect();
    banners.extend(combined_banner(&stores, &products));

    let page: Page<Store> = listing::apply(stores.data, &query);
    let table = table_config().view::<Store, _>(&query, &[], &page);
    let rows = page
        .items
        .iter()
        .map(|s| StoreRow::new(s, &products.data))
        .collect();

    StoreListTemplate {
        nav: Nav::new(&user, "stores"),
        banners,
        table,
        rows,
    }
}

// =============================================================================
// Form
// =============================================================================

/// Store form data, kept as typed so it can be re-rendered on error.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StoreForm {
    pub name: String,
    pub etsy_shop_name: String,
    pub shop_url: String,
    pub currency: String,
    pub status: String,
}

impl StoreForm {
    /// Parse and validate into a draft.
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] found.
    pub fn to_draft(&self) -> Result<StoreDraft, ValidationError> {
        let currency = if self.currency.trim().is_empty() {
            CurrencyCode::default()
        } else {
            self.currency
                .parse()
                .map_err(|_| ValidationError::InvalidFormat {
                    field: "Currency",
                    message: "is not supported",
                })?
        };
        let status = if self.status.trim().is_empty() {
            StoreStatus::default()
        } else {
            self.status
                .parse()
                .map_err(|_| ValidationError::InvalidFormat {
                    field: "Status",
                    message: "is not recognized",
                })?
        };

        StoreDraft {
            name: self.name.clone(),
            etsy_shop_name: self.etsy_shop_name.clone(),
            shop_url: Some(self.shop_url.clone()),
            currency,
            status,
        }
        .normalized()
    }
}

impl From<&Store> for StoreForm {
    fn from(store: &Store) -> Self {
        Self {
            name: store.name.clone(),
            etsy_shop_name: store.etsy_shop_name.clone(),
            shop_url: store.shop_url.clone().unwrap_or_default(),
            currency: store.currency.code().to_string(),
            status: store.status.as_str().to_string(),
        }
    }
}

/// Store create/edit form template.
#[derive(Template, WebTemplate)]
#[template(path = "dashboard/stores/form.html")]
pub struct StoreFormTemplate {
    pub nav: Nav,
    pub banners: Vec<Banner>,
    pub title: &'static str,
    pub action: String,
    pub form: StoreForm,
    pub currencies: Vec<SelectOption>,
    pub statuses: Vec<SelectOption>,
    pub is_edit: bool,
}

impl StoreFormTemplate {
    fn new(nav: Nav, form: StoreForm, edit: Option<StoreId>) -> Self {
        let currency = if form.currency.is_empty() {
            CurrencyCode::default().code().to_string()
        } else {
            form.currency.clone()
        };
        let status = if form.status.is_empty() {
            StoreStatus::default().as_str().to_string()
        } else {
            form.status.clone()
        };
        Self {
            nav,
            banners: Vec::new(),
            title: if edit.is_some() { "Edit store" } else { "Add store" },
            action: edit.map_or_else(|| BASE_PATH.to_string(), |id| format!("{BASE_PATH}/{id}")),
            currencies: CurrencyCode::ALL
                .iter()
                .map(|c| SelectOption::new(c.code(), c.code(), &currency))
                .collect(),
            statuses: StoreStatus::ALL
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

/// Re-render a rejected form.
fn form_error(status: StatusCode, template: StoreFormTemplate, message: String) -> Response {
    (status, template.with_error(message)).into_response()
}

/// Display the new-store form.
pub async fn new(RequireAuth(user): RequireAuth) -> impl IntoResponse {
    StoreFormTemplate::new(Nav::new(&user, "stores"), StoreForm::default(), None)
}

/// Create a store.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Form(form): Form<StoreForm>,
) -> Response {
    let template = StoreFormTemplate::new(Nav::new(&user, "stores"), form.clone(), None);
    let draft = match form.to_draft() {
        Ok(draft) => draft,
        Err(e) => return form_error(StatusCode::UNPROCESSABLE_ENTITY, template, e.to_string()),
    };

    let table = StoreTable::new(state.backend(), user.id, &user.access_token);
    match table.create(&draft).await {
        Ok(store) => {
            state.invalidate_stats(user.id).await;
            let store_id = store.id.to_string();
            add_breadcrumb("stores", "Store created", Some(&[("store_id", store_id.as_str())]));
            tracing::info!(store_id = %store.id, "Store created");
            Redirect::to(&format!("{BASE_PATH}?notice=created")).into_response()
        }
        Err(e) => {
            let (status, message) = write_failure(e, "add the store");
            form_error(status, template, message)
        }
    }
}

/// Display the edit form for a store.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn edit(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let id: StoreId = parse_id(&id, "Store")?;
    let table = StoreTable::new(state.backend(), user.id, &user.access_token);
    match table.get(id).await {
        Ok(store) => Ok(StoreFormTemplate::new(
            Nav::new(&user, "stores"),
            StoreForm::from(&store),
            Some(id),
        )
        .into_response()),
        Err(BackendError::NotFound(_)) => {
            Ok(Redirect::to(&format!("{BASE_PATH}?error=not_found")).into_response())
        }
        Err(e) => Err(e.into()),
    }
}

/// Save changes to a store.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn update(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<String>,
    Form(form): Form<StoreForm>,
) -> Result<Response, AppError> {
    let id: StoreId = parse_id(&id, "Store")?;
    let template = StoreFormTemplate::new(Nav::new(&user, "stores"), form.clone(), Some(id));
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

    let table = StoreTable::new(state.backend(), user.id, &user.access_token);
    match table.update(id, &draft).await {
        Ok(_) => {
            state.invalidate_stats(user.id).await;
            tracing::info!(store_id = %id, "Store updated");
            Ok(Redirect::to(&format!("{BASE_PATH}?notice=updated")).into_response())
        }
        Err(BackendError::NotFound(_)) => {
            Ok(Redirect::to(&format!("{BASE_PATH}?error=not_found")).into_response())
        }
        Err(e) => {
            let (status, message) = write_failure(e, "save the store");
            Ok(form_error(status, template, message))
        }
    }
}

/// Delete a store.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn delete(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<String>,
) -> Result<Redirect, AppError> {
    let id: StoreId = parse_id(&id, "Store")?;
    let table = StoreTable::new(state.backend(), user.id, &user.access_token);
    match table.delete(id).await {
        Ok(()) => {
            state.invalidate_stats(user.id).await;
            let store_id = id.to_string();
            add_breadcrumb("stores", "Store deleted", Some(&[("store_id", store_id.as_str())]));
            tracing::info!(store_id = %id, "Store deleted");
            Ok(Redirect::to(&format!("{BASE_PATH}?notice=deleted")))
        }
        Err(BackendError::NotFound(_)) => {
            Ok(Redirect::to(&format!("{BASE_PATH}?error=not_found")))
        }
        Err(e) => {
            tracing::warn!(store_id = %id, error = %e, "Store delete failed");
            Ok(Redirect::to(&format!("{BASE_PATH}?error=delete_failed")))
        }
    }
}
