//! Listing template route handlers, including the live preview.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use gainsy_core::{
    ListQuery, Page, ProductId, RenderContext, TemplateCategory, TemplateDraft, TemplateId,
    ValidationError, demo, entities::template::PLACEHOLDERS, listing,
};
use serde::Deserialize;
use tracing::instrument;

use crate::backend::{BackendError, ProductTable, StoreTable, TemplateTable};
use crate::components::{DataTableConfig, FilterOption, TableColumn, TableFilter, TableView};
use crate::error::AppError;
use crate::middleware::RequireAuth;
use crate::state::AppState;

use super::dashboard::{Nav, NoticeQuery, SelectOption, parse_id, short_date, write_failure};
use super::fallback::{Banner, combined_banner, load};

const BASE_PATH: &str = "/dashboard/templates";
const EXCERPT_CHARS: usize = 80;

fn table_config() -> DataTableConfig {
    DataTableConfig::new(BASE_PATH)
        .column(TableColumn::sortable("name", "Template"))
        .column(TableColumn::sortable("category", "Category"))
        .column(TableColumn::new("Preview"))
        .column(TableColumn::sortable("updated", "Updated"))
        .filter(TableFilter::select(
            "status",
            "Category",
            TemplateCategory::ALL
                .iter()
                .map(|c| FilterOption::new(c.as_str(), c.label()))
                .collect(),
        ))
        .search_placeholder("Search templates...")
        .empty_state(
            "No templates yet",
            Some("Save your go-to titles, descriptions, and policies as templates."),
        )
}

// =============================================================================
// List
// =============================================================================

/// Template row as rendered in the list.
#[derive(Debug, Clone)]
pub struct TemplateRow {
    pub id: String,
    pub name: String,
    pub category_label: &'static str,
    pub category_badge: &'static str,
    pub excerpt: String,
    pub is_default: bool,
    pub updated: String,
}

impl From<&gainsy_core::Template> for TemplateRow {
    fn from(template: &gainsy_core::Template) -> Self {
        Self {
            id: template.id.to_string(),
            name: template.name.clone(),
            category_label: template.category.label(),
            category_badge: template.category.badge_class(),
            excerpt: template.excerpt(EXCERPT_CHARS),
            is_default: template.is_default,
            updated: short_date(template.updated_at),
        }
    }
}

/// Template list page.
#[derive(Template, WebTemplate)]
#[template(path = "dashboard/templates/list.html")]
pub struct TemplateListTemplate {
    pub nav: Nav,
    pub banners: Vec<Banner>,
    pub table: TableView,
    pub rows: Vec<TemplateRow>,
}

/// List the seller's templates. The `status` parameter filters by category.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn index(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Query(query): Query<ListQuery>,
    Query(notice): Query<NoticeQuery>,
) -> impl IntoResponse {
    let table = TemplateTable::new(state.backend(), user.id, &user.access_token);
    let templates = load(&state, "templates", table.list(), demo::templates).await;

    let mut banners: Vec<Banner> = notice.banner("Template").into_iter().collect();
    banners.extend(templates.banner());

    let page: Page<gainsy_core::Template> = listing::apply(templates.data, &query);
    let view = table_config().view::<gainsy_core::Template, _>(&query, &[], &page);

    TemplateListTemplate {
        nav: Nav::new(&user, "templates"),
        banners,
        table: view,
        rows: page.items.iter().map(TemplateRow::from).collect(),
    }
}

// =============================================================================
// Form
// =============================================================================

/// Template form data as submitted.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TemplateForm {
    pub name: String,
    pub category: String,
    pub content: String,
    /// Checkbox; present when checked.
    pub is_default: Option<String>,
}

impl TemplateForm {
    /// Parse and validate into a draft.
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] found.
    pub fn to_draft(&self) -> Result<TemplateDraft, ValidationError> {
        let category = match self.category.trim() {
            "" => TemplateCategory::default(),
            raw => raw.parse().map_err(|_| ValidationError::InvalidFormat {
                field: "Category",
                message: "is not recognized",
            })?,
        };
        TemplateDraft {
            name: self.name.clone(),
            category,
            content: self.content.clone(),
            is_default: self.is_checked(),
        }
        .normalized()
    }

    /// Whether the default checkbox was ticked.
    #[must_use]
    pub fn is_checked(&self) -> bool {
        self.is_default
            .as_deref()
            .is_some_and(|v| !v.is_empty() && v != "false")
    }
}

impl From<&gainsy_core::Template> for TemplateForm {
    fn from(template: &gainsy_core::Template) -> Self {
        Self {
            name: template.name.clone(),
            category: template.category.as_str().to_string(),
            content: template.content.clone(),
            is_default: template.is_default.then(|| "on".to_string()),
        }
    }
}

/// Template create/edit form page.
#[derive(Template, WebTemplate)]
#[template(path = "dashboard/templates/form.html")]
pub struct TemplateFormTemplate {
    pub nav: Nav,
    pub banners: Vec<Banner>,
    pub title: &'static str,
    pub action: String,
    pub form: TemplateForm,
    pub is_default: bool,
    pub categories: Vec<SelectOption>,
    pub placeholders: &'static [&'static str],
    /// Set when editing, for the preview link.
    pub template_id: Option<String>,
}

impl TemplateFormTemplate {
    fn new(nav: Nav, form: TemplateForm, edit: Option<TemplateId>) -> Self {
        let category = match form.category.as_str() {
            "" => TemplateCategory::default().as_str().to_string(),
            c => c.to_string(),
        };
        Self {
            nav,
            banners: Vec::new(),
            title: if edit.is_some() { "Edit template" } else { "New template" },
            action: edit.map_or_else(|| BASE_PATH.to_string(), |id| format!("{BASE_PATH}/{id}")),
            is_default: form.is_checked(),
            categories: TemplateCategory::ALL
                .iter()
                .map(|c| SelectOption::new(c.as_str(), c.label(), &category))
                .collect(),
            placeholders: PLACEHOLDERS,
            template_id: edit.map(|id| id.to_string()),
            form,
        }
    }

    fn with_error(mut self, message: String) -> Self {
        self.banners.push(Banner::error(message));
        self
    }
}

fn form_error(status: StatusCode, template: TemplateFormTemplate, message: String) -> Response {
    (status, template.with_error(message)).into_response()
}

/// Display the new-template form.
pub async fn new(RequireAuth(user): RequireAuth) -> impl IntoResponse {
    TemplateFormTemplate::new(Nav::new(&user, "templates"), TemplateForm::default(), None)
}

/// Create a template.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Form(form): Form<TemplateForm>,
) -> Response {
    let template = TemplateFormTemplate::new(Nav::new(&user, "templates"), form.clone(), None);
    let draft = match form.to_draft() {
        Ok(draft) => draft,
        Err(e) => return form_error(StatusCode::UNPROCESSABLE_ENTITY, template, e.to_string()),
    };

    let table = TemplateTable::new(state.backend(), user.id, &user.access_token);
    match table.create(&draft).await {
        Ok(created) => {
            tracing::info!(template_id = %created.id, "Template created");
            Redirect::to(&format!("{BASE_PATH}?notice=created")).into_response()
        }
        Err(e) => {
            let (status, message) = write_failure(e, "create the template");
            form_error(status, template, message)
        }
    }
}

/// Display the edit form for a template.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn edit(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let id: TemplateId = parse_id(&id, "Template")?;
    let table = TemplateTable::new(state.backend(), user.id, &user.access_token);
    match table.get(id).await {
        Ok(found) => Ok(TemplateFormTemplate::new(
            Nav::new(&user, "templates"),
            TemplateForm::from(&found),
            Some(id),
        )
        .into_response()),
        Err(BackendError::NotFound(_)) => {
            Ok(Redirect::to(&format!("{BASE_PATH}?error=not_found")).into_response())
        }
        Err(e) => Err(e.into()),
    }
}

/// Save changes to a template.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn update(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<String>,
    Form(form): Form<TemplateForm>,
) -> Result<Response, AppError> {
    let id: TemplateId = parse_id(&id, "Template")?;
    let template = TemplateFormTemplate::new(Nav::new(&user, "templates"), form.clone(), Some(id));
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

    let table = TemplateTable::new(state.backend(), user.id, &user.access_token);
    match table.update(id, &draft).await {
        Ok(_) => {
            tracing::info!(template_id = %id, "Template updated");
            Ok(Redirect::to(&format!("{BASE_PATH}?notice=updated")).into_response())
        }
        Err(BackendError::NotFound(_)) => {
            Ok(Redirect::to(&format!("{BASE_PATH}?error=not_found")).into_response())
        }
        Err(e) => {
            let (status, message) = write_failure(e, "save the template");
            Ok(form_error(status, template, message))
        }
    }
}

/// Delete a template.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn delete(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<String>,
) -> Result<Redirect, AppError> {
    let id: TemplateId = parse_id(&id, "Template")?;
    let table = TemplateTable::new(state.backend(), user.id, &user.access_token);
    match table.delete(id).await {
        Ok(()) => {
            tracing::info!(template_id = %id, "Template deleted");
            Ok(Redirect::to(&format!("{BASE_PATH}?notice=deleted")))
        }
        Err(BackendError::NotFound(_)) => {
            Ok(Redirect::to(&format!("{BASE_PATH}?error=not_found")))
        }
        Err(e) => {
            tracing::warn!(template_id = %id, error = %e, "Template delete failed");
            Ok(Redirect::to(&format!("{BASE_PATH}?error=delete_failed")))
        }
    }
}

// =============================================================================
// Preview
// =============================================================================

/// Preview query: which product to render against.
#[derive(Debug, Default, Deserialize)]
pub struct PreviewQuery {
    pub product: Option<String>,
}

/// Template preview page.
#[derive(Template, WebTemplate)]
#[template(path = "dashboard/templates/preview.html")]
pub struct PreviewTemplate {
    pub nav: Nav,
    pub banners: Vec<Banner>,
    pub template_id: String,
    pub name: String,
    pub category_label: &'static str,
    pub content: String,
    /// `None` when there is no product to render against.
    pub rendered: Option<String>,
    pub products: Vec<SelectOption>,
    pub placeholders: Vec<String>,
    pub unknown_placeholders: Vec<String>,
}

/// Render a template against one of the seller's products.
///
/// Uses the product named by `?product=`, else the most recent one.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn preview(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<String>,
    Query(query): Query<PreviewQuery>,
) -> Result<Response, AppError> {
    let id: TemplateId = parse_id(&id, "Template")?;
    let backend = state.backend();
    let token = user.access_token.as_str();
    let template_table = TemplateTable::new(backend, user.id, token);
    let product_table = ProductTable::new(backend, user.id, token);
    let store_table = StoreTable::new(backend, user.id, token);

    let found = match template_table.get(id).await {
        Ok(found) => found,
        Err(BackendError::NotFound(_)) => {
            return Ok(Redirect::to(&format!("{BASE_PATH}?error=not_found")).into_response());
        }
        Err(e) => return Err(e.into()),
    };

    let (products, stores) = tokio::join!(
        load(&state, "products", product_table.list(), demo::products),
        load(&state, "stores", store_table.list(), demo::stores),
    );

    let wanted: Option<ProductId> = query.product.as_deref().and_then(|p| p.parse().ok());
    let selected = wanted
        .and_then(|pid| products.data.iter().find(|p| p.id == pid))
        .or_else(|| products.data.first());

    let rendered = selected.map(|product| {
        let store = stores.data.iter().find(|s| s.id == product.store_id);
        found.render(&RenderContext::for_product(product, store))
    });
    let selected_id = selected.map(|p| p.id.to_string()).unwrap_or_default();

    Ok(PreviewTemplate {
        nav: Nav::new(&user, "templates"),
        banners: combined_banner(&products, &stores).into_iter().collect(),
        template_id: found.id.to_string(),
        name: found.name.clone(),
        category_label: found.category.label(),
        content: found.content.clone(),
        rendered,
        products: products
            .data
            .iter()
            .map(|p| SelectOption::new(&p.id.to_string(), &p.title, &selected_id))
            .collect(),
        placeholders: found.placeholders(),
        unknown_placeholders: found.unknown_placeholders(),
    }
    .into_response())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_checkbox_values() {
        let mut form = TemplateForm::from(&demo::templates()[0]);
        form.is_default = None;
        assert!(!form.is_checked());
        form.is_default = Some("on".to_string());
        assert!(form.is_checked());
        form.is_default = Some("false".to_string());
        assert!(!form.is_checked());
    }

    #[test]
    fn test_form_round_trips_template() {
        for template in demo::templates() {
            let draft = TemplateForm::from(&template).to_draft().unwrap();
            assert_eq!(draft, TemplateDraft::from(&template));
        }
    }

    #[test]
    fn test_blank_name_rejected() {
        let form = TemplateForm {
            name: "   ".to_string(),
            category: "title".to_string(),
            content: "{title} | Handmade".to_string(),
            is_default: None,
        };
        assert_eq!(
            form.to_draft(),
            Err(ValidationError::Required("Template name"))
        );
    }

    #[test]
    fn test_row_excerpt() {
        let template = &demo::templates()[0];
        let row = TemplateRow::from(template);
        assert!(row.excerpt.chars().count() <= EXCERPT_CHARS);
        assert_eq!(row.category_label, template.category.label());
    }
}
