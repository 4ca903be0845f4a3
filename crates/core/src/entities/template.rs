//! Listing templates with `{placeholder}` substitution.
//!
//! Sellers keep reusable snippets for titles, descriptions, tags, shipping and
//! policy text. A template's content may reference listing fields:
//!
//! | Placeholder  | Value                                  |
//! |--------------|----------------------------------------|
//! | `{title}`    | Product title                          |
//! | `{price}`    | Formatted price, e.g. `$32.50`         |
//! | `{store}`    | Store display name                     |
//! | `{tags}`     | Tags joined with `, `                  |
//! | `{sku}`      | SKU, empty when unset                  |
//! | `{quantity}` | Quantity in stock                      |
//!
//! Unknown placeholders are left as written. `{{` and `}}` produce literal
//! braces.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Product, Store, ValidationError, contains_ci, require_text};
use crate::listing::{Listable, SortDirection};
use crate::types::{TemplateCategory, TemplateId, UserId};

const NAME_MAX: usize = 100;
const CONTENT_MAX: usize = 10_000;

/// Placeholder names the renderer understands.
pub const PLACEHOLDERS: &[&str] = &["title", "price", "store", "tags", "sku", "quantity"];

/// A reusable listing snippet (`templates` table).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    pub id: TemplateId,
    pub user_id: UserId,
    pub name: String,
    #[serde(default)]
    pub category: TemplateCategory,
    pub content: String,
    #[serde(default)]
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Field values substituted into a template.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderContext {
    pub title: String,
    pub price: String,
    pub store: String,
    pub tags: String,
    pub sku: String,
    pub quantity: String,
}

impl RenderContext {
    /// Build the context for a product, with its store when known.
    #[must_use]
    pub fn for_product(product: &Product, store: Option<&Store>) -> Self {
        Self {
            title: product.title.clone(),
            price: product.listing_price().display(),
            store: store.map(|s| s.name.clone()).unwrap_or_default(),
            tags: product.tags.join(", "),
            sku: product.sku.clone().unwrap_or_default(),
            quantity: product.quantity.to_string(),
        }
    }

    fn lookup(&self, name: &str) -> Option<&str> {
        match name {
            "title" => Some(&self.title),
            "price" => Some(&self.price),
            "store" => Some(&self.store),
            "tags" => Some(&self.tags),
            "sku" => Some(&self.sku),
            "quantity" => Some(&self.quantity),
            _ => None,
        }
    }
}

/// A piece of template content.
#[derive(Debug, PartialEq, Eq)]
enum Segment<'a> {
    Text(&'a str),
    Placeholder(&'a str),
}

/// Split content into literal text and `{name}` placeholders.
fn segments(content: &str) -> Vec<Segment<'_>> {
    let mut out = Vec::new();
    let mut rest = content;

    while !rest.is_empty() {
        let Some(pos) = rest.find(['{', '}']) else {
            out.push(Segment::Text(rest));
            break;
        };
        let (before, tail) = rest.split_at(pos);
        if !before.is_empty() {
            out.push(Segment::Text(before));
        }

        if let Some(after) = tail.strip_prefix("{{") {
            out.push(Segment::Text("{"));
            rest = after;
        } else if let Some(after) = tail.strip_prefix("}}") {
            out.push(Segment::Text("}"));
            rest = after;
        } else if let Some(after) = tail.strip_prefix('{') {
            let name_len = after
                .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                .unwrap_or(after.len());
            let (name, remainder) = after.split_at(name_len);
            if let (false, Some(after_close)) = (name.is_empty(), remainder.strip_prefix('}')) {
                out.push(Segment::Placeholder(name));
                rest = after_close;
            } else {
                out.push(Segment::Text("{"));
                rest = after;
            }
        } else {
            out.push(Segment::Text("}"));
            rest = tail.strip_prefix('}').unwrap_or_default();
        }
    }

    out
}

impl Template {
    /// Substitute known placeholders from `ctx`.
    #[must_use]
    pub fn render(&self, ctx: &RenderContext) -> String {
        render_content(&self.content, ctx)
    }

    /// Placeholder names used by this template, in first-use order.
    #[must_use]
    pub fn placeholders(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for segment in segments(&self.content) {
            if let Segment::Placeholder(name) = segment
                && !names.iter().any(|n| n == name)
            {
                names.push(name.to_string());
            }
        }
        names
    }

    /// Placeholder names used by this template that the renderer will not
    /// substitute.
    #[must_use]
    pub fn unknown_placeholders(&self) -> Vec<String> {
        self.placeholders()
            .into_iter()
            .filter(|n| !PLACEHOLDERS.contains(&n.as_str()))
            .collect()
    }

    /// First line of content, shortened for list views.
    #[must_use]
    pub fn excerpt(&self, max_chars: usize) -> String {
        let line = self.content.lines().next().unwrap_or_default().trim();
        if line.chars().count() <= max_chars {
            return line.to_string();
        }
        let cut: String = line.chars().take(max_chars.saturating_sub(1)).collect();
        format!("{}…", cut.trim_end())
    }
}

/// Render raw template content against a context.
#[must_use]
pub fn render_content(content: &str, ctx: &RenderContext) -> String {
    let mut out = String::with_capacity(content.len());
    for segment in segments(content) {
        match segment {
            Segment::Text(text) => out.push_str(text),
            Segment::Placeholder(name) => match ctx.lookup(name) {
                Some(value) => out.push_str(value),
                None => {
                    out.push('{');
                    out.push_str(name);
                    out.push('}');
                }
            },
        }
    }
    out
}

impl Listable for Template {
    const SORT_KEYS: &'static [&'static str] = &["updated", "created", "name", "category"];
    const DEFAULT_SORT: &'static str = "updated";
    const DEFAULT_DIRECTION: SortDirection = SortDirection::Desc;

    fn matches_search(&self, needle: &str) -> bool {
        contains_ci(&self.name, needle) || contains_ci(&self.content, needle)
    }

    fn status_key(&self) -> &str {
        self.category.as_str()
    }

    fn compare_by(&self, other: &Self, key: &str) -> Ordering {
        match key {
            "name" => self.name.to_lowercase().cmp(&other.name.to_lowercase()),
            "category" => self.category.as_str().cmp(other.category.as_str()),
            "created" => self.created_at.cmp(&other.created_at),
            _ => self.updated_at.cmp(&other.updated_at),
        }
    }
}

/// Editable template columns, sent on insert and update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateDraft {
    pub name: String,
    pub category: TemplateCategory,
    pub content: String,
    pub is_default: bool,
}

impl TemplateDraft {
    /// Trim the name and validate.
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] found.
    pub fn normalized(mut self) -> Result<Self, ValidationError> {
        self.name = self.name.trim().to_string();
        self.validate()?;
        Ok(self)
    }

    /// Validate field lengths.
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] found.
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text(&self.name, "Template name", NAME_MAX)?;
        require_text(&self.content, "Content", CONTENT_MAX)?;
        Ok(())
    }
}

impl From<&Template> for TemplateDraft {
    fn from(template: &Template) -> Self {
        Self {
            name: template.name.clone(),
            category: template.category,
            content: template.content.clone(),
            is_default: template.is_default,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::demo;

    fn ctx() -> RenderContext {
        RenderContext {
            title: "Speckled Mug".to_string(),
            price: "$32.50".to_string(),
            store: "Moss & Fern".to_string(),
            tags: "ceramic, mug".to_string(),
            sku: "MUG-01".to_string(),
            quantity: "12".to_string(),
        }
    }

    #[test]
    fn test_render_substitutes_known_placeholders() {
        let out = render_content("{title} from {store} for only {price}!", &ctx());
        assert_eq!(out, "Speckled Mug from Moss & Fern for only $32.50!");
    }

    #[test]
    fn test_render_leaves_unknown_and_malformed() {
        let out = render_content("{colour} {title {} {9lives", &ctx());
        assert_eq!(out, "{colour} {title {} {9lives");
    }

    #[test]
    fn test_render_escaped_braces() {
        let out = render_content("{{title}} is {title}}}", &ctx());
        assert_eq!(out, "{title} is Speckled Mug}");
    }

    #[test]
    fn test_placeholders_in_first_use_order() {
        let mut t = demo::templates()[0].clone();
        t.content = "{store} {title} {store} {material}".to_string();
        assert_eq!(t.placeholders(), vec!["store", "title", "material"]);
        assert_eq!(t.unknown_placeholders(), vec!["material"]);
    }

    #[test]
    fn test_for_product_uses_store_name() {
        let product = &demo::products()[0];
        let store = &demo::stores()[0];
        let ctx = RenderContext::for_product(product, Some(store));
        assert_eq!(ctx.store, store.name);
        assert_eq!(ctx.title, product.title);
        assert_eq!(ctx.price, product.listing_price().display());
    }

    #[test]
    fn test_excerpt() {
        let mut t = demo::templates()[0].clone();
        t.content = "A very long first line here\nsecond".to_string();
        assert_eq!(t.excerpt(100), "A very long first line here");
        assert_eq!(t.excerpt(7), "A very…");
    }

    #[test]
    fn test_draft_requires_content() {
        let draft = TemplateDraft {
            name: "Shipping".to_string(),
            category: TemplateCategory::Shipping,
            content: "   ".to_string(),
            is_default: false,
        };
        assert_eq!(draft.validate(), Err(ValidationError::Required("Content")));
    }
}
