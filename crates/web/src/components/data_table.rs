//! Data table component types.
//!
//! A table is described once with [`DataTableConfig`] and turned into a
//! [`TableView`] per request: header links that toggle sorting, the search
//! box and select filters pre-filled from the query string, and pagination
//! links that keep every other parameter.

use gainsy_core::{ListQuery, Listable, Page, SortDirection};
use url::form_urlencoded;

/// Column definition for a data table.
#[derive(Debug, Clone)]
pub struct TableColumn {
    /// Display label for the column header.
    pub label: String,
    /// Sort key passed as `?sort=`, when the column is sortable.
    pub sort_key: Option<String>,
    /// Extra CSS classes (alignment).
    pub class: String,
}

impl TableColumn {
    /// Create a sortable column.
    #[must_use]
    pub fn sortable(sort_key: &str, label: &str) -> Self {
        Self {
            label: label.to_string(),
            sort_key: Some(sort_key.to_string()),
            class: String::new(),
        }
    }

    /// Create a non-sortable column.
    #[must_use]
    pub fn new(label: &str) -> Self {
        Self {
            label: label.to_string(),
            sort_key: None,
            class: String::new(),
        }
    }

    /// Right-align the column (numbers, money).
    #[must_use]
    pub fn numeric(mut self) -> Self {
        self.class = "text-right".to_string();
        self
    }
}

/// Option for select filters.
#[derive(Debug, Clone)]
pub struct FilterOption {
    pub value: String,
    pub label: String,
}

impl FilterOption {
    /// Create a new filter option.
    #[must_use]
    pub fn new(value: &str, label: &str) -> Self {
        Self {
            value: value.to_string(),
            label: label.to_string(),
        }
    }
}

/// Single-select filter definition.
#[derive(Debug, Clone)]
pub struct TableFilter {
    /// Query parameter key.
    pub key: String,
    pub label: String,
    /// Options after the implicit "All" entry.
    pub options: Vec<FilterOption>,
}

impl TableFilter {
    /// Create a select filter.
    #[must_use]
    pub fn select(key: &str, label: &str, options: Vec<FilterOption>) -> Self {
        Self {
            key: key.to_string(),
            label: label.to_string(),
            options,
        }
    }
}

/// Configuration for a data table.
#[derive(Debug, Clone)]
pub struct DataTableConfig {
    /// Path the table's links point at.
    pub base_path: String,
    pub columns: Vec<TableColumn>,
    pub filters: Vec<TableFilter>,
    pub search_placeholder: String,
    pub empty_title: String,
    pub empty_description: Option<String>,
}

impl DataTableConfig {
    /// Create a new data table configuration.
    #[must_use]
    pub fn new(base_path: &str) -> Self {
        Self {
            base_path: base_path.to_string(),
            columns: vec![],
            filters: vec![],
            search_placeholder: "Search...".to_string(),
            empty_title: "No items found".to_string(),
            empty_description: None,
        }
    }

    /// Add a column.
    #[must_use]
    pub fn column(mut self, column: TableColumn) -> Self {
        self.columns.push(column);
        self
    }

    /// Add a filter.
    #[must_use]
    pub fn filter(mut self, filter: TableFilter) -> Self {
        self.filters.push(filter);
        self
    }

    /// Set search placeholder.
    #[must_use]
    pub fn search_placeholder(mut self, placeholder: &str) -> Self {
        self.search_placeholder = placeholder.to_string();
        self
    }

    /// Set empty state text.
    #[must_use]
    pub fn empty_state(mut self, title: &str, description: Option<&str>) -> Self {
        self.empty_title = title.to_string();
        self.empty_description = description.map(ToString::to_string);
        self
    }

    /// Build the per-request view for rows of type `T`.
    ///
    /// `extra` holds filter values outside [`ListQuery`] (e.g. `store`),
    /// keyed like the configured filters.
    #[must_use]
    pub fn view<T: Listable, R>(
        &self,
        query: &ListQuery,
        extra: &[(&str, Option<String>)],
        page: &Page<R>,
    ) -> TableView {
        let params = LinkParams::from_query::<T>(query, extra);
        let sort_key = query.sort_key::<T>();
        let direction = query.direction::<T>();

        let headers = self
            .columns
            .iter()
            .map(|column| {
                let Some(key) = column.sort_key.as_deref() else {
                    return HeaderView {
                        label: column.label.clone(),
                        class: column.class.clone(),
                        href: None,
                        indicator: "",
                    };
                };
                let active = key == sort_key;
                let next_direction = if active {
                    direction.flipped()
                } else {
                    SortDirection::Asc
                };
                let href = params
                    .with("sort", Some(key.to_string()))
                    .with("dir", Some(next_direction.as_str().to_string()))
                    .with("page", None)
                    .href(&self.base_path);
                HeaderView {
                    label: column.label.clone(),
                    class: column.class.clone(),
                    href: Some(href),
                    indicator: match (active, direction) {
                        (false, _) => "",
                        (true, SortDirection::Asc) => "▲",
                        (true, SortDirection::Desc) => "▼",
                    },
                }
            })
            .collect();

        let filters = self
            .filters
            .iter()
            .map(|filter| {
                let current = params.get(&filter.key).unwrap_or_default();
                FilterView {
                    key: filter.key.clone(),
                    label: filter.label.clone(),
                    options: filter
                        .options
                        .iter()
                        .map(|option| OptionView {
                            value: option.value.clone(),
                            label: option.label.clone(),
                            selected: option.value.eq_ignore_ascii_case(current),
                        })
                        .collect(),
                }
            })
            .collect();

        let page_href = |n: usize| {
            params
                .with("page", Some(n.to_string()))
                .href(&self.base_path)
        };

        TableView {
            base_path: self.base_path.clone(),
            search: query.q.clone().unwrap_or_default(),
            search_placeholder: self.search_placeholder.clone(),
            sort: sort_key.to_string(),
            dir: direction.as_str().to_string(),
            headers,
            filters,
            is_empty: page.items.is_empty(),
            is_filtered: query.search_term().is_some()
                || query.status_filter().is_some()
                || extra.iter().any(|(_, v)| v.is_some()),
            empty_title: self.empty_title.clone(),
            empty_description: self.empty_description.clone(),
            summary: if page.total == 0 {
                "No results".to_string()
            } else {
                format!(
                    "Showing {}–{} of {}",
                    page.first_index(),
                    page.last_index(),
                    page.total
                )
            },
            prev_href: page.has_prev().then(|| page_href(page.page - 1)),
            next_href: page.has_next().then(|| page_href(page.page + 1)),
        }
    }
}

/// Column header as rendered.
#[derive(Debug, Clone)]
pub struct HeaderView {
    pub label: String,
    pub class: String,
    pub href: Option<String>,
    pub indicator: &'static str,
}

/// Select filter as rendered.
#[derive(Debug, Clone)]
pub struct FilterView {
    pub key: String,
    pub label: String,
    pub options: Vec<OptionView>,
}

/// Select option as rendered.
#[derive(Debug, Clone)]
pub struct OptionView {
    pub value: String,
    pub label: String,
    pub selected: bool,
}

/// Everything a list template needs besides the rows.
#[derive(Debug, Clone)]
pub struct TableView {
    pub base_path: String,
    pub search: String,
    pub search_placeholder: String,
    pub sort: String,
    pub dir: String,
    pub headers: Vec<HeaderView>,
    pub filters: Vec<FilterView>,
    pub is_empty: bool,
    /// Whether any search or filter narrowed the list.
    pub is_filtered: bool,
    pub empty_title: String,
    pub empty_description: Option<String>,
    pub summary: String,
    pub prev_href: Option<String>,
    pub next_href: Option<String>,
}

/// Ordered query parameters carried between table links.
#[derive(Debug, Clone)]
struct LinkParams(Vec<(String, String)>);

impl LinkParams {
    fn from_query<T: Listable>(query: &ListQuery, extra: &[(&str, Option<String>)]) -> Self {
        let mut params = Self(Vec::new());
        params = params
            .with("q", query.search_term().and(query.q.clone()))
            .with("status", query.status_filter().map(ToString::to_string));
        for (key, value) in extra {
            params = params.with(key, value.clone());
        }
        params
            .with("sort", query.sort.as_ref().map(|_| query.sort_key::<T>().to_string()))
            .with("dir", query.dir.map(|d| d.as_str().to_string()))
            .with("page", query.page.filter(|p| *p > 1).map(|p| p.to_string()))
    }

    fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Set or remove `key`, keeping its position when present.
    fn with(&self, key: &str, value: Option<String>) -> Self {
        let mut params = self.0.clone();
        let value = value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        match (params.iter().position(|(k, _)| k == key), value) {
            (Some(i), Some(v)) => {
                if let Some(slot) = params.get_mut(i) {
                    slot.1 = v;
                }
            }
            (Some(i), None) => {
                params.remove(i);
            }
            (None, Some(v)) => params.push((key.to_string(), v)),
            (None, None) => {}
        }
        Self(params)
    }

    fn href(&self, base_path: &str) -> String {
        if self.0.is_empty() {
            return base_path.to_string();
        }
        let query = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(&self.0)
            .finish();
        format!("{base_path}?{query}")
    }
}
