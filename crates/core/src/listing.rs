//! In-memory search, filtering, sorting, and pagination.
//!
//! Dashboard pages fetch a seller's full list of rows from the backend and
//! narrow it here, driven by URL query parameters:
//!
//! ```text
//! /dashboard/products?q=mug&status=active&sort=price&dir=asc&page=2
//! ```
//!
//! Unknown sort keys fall back to the entity's default, `status=all` (or an
//! empty value) disables the status filter, and page numbers are clamped into
//! range rather than rejected. Values that do not parse (`page=abc`,
//! `dir=sideways`) are treated as absent.

use std::cmp::Ordering;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

/// Default number of rows per page.
pub const DEFAULT_PER_PAGE: usize = 20;

/// Upper bound on rows per page.
pub const MAX_PER_PAGE: usize = 100;

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    /// Query-string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }

    /// The other direction, for clickable column headers.
    #[must_use]
    pub const fn flipped(self) -> Self {
        match self {
            Self::Asc => Self::Desc,
            Self::Desc => Self::Asc,
        }
    }
}

impl FromStr for SortDirection {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("asc") {
            Ok(Self::Asc)
        } else if s.eq_ignore_ascii_case("desc") {
            Ok(Self::Desc)
        } else {
            Err(())
        }
    }
}

/// Deserialize an optional value from its string form, mapping anything
/// unparseable to `None`.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.and_then(|s| s.trim().parse().ok()))
}

/// A record type that can be listed.
pub trait Listable {
    /// Accepted `sort` values.
    const SORT_KEYS: &'static [&'static str];
    /// Sort key used when none (or an unknown one) is given.
    const DEFAULT_SORT: &'static str;
    /// Direction used when none is given.
    const DEFAULT_DIRECTION: SortDirection;

    /// Whether the record matches a lowercase search needle.
    fn matches_search(&self, needle: &str) -> bool;

    /// Value compared against the `status` filter.
    fn status_key(&self) -> &str;

    /// Ascending comparison by a key from [`Self::SORT_KEYS`].
    fn compare_by(&self, other: &Self, key: &str) -> Ordering;
}

/// List parameters parsed from a query string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListQuery {
    /// Free-text search.
    pub q: Option<String>,
    /// Status (or category) filter.
    pub status: Option<String>,
    /// Sort key.
    pub sort: Option<String>,
    /// Sort direction.
    #[serde(deserialize_with = "lenient")]
    pub dir: Option<SortDirection>,
    /// 1-based page number.
    #[serde(deserialize_with = "lenient")]
    pub page: Option<usize>,
    /// Rows per page.
    #[serde(deserialize_with = "lenient")]
    pub per_page: Option<usize>,
}

impl ListQuery {
    /// Trimmed, lowercased search needle, if any.
    #[must_use]
    pub fn search_term(&self) -> Option<String> {
        self.q
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .map(str::to_lowercase)
    }

    /// Active status filter, if any.
    #[must_use]
    pub fn status_filter(&self) -> Option<&str> {
        self.status
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty() && !s.eq_ignore_ascii_case("all"))
    }

    /// Effective sort key for `T`.
    #[must_use]
    pub fn sort_key<T: Listable>(&self) -> &'static str {
        self.sort
            .as_deref()
            .and_then(|s| T::SORT_KEYS.iter().copied().find(|k| *k == s))
            .unwrap_or(T::DEFAULT_SORT)
    }

    /// Effective sort direction for `T`.
    #[must_use]
    pub fn direction<T: Listable>(&self) -> SortDirection {
        self.dir.unwrap_or(T::DEFAULT_DIRECTION)
    }

    /// Effective page size.
    #[must_use]
    pub fn per_page(&self) -> usize {
        self.per_page
            .unwrap_or(DEFAULT_PER_PAGE)
            .clamp(1, MAX_PER_PAGE)
    }
}

/// One page of results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Rows matching the filters, across all pages.
    pub total: usize,
    /// 1-based current page.
    pub page: usize,
    pub per_page: usize,
    /// Always at least 1, even when empty.
    pub total_pages: usize,
}

impl<T> Page<T> {
    /// Whether a previous page exists.
    #[must_use]
    pub const fn has_prev(&self) -> bool {
        self.page > 1
    }

    /// Whether a next page exists.
    #[must_use]
    pub const fn has_next(&self) -> bool {
        self.page < self.total_pages
    }

    /// 1-based index of the first row on this page (0 when empty).
    #[must_use]
    pub fn first_index(&self) -> usize {
        if self.total == 0 {
            0
        } else {
            (self.page - 1) * self.per_page + 1
        }
    }

    /// 1-based index of the last row on this page.
    #[must_use]
    pub fn last_index(&self) -> usize {
        if self.total == 0 {
            0
        } else {
            self.first_index() + self.items.len() - 1
        }
    }
}

/// Filter, sort, and paginate `items`.
///
/// Sorting is stable, so rows that compare equal keep their fetch order.
#[must_use]
pub fn apply<T: Listable>(items: Vec<T>, query: &ListQuery) -> Page<T> {
    let needle = query.search_term();
    let status = query.status_filter();

    let mut rows: Vec<T> = items
        .into_iter()
        .filter(|item| needle.as_deref().is_none_or(|n| item.matches_search(n)))
        .filter(|item| status.is_none_or(|s| item.status_key().eq_ignore_ascii_case(s)))
        .collect();

    let key = query.sort_key::<T>();
    let direction = query.direction::<T>();
    rows.sort_by(|a, b| {
        let ord = a.compare_by(b, key);
        match direction {
            SortDirection::Asc => ord,
            SortDirection::Desc => ord.reverse(),
        }
    });

    paginate(rows, query.page.unwrap_or(1), query.per_page())
}

/// Slice `rows` into one page, clamping `page` into `1..=total_pages`.
#[must_use]
pub fn paginate<T>(rows: Vec<T>, page: usize, per_page: usize) -> Page<T> {
    let per_page = per_page.max(1);
    let total = rows.len();
    let total_pages = total.div_ceil(per_page).max(1);
    let page = page.clamp(1, total_pages);

    let items = rows
        .into_iter()
        .skip((page - 1) * per_page)
        .take(per_page)
        .collect();

    Page {
        items,
        total,
        page,
        per_page,
        total_pages,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::demo;
    use crate::entities::Product;
    use crate::types::ProductStatus;

    fn query() -> ListQuery {
        ListQuery::default()
    }

    #[test]
    fn test_unparseable_query_values_are_ignored() {
        let parsed: ListQuery = serde_json::from_value(serde_json::json!({
            "q": "mug",
            "page": "abc",
            "per_page": "x",
            "dir": "sideways",
        }))
        .unwrap();
        assert_eq!(parsed.q.as_deref(), Some("mug"));
        assert_eq!(parsed.page, None);
        assert_eq!(parsed.per_page, None);
        assert_eq!(parsed.dir, None);

        let parsed: ListQuery = serde_json::from_value(serde_json::json!({
            "page": "-1",
            "per_page": "",
            "dir": "ASC",
        }))
        .unwrap();
        assert_eq!(parsed.page, None);
        assert_eq!(parsed.per_page(), DEFAULT_PER_PAGE);
        assert_eq!(parsed.dir, Some(SortDirection::Asc));

        let parsed: ListQuery =
            serde_json::from_value(serde_json::json!({ "page": " 3 " })).unwrap();
        assert_eq!(parsed.page, Some(3));
    }

    #[test]
    fn test_paginate_clamps_pages() {
        let rows: Vec<u32> = (1..=45).collect();

        let page = paginate(rows.clone(), 0, 20);
        assert_eq!(page.page, 1);
        assert_eq!(page.items.len(), 20);
        assert!(!page.has_prev());
        assert!(page.has_next());

        let page = paginate(rows.clone(), 99, 20);
        assert_eq!(page.page, 3);
        assert_eq!(page.items, vec![41, 42, 43, 44, 45]);
        assert_eq!(page.first_index(), 41);
        assert_eq!(page.last_index(), 45);
        assert!(!page.has_next());
    }

    #[test]
    fn test_paginate_empty() {
        let page = paginate(Vec::<u32>::new(), 3, 10);
        assert_eq!(page.page, 1);
        assert_eq!(page.total_pages, 1);
        assert_eq!(page.first_index(), 0);
        assert_eq!(page.last_index(), 0);
    }

    #[test]
    fn test_per_page_is_clamped() {
        let mut q = query();
        q.per_page = Some(0);
        assert_eq!(q.per_page(), 1);
        q.per_page = Some(10_000);
        assert_eq!(q.per_page(), MAX_PER_PAGE);
    }

    #[test]
    fn test_search_is_case_insensitive_and_covers_tags() {
        let mut q = query();
        q.q = Some("  CERAMIC ".to_string());
        let page = apply(demo::products(), &q);
        assert!(page.total > 0);
        assert!(page.items.iter().all(|p| {
            p.title.to_lowercase().contains("ceramic")
                || p.tags.iter().any(|t| t.to_lowercase().contains("ceramic"))
        }));
    }

    #[test]
    fn test_status_all_disables_filter() {
        let all = demo::products().len();
        let mut q = query();
        q.status = Some("all".to_string());
        q.per_page = Some(MAX_PER_PAGE);
        assert_eq!(apply(demo::products(), &q).total, all);

        q.status = Some("draft".to_string());
        let drafts = apply(demo::products(), &q);
        assert!(drafts.items.iter().all(|p| p.status == ProductStatus::Draft));
        assert!(drafts.total < all);
    }

    #[test]
    fn test_sort_by_price_both_directions() {
        let mut q = query();
        q.sort = Some("price".to_string());
        q.dir = Some(SortDirection::Asc);
        q.per_page = Some(MAX_PER_PAGE);
        let asc: Vec<_> = apply(demo::products(), &q)
            .items
            .into_iter()
            .map(|p| p.price)
            .collect();
        assert!(asc.windows(2).all(|w| w[0] <= w[1]));

        q.dir = Some(SortDirection::Desc);
        let desc: Vec<_> = apply(demo::products(), &q)
            .items
            .into_iter()
            .map(|p| p.price)
            .collect();
        assert!(desc.windows(2).all(|w| w[0] >= w[1]));
    }

    #[test]
    fn test_unknown_sort_key_falls_back() {
        let mut q = query();
        q.sort = Some("DROP TABLE".to_string());
        assert_eq!(q.sort_key::<Product>(), "created");
        assert_eq!(q.direction::<Product>(), SortDirection::Desc);
    }

    #[test]
    fn test_query_deserializes_from_url() {
        let q: ListQuery =
            serde_json::from_value(serde_json::json!({"q": "mug", "dir": "asc", "page": 2}))
                .unwrap_or_default();
        assert_eq!(q.q.as_deref(), Some("mug"));
        assert_eq!(q.dir, Some(SortDirection::Asc));
        assert_eq!(q.page, Some(2));
        assert_eq!(q.status, None);
    }
}
