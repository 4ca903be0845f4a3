//! Query-string filters for the table API.
//!
//! Builds PostgREST-style parameters:
//!
//! ```text
//! ?user_id=eq.<uuid>&status=eq.active&order=created_at.desc&limit=20
//! ```

use std::fmt::Display;

use gainsy_core::SortDirection;

/// Row filter, ordering, and limit for a table request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    params: Vec<(String, String)>,
}

impl Filter {
    /// An empty filter (all rows visible to the token).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// `column = value`.
    #[must_use]
    pub fn eq(self, column: &str, value: impl Display) -> Self {
        self.param(column, format!("eq.{value}"))
    }

    /// `column <> value`.
    #[must_use]
    pub fn neq(self, column: &str, value: impl Display) -> Self {
        self.param(column, format!("neq.{value}"))
    }

    /// `column IS NULL`.
    #[must_use]
    pub fn is_null(self, column: &str) -> Self {
        self.param(column, "is.null".to_string())
    }

    /// Any of the given conditions, written as `column.op.value`.
    #[must_use]
    pub fn any_of(self, conditions: &[String]) -> Self {
        self.param("or", format!("({})", conditions.join(",")))
    }

    /// Sort by `column`; may be called more than once.
    #[must_use]
    pub fn order(mut self, column: &str, direction: SortDirection) -> Self {
        let term = format!("{column}.{}", direction.as_str());
        if let Some((_, existing)) = self.params.iter_mut().find(|(k, _)| k == "order") {
            existing.push(',');
            existing.push_str(&term);
            return self;
        }
        self.param("order", term)
    }

    /// At most `n` rows.
    #[must_use]
    pub fn limit(self, n: usize) -> Self {
        self.without("limit").param("limit", n.to_string())
    }

    /// Only return these columns.
    #[must_use]
    pub fn columns(self, columns: &str) -> Self {
        self.without("select").param("select", columns.to_string())
    }

    /// Query parameters in insertion order.
    #[must_use]
    pub fn pairs(&self) -> &[(String, String)] {
        &self.params
    }

    fn param(mut self, key: &str, value: String) -> Self {
        self.params.push((key.to_string(), value));
        self
    }

    fn without(mut self, key: &str) -> Self {
        self.params.retain(|(k, _)| k != key);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rendered(filter: &Filter) -> Vec<String> {
        filter
            .pairs()
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect()
    }

    #[test]
    fn test_builds_params_in_order() {
        let filter = Filter::new()
            .eq("user_id", "u1")
            .neq("status", "draft")
            .order("created_at", SortDirection::Desc)
            .limit(5);
        assert_eq!(
            rendered(&filter),
            vec![
                "user_id=eq.u1",
                "status=neq.draft",
                "order=created_at.desc",
                "limit=5"
            ]
        );
    }

    #[test]
    fn test_order_accumulates_and_limit_replaces() {
        let filter = Filter::new()
            .order("severity", SortDirection::Asc)
            .order("created_at", SortDirection::Desc)
            .limit(10)
            .limit(1);
        assert_eq!(
            rendered(&filter),
            vec!["order=severity.asc,created_at.desc", "limit=1"]
        );
    }

    #[test]
    fn test_any_of_and_null() {
        let filter = Filter::new()
            .any_of(&["user_id.eq.u1".to_string(), "user_id.is.null".to_string()])
            .is_null("deleted_at");
        assert_eq!(
            rendered(&filter),
            vec!["or=(user_id.eq.u1,user_id.is.null)", "deleted_at=is.null"]
        );
    }
}
