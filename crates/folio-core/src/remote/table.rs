use async_trait::async_trait;
use serde_json::Value;

use super::error::RemoteResult;
use super::row::{RemoteInsert, RemotePatch, RemoteRow};

/// A row filter
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Column equals value
    Eq(&'static str, Value),
    /// Column differs from value
    Neq(&'static str, Value),
    /// Case-insensitive substring match on any of the columns
    Contains {
        columns: Vec<&'static str>,
        term: String,
    },
}

impl Filter {
    pub fn eq(column: &'static str, value: impl Into<Value>) -> Self {
        Filter::Eq(column, value.into())
    }

    pub fn neq(column: &'static str, value: impl Into<Value>) -> Self {
        Filter::Neq(column, value.into())
    }

    /// Evaluate the filter against a row's JSON form
    pub fn matches(&self, row: &Value) -> bool {
        match self {
            Filter::Eq(column, value) => row.get(*column) == Some(value),
            Filter::Neq(column, value) => row.get(*column) != Some(value),
            Filter::Contains { columns, term } => {
                let term = term.to_lowercase();
                columns.iter().any(|column| {
                    row.get(*column)
                        .and_then(Value::as_str)
                        .is_some_and(|text| text.to_lowercase().contains(&term))
                })
            }
        }
    }
}

/// Sort order for a select
#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub column: &'static str,
    pub descending: bool,
}

/// A select over the post table
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub filters: Vec<Filter>,
    pub order: Option<Order>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    /// Newest first by `column`
    pub fn order_desc(mut self, column: &'static str) -> Self {
        self.order = Some(Order {
            column,
            descending: true,
        });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// A table-shaped remote resource holding post rows
///
/// Implementations must reject an insert or update that would duplicate a
/// slug with [`RemoteError::Conflict`](super::RemoteError::Conflict).
#[async_trait]
pub trait RemoteTable: Send + Sync {
    /// Rows matching the query
    async fn select(&self, query: &Query) -> RemoteResult<Vec<RemoteRow>>;

    /// Insert a row and return it as stored
    async fn insert(&self, row: &RemoteInsert) -> RemoteResult<RemoteRow>;

    /// Apply a patch to every matching row and return the updated rows
    async fn update(&self, filters: &[Filter], patch: &RemotePatch) -> RemoteResult<Vec<RemoteRow>>;

    /// Delete every matching row and return how many were removed
    async fn delete(&self, filters: &[Filter]) -> RemoteResult<u64>;

    /// Human-readable location, for status output
    fn describe(&self) -> String;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_filter_matching() {
        let row = json!({"id": 3, "slug": "dica-1", "title": "Dica 1", "excerpt": null, "published": true});

        assert!(Filter::eq("slug", "dica-1").matches(&row));
        assert!(!Filter::eq("slug", "dica-2").matches(&row));
        assert!(Filter::neq("id", 0).matches(&row));
        assert!(!Filter::neq("id", 3).matches(&row));
        assert!(Filter::eq("published", true).matches(&row));

        let contains = Filter::Contains {
            columns: vec!["title", "excerpt"],
            term: "DICA".to_string(),
        };
        assert!(contains.matches(&row));
    }

    #[test]
    fn test_query_builder() {
        let query = Query::new()
            .filter(Filter::eq("slug", "x"))
            .order_desc("date")
            .limit(1);

        assert_eq!(query.filters.len(), 1);
        assert_eq!(query.limit, Some(1));
        assert!(query.order.unwrap().descending);
    }
}
