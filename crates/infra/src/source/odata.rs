//! `$filter` expressions in the OData dialect the ERP accepts.

use std::fmt;

use chrono::NaiveDateTime;
use sheetsync_core::SourceQuery;
use sheetsync_domain::constants::SOURCE_DATETIME_FORMAT;

/// Conjunction of filter clauses.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ODataFilter {
    clauses: Vec<String>,
}

impl ODataFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// `Field eq 'value'`; single quotes in `value` are doubled.
    pub fn eq(field: &str, value: &str) -> Self {
        Self { clauses: vec![format!("{field} eq '{}'", value.replace('\'', "''"))] }
    }

    /// `Field gt DateTime'YYYY-MM-DDTHH:MM:SS'`.
    pub fn gt_datetime(field: &str, after: NaiveDateTime) -> Self {
        Self {
            clauses: vec![format!("{field} gt DateTime'{}'", after.format(SOURCE_DATETIME_FORMAT))],
        }
    }

    #[must_use]
    pub fn and(mut self, other: Self) -> Self {
        self.clauses.extend(other.clauses);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Filter for a runner query: exact matches first, then the date window.
    pub fn from_query(query: &SourceQuery) -> Self {
        let mut filter = query
            .equals
            .iter()
            .fold(Self::new(), |acc, (field, value)| acc.and(Self::eq(field, value)));
        if let Some(since) = &query.since {
            filter = filter.and(Self::gt_datetime(&since.field, since.after));
        }
        filter
    }
}

impl fmt::Display for ODataFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.clauses.join(" and "))
    }
}
