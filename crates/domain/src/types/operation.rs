//! Business keys and write operations

use std::fmt;

use serde::{Deserialize, Serialize};

use super::sheet::{Cell, RowId};
use crate::impl_label_conversions;

/// Stable identifier matching a source record to a target row.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BusinessKey(String);

impl BusinessKey {
    /// Trims surrounding whitespace; an all-blank input yields an empty key.
    pub fn new(value: impl Into<String>) -> Self {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.len() == value.len() {
            Self(value)
        } else {
            Self(trimmed.to_string())
        }
    }

    /// Synthetic key for the `index`-th row expanded from one record.
    pub fn expanded(base: &Self, index: usize) -> Self {
        Self(format!("{}-{index}", base.0))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for BusinessKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BusinessKey {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for BusinessKey {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Insert,
    Update,
}

impl_label_conversions!(OperationKind {
    Insert => "insert",
    Update => "update",
});

/// One row write decided by reconciliation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Operation {
    Insert { key: BusinessKey, cells: Vec<Cell> },
    Update { row_id: RowId, key: BusinessKey, cells: Vec<Cell> },
}

impl Operation {
    pub fn kind(&self) -> OperationKind {
        match self {
            Self::Insert { .. } => OperationKind::Insert,
            Self::Update { .. } => OperationKind::Update,
        }
    }

    pub fn key(&self) -> &BusinessKey {
        match self {
            Self::Insert { key, .. } | Self::Update { key, .. } => key,
        }
    }

    pub fn cells(&self) -> &[Cell] {
        match self {
            Self::Insert { cells, .. } | Self::Update { cells, .. } => cells,
        }
    }

    /// Replaces the cells while keeping the operation's kind and target.
    pub fn replace_cells(&mut self, new_cells: Vec<Cell>) {
        match self {
            Self::Insert { cells, .. } | Self::Update { cells, .. } => *cells = new_cells,
        }
    }

    pub fn row_id(&self) -> Option<RowId> {
        match self {
            Self::Insert { .. } => None,
            Self::Update { row_id, .. } => Some(*row_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::sheet::ColumnId;

    #[test]
    fn test_key_trims_whitespace() {
        assert_eq!(BusinessKey::new("  abc ").as_str(), "abc");
        assert!(BusinessKey::new("   ").is_empty());
    }

    #[test]
    fn test_expanded_key_format() {
        let base = BusinessKey::new("uuid-1");
        assert_eq!(BusinessKey::expanded(&base, 0).as_str(), "uuid-1-0");
        assert_eq!(BusinessKey::expanded(&base, 2).as_str(), "uuid-1-2");
    }

    #[test]
    fn test_operation_accessors() {
        let mut op = Operation::Update {
            row_id: RowId(9),
            key: "k".into(),
            cells: vec![Cell::new(ColumnId(1), "a")],
        };
        assert_eq!(op.kind(), OperationKind::Update);
        assert_eq!(op.row_id(), Some(RowId(9)));

        op.replace_cells(vec![Cell::new(ColumnId(1), "b"), Cell::new(ColumnId(2), "c")]);
        assert_eq!(op.cells().len(), 2);
        assert_eq!(op.kind(), OperationKind::Update);
    }
}
