//! Run-scoped column title → id cache.
//!
//! Built from the snapshot read at the start of a run and dropped with it;
//! never shared between runs, so a column renamed between runs is picked up
//! without any invalidation logic.

use std::collections::HashMap;

use sheetsync_domain::{ColumnId, SheetSnapshot};

#[derive(Debug, Clone, Default)]
pub struct ColumnMap {
    by_title: HashMap<String, ColumnId>,
}

impl ColumnMap {
    pub fn from_snapshot(snapshot: &SheetSnapshot) -> Self {
        let by_title =
            snapshot.columns.iter().map(|column| (column.title.clone(), column.id)).collect();
        Self { by_title }
    }

    pub fn resolve(&self, title: &str) -> Option<ColumnId> {
        self.by_title.get(title).copied()
    }

    pub fn contains(&self, title: &str) -> bool {
        self.by_title.contains_key(title)
    }

    pub fn len(&self) -> usize {
        self.by_title.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_title.is_empty()
    }
}
