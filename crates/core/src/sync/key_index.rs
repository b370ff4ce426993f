//! Business key → row id lookup over the target's current contents.
//!
//! Built once per run from a single full read of the sheet. If the sheet
//! holds the same key on several rows the last scanned row wins and the key
//! is listed in [`KeyIndex::collisions`]; earlier rows with that key are no
//! longer addressable by reconciliation. The sheet's column titles are kept
//! alongside so the same read also serves cell mapping.

use std::collections::HashMap;

use sheetsync_domain::{BusinessKey, Result, RowId, SheetId, SheetSnapshot, SheetSyncError};
use tracing::{debug, warn};

use super::column_map::ColumnMap;
use crate::ports::TargetStore;

#[derive(Debug, Clone, Default)]
pub struct KeyIndex {
    rows: HashMap<BusinessKey, RowId>,
    collisions: Vec<BusinessKey>,
    columns: ColumnMap,
}

impl KeyIndex {
    /// Reads the sheet and indexes it by `key_column`.
    pub async fn build(
        store: &dyn TargetStore,
        sheet: SheetId,
        key_column: &str,
    ) -> Result<Self> {
        let snapshot = store.load_sheet(sheet).await?;
        Self::from_snapshot(&snapshot, key_column)
    }

    /// Indexes an already loaded snapshot.
    ///
    /// # Errors
    /// Returns `SheetSyncError::Target` when the sheet has no `key_column`;
    /// without it every record would be treated as new.
    pub fn from_snapshot(snapshot: &SheetSnapshot, key_column: &str) -> Result<Self> {
        let column = snapshot.column(key_column).ok_or_else(|| {
            SheetSyncError::Target(format!(
                "key column '{key_column}' not found on sheet {}",
                snapshot.sheet_id
            ))
        })?;

        let mut index = Self { columns: ColumnMap::from_snapshot(snapshot), ..Self::default() };
        for row in &snapshot.rows {
            let Some(key) = row.value(column.id).and_then(|value| value.key_text()) else {
                continue;
            };
            let key = BusinessKey::new(key);
            if index.rows.insert(key.clone(), row.id).is_some() {
                warn!(sheet_id = %snapshot.sheet_id, key = %key, "duplicate key on target sheet");
                index.collisions.push(key);
            }
        }

        debug!(
            sheet_id = %snapshot.sheet_id,
            keys = index.rows.len(),
            rows = snapshot.rows.len(),
            "key index built"
        );
        Ok(index)
    }

    pub fn get(&self, key: &BusinessKey) -> Option<RowId> {
        self.rows.get(key).copied()
    }

    pub fn contains(&self, key: &BusinessKey) -> bool {
        self.rows.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Column titles of the sheet the index was read from.
    pub fn columns(&self) -> &ColumnMap {
        &self.columns
    }

    /// Keys that appeared on more than one target row.
    pub fn collisions(&self) -> &[BusinessKey] {
        &self.collisions
    }
}
