//! Source records → insert/update operations.
//!
//! Pure: no I/O happens here. The caller supplies the key index and column
//! map built from the target snapshot and gets back the ordered operation
//! list plus any soft warnings.

use std::collections::{HashMap, HashSet};

use sheetsync_domain::{BusinessKey, MappingWarning, Operation, Record};
use tracing::{debug, warn};

use super::catalog::CatalogSpec;
use super::column_map::ColumnMap;
use super::key_index::KeyIndex;
use super::mapping::{MappingContext, RowSource};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reconciliation {
    /// Operations in source order; a key appears at most once.
    pub operations: Vec<Operation>,
    pub warnings: Vec<MappingWarning>,
    /// Target rows produced after line-item expansion.
    pub expanded_rows: usize,
}

impl Reconciliation {
    pub fn inserts(&self) -> usize {
        self.operations.iter().filter(|op| op.row_id().is_none()).count()
    }

    pub fn updates(&self) -> usize {
        self.operations.len() - self.inserts()
    }
}

pub struct ReconciliationEngine<'a> {
    spec: &'a CatalogSpec,
    index: &'a KeyIndex,
    columns: &'a ColumnMap,
    context: &'a MappingContext,
}

impl<'a> ReconciliationEngine<'a> {
    pub fn new(
        spec: &'a CatalogSpec,
        index: &'a KeyIndex,
        columns: &'a ColumnMap,
        context: &'a MappingContext,
    ) -> Self {
        Self { spec, index, columns, context }
    }

    pub fn reconcile(&self, records: impl IntoIterator<Item = Record>) -> Reconciliation {
        let mut out = Reconciliation::default();
        let mut positions: HashMap<BusinessKey, usize> = HashMap::new();
        let mut reported_columns: HashSet<&'static str> = HashSet::new();

        for record in records {
            let base = self.spec.key.key(&record);
            if base.is_empty() {
                debug!(catalog = self.spec.name, "record without business key skipped");
                out.warnings.push(MappingWarning::missing_key());
                continue;
            }

            let items = self
                .spec
                .expansion
                .map(|expansion| record.records(expansion.items_field))
                .unwrap_or_default();

            let rows: Vec<(BusinessKey, Option<&Record>)> = match items.len() {
                0 => vec![(base, None)],
                1 => vec![(base, items.first())],
                _ => items
                    .iter()
                    .enumerate()
                    .map(|(idx, item)| (BusinessKey::expanded(&base, idx), Some(item)))
                    .collect(),
            };

            for (key, item) in rows {
                out.expanded_rows += 1;
                let source =
                    RowSource { record: &record, item, key: &key, context: self.context };
                let mapped = self.spec.mapping.apply(&source, self.columns);

                for column in mapped.unknown_columns {
                    if reported_columns.insert(column) {
                        warn!(catalog = self.spec.name, column, "mapped column missing on sheet");
                        out.warnings.push(MappingWarning::unknown_column(column));
                    }
                }

                if let Some(&position) = positions.get(&key) {
                    warn!(catalog = self.spec.name, key = %key, "duplicate key in source batch");
                    out.operations[position].replace_cells(mapped.cells);
                    out.warnings.push(MappingWarning::duplicate_key(key));
                    continue;
                }

                let operation = match self.index.get(&key) {
                    Some(row_id) => Operation::Update { row_id, key: key.clone(), cells: mapped.cells },
                    None => Operation::Insert { key: key.clone(), cells: mapped.cells },
                };
                positions.insert(key, out.operations.len());
                out.operations.push(operation);
            }
        }

        debug!(
            catalog = self.spec.name,
            operations = out.operations.len(),
            inserts = out.inserts(),
            warnings = out.warnings.len(),
            "reconciliation complete"
        );
        out
    }
}
