//! Chunked submission of reconciled operations.
//!
//! Updates go first, then inserts, each in source order and in chunks of at
//! most `batch_size` rows. A failed chunk is recorded and the remaining
//! chunks still run; a chunk that succeeded is never retried.

use sheetsync_domain::{
    BatchFailure, Cell, Operation, OperationKind, RowPosition, RowUpdate, SheetId,
};
use tracing::{debug, error, instrument};

use crate::ports::TargetStore;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchOutcome {
    pub inserted: usize,
    pub updated: usize,
    pub failures: Vec<BatchFailure>,
}

impl BatchOutcome {
    pub fn errors(&self) -> Vec<String> {
        self.failures.iter().map(ToString::to_string).collect()
    }
}

pub struct BatchExecutor<'a> {
    store: &'a dyn TargetStore,
    sheet: SheetId,
    batch_size: usize,
    position: RowPosition,
}

impl<'a> BatchExecutor<'a> {
    /// `batch_size` is clamped to at least one row.
    pub fn new(
        store: &'a dyn TargetStore,
        sheet: SheetId,
        batch_size: usize,
        position: RowPosition,
    ) -> Self {
        Self { store, sheet, batch_size: batch_size.max(1), position }
    }

    #[instrument(skip(self, operations), fields(sheet_id = %self.sheet, operations = operations.len()))]
    pub async fn apply(&self, operations: Vec<Operation>) -> BatchOutcome {
        let mut updates: Vec<RowUpdate> = Vec::new();
        let mut inserts: Vec<Vec<Cell>> = Vec::new();
        for operation in operations {
            match operation {
                Operation::Update { row_id, cells, .. } => updates.push(RowUpdate { row_id, cells }),
                Operation::Insert { cells, .. } => inserts.push(cells),
            }
        }

        let mut outcome = BatchOutcome::default();

        for (chunk_index, chunk) in updates.chunks(self.batch_size).enumerate() {
            match self.store.update_rows(self.sheet, chunk).await {
                Ok(()) => {
                    outcome.updated += chunk.len();
                    debug!(chunk_index, rows = chunk.len(), "update batch applied");
                }
                Err(err) => {
                    error!(chunk_index, rows = chunk.len(), error = %err, "update batch failed");
                    outcome.failures.push(BatchFailure {
                        kind: OperationKind::Update,
                        chunk_index,
                        size: chunk.len(),
                        message: err.to_string(),
                    });
                }
            }
        }

        for (chunk_index, chunk) in inserts.chunks(self.batch_size).enumerate() {
            match self.store.add_rows(self.sheet, self.position, chunk).await {
                Ok(()) => {
                    outcome.inserted += chunk.len();
                    debug!(chunk_index, rows = chunk.len(), "insert batch applied");
                }
                Err(err) => {
                    error!(chunk_index, rows = chunk.len(), error = %err, "insert batch failed");
                    outcome.failures.push(BatchFailure {
                        kind: OperationKind::Insert,
                        chunk_index,
                        size: chunk.len(),
                        message: err.to_string(),
                    });
                }
            }
        }

        outcome
    }
}
