//! # SheetSync Core
//!
//! Reconciliation logic and port definitions - no HTTP, no I/O.
//!
//! This crate contains:
//! - Ports for the record source and the sheet target
//! - Declared catalogs (field mappings, key rules, line-item expansion)
//! - KeyIndex, ReconciliationEngine, BatchExecutor and SyncRunner
//! - Sheet lookup by name with creation on first use
//!
//! ## Architecture Principles
//! - Only depends on `sheetsync-domain`
//! - All remote systems via traits
//! - Deterministic given a clock and a target snapshot

pub mod clock;
pub mod ports;
pub mod sync;

pub use clock::{Clock, FixedClock, SystemClock};
pub use ports::{NewColumn, RecordSource, SheetDirectory, SinceFilter, SourceQuery, TargetStore};
pub use sync::batch::{BatchExecutor, BatchOutcome};
pub use sync::catalog::{CatalogSpec, KeyRule, LineItemExpansion};
pub use sync::catalogs;
pub use sync::column_map::ColumnMap;
pub use sync::key_index::KeyIndex;
pub use sync::locks::TargetLocks;
pub use sync::mapping::{ColumnRule, FieldMapping, FieldSource, MappingContext, RowSource};
pub use sync::provision::{get_or_create_sheet, sheet_columns};
pub use sync::reconcile::{Reconciliation, ReconciliationEngine};
pub use sync::runner::{RunOptions, RunnerSettings, SyncRunner};
