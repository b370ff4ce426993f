//! Domain types and models

pub mod operation;
pub mod record;
pub mod report;
pub mod sheet;

pub use operation::{BusinessKey, Operation, OperationKind};
pub use record::{scalar_text, CellValue, Record};
pub use report::{BatchFailure, MappingWarning, SyncMode, SyncPhase, SyncReport, WarningKind};
pub use sheet::{Cell, Column, ColumnId, Row, RowId, RowPosition, SheetId, SheetSnapshot, RowUpdate};
