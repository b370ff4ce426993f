//! Sync run outcomes

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::operation::{BusinessKey, OperationKind};
use super::sheet::SheetId;
use crate::impl_label_conversions;

/// Whether a run applied the "since" filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncMode {
    Full,
    Incremental,
}

impl_label_conversions!(SyncMode {
    Full => "full",
    Incremental => "incremental",
});

/// Run state machine. Phases only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncPhase {
    #[default]
    Idle,
    Fetching,
    Reconciling,
    Applying,
    Reported,
}

impl_label_conversions!(SyncPhase {
    Idle => "idle",
    Fetching => "fetching",
    Reconciling => "reconciling",
    Applying => "applying",
    Reported => "reported",
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum WarningKind {
    /// The record produced an empty business key and was skipped.
    MissingKey,
    /// A mapped column does not exist on the target sheet.
    UnknownColumn(String),
    /// The key was already produced earlier in the same run.
    DuplicateKey,
    /// The target already held this key on more than one row.
    DuplicateTargetRow,
    /// Detail enrichment failed; the record was used as listed.
    DetailUnavailable(String),
}

/// Soft, per-record problem. The run continues.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingWarning {
    pub key: Option<BusinessKey>,
    pub kind: WarningKind,
}

impl MappingWarning {
    pub fn missing_key() -> Self {
        Self { key: None, kind: WarningKind::MissingKey }
    }

    pub fn unknown_column(column: impl Into<String>) -> Self {
        Self { key: None, kind: WarningKind::UnknownColumn(column.into()) }
    }

    pub fn duplicate_key(key: BusinessKey) -> Self {
        Self { key: Some(key), kind: WarningKind::DuplicateKey }
    }

    pub fn duplicate_target_row(key: BusinessKey) -> Self {
        Self { key: Some(key), kind: WarningKind::DuplicateTargetRow }
    }

    pub fn detail_unavailable(key: Option<BusinessKey>, reason: impl Into<String>) -> Self {
        Self { key, kind: WarningKind::DetailUnavailable(reason.into()) }
    }
}

impl fmt::Display for MappingWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.kind, &self.key) {
            (WarningKind::MissingKey, _) => f.write_str("record skipped: empty business key"),
            (WarningKind::UnknownColumn(column), _) => {
                write!(f, "column '{column}' not found on target sheet")
            }
            (WarningKind::DuplicateKey, Some(key)) => {
                write!(f, "key '{key}' produced twice in one run; later record wins")
            }
            (WarningKind::DuplicateTargetRow, Some(key)) => {
                write!(f, "key '{key}' found on several target rows; last row wins")
            }
            (WarningKind::DetailUnavailable(reason), Some(key)) => {
                write!(f, "detail for '{key}' unavailable: {reason}")
            }
            (WarningKind::DetailUnavailable(reason), None) => {
                write!(f, "detail unavailable: {reason}")
            }
            (kind, None) => write!(f, "{kind:?}"),
        }
    }
}

/// One failed batch submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchFailure {
    pub kind: OperationKind,
    /// Zero-based chunk index within its partition.
    pub chunk_index: usize,
    pub size: usize,
    pub message: String,
}

impl fmt::Display for BatchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} batch {} ({} rows) failed: {}",
            self.kind, self.chunk_index, self.size, self.message
        )
    }
}

/// Accumulated result of one sync run. Always produced, even on failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncReport {
    pub run_id: Uuid,
    pub catalog: String,
    pub sheet_id: SheetId,
    pub mode: Option<SyncMode>,
    pub phase: SyncPhase,
    /// Keyed rows the target held when the run started.
    pub existing_rows: usize,
    pub total_source_count: usize,
    pub inserted: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub skipped: usize,
    pub errors: Vec<String>,
    pub warnings: Vec<MappingWarning>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl SyncReport {
    pub fn new(catalog: impl Into<String>, sheet_id: SheetId, started_at: DateTime<Utc>) -> Self {
        Self {
            run_id: Uuid::now_v7(),
            catalog: catalog.into(),
            sheet_id,
            mode: None,
            phase: SyncPhase::Idle,
            existing_rows: 0,
            total_source_count: 0,
            inserted: 0,
            updated: 0,
            unchanged: 0,
            skipped: 0,
            errors: Vec::new(),
            warnings: Vec::new(),
            started_at,
            finished_at: None,
        }
    }

    /// Moves to `phase` if it lies ahead of the current one.
    pub fn advance(&mut self, phase: SyncPhase) -> bool {
        if phase > self.phase {
            self.phase = phase;
            true
        } else {
            false
        }
    }

    pub fn push_warning(&mut self, warning: MappingWarning) {
        if warning.kind == WarningKind::MissingKey {
            self.skipped += 1;
        }
        self.warnings.push(warning);
    }

    pub fn push_batch_failure(&mut self, failure: &BatchFailure) {
        self.errors.push(failure.to_string());
    }

    /// Fetch-phase failure: nothing is applied, one top-level error remains.
    pub fn fail_fetch(&mut self, error: impl fmt::Display) {
        self.inserted = 0;
        self.updated = 0;
        self.errors = vec![format!("fetch failed: {error}")];
    }

    /// Closes the report and derives the unchanged count.
    pub fn finish(&mut self, finished_at: DateTime<Utc>) {
        self.unchanged =
            self.total_source_count.saturating_sub(self.inserted.saturating_add(self.updated));
        self.phase = SyncPhase::Reported;
        self.finished_at = Some(finished_at);
    }

    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn duration_ms(&self) -> Option<i64> {
        self.finished_at.map(|end| (end - self.started_at).num_milliseconds())
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn started() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_phases_only_move_forward() {
        let mut report = SyncReport::new("clients", SheetId(1), started());
        assert!(report.advance(SyncPhase::Fetching));
        assert!(report.advance(SyncPhase::Applying));
        assert!(!report.advance(SyncPhase::Reconciling));
        assert_eq!(report.phase, SyncPhase::Applying);
    }

    #[test]
    fn test_finish_computes_unchanged_saturating() {
        let mut report = SyncReport::new("clients", SheetId(1), started());
        report.total_source_count = 10;
        report.inserted = 3;
        report.updated = 4;
        report.finish(started() + chrono::Duration::seconds(2));
        assert_eq!(report.unchanged, 3);
        assert_eq!(report.phase, SyncPhase::Reported);
        assert_eq!(report.duration_ms(), Some(2000));

        let mut expanded = SyncReport::new("invoices", SheetId(1), started());
        expanded.total_source_count = 1;
        expanded.inserted = 3;
        expanded.finish(started());
        assert_eq!(expanded.unchanged, 0);
    }

    #[test]
    fn test_fail_fetch_leaves_single_error() {
        let mut report = SyncReport::new("clients", SheetId(1), started());
        report.errors.push("earlier".into());
        report.fail_fetch("server error 503");
        assert_eq!(report.errors, vec!["fetch failed: server error 503".to_string()]);
        assert_eq!(report.inserted + report.updated, 0);
    }

    #[test]
    fn test_missing_key_warning_counts_as_skipped() {
        let mut report = SyncReport::new("clients", SheetId(1), started());
        report.push_warning(MappingWarning::missing_key());
        report.push_warning(MappingWarning::unknown_column("RFC"));
        assert_eq!(report.skipped, 1);
        assert_eq!(report.warnings.len(), 2);
    }

    #[test]
    fn test_batch_failure_message() {
        let failure = BatchFailure {
            kind: OperationKind::Insert,
            chunk_index: 1,
            size: 50,
            message: "server error 500".into(),
        };
        assert_eq!(failure.to_string(), "insert batch 1 (50 rows) failed: server error 500");
    }
}
