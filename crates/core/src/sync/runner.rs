//! One catalog run, end to end.
//!
//! ```text
//! Idle -> Fetching -> Reconciling -> Applying -> Reported
//! ```
//!
//! A failure while reading the target or fetching the source jumps straight
//! to `Reported` with a single error and nothing written. Batch failures are
//! recorded per chunk and never abort the run.

use std::sync::Arc;

use chrono::Duration;
use chrono_tz::Tz;
use futures::TryStreamExt;
use sheetsync_domain::{
    MappingWarning, Record, Result, SheetId, SheetSyncError, SyncMode, SyncPhase, SyncReport,
    SyncSettings,
};
use tracing::{info, instrument, warn};

use super::batch::BatchExecutor;
use super::catalog::{CatalogSpec, LineItemExpansion};
use super::key_index::KeyIndex;
use super::locks::TargetLocks;
use super::mapping::MappingContext;
use super::reconcile::ReconciliationEngine;
use crate::clock::Clock;
use crate::ports::{RecordSource, SinceFilter, SourceQuery, TargetStore};

#[derive(Debug, Clone, Default)]
pub struct RunnerSettings {
    pub batch_size: usize,
    pub sync: SyncSettings,
    /// Written into catalogs that carry a warehouse column.
    pub warehouse_id: Option<String>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Skip the incremental window regardless of target size.
    pub force_full_load: bool,
}

pub struct SyncRunner {
    source: Arc<dyn RecordSource>,
    target: Arc<dyn TargetStore>,
    settings: RunnerSettings,
    timezone: Tz,
    clock: Arc<dyn Clock>,
    locks: TargetLocks,
}

impl SyncRunner {
    /// # Errors
    /// `SheetSyncError::Config` when the configured timezone is not a known
    /// IANA zone.
    pub fn new(
        source: Arc<dyn RecordSource>,
        target: Arc<dyn TargetStore>,
        settings: RunnerSettings,
        clock: Arc<dyn Clock>,
        locks: TargetLocks,
    ) -> Result<Self> {
        let timezone: Tz = settings.sync.timezone.parse().map_err(|_| {
            SheetSyncError::Config(format!("unknown timezone '{}'", settings.sync.timezone))
        })?;
        Ok(Self { source, target, settings, timezone, clock, locks })
    }

    pub fn settings(&self) -> &RunnerSettings {
        &self.settings
    }

    /// Synchronises `spec` into `sheet`. Always returns a report.
    #[instrument(skip(self, spec), fields(catalog = spec.name, sheet_id = %sheet))]
    pub async fn run(&self, spec: &CatalogSpec, sheet: SheetId, options: RunOptions) -> SyncReport {
        let _guard = self.locks.acquire(sheet).await;
        let started_at = self.clock.now();
        let mut report = SyncReport::new(spec.name, sheet, started_at);
        report.advance(SyncPhase::Fetching);

        let index = match KeyIndex::build(self.target.as_ref(), sheet, spec.key_column).await {
            Ok(index) => index,
            Err(err) => return self.abort(report, &err),
        };
        for key in index.collisions() {
            report.push_warning(MappingWarning::duplicate_target_row(key.clone()));
        }
        report.existing_rows = index.len();

        let incremental = !(options.force_full_load || self.settings.sync.force_full_load)
            && index.len() >= self.settings.sync.incremental_threshold;
        let query = self.query_for(spec, incremental, started_at);
        report.mode =
            Some(if query.since.is_some() { SyncMode::Incremental } else { SyncMode::Full });
        info!(
            mode = ?report.mode,
            existing = report.existing_rows,
            since = ?query.since.as_ref().map(|s| s.after),
            "fetching source records"
        );

        let mut records = match self.source.records(query).try_collect::<Vec<Record>>().await {
            Ok(records) => records,
            Err(err) => return self.abort(report, &err),
        };
        report.total_source_count = records.len();

        if let Some(expansion) = spec.expansion {
            records = self.attach_details(spec, expansion, records, &mut report).await;
        }

        report.advance(SyncPhase::Reconciling);
        let mut context = MappingContext::new(self.timezone, started_at);
        context.warehouse_id = self.settings.warehouse_id.clone();
        let plan =
            ReconciliationEngine::new(spec, &index, index.columns(), &context).reconcile(records);
        for warning in plan.warnings {
            report.push_warning(warning);
        }

        report.advance(SyncPhase::Applying);
        let outcome =
            BatchExecutor::new(self.target.as_ref(), sheet, self.settings.batch_size, spec.position)
                .apply(plan.operations)
                .await;
        report.inserted = outcome.inserted;
        report.updated = outcome.updated;
        for failure in &outcome.failures {
            report.push_batch_failure(failure);
        }

        report.finish(self.clock.now());
        info!(
            run_id = %report.run_id,
            total = report.total_source_count,
            inserted = report.inserted,
            updated = report.updated,
            unchanged = report.unchanged,
            skipped = report.skipped,
            errors = report.errors.len(),
            warnings = report.warnings.len(),
            duration_ms = report.duration_ms(),
            "sync run complete"
        );
        report
    }

    fn query_for(
        &self,
        spec: &CatalogSpec,
        incremental: bool,
        now: chrono::DateTime<chrono::Utc>,
    ) -> SourceQuery {
        let mut query = SourceQuery::new(spec.endpoint);
        query.order_by = spec.order_by.map(str::to_string);
        query.max_records = spec.effective_max_records(self.settings.sync.max_records);

        if incremental {
            if let Some(field) = spec.date_field {
                let after = now.with_timezone(&self.timezone).naive_local()
                    - Duration::days(self.settings.sync.lookback_days);
                query.since = Some(SinceFilter { field: field.to_string(), after });
            }
        }
        query
    }

    /// Merges each record's detail document into it, one request at a time.
    /// A failed lookup keeps the listed record and leaves a warning.
    async fn attach_details(
        &self,
        spec: &CatalogSpec,
        expansion: LineItemExpansion,
        records: Vec<Record>,
        report: &mut SyncReport,
    ) -> Vec<Record> {
        let mut merged = Vec::with_capacity(records.len());
        for mut record in records {
            let Some(id) = record.text(expansion.id_field) else {
                merged.push(record);
                continue;
            };
            match self.source.record_detail(expansion.detail_endpoint, &id).await {
                Ok(detail) => record.merge(detail),
                Err(err) => {
                    warn!(id = %id, error = %err, "detail fetch failed");
                    let key = spec.key.key(&record);
                    let key = (!key.is_empty()).then_some(key);
                    report.push_warning(MappingWarning::detail_unavailable(key, err.to_string()));
                }
            }
            merged.push(record);
        }
        merged
    }

    fn abort(&self, mut report: SyncReport, err: &SheetSyncError) -> SyncReport {
        warn!(error = %err, category = err.category(), "sync run aborted before writing");
        report.fail_fetch(err);
        report.finish(self.clock.now());
        report
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use async_trait::async_trait;
    use chrono::{NaiveDate, TimeZone, Utc};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration as StdDuration;

    use futures::stream::{BoxStream, StreamExt};
    use parking_lot::Mutex;
    use sheetsync_domain::{
        ApiError, Cell, CellValue, Column, ColumnId, Row, RowId, RowPosition, RowUpdate,
        SheetSnapshot, WarningKind,
    };

    use super::*;
    use crate::clock::FixedClock;
    use crate::sync::mapping::{FieldMapping, FieldSource};

    #[derive(Default)]
    struct MemorySource {
        records: Vec<Record>,
        fail: bool,
        queries: Mutex<Vec<SourceQuery>>,
        /// When set, details resolve after this delay instead of failing.
        detail_delay: Option<StdDuration>,
        details_in_flight: AtomicUsize,
        max_details_in_flight: AtomicUsize,
        detail_calls: AtomicUsize,
    }

    #[async_trait]
    impl RecordSource for MemorySource {
        fn records(&self, query: SourceQuery) -> BoxStream<'_, Result<Record>> {
            let cap = query.max_records.unwrap_or(usize::MAX);
            self.queries.lock().push(query);
            if self.fail {
                let err = SheetSyncError::Api(ApiError::Server {
                    status: 500,
                    attempts: 5,
                    body: "boom".into(),
                });
                return futures::stream::iter(vec![Ok(self.records[0].clone()), Err(err)]).boxed();
            }
            futures::stream::iter(self.records.iter().take(cap).cloned().map(Ok)).boxed()
        }

        async fn record_detail(&self, _endpoint: &str, id: &str) -> Result<Record> {
            let Some(delay) = self.detail_delay else {
                return Err(SheetSyncError::Internal("no details".into()));
            };
            self.detail_calls.fetch_add(1, Ordering::SeqCst);
            let now = self.details_in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_details_in_flight.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(delay).await;
            self.details_in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(Record::new().with("Name", format!("Detail {id}")))
        }
    }

    /// Sheet held in memory; inserts get fresh row ids.
    struct MemoryTarget {
        sheet: Mutex<SheetSnapshot>,
        next_row: Mutex<i64>,
        locks: TargetLocks,
        locked_during_read: Mutex<bool>,
    }

    impl MemoryTarget {
        fn new(locks: TargetLocks) -> Self {
            Self {
                sheet: Mutex::new(SheetSnapshot {
                    sheet_id: SheetId(1),
                    name: "Bind - Clientes".into(),
                    columns: vec![
                        Column { id: ColumnId(1), title: "ID".into(), primary: true },
                        Column { id: ColumnId(2), title: "Nombre".into(), primary: false },
                    ],
                    rows: Vec::new(),
                }),
                next_row: Mutex::new(1000),
                locks,
                locked_during_read: Mutex::new(false),
            }
        }

        fn row_count(&self) -> usize {
            self.sheet.lock().rows.len()
        }
    }

    #[async_trait]
    impl TargetStore for MemoryTarget {
        async fn load_sheet(&self, sheet: SheetId) -> Result<SheetSnapshot> {
            *self.locked_during_read.lock() = self.locks.is_locked(sheet);
            Ok(self.sheet.lock().clone())
        }

        async fn add_rows(
            &self,
            _sheet: SheetId,
            _position: RowPosition,
            rows: &[Vec<Cell>],
        ) -> Result<()> {
            let mut sheet = self.sheet.lock();
            let mut next = self.next_row.lock();
            for cells in rows {
                *next += 1;
                let values: HashMap<_, _> =
                    cells.iter().map(|c| (c.column_id, c.value.clone())).collect();
                sheet.rows.push(Row { id: RowId(*next), values });
            }
            Ok(())
        }

        async fn update_rows(&self, _sheet: SheetId, rows: &[RowUpdate]) -> Result<()> {
            let mut sheet = self.sheet.lock();
            for update in rows {
                let row = sheet
                    .rows
                    .iter_mut()
                    .find(|row| row.id == update.row_id)
                    .ok_or_else(|| SheetSyncError::Target(format!("no row {}", update.row_id)))?;
                for cell in &update.cells {
                    row.values.insert(cell.column_id, cell.value.clone());
                }
            }
            Ok(())
        }
    }

    fn spec() -> CatalogSpec {
        CatalogSpec::new(
            "clients",
            "Bind - Clientes",
            "/Clients",
            FieldMapping::default()
                .rule("ID", FieldSource::BusinessKey)
                .rule("Nombre", FieldSource::Field("Name")),
        )
        .date_field("CreationDate")
    }

    fn records(n: usize) -> Vec<Record> {
        (0..n).map(|i| Record::new().with("ID", format!("c{i}")).with("Name", format!("Client {i}"))).collect()
    }

    fn runner(
        source: Arc<MemorySource>,
        target: Arc<MemoryTarget>,
        locks: TargetLocks,
        threshold: usize,
    ) -> SyncRunner {
        let settings = RunnerSettings {
            batch_size: 100,
            sync: SyncSettings { incremental_threshold: threshold, ..SyncSettings::default() },
            warehouse_id: None,
        };
        let clock = Arc::new(FixedClock::new(Utc.with_ymd_and_hms(2026, 3, 10, 18, 0, 0).unwrap()));
        SyncRunner::new(source, target, settings, clock, locks).unwrap()
    }

    #[tokio::test]
    async fn test_second_run_updates_instead_of_inserting() {
        let locks = TargetLocks::new();
        let source = Arc::new(MemorySource { records: records(3), ..Default::default() });
        let target = Arc::new(MemoryTarget::new(locks.clone()));
        let runner = runner(source, Arc::clone(&target), locks, 10);

        let first = runner.run(&spec(), SheetId(1), RunOptions::default()).await;
        assert_eq!((first.inserted, first.updated, first.unchanged), (3, 0, 0));
        assert_eq!(first.mode, Some(SyncMode::Full));
        assert!(first.is_success());

        let second = runner.run(&spec(), SheetId(1), RunOptions::default()).await;
        assert_eq!((second.inserted, second.updated), (0, 3));
        assert_eq!(second.existing_rows, 3);
        assert_eq!(target.row_count(), 3);
        assert_eq!(second.phase, SyncPhase::Reported);
    }

    #[tokio::test]
    async fn test_empty_key_is_skipped_not_inserted() {
        let locks = TargetLocks::new();
        let mut input = records(2);
        input.push(Record::new().with("Name", "anonymous"));
        let source = Arc::new(MemorySource { records: input, ..Default::default() });
        let target = Arc::new(MemoryTarget::new(locks.clone()));

        let report = runner(source, Arc::clone(&target), locks, 10)
            .run(&spec(), SheetId(1), RunOptions::default())
            .await;

        assert_eq!(report.total_source_count, 3);
        assert_eq!(report.inserted, 2);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.unchanged, 1);
        assert!(report.warnings.iter().any(|w| w.kind == WarningKind::MissingKey));
        assert_eq!(target.row_count(), 2);
    }

    #[tokio::test]
    async fn test_fetch_failure_writes_nothing() {
        let locks = TargetLocks::new();
        let source = Arc::new(MemorySource { records: records(2), fail: true, ..Default::default() });
        let target = Arc::new(MemoryTarget::new(locks.clone()));

        let report = runner(source, Arc::clone(&target), locks, 10)
            .run(&spec(), SheetId(1), RunOptions::default())
            .await;

        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].starts_with("fetch failed"));
        assert_eq!((report.inserted, report.updated), (0, 0));
        assert_eq!(report.phase, SyncPhase::Reported);
        assert_eq!(target.row_count(), 0);
    }

    #[tokio::test]
    async fn test_incremental_window_once_target_is_populated() {
        let locks = TargetLocks::new();
        let source = Arc::new(MemorySource { records: records(3), ..Default::default() });
        let target = Arc::new(MemoryTarget::new(locks.clone()));
        let runner = runner(Arc::clone(&source), target, locks, 3);

        runner.run(&spec(), SheetId(1), RunOptions::default()).await;
        let report = runner.run(&spec(), SheetId(1), RunOptions::default()).await;
        assert_eq!(report.mode, Some(SyncMode::Incremental));

        let forced = runner.run(&spec(), SheetId(1), RunOptions { force_full_load: true }).await;
        assert_eq!(forced.mode, Some(SyncMode::Full));

        let queries = source.queries.lock();
        assert_eq!(queries[0].since, None);
        let since = queries[1].since.as_ref().expect("incremental filter");
        assert_eq!(since.field, "CreationDate");
        // 18:00 UTC is 12:00 in Mexico City; seven days back.
        assert_eq!(
            since.after,
            NaiveDate::from_ymd_opt(2026, 3, 3).unwrap().and_hms_opt(12, 0, 0).unwrap()
        );
        assert_eq!(queries[2].since, None);
    }

    #[tokio::test]
    async fn test_run_holds_the_sheet_lock() {
        let locks = TargetLocks::new();
        let source = Arc::new(MemorySource { records: records(1), ..Default::default() });
        let target = Arc::new(MemoryTarget::new(locks.clone()));

        runner(source, Arc::clone(&target), locks.clone(), 10)
            .run(&spec(), SheetId(1), RunOptions::default())
            .await;

        assert!(*target.locked_during_read.lock());
        assert!(!locks.is_locked(SheetId(1)));
    }

    #[tokio::test]
    async fn test_missing_key_column_aborts() {
        let locks = TargetLocks::new();
        let source = Arc::new(MemorySource { records: records(1), ..Default::default() });
        let target = Arc::new(MemoryTarget::new(locks.clone()));
        let spec = spec().keyed(crate::sync::catalog::KeyRule::Field("ID"), "Clave");

        let report = runner(source, target, locks, 10).run(&spec, SheetId(1), RunOptions::default()).await;

        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].contains("Clave"));
    }

    #[tokio::test]
    async fn test_detail_requests_are_sequential() {
        let locks = TargetLocks::new();
        let source = Arc::new(MemorySource {
            records: records(8),
            detail_delay: Some(StdDuration::from_millis(20)),
            ..Default::default()
        });
        let target = Arc::new(MemoryTarget::new(locks.clone()));
        let spec = spec().expand(LineItemExpansion {
            detail_endpoint: "/Clients",
            id_field: "ID",
            items_field: "Products",
        });

        let report = runner(Arc::clone(&source), Arc::clone(&target), locks, 10)
            .run(&spec, SheetId(1), RunOptions::default())
            .await;

        assert_eq!(source.detail_calls.load(Ordering::SeqCst), 8);
        assert_eq!(source.max_details_in_flight.load(Ordering::SeqCst), 1);
        assert_eq!(report.inserted, 8);
        assert!(report.warnings.is_empty());
        let sheet = target.sheet.lock();
        assert_eq!(sheet.rows[0].value(ColumnId(2)), Some(&CellValue::text("Detail c0")));
    }

    #[tokio::test]
    async fn test_failed_detail_keeps_listed_record() {
        let locks = TargetLocks::new();
        let source = Arc::new(MemorySource { records: records(2), ..Default::default() });
        let target = Arc::new(MemoryTarget::new(locks.clone()));
        let spec = spec().expand(LineItemExpansion {
            detail_endpoint: "/Clients",
            id_field: "ID",
            items_field: "Products",
        });

        let report =
            runner(source, target, locks, 10).run(&spec, SheetId(1), RunOptions::default()).await;

        assert_eq!(report.inserted, 2);
        let unavailable = report
            .warnings
            .iter()
            .filter(|w| matches!(w.kind, WarningKind::DetailUnavailable(_)))
            .count();
        assert_eq!(unavailable, 2);
    }

    #[tokio::test]
    async fn test_catalog_without_date_field_reports_full_mode() {
        let locks = TargetLocks::new();
        let source = Arc::new(MemorySource { records: records(3), ..Default::default() });
        let target = Arc::new(MemoryTarget::new(locks.clone()));
        let runner = runner(Arc::clone(&source), target, locks, 3);
        let mut spec = spec();
        spec.date_field = None;

        runner.run(&spec, SheetId(1), RunOptions::default()).await;
        let report = runner.run(&spec, SheetId(1), RunOptions::default()).await;

        assert_eq!(report.existing_rows, 3);
        assert_eq!(report.mode, Some(SyncMode::Full));
        assert!(source.queries.lock().iter().all(|query| query.since.is_none()));
    }

    #[test]
    fn test_invalid_timezone_rejected() {
        let locks = TargetLocks::new();
        let settings = RunnerSettings {
            sync: SyncSettings { timezone: "Mars/Olympus".into(), ..SyncSettings::default() },
            ..RunnerSettings::default()
        };
        let result = SyncRunner::new(
            Arc::new(MemorySource::default()),
            Arc::new(MemoryTarget::new(locks.clone())),
            settings,
            Arc::new(FixedClock::new(Utc::now())),
            locks,
        );
        assert!(matches!(result, Err(SheetSyncError::Config(_))));
    }
}
