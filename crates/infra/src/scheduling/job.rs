//! Units of work the scheduler can trigger.

use std::sync::Arc;

use async_trait::async_trait;
use sheetsync_core::{CatalogSpec, RunOptions, SyncRunner};
use sheetsync_domain::{SheetId, SyncReport};
use tracing::info;

/// One scheduled unit of work; produces a report per synced catalog.
#[async_trait]
pub trait SyncJob: Send + Sync {
    fn name(&self) -> &str;

    async fn run(&self) -> Vec<SyncReport>;
}

/// Runs a fixed list of catalogs one after another through a [`SyncRunner`].
pub struct RunnerJob {
    runner: Arc<SyncRunner>,
    targets: Vec<(CatalogSpec, SheetId)>,
    options: RunOptions,
}

impl RunnerJob {
    pub fn new(
        runner: Arc<SyncRunner>,
        targets: Vec<(CatalogSpec, SheetId)>,
        options: RunOptions,
    ) -> Self {
        Self { runner, targets, options }
    }

    pub fn catalogs(&self) -> impl Iterator<Item = &str> {
        self.targets.iter().map(|(spec, _)| spec.name)
    }
}

#[async_trait]
impl SyncJob for RunnerJob {
    fn name(&self) -> &str {
        "catalog-sync"
    }

    async fn run(&self) -> Vec<SyncReport> {
        let mut reports = Vec::with_capacity(self.targets.len());
        for (spec, sheet) in &self.targets {
            reports.push(self.runner.run(spec, *sheet, self.options).await);
        }
        let failed = reports.iter().filter(|r| !r.is_success()).count();
        info!(catalogs = reports.len(), failed, "Catalog sync job finished");
        reports
    }
}
