//! Trigger modes of the `sheetsync` binary.

pub mod check;
pub mod once;
pub mod schedule;

use async_trait::async_trait;
use sheetsync_domain::SyncReport;
use sheetsync_infra::scheduling::SyncJob;

use crate::utils::logging::log_report;

/// Logs every report the wrapped job produces.
pub struct ReportingJob<J> {
    inner: J,
}

impl<J: SyncJob> ReportingJob<J> {
    pub fn new(inner: J) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<J: SyncJob> SyncJob for ReportingJob<J> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn run(&self) -> Vec<SyncReport> {
        let reports = self.inner.run().await;
        reports.iter().for_each(log_report);
        reports
    }
}
