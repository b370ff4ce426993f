//! `sheetsync once [catalog ...]`

use std::sync::Arc;

use anyhow::Result;
use sheetsync_domain::SyncReport;
use tracing::info;

use super::ReportingJob;
use crate::AppContext;

/// Runs the named catalogs (all configured when empty) one after another.
///
/// # Errors
/// Fails only when a catalog cannot be resolved to a sheet; individual run
/// failures are carried inside the reports.
pub async fn run(context: &AppContext, catalogs: &[String]) -> Result<Vec<SyncReport>> {
    let job = ReportingJob::new(context.job(catalogs).await?);
    let scheduler = context.scheduler(Arc::new(job));

    let reports = scheduler.trigger_now().await;
    let failed = reports.iter().filter(|r| !r.is_success()).count();
    info!(catalogs = reports.len(), failed, "One-shot sync finished");
    Ok(reports)
}
