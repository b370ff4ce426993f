//! `sheetsync schedule`

use std::future::Future;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use tracing::info;

use super::ReportingJob;
use crate::AppContext;

/// Syncs every configured catalog on the configured interval until
/// `shutdown` resolves.
///
/// # Errors
/// Fails when the scheduler cannot be started or stopped cleanly.
pub async fn run(context: &AppContext, shutdown: impl Future<Output = ()>) -> Result<()> {
    let job = context.job(&[]).await?;
    let catalogs = job.catalogs().count();
    let mut scheduler = context.scheduler(Arc::new(ReportingJob::new(job)));

    scheduler.start().await.context("failed to start sync scheduler")?;
    info!(
        interval_minutes = context.config.sync.interval_minutes,
        catalogs,
        "Scheduled sync running; waiting for shutdown signal"
    );

    shutdown.await;

    info!("Shutdown requested");
    scheduler.stop().await.context("failed to stop sync scheduler")?;

    let stats = context.history.stats();
    info!(total = stats.total, successful = stats.successful, failed = stats.failed, "Scheduler stopped");
    Ok(())
}
