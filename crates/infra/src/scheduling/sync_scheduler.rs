//! Interval scheduler for catalog sync jobs.
//!
//! Runs a [`SyncJob`] every `interval` while started and on demand through
//! [`SyncScheduler::trigger_now`]. Manual and interval runs share one run
//! lock, so a job never overlaps itself. Every report lands in the
//! scheduler's [`JobHistory`].
//!
//! A token handed to [`SyncScheduler::with_shutdown`] is cancelled by
//! `stop`. Clients built with that token abandon their retry waits, so an
//! in-flight run winds down within the join timeout. Once cancelled it stays
//! cancelled; such a scheduler is not restarted.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use sheetsync_infra::scheduling::{SyncJob, SyncScheduler, SyncSchedulerConfig};
//!
//! # async fn example(job: Arc<dyn SyncJob>) -> Result<(), sheetsync_infra::scheduling::SchedulerError> {
//! let mut scheduler = SyncScheduler::new(
//!     job,
//!     SyncSchedulerConfig { interval: Duration::from_secs(3600), ..Default::default() },
//! );
//!
//! scheduler.start().await?;
//! // ... application runs ...
//! scheduler.stop().await?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

use sheetsync_domain::SyncReport;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::history::{JobHistory, JobTrigger};
use super::job::SyncJob;
use crate::scheduling::error::{SchedulerError, SchedulerResult};

/// Type alias for task handle to avoid complexity warnings
type TaskHandle = Arc<Mutex<Option<JoinHandle<()>>>>;

/// Configuration for sync scheduler
#[derive(Debug, Clone)]
pub struct SyncSchedulerConfig {
    /// Time between interval runs
    pub interval: Duration,
    /// Run once as soon as the scheduler starts
    pub run_on_start: bool,
    /// How long `stop` waits for an in-flight run
    pub join_timeout: Duration,
}

impl Default for SyncSchedulerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(3600), // 60 minutes
            run_on_start: false,
            join_timeout: Duration::from_secs(5),
        }
    }
}

/// State shared between the scheduler handle and its background loop.
#[derive(Clone)]
struct JobContext {
    job: Arc<dyn SyncJob>,
    history: JobHistory,
    run_lock: Arc<Mutex<()>>,
}

impl JobContext {
    async fn execute(&self, trigger: JobTrigger) -> Vec<SyncReport> {
        let _guard = self.run_lock.lock().await;
        let started = Instant::now();
        info!(job = self.job.name(), ?trigger, "Sync job started");

        let reports = self.job.run().await;
        for report in &reports {
            self.history.push(trigger, report.clone());
        }

        info!(
            job = self.job.name(),
            ?trigger,
            reports = reports.len(),
            duration_ms = started.elapsed().as_millis() as u64,
            "Sync job finished"
        );
        reports
    }
}

/// Interval scheduler with explicit start/stop lifecycle
pub struct SyncScheduler {
    context: JobContext,
    config: SyncSchedulerConfig,
    cancellation_token: CancellationToken,
    shutdown: Option<CancellationToken>,
    task_handle: TaskHandle,
}

impl SyncScheduler {
    pub fn new(job: Arc<dyn SyncJob>, config: SyncSchedulerConfig) -> Self {
        Self::with_history(job, config, JobHistory::new())
    }

    /// Same as [`SyncScheduler::new`] but records into an existing history.
    pub fn with_history(
        job: Arc<dyn SyncJob>,
        config: SyncSchedulerConfig,
        history: JobHistory,
    ) -> Self {
        Self {
            context: JobContext { job, history, run_lock: Arc::new(Mutex::new(())) },
            config,
            cancellation_token: CancellationToken::new(),
            shutdown: None,
            task_handle: Arc::new(Mutex::new(None)),
        }
    }

    /// Cancels `shutdown` on stop, interrupting work that shares it.
    #[must_use]
    pub fn with_shutdown(mut self, shutdown: CancellationToken) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    pub fn history(&self) -> &JobHistory {
        &self.context.history
    }

    /// Start the scheduler
    ///
    /// Spawns a background task that runs the job every interval.
    ///
    /// # Errors
    ///
    /// Returns error if scheduler is already running
    #[instrument(skip(self), fields(job = self.context.job.name()))]
    pub async fn start(&mut self) -> SchedulerResult<()> {
        if self.is_running() {
            return Err(SchedulerError::AlreadyRunning);
        }

        info!(interval_secs = self.config.interval.as_secs(), "Starting sync scheduler");

        // Fresh token so the scheduler can be restarted after stop
        self.cancellation_token = CancellationToken::new();

        let context = self.context.clone();
        let config = self.config.clone();
        let cancel = self.cancellation_token.clone();

        let handle = tokio::spawn(async move {
            Self::sync_loop(context, config, cancel).await;
        });

        *self.task_handle.lock().await = Some(handle);

        info!("Sync scheduler started");
        Ok(())
    }

    /// Stop the scheduler gracefully
    ///
    /// Cancels the background task and awaits completion.
    ///
    /// # Errors
    ///
    /// Returns error if scheduler is not running, or if the in-flight run
    /// does not finish within the join timeout
    #[instrument(skip(self), fields(job = self.context.job.name()))]
    pub async fn stop(&mut self) -> SchedulerResult<()> {
        if !self.is_running() {
            return Err(SchedulerError::NotRunning);
        }

        info!("Stopping sync scheduler");
        self.cancellation_token.cancel();
        if let Some(shutdown) = &self.shutdown {
            shutdown.cancel();
        }

        if let Some(handle) = self.task_handle.lock().await.take() {
            let join_timeout = self.config.join_timeout;
            match tokio::time::timeout(join_timeout, handle).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => return Err(SchedulerError::TaskJoinFailed(e.to_string())),
                Err(_) => {
                    return Err(SchedulerError::Timeout { seconds: join_timeout.as_secs() })
                }
            }
        }

        info!("Sync scheduler stopped");
        Ok(())
    }

    /// Check if scheduler is running
    ///
    /// A scheduler is considered running if it has an active task handle that
    /// hasn't finished.
    pub fn is_running(&self) -> bool {
        self.task_handle
            .try_lock()
            .ok()
            .and_then(|guard| guard.as_ref().map(|h| !h.is_finished()))
            .unwrap_or(false)
    }

    /// Runs the job now, waiting for any in-flight run to finish first.
    ///
    /// Works whether or not the interval loop is started.
    pub async fn trigger_now(&self) -> Vec<SyncReport> {
        self.context.execute(JobTrigger::Manual).await
    }

    async fn sync_loop(context: JobContext, config: SyncSchedulerConfig, cancel: CancellationToken) {
        if config.run_on_start {
            context.execute(JobTrigger::Interval).await;
        }

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("Sync loop cancelled");
                    break;
                }
                _ = tokio::time::sleep(config.interval) => {
                    context.execute(JobTrigger::Interval).await;
                }
            }
        }
    }
}

/// Ensure scheduler is stopped when dropped
impl Drop for SyncScheduler {
    fn drop(&mut self) {
        if !self.cancellation_token.is_cancelled() && self.is_running() {
            warn!("SyncScheduler dropped while running; cancelling");
            if let Some(shutdown) = &self.shutdown {
                shutdown.cancel();
            }
        }
        self.cancellation_token.cancel();
    }
}
