//! Scheduling infrastructure for automated sync runs
//!
//! - [`SyncScheduler`]: interval loop plus manual trigger, one run at a time
//! - [`JobHistory`]: bounded newest-first log of run reports
//! - [`SyncJob`]: the unit of work; [`RunnerJob`] drives a `SyncRunner`
//!
//! The scheduler follows the workspace runtime rules: explicit start/stop,
//! tracked join handle, cancellation token, and a timeout on shutdown.

pub mod error;
pub mod history;
pub mod job;
pub mod sync_scheduler;

pub use error::{SchedulerError, SchedulerResult};
pub use history::{JobHistory, JobRecord, JobStats, JobTrigger, JOB_HISTORY_CAPACITY};
pub use job::{RunnerJob, SyncJob};
pub use sync_scheduler::{SyncScheduler, SyncSchedulerConfig};
