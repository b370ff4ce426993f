//! Failures of the sync scheduler's start/stop lifecycle.

use sheetsync_domain::SheetSyncError;
use thiserror::Error;

use crate::errors::InfraError;

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("sync scheduler is already running")]
    AlreadyRunning,

    #[error("sync scheduler is not running")]
    NotRunning,

    /// The loop did not wind down within the join timeout; an in-flight run
    /// is still writing.
    #[error("sync loop still busy after {seconds}s")]
    Timeout { seconds: u64 },

    #[error("sync loop task failed: {0}")]
    TaskJoinFailed(String),
}

impl SchedulerError {
    /// Caller asked for a transition the scheduler is not in a state to make.
    pub fn is_lifecycle_misuse(&self) -> bool {
        matches!(self, Self::AlreadyRunning | Self::NotRunning)
    }
}

impl From<SchedulerError> for InfraError {
    fn from(err: SchedulerError) -> Self {
        let message = err.to_string();
        if err.is_lifecycle_misuse() {
            Self(SheetSyncError::InvalidInput(message))
        } else {
            Self(SheetSyncError::Internal(message))
        }
    }
}

impl From<SchedulerError> for SheetSyncError {
    fn from(err: SchedulerError) -> Self {
        InfraError::from(err).into()
    }
}

pub type SchedulerResult<T> = Result<T, SchedulerError>;
