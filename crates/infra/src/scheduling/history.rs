//! Bounded, newest-first log of finished sync runs.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use sheetsync_domain::SyncReport;

pub use sheetsync_domain::constants::JOB_HISTORY_CAPACITY;

/// What started a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobTrigger {
    Manual,
    Interval,
}

#[derive(Debug, Clone, Serialize)]
pub struct JobRecord {
    pub trigger: JobTrigger,
    pub report: SyncReport,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct JobStats {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
}

/// Shared handle; clones see the same log.
#[derive(Debug, Clone)]
pub struct JobHistory {
    entries: Arc<Mutex<VecDeque<JobRecord>>>,
    capacity: usize,
}

impl Default for JobHistory {
    fn default() -> Self {
        Self::with_capacity(JOB_HISTORY_CAPACITY)
    }
}

impl JobHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self { entries: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))), capacity }
    }

    pub fn push(&self, trigger: JobTrigger, report: SyncReport) {
        let mut entries = self.entries.lock();
        entries.push_front(JobRecord { trigger, report });
        entries.truncate(self.capacity);
    }

    /// Up to `limit` records, newest first.
    pub fn recent(&self, limit: usize) -> Vec<JobRecord> {
        self.entries.lock().iter().take(limit).cloned().collect()
    }

    pub fn latest(&self) -> Option<JobRecord> {
        self.entries.lock().front().cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn stats(&self) -> JobStats {
        let entries = self.entries.lock();
        let successful = entries.iter().filter(|record| record.report.is_success()).count();
        JobStats { total: entries.len(), successful, failed: entries.len() - successful }
    }
}
