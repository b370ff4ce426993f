//! Per-sheet mutual exclusion.
//!
//! Two runs that target the same sheet must not interleave their
//! read-index-write sequences; runs on different sheets proceed in parallel.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use sheetsync_domain::SheetId;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

#[derive(Debug, Clone, Default)]
pub struct TargetLocks {
    inner: Arc<Mutex<HashMap<SheetId, Arc<AsyncMutex<()>>>>>,
}

impl TargetLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits until no other run holds `sheet`. The lock is released when the
    /// guard drops.
    pub async fn acquire(&self, sheet: SheetId) -> OwnedMutexGuard<()> {
        let lock = Arc::clone(self.inner.lock().entry(sheet).or_default());
        lock.lock_owned().await
    }

    pub fn is_locked(&self, sheet: SheetId) -> bool {
        self.inner.lock().get(&sheet).is_some_and(|lock| lock.try_lock().is_err())
    }
}
