//! Time-to-live keyed store for scan records.

use crate::model::Scan;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use uuid::Uuid;

/// In-memory scan store.
///
/// Callers receive copies, never references into the map. Expiry is
/// enforced by the sweeper alone: between sweeps a technically-expired
/// record may still be returned — staleness bounded by the sweep interval
/// is the accepted trade-off, not a bug.
#[derive(Debug, Default)]
pub struct ScanStore {
    entries: DashMap<Uuid, Scan>,
}

impl ScanStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&self, scan: Scan) {
        self.entries.insert(scan.id, scan);
    }

    #[must_use]
    pub fn get(&self, id: &Uuid) -> Option<Scan> {
        self.entries.get(id).map(|entry| entry.value().clone())
    }

    #[must_use]
    pub fn get_all(&self) -> Vec<Scan> {
        self.entries
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }

    pub fn delete(&self, id: &Uuid) -> bool {
        self.entries.remove(id).is_some()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Removes every record whose availability window has passed.
    /// Returns the number of evicted records. A record is never evicted
    /// before its `available_until`.
    pub fn sweep(&self, now: DateTime<Utc>) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, scan| !scan.is_expired(now));
        before - self.entries.len()
    }

    /// Starts the background sweeper at a fixed cadence.
    ///
    /// The returned handle aborts the task when dropped, tying the
    /// sweeper's lifetime to whoever owns the handle. The task itself holds
    /// only a weak reference, so dropping the store also ends it.
    #[must_use]
    pub fn spawn_sweeper(self: &Arc<Self>, every: Duration) -> SweeperHandle {
        // tokio rejects a zero period outright.
        let every = every.max(Duration::from_millis(1));
        let store = Arc::downgrade(self);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            // The first tick completes immediately; nothing to sweep yet.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(store) = store.upgrade() else {
                    break;
                };
                let removed = store.sweep(Utc::now());
                if removed > 0 {
                    tracing::debug!(removed, remaining = store.len(), "Swept expired scans");
                }
            }
        });
        SweeperHandle { handle }
    }
}

/// Owns the background sweeper task; aborts it on drop.
#[derive(Debug)]
pub struct SweeperHandle {
    handle: JoinHandle<()>,
}

impl SweeperHandle {
    pub fn abort(&self) {
        self.handle.abort();
    }
}

impl Drop for SweeperHandle {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
