// src/snapshot/mod.rs

use std::sync::{Arc, RwLock};
use tracing::info;

use crate::data::{Observation, Snapshot};

/// Holder of "the current snapshot". Single writer (the refresher),
/// many readers (every view render).
///
/// `publish` swaps the inner `Arc` under a short write lock; `current`
/// clones it under a read lock. A reader keeps whatever `Arc` it took for
/// the whole render, so a concurrent publish can never hand it a mix of
/// two snapshots, and rows and catalog always come from the same load.
pub struct SnapshotStore {
    inner: RwLock<Arc<Snapshot>>,
}

impl SnapshotStore {
    /// Start with an empty placeholder snapshot (version 0). Binaries
    /// publish a real snapshot before serving.
    pub fn new() -> Self {
        SnapshotStore {
            inner: RwLock::new(Arc::new(Snapshot::empty())),
        }
    }

    /// The currently published snapshot. Cheap: one lock, one Arc clone.
    pub fn current(&self) -> Arc<Snapshot> {
        self.inner.read().unwrap().clone()
    }

    /// Atomically replace the published snapshot with a new one built from
    /// `rows`. Returns the version assigned to it.
    pub fn publish(&self, rows: Vec<Observation>) -> u64 {
        let mut snapshot = Snapshot::new(rows);
        let mut guard = self.inner.write().unwrap();
        snapshot.version = guard.version + 1;
        let version = snapshot.version;
        let rows = snapshot.rows.len();
        *guard = Arc::new(snapshot);
        drop(guard);
        info!(version, rows, "published snapshot");
        version
    }
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}
