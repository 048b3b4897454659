// src/refresh/mod.rs

use anyhow::{Context, Result};
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};
use std::time::Duration;
use tokio::{
    sync::{watch, Mutex},
    task,
    time::{interval, timeout, MissedTickBehavior},
};
use tracing::{debug, warn};

use crate::load::TableSource;
use crate::snapshot::SnapshotStore;

/// Drives reloads of the shared snapshot, one per tick.
///
/// Every reload trigger in the process goes through [`ensure_fresh`]: the
/// background scheduler loop and the view-update handler both call it with
/// the tick they observed, and a given tick value is consumed exactly once.
/// Whichever caller arrives first performs the load; everyone else gets the
/// snapshot it published. This is what keeps a scheduler tick and the
/// client-side poll for the same tick from loading twice.
///
/// [`ensure_fresh`]: Refresher::ensure_fresh
pub struct Refresher {
    source: Arc<dyn TableSource>,
    store: Arc<SnapshotStore>,
    /// Highest tick already consumed (loaded or failed-and-skipped).
    last_tick: AtomicU64,
    /// Serializes load attempts so racing callers for a new tick agree on
    /// who loads.
    gate: Mutex<()>,
    load_timeout: Duration,
}

impl Refresher {
    pub fn new(
        source: Arc<dyn TableSource>,
        store: Arc<SnapshotStore>,
        load_timeout: Duration,
    ) -> Self {
        Refresher {
            source,
            store,
            last_tick: AtomicU64::new(0),
            gate: Mutex::new(()),
            load_timeout,
        }
    }

    pub fn store(&self) -> &Arc<SnapshotStore> {
        &self.store
    }

    /// Reload and publish if `tick` has not been consumed yet.
    ///
    /// Returns `Ok(true)` when this call performed the load, `Ok(false)`
    /// when the tick was already consumed. On failure the last-good
    /// snapshot stays published and the tick still counts as consumed:
    /// viewers on this tick keep rendering the old data, and the retry
    /// happens on the next scheduler tick rather than on every interaction.
    pub async fn ensure_fresh(&self, tick: u64) -> Result<bool> {
        if tick <= self.last_tick.load(Ordering::Acquire) {
            return Ok(false);
        }

        let _guard = self.gate.lock().await;
        if tick <= self.last_tick.load(Ordering::Acquire) {
            return Ok(false);
        }
        self.last_tick.store(tick, Ordering::Release);

        // The CSV read is synchronous; keep it off the runtime threads and
        // bound it so a hung source cannot wedge the gate.
        let source = Arc::clone(&self.source);
        let rows = timeout(self.load_timeout, task::spawn_blocking(move || source.load()))
            .await
            .context("load attempt timed out")?
            .context("load task panicked")?
            .context("load attempt failed")?;

        let version = self.store.publish(rows);
        debug!(tick, version, "refreshed snapshot");
        Ok(true)
    }

    /// Scheduler loop: consume one tick per `period`, starting immediately,
    /// forever. A failed tick is logged and skipped; the next tick proceeds
    /// on schedule — no backoff, no retry cap. Each consumed tick is
    /// broadcast on `ticks` so viewers learn that fresher data may exist.
    pub async fn run(self: Arc<Self>, period: Duration, ticks: watch::Sender<u64>) {
        let mut clock = interval(period);
        clock.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut tick = self.last_tick.load(Ordering::Acquire);
        loop {
            clock.tick().await;
            tick += 1;
            if let Err(err) = self.ensure_fresh(tick).await {
                warn!(tick, error = %err, "scheduled refresh failed; keeping last-good snapshot");
            }
            // Only fails when every receiver is gone, which is fine.
            let _ = ticks.send(tick);
        }
    }
}
