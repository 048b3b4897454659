// src/view/mod.rs

use std::borrow::Cow;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::warn;

use crate::data::{Observation, Snapshot, ALL};
use crate::refresh::Refresher;

/// Parent-region filter as picked in the dropdown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    All,
    Parent(String),
}

impl Filter {
    /// Parse the dropdown value; the literal `"All"` is the sentinel for
    /// "no filter".
    pub fn from_value(value: &str) -> Filter {
        if value == ALL {
            Filter::All
        } else {
            Filter::Parent(value.to_string())
        }
    }
}

/// The sub-table to hand to the rendering collaborator.
///
/// Pure over one snapshot reference: `All` borrows the snapshot's rows
/// unchanged, a parent filter keeps exactly the matching rows in their
/// original order. A filter naming a parent absent from the snapshot
/// yields an empty table, not an error.
pub fn select<'a>(snapshot: &'a Snapshot, filter: &Filter) -> Cow<'a, [Observation]> {
    match filter {
        Filter::All => Cow::Borrowed(&snapshot.rows),
        Filter::Parent(parent) => Cow::Owned(
            snapshot
                .rows
                .iter()
                .filter(|o| &o.parent == parent)
                .cloned()
                .collect(),
        ),
    }
}

/// The single user-facing update path: every view request carries the
/// filter plus the last tick the client observed, and this handler decides
/// whether that implies a reload.
///
/// Tick unchanged (filter-only interaction): skip the reload, just
/// reselect. Tick advanced: route through the refresher's gate, which
/// loads at most once per tick no matter how many viewers and the
/// scheduler race for it. Load failures are contained here — the viewer
/// always gets a view over some valid snapshot.
pub struct ViewUpdater {
    refresher: Arc<Refresher>,
    /// Latest tick the scheduler has announced.
    ticks: watch::Receiver<u64>,
}

impl ViewUpdater {
    pub fn new(refresher: Arc<Refresher>, ticks: watch::Receiver<u64>) -> Self {
        ViewUpdater { refresher, ticks }
    }

    /// Resolve one interaction into the snapshot to render from. The
    /// snapshot reference is taken once; callers select and render from
    /// that one reference only.
    ///
    /// Ticks originate with the scheduler; interactions only echo them
    /// back. The observed tick is clamped to the latest announced one, so
    /// an inflated value (a forged or confused client) cannot consume
    /// ticks the scheduler has yet to reach and thereby starve every
    /// future scheduled refresh.
    pub async fn resolve(&self, tick: u64) -> Arc<Snapshot> {
        let tick = tick.min(*self.ticks.borrow());
        if let Err(err) = self.refresher.ensure_fresh(tick).await {
            warn!(tick, error = %err, "reload on tick failed; serving last-good snapshot");
        }
        self.refresher.store().current()
    }
}
