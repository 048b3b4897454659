use anyhow::{Context, Result};
use kreismap::{
    config::Config,
    geo::BoundaryLayer,
    load::{Loader, SliceMode, TableSource},
    render::FigureSpec,
    serve::{self, AppState},
    snapshot::SnapshotStore,
};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

/// Static demo map: one load at startup, full history with the date axis
/// animated, no background refresh.
#[tokio::main]
async fn main() -> Result<()> {
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder().with_env_filter(env).init();
    info!("startup (static mode)");

    let cfg = Config::from_env()?;

    let boundary = Arc::new(
        BoundaryLayer::from_file(&cfg.boundary_file, &cfg.feature_key)
            .context("loading boundary file")?,
    );

    let loader = Loader::new(&cfg.data_path, SliceMode::FullHistory);
    let rows = loader
        .load()
        .with_context(|| format!("loading {}", cfg.data_path.display()))?;
    let store = Arc::new(SnapshotStore::new());
    store.publish(rows);

    let snapshot = store.current();
    info!(rows = snapshot.rows.len(), dates = snapshot.dates().len(), "snapshot ready");
    let misses = boundary.join_misses(snapshot.rows.iter().map(|o| o.region.as_str()));
    if !misses.is_empty() {
        warn!(count = misses.len(), "regions will render blank (no boundary match)");
    }

    // No scheduler in this mode; the tick never advances.
    let (_tick_tx, tick_rx) = watch::channel(0u64);
    let state = Arc::new(AppState {
        store,
        updater: None,
        ticks: tick_rx,
        boundary,
        figure_spec: FigureSpec::animated(),
        poll_ms: None,
    });
    info!(bind = %cfg.bind, "listening");
    serve::run(state, cfg.bind).await;

    Ok(())
}
