use anyhow::{Context, Result};
use kreismap::{
    config::Config,
    geo::BoundaryLayer,
    load::{Loader, SliceMode},
    refresh::Refresher,
    render::FigureSpec,
    serve::{self, AppState},
    snapshot::SnapshotStore,
    view::ViewUpdater,
};
use reqwest::Client;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

/// Live dashboard: periodic background refresh of the latest date slice,
/// served with a parent-region dropdown.
#[tokio::main]
async fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder().with_env_filter(env).init();
    info!("startup");

    std::panic::set_hook(Box::new(|info| {
        eprintln!("panic: {:?}", info);
    }));

    let cfg = Config::from_env()?;

    // ─── 2) boundary layer ───────────────────────────────────────────
    let client = Client::builder()
        .timeout(cfg.load_timeout)
        .build()
        .context("building http client")?;
    let boundary = Arc::new(
        BoundaryLayer::fetch(&client, &cfg.boundary_url, &cfg.feature_key)
            .await
            .context("fetching boundary layer")?,
    );

    // ─── 3) initial load (fail-fast: no serving without a snapshot) ──
    let store = Arc::new(SnapshotStore::new());
    let loader = Loader::new(&cfg.data_path, SliceMode::LatestDate);
    let refresher = Arc::new(Refresher::new(
        Arc::new(loader),
        Arc::clone(&store),
        cfg.load_timeout,
    ));
    refresher
        .ensure_fresh(1)
        .await
        .with_context(|| format!("initial load from {}", cfg.data_path.display()))?;

    let snapshot = store.current();
    info!(rows = snapshot.rows.len(), "initial snapshot ready");
    let misses = boundary.join_misses(snapshot.rows.iter().map(|o| o.region.as_str()));
    if !misses.is_empty() {
        warn!(count = misses.len(), "regions will render blank (no boundary match)");
    }

    // ─── 4) background scheduler ─────────────────────────────────────
    let (tick_tx, tick_rx) = watch::channel(1u64);
    tokio::spawn(Arc::clone(&refresher).run(cfg.refresh_period, tick_tx));
    info!(period = ?cfg.refresh_period, "scheduler running");

    // ─── 5) serve ────────────────────────────────────────────────────
    let state = Arc::new(AppState {
        store,
        updater: Some(ViewUpdater::new(refresher, tick_rx.clone())),
        ticks: tick_rx,
        boundary,
        figure_spec: FigureSpec::live(),
        poll_ms: Some(30_000),
    });
    info!(bind = %cfg.bind, "listening");
    serve::run(state, cfg.bind).await;

    Ok(())
}
