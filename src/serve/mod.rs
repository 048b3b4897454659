// src/serve/mod.rs

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{net::SocketAddr, sync::Arc};
use tokio::sync::watch;
use warp::{reject::Rejection, reply::Reply, Filter};

use crate::data::ALL;
use crate::geo::BoundaryLayer;
use crate::render::{self, FigureSpec};
use crate::snapshot::SnapshotStore;
use crate::view::{self, Filter as RegionFilter, ViewUpdater};

/// Everything a request handler needs, shared across all viewers.
pub struct AppState {
    pub store: Arc<SnapshotStore>,
    /// Present in live mode; `None` means the dataset was loaded once at
    /// startup and never refreshes.
    pub updater: Option<ViewUpdater>,
    /// Latest tick consumed by the scheduler; echoed to clients so their
    /// next poll carries it.
    pub ticks: watch::Receiver<u64>,
    pub boundary: Arc<BoundaryLayer>,
    pub figure_spec: FigureSpec,
    /// Client poll period in milliseconds; `None` disables polling.
    pub poll_ms: Option<u64>,
}

#[derive(Deserialize)]
struct FigureQuery {
    bundesland: Option<String>,
    tick: Option<u64>,
}

#[derive(Serialize)]
struct FigureResponse {
    version: u64,
    tick: u64,
    figure: Value,
}

async fn figure_handler(query: FigureQuery, state: Arc<AppState>) -> Result<impl Reply, Rejection> {
    let filter = RegionFilter::from_value(query.bundesland.as_deref().unwrap_or(ALL));

    // One snapshot reference for the whole request; selection and figure
    // assembly never re-fetch it.
    let snapshot = match &state.updater {
        Some(updater) => updater.resolve(query.tick.unwrap_or(0)).await,
        None => state.store.current(),
    };
    let table = view::select(&snapshot, &filter);
    let figure = render::choropleth(&table, &state.boundary, &state.figure_spec);

    Ok(warp::reply::json(&FigureResponse {
        version: snapshot.version,
        tick: *state.ticks.borrow(),
        figure,
    }))
}

async fn catalog_handler(state: Arc<AppState>) -> Result<impl Reply, Rejection> {
    Ok(warp::reply::json(&state.store.current().catalog))
}

async fn health_handler() -> Result<impl Reply, Rejection> {
    Ok(warp::reply::json(&serde_json::json!({
        "status": "healthy",
        "service": "kreismap"
    })))
}

async fn page_handler(state: Arc<AppState>) -> Result<impl Reply, Rejection> {
    Ok(warp::reply::html(page(&state)))
}

/// Minimal HTML escaping for values interpolated into the page; region
/// names come from the CSV and are not trusted markup.
fn escape_html(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn page(state: &AppState) -> String {
    let snapshot = state.store.current();
    let options: String = snapshot
        .catalog
        .iter()
        .map(|land| {
            let land = escape_html(land);
            format!(r#"<option value="{land}">{land}</option>"#)
        })
        .collect();
    let poll = match state.poll_ms {
        Some(ms) => format!("setInterval(refresh, {ms});"),
        None => String::new(),
    };
    let tick = *state.ticks.borrow();

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>Reported Covid-19 cases in Germany by district</title>
<script src="https://cdn.plot.ly/plotly-2.35.2.min.js"></script>
</head>
<body>
<h1>Visualization of reported Covid-19 cases in Germany by Districts</h1>
<a href="https://www.rki.de/DE/Content/InfAZ/N/Neuartiges_Coronavirus/Situationsberichte/Gesamt.html"
   target="_blank">Data taken from the RKI page</a>
<div>
  <label for="select-bundesland" title="Select the county to zoom in">Bundesland</label>
  <select id="select-bundesland">{options}</select>
</div>
<div id="infected-graph"></div>
<script>
let tick = {tick};
async function refresh() {{
  const land = document.getElementById('select-bundesland').value;
  const resp = await fetch(`/figure?bundesland=${{encodeURIComponent(land)}}&tick=${{tick}}`);
  const body = await resp.json();
  tick = body.tick;
  await Plotly.react('infected-graph', body.figure.data, body.figure.layout);
  if (body.figure.frames) {{
    await Plotly.addFrames('infected-graph', body.figure.frames);
  }}
}}
document.getElementById('select-bundesland').addEventListener('change', refresh);
{poll}
refresh();
</script>
</body>
</html>
"#
    )
}

fn routes(
    state: Arc<AppState>,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let with_state = warp::any().map(move || Arc::clone(&state));

    let page = warp::path::end()
        .and(warp::get())
        .and(with_state.clone())
        .and_then(page_handler);
    let figure = warp::path("figure")
        .and(warp::path::end())
        .and(warp::get())
        .and(warp::query::<FigureQuery>())
        .and(with_state.clone())
        .and_then(figure_handler);
    let catalog = warp::path("catalog")
        .and(warp::path::end())
        .and(warp::get())
        .and(with_state)
        .and_then(catalog_handler);
    let health = warp::path("healthz")
        .and(warp::path::end())
        .and(warp::get())
        .and_then(health_handler);

    page.or(figure).or(catalog).or(health)
}

pub async fn run(state: Arc<AppState>, bind: SocketAddr) {
    warp::serve(routes(state)).run(bind).await;
}
