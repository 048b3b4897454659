// src/render/mod.rs
//
// Builds the figure document the browser-side renderer draws. The document
// is Plotly-shaped JSON; this module only guarantees the renderer receives
// a well-formed table drawn from a single snapshot — everything visual
// beyond that is the renderer's business.

use serde_json::{json, Value};

use crate::data::Observation;
use crate::geo::BoundaryLayer;

/// Presentation knobs that differ between the two modes.
pub struct FigureSpec {
    pub height: u32,
    /// Animate over the date axis (static/demo mode).
    pub animate: bool,
    /// Overlay district names on the map (live mode).
    pub labels: bool,
}

impl FigureSpec {
    /// Full-history figure with the date axis as animation frames.
    pub fn animated() -> Self {
        FigureSpec {
            height: 800,
            animate: true,
            labels: false,
        }
    }

    /// Single-date live figure with district labels.
    pub fn live() -> Self {
        FigureSpec {
            height: 1000,
            animate: false,
            labels: true,
        }
    }
}

fn choropleth_trace(rows: &[&Observation], boundary: &BoundaryLayer) -> Value {
    json!({
        "type": "choropleth",
        "geojson": boundary.collection(),
        "featureidkey": boundary.feature_key(),
        "locations": rows.iter().map(|o| o.region.as_str()).collect::<Vec<_>>(),
        "z": rows.iter().map(|o| o.log_scale()).collect::<Vec<_>>(),
        "text": rows.iter().map(|o| o.infected).collect::<Vec<_>>(),
        "hovertemplate": "%{location}<br>infected: %{text}<extra></extra>",
        "colorscale": "Oranges",
    })
}

fn label_trace(rows: &[&Observation], boundary: &BoundaryLayer) -> Value {
    json!({
        "type": "scattergeo",
        "geojson": boundary.collection(),
        "featureidkey": boundary.feature_key(),
        "locations": rows.iter().map(|o| o.region.as_str()).collect::<Vec<_>>(),
        "text": rows.iter().map(|o| o.region.as_str()).collect::<Vec<_>>(),
        "mode": "text",
        "textfont": { "family": "sans serif", "size": 12, "color": "Black" },
    })
}

/// Assemble the figure for one selected sub-table. With `animate` set the
/// rows are grouped per date into frames (the base trace shows the first
/// date); otherwise all rows land in one trace.
pub fn choropleth(rows: &[Observation], boundary: &BoundaryLayer, spec: &FigureSpec) -> Value {
    let layout = json!({
        "height": spec.height,
        "margin": { "r": 0, "t": 0, "l": 0, "b": 0 },
        "geo": {
            "fitbounds": "locations",
            "visible": false,
            "projection": { "type": "mercator" },
        },
    });

    if !spec.animate {
        let all: Vec<&Observation> = rows.iter().collect();
        let mut data = vec![choropleth_trace(&all, boundary)];
        if spec.labels {
            data.push(label_trace(&all, boundary));
        }
        return json!({ "data": data, "layout": layout });
    }

    // Group per date, preserving first-appearance order.
    let mut dates: Vec<&str> = Vec::new();
    for row in rows {
        if !dates.contains(&row.date.as_str()) {
            dates.push(&row.date);
        }
    }
    let per_date: Vec<Vec<&Observation>> = dates
        .iter()
        .map(|d| rows.iter().filter(|o| o.date == *d).collect())
        .collect();

    let base = per_date.first().cloned().unwrap_or_default();
    let frames: Vec<Value> = dates
        .iter()
        .zip(&per_date)
        .map(|(date, day_rows)| {
            json!({ "name": date, "data": [choropleth_trace(day_rows, boundary)] })
        })
        .collect();
    let steps: Vec<Value> = dates
        .iter()
        .map(|date| {
            json!({
                "label": date,
                "method": "animate",
                "args": [[date], { "mode": "immediate" }],
            })
        })
        .collect();

    let mut layout = layout;
    layout["sliders"] = json!([{ "steps": steps }]);

    json!({
        "data": [choropleth_trace(&base, boundary)],
        "layout": layout,
        "frames": frames,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn boundary() -> BoundaryLayer {
        BoundaryLayer::from_value(
            json!({
                "type": "FeatureCollection",
                "features": [
                    { "type": "Feature", "properties": { "NAME_3": "Aachen" }, "geometry": null },
                    { "type": "Feature", "properties": { "NAME_3": "Köln" }, "geometry": null }
                ]
            }),
            crate::geo::DEFAULT_FEATURE_KEY,
        )
        .expect("boundary")
    }

    fn obs(date: &str, region: &str, infected: u64) -> Observation {
        Observation {
            date: date.to_string(),
            region: region.to_string(),
            parent: "NRW".to_string(),
            infected,
        }
    }

    #[test]
    fn live_figure_has_one_location_per_row_and_a_label_overlay() {
        let rows = vec![obs("17-03", "Aachen", 9), obs("17-03", "Köln", 3)];
        let fig = choropleth(&rows, &boundary(), &FigureSpec::live());

        let data = fig["data"].as_array().expect("data");
        assert_eq!(data.len(), 2);
        assert_eq!(data[0]["locations"], json!(["Aachen", "Köln"]));
        assert_eq!(data[1]["mode"], json!("text"));

        let z = data[0]["z"].as_array().expect("z");
        assert!((z[0].as_f64().unwrap() - 10f64.ln()).abs() < 1e-12);
        assert_eq!(fig.get("frames"), None);
    }

    #[test]
    fn animated_figure_has_one_frame_per_date() {
        let rows = vec![
            obs("17-03", "Aachen", 1),
            obs("17-03", "Köln", 2),
            obs("18-03", "Aachen", 3),
            obs("18-03", "Köln", 4),
        ];
        let fig = choropleth(&rows, &boundary(), &FigureSpec::animated());

        let frames = fig["frames"].as_array().expect("frames");
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0]["name"], json!("17-03"));
        assert_eq!(frames[1]["name"], json!("18-03"));
        // Base trace shows the first date only.
        assert_eq!(fig["data"][0]["locations"], json!(["Aachen", "Köln"]));
        assert_eq!(fig["layout"]["sliders"][0]["steps"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn empty_table_still_renders_without_panicking() {
        let fig = choropleth(&[], &boundary(), &FigureSpec::live());
        assert_eq!(fig["data"][0]["locations"], json!([]));
        let fig = choropleth(&[], &boundary(), &FigureSpec::animated());
        assert_eq!(fig["data"][0]["locations"], json!([]));
    }
}
