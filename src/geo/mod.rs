// src/geo/mod.rs

use anyhow::{Context, Result};
use reqwest::Client;
use serde_json::Value;
use std::{collections::HashSet, path::Path};
use tracing::{debug, info, warn};
use url::Url;

/// Property path identifying a feature, GeoJSON-style dotted notation.
pub const DEFAULT_FEATURE_KEY: &str = "properties.NAME_3";

/// The boundary geometry: a GeoJSON feature collection kept opaque for the
/// rendering collaborator, plus the set of feature names extracted via the
/// configured key path so join-misses can be diagnosed.
pub struct BoundaryLayer {
    collection: Value,
    feature_key: String,
    names: HashSet<String>,
}

impl BoundaryLayer {
    /// Wrap an already-parsed feature collection. Fails if the document has
    /// no `features` array; individual features without a name under the
    /// key path are skipped with a warning.
    pub fn from_value(collection: Value, feature_key: &str) -> Result<Self> {
        let features = collection
            .get("features")
            .and_then(Value::as_array)
            .context("boundary document has no `features` array")?;

        let pointer = format!("/{}", feature_key.replace('.', "/"));
        let mut names = HashSet::new();
        for feature in features {
            match feature.pointer(&pointer).and_then(Value::as_str) {
                Some(name) => {
                    names.insert(name.to_string());
                }
                None => warn!(feature_key, "feature without a name; skipping"),
            }
        }
        info!(features = names.len(), "boundary layer ready");

        Ok(BoundaryLayer {
            collection,
            feature_key: feature_key.to_string(),
            names,
        })
    }

    /// Fetch the collection from a remote URL (live mode).
    pub async fn fetch(client: &Client, url: &Url, feature_key: &str) -> Result<Self> {
        debug!(%url, "fetching boundary layer");
        let collection: Value = client
            .get(url.clone())
            .send()
            .await
            .with_context(|| format!("GET {} failed", url))?
            .error_for_status()
            .with_context(|| format!("non-success status from {}", url))?
            .json()
            .await
            .with_context(|| format!("parsing boundary JSON from {}", url))?;
        Self::from_value(collection, feature_key)
    }

    /// Read the collection from a local file (static/demo mode).
    pub fn from_file(path: impl AsRef<Path>, feature_key: &str) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read(path)
            .with_context(|| format!("reading boundary file {}", path.display()))?;
        let collection: Value = serde_json::from_slice(&raw)
            .with_context(|| format!("parsing boundary file {}", path.display()))?;
        Self::from_value(collection, feature_key)
    }

    /// The raw feature collection, handed through to the renderer as-is.
    pub fn collection(&self) -> &Value {
        &self.collection
    }

    pub fn feature_key(&self) -> &str {
        &self.feature_key
    }

    pub fn contains(&self, region: &str) -> bool {
        self.names.contains(region)
    }

    /// Regions present in the table but absent from the geometry. Not an
    /// error: such regions render as blank patches. Logged so the gap is
    /// at least visible in the logs.
    pub fn join_misses<'a, I>(&self, regions: I) -> Vec<&'a str>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let misses: Vec<&str> = regions
            .into_iter()
            .filter(|name| !self.names.contains(*name))
            .collect();
        if !misses.is_empty() {
            debug!(count = misses.len(), "regions without matching boundary feature");
        }
        misses
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_collection() -> Value {
        json!({
            "type": "FeatureCollection",
            "features": [
                { "type": "Feature", "properties": { "NAME_3": "Aachen" }, "geometry": null },
                { "type": "Feature", "properties": { "NAME_3": "München" }, "geometry": null },
                { "type": "Feature", "properties": { "OTHER": "x" }, "geometry": null }
            ]
        })
    }

    #[test]
    fn extracts_names_via_the_key_path() {
        let layer = BoundaryLayer::from_value(sample_collection(), DEFAULT_FEATURE_KEY)
            .expect("boundary layer");
        assert!(layer.contains("Aachen"));
        assert!(layer.contains("München"));
        assert!(!layer.contains("Berlin"));
    }

    #[test]
    fn document_without_features_is_an_error() {
        let err = BoundaryLayer::from_value(json!({"type": "FeatureCollection"}), "properties.NAME_3");
        assert!(err.is_err());
    }

    #[test]
    fn join_misses_lists_unmatched_regions_only() {
        let layer = BoundaryLayer::from_value(sample_collection(), DEFAULT_FEATURE_KEY)
            .expect("boundary layer");
        let misses = layer.join_misses(["Aachen", "Berlin", "München", "Erfurt"]);
        assert_eq!(misses, vec!["Berlin", "Erfurt"]);
    }

    #[test]
    fn keeps_the_collection_untouched_for_the_renderer() {
        let original = sample_collection();
        let layer =
            BoundaryLayer::from_value(original.clone(), DEFAULT_FEATURE_KEY).expect("layer");
        assert_eq!(layer.collection(), &original);
    }
}
