// src/config.rs

use anyhow::{Context, Result};
use std::{env, net::SocketAddr, path::PathBuf, time::Duration};
use url::Url;

use crate::geo::DEFAULT_FEATURE_KEY;

/// Default district boundary feed (GeoJSON, one feature per Landkreis).
pub const DEFAULT_BOUNDARY_URL: &str =
    "https://raw.githubusercontent.com/isellsoap/deutschlandGeoJSON/master/4_kreise/4_niedrig.geojson";

/// Runtime configuration, environment-driven with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Observation CSV path (`KREISMAP_DATA`).
    pub data_path: PathBuf,
    /// Remote boundary feed for live mode (`KREISMAP_BOUNDARY_URL`).
    pub boundary_url: Url,
    /// Local boundary file for static mode (`KREISMAP_BOUNDARY_FILE`).
    pub boundary_file: PathBuf,
    /// Property path naming a feature (`KREISMAP_FEATURE_KEY`).
    pub feature_key: String,
    /// Background refresh period (`KREISMAP_REFRESH_SECS`).
    pub refresh_period: Duration,
    /// Upper bound on one load attempt (`KREISMAP_LOAD_TIMEOUT_SECS`).
    pub load_timeout: Duration,
    /// Listen address (`KREISMAP_BIND`).
    pub bind: SocketAddr,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let data_path = PathBuf::from(var_or("KREISMAP_DATA", "data.csv"));
        let boundary_url = Url::parse(&var_or("KREISMAP_BOUNDARY_URL", DEFAULT_BOUNDARY_URL))
            .context("parsing KREISMAP_BOUNDARY_URL")?;
        let boundary_file = PathBuf::from(var_or("KREISMAP_BOUNDARY_FILE", "counties.json"));
        let feature_key = var_or("KREISMAP_FEATURE_KEY", DEFAULT_FEATURE_KEY);
        let refresh_period = Duration::from_secs(
            var_or("KREISMAP_REFRESH_SECS", "10")
                .parse()
                .context("parsing KREISMAP_REFRESH_SECS")?,
        );
        let load_timeout = Duration::from_secs(
            var_or("KREISMAP_LOAD_TIMEOUT_SECS", "30")
                .parse()
                .context("parsing KREISMAP_LOAD_TIMEOUT_SECS")?,
        );
        let bind = var_or("KREISMAP_BIND", "0.0.0.0:8080")
            .parse()
            .context("parsing KREISMAP_BIND")?;

        Ok(Config {
            data_path,
            boundary_url,
            boundary_file,
            feature_key,
            refresh_period,
            load_timeout,
            bind,
        })
    }
}

fn var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}
