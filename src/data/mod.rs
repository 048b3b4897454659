// src/data/mod.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The dropdown sentinel meaning "no parent-region filter".
pub const ALL: &str = "All";

/// One reported case count: a district on one report date.
///
/// The CSV feed uses German column names (`Landkreis` = district,
/// `Bundesland` = state); serde renames keep the on-disk schema intact
/// while the code uses neutral names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// Report date label, e.g. "17-03". A short label, not a calendar date;
    /// the feed appends days in order, so file order is chronological.
    pub date: String,
    /// District name, the join key against the boundary layer.
    #[serde(rename = "Landkreis")]
    pub region: String,
    /// State containing the district, the filter granularity.
    #[serde(rename = "Bundesland")]
    pub parent: String,
    /// Reported case count. Zero means "no data yet" for that date.
    pub infected: u64,
}

impl Observation {
    /// Log-scaled color value, `ln(infected + 1)`, as plotted by the map.
    pub fn log_scale(&self) -> f64 {
        ((self.infected + 1) as f64).ln()
    }
}

/// An immutable, fully-formed table: "the data as of the last successful
/// load". Readers always see a whole snapshot or none of it; the catalog is
/// derived from the same rows it is published with, so the two can never
/// disagree.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    /// Monotonic version assigned by the store at publish time. Version 0 is
    /// the pre-publish placeholder and never leaves the store.
    pub version: u64,
    pub loaded_at: DateTime<Utc>,
    pub rows: Vec<Observation>,
    /// Dropdown options: the `"All"` sentinel followed by the distinct
    /// parent regions in first-appearance order.
    pub catalog: Vec<String>,
}

impl Snapshot {
    pub fn new(rows: Vec<Observation>) -> Self {
        let catalog = derive_catalog(&rows);
        Snapshot {
            version: 0,
            loaded_at: Utc::now(),
            rows,
            catalog,
        }
    }

    /// Empty placeholder used before the first publish.
    pub fn empty() -> Self {
        Snapshot::new(Vec::new())
    }

    /// Distinct date labels in row order.
    pub fn dates(&self) -> Vec<&str> {
        let mut seen = std::collections::HashSet::new();
        self.rows
            .iter()
            .filter(|o| seen.insert(o.date.as_str()))
            .map(|o| o.date.as_str())
            .collect()
    }
}

/// Build the dropdown catalog for a set of rows: `"All"` first, then each
/// distinct parent region in the order it first appears.
pub fn derive_catalog(rows: &[Observation]) -> Vec<String> {
    let mut catalog = vec![ALL.to_string()];
    let mut seen = std::collections::HashSet::new();
    for row in rows {
        if seen.insert(row.parent.as_str()) {
            catalog.push(row.parent.clone());
        }
    }
    catalog
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obs(date: &str, region: &str, parent: &str, infected: u64) -> Observation {
        Observation {
            date: date.to_string(),
            region: region.to_string(),
            parent: parent.to_string(),
            infected,
        }
    }

    #[test]
    fn catalog_has_all_sentinel_first_and_no_duplicates() {
        let rows = vec![
            obs("17-03", "Aachen", "NRW", 5),
            obs("17-03", "Köln", "NRW", 9),
            obs("17-03", "München", "Bayern", 12),
            obs("18-03", "Aachen", "NRW", 7),
        ];
        assert_eq!(derive_catalog(&rows), vec!["All", "NRW", "Bayern"]);
    }

    #[test]
    fn catalog_of_empty_table_is_just_the_sentinel() {
        assert_eq!(derive_catalog(&[]), vec!["All"]);
    }

    #[test]
    fn dates_are_distinct_and_source_ordered() {
        let snap = Snapshot::new(vec![
            obs("17-03", "A", "P", 1),
            obs("17-03", "B", "P", 2),
            obs("18-03", "A", "P", 3),
        ]);
        assert_eq!(snap.dates(), vec!["17-03", "18-03"]);
    }

    #[test]
    fn log_scale_is_ln_of_count_plus_one() {
        let row = obs("17-03", "A", "P", 0);
        assert_eq!(row.log_scale(), 0.0);
        let row = obs("17-03", "A", "P", 9);
        assert!((row.log_scale() - 10f64.ln()).abs() < 1e-12);
    }
}
