// src/load/mod.rs

use csv::ReaderBuilder;
use std::{collections::HashSet, fs::File, path::PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

use crate::data::Observation;

/// Errors during a load attempt. Both kinds are contained at the
/// loader/scheduler boundary: a failed attempt leaves the last-good
/// snapshot untouched.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("data source unavailable: {path}")]
    SourceUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed data source {path}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("duplicate region {region:?} on date {date:?} in {path}")]
    DuplicateRegion {
        path: PathBuf,
        date: String,
        region: String,
    },
}

/// How much of the table a load keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SliceMode {
    /// Keep every available date; the date axis becomes the animation
    /// dimension (static/demo mode).
    FullHistory,
    /// Keep only the most recent date with any non-zero value (live mode).
    LatestDate,
}

/// Seam between the refresher and the concrete source, so tests can count
/// or fail loads without touching the filesystem.
pub trait TableSource: Send + Sync + 'static {
    fn load(&self) -> Result<Vec<Observation>, LoadError>;
}

/// Reads the observation CSV and normalizes it into a row table.
///
/// Normalization: dates where every district still reports zero are treated
/// as "no data yet" and dropped entirely; `LatestDate` mode then narrows to
/// the last remaining date in file order (the feed appends days in order,
/// and the `DD-MM` labels do not sort lexicographically).
pub struct Loader {
    path: PathBuf,
    slice: SliceMode,
}

impl Loader {
    pub fn new(path: impl Into<PathBuf>, slice: SliceMode) -> Self {
        Loader {
            path: path.into(),
            slice,
        }
    }

    fn read_rows(&self) -> Result<Vec<Observation>, LoadError> {
        let file = File::open(&self.path).map_err(|source| LoadError::SourceUnavailable {
            path: self.path.clone(),
            source,
        })?;
        let mut reader = ReaderBuilder::new().trim(csv::Trim::All).from_reader(file);

        let mut rows = Vec::new();
        let mut seen = HashSet::new();
        for record in reader.deserialize::<Observation>() {
            let row = record.map_err(|source| LoadError::Malformed {
                path: self.path.clone(),
                source,
            })?;
            // Region names must be unique within a date or the map join
            // would silently pick one of the duplicates.
            if !seen.insert((row.date.clone(), row.region.clone())) {
                return Err(LoadError::DuplicateRegion {
                    path: self.path.clone(),
                    date: row.date,
                    region: row.region,
                });
            }
            rows.push(row);
        }
        Ok(rows)
    }
}

impl TableSource for Loader {
    fn load(&self) -> Result<Vec<Observation>, LoadError> {
        let rows = self.read_rows()?;

        // Dates where no district has reported yet carry only placeholder
        // zeroes; they are not "available" for rendering.
        let available: HashSet<&str> = rows
            .iter()
            .filter(|o| o.infected != 0)
            .map(|o| o.date.as_str())
            .collect();
        if available.is_empty() {
            warn!(path = %self.path.display(), "source has no non-zero rows yet");
        }

        let keep_dates: HashSet<String> = match self.slice {
            SliceMode::FullHistory => available.iter().map(|d| d.to_string()).collect(),
            SliceMode::LatestDate => rows
                .iter()
                .rev()
                .find(|o| available.contains(o.date.as_str()))
                .map(|o| o.date.clone())
                .into_iter()
                .collect(),
        };

        let kept: Vec<Observation> = rows
            .into_iter()
            .filter(|o| keep_dates.contains(o.date.as_str()))
            .collect();
        debug!(
            path = %self.path.display(),
            rows = kept.len(),
            dates = keep_dates.len(),
            "loaded table"
        );
        Ok(kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_csv(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("temp file");
        file.write_all(content.as_bytes()).expect("write csv");
        file.flush().expect("flush csv");
        file
    }

    const THREE_DAYS: &str = "\
date,Landkreis,Bundesland,infected
16-03,Aachen,NRW,0
16-03,München,Bayern,0
17-03,Aachen,NRW,12
17-03,München,Bayern,30
18-03,Aachen,NRW,19
18-03,München,Bayern,44
";

    #[test]
    fn full_history_drops_all_zero_dates() {
        let file = write_csv(THREE_DAYS);
        let loader = Loader::new(file.path(), SliceMode::FullHistory);
        let rows = loader.load().expect("load");
        assert_eq!(rows.len(), 4);
        assert!(rows.iter().all(|o| o.date != "16-03"));
    }

    #[test]
    fn latest_date_keeps_only_the_last_available_slice() {
        let file = write_csv(THREE_DAYS);
        let loader = Loader::new(file.path(), SliceMode::LatestDate);
        let rows = loader.load().expect("load");
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|o| o.date == "18-03"));
        assert_eq!(rows[0].region, "Aachen");
        assert_eq!(rows[1].region, "München");
    }

    #[test]
    fn a_zero_row_on_an_available_date_is_kept() {
        // 17-03 is available because München reported; Aachen's zero row on
        // that date is real data (zero cases), not a placeholder.
        let file = write_csv(
            "date,Landkreis,Bundesland,infected\n\
             17-03,Aachen,NRW,0\n\
             17-03,München,Bayern,30\n",
        );
        let loader = Loader::new(file.path(), SliceMode::FullHistory);
        let rows = loader.load().expect("load");
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn missing_file_is_source_unavailable() {
        let loader = Loader::new("/nonexistent/data.csv", SliceMode::FullHistory);
        match loader.load() {
            Err(LoadError::SourceUnavailable { path, .. }) => {
                assert_eq!(path, PathBuf::from("/nonexistent/data.csv"));
            }
            other => panic!("expected SourceUnavailable, got {:?}", other.map(|r| r.len())),
        }
    }

    #[test]
    fn unparseable_value_is_malformed() {
        let file = write_csv(
            "date,Landkreis,Bundesland,infected\n\
             17-03,Aachen,NRW,not-a-number\n",
        );
        let loader = Loader::new(file.path(), SliceMode::FullHistory);
        assert!(matches!(loader.load(), Err(LoadError::Malformed { .. })));
    }

    #[test]
    fn negative_value_is_malformed() {
        let file = write_csv(
            "date,Landkreis,Bundesland,infected\n\
             17-03,Aachen,NRW,-3\n",
        );
        let loader = Loader::new(file.path(), SliceMode::FullHistory);
        assert!(matches!(loader.load(), Err(LoadError::Malformed { .. })));
    }

    #[test]
    fn duplicate_region_within_a_date_is_rejected() {
        let file = write_csv(
            "date,Landkreis,Bundesland,infected\n\
             17-03,Aachen,NRW,3\n\
             17-03,Aachen,NRW,5\n",
        );
        let loader = Loader::new(file.path(), SliceMode::FullHistory);
        match loader.load() {
            Err(LoadError::DuplicateRegion { date, region, .. }) => {
                assert_eq!(date, "17-03");
                assert_eq!(region, "Aachen");
            }
            other => panic!("expected DuplicateRegion, got {:?}", other.map(|r| r.len())),
        }
    }

    #[test]
    fn same_region_on_different_dates_is_fine() {
        let file = write_csv(THREE_DAYS);
        let loader = Loader::new(file.path(), SliceMode::FullHistory);
        assert!(loader.load().is_ok());
    }
}
