use super::read_json_array;
use crate::prelude::{PipelineResult, TimeWindow};
use crate::telemetry::log::LogManager;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::PathBuf;

/// One SuperMAG vector sample (nT).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MagnetometerSample {
    pub time: DateTime<Utc>,
    pub station: String,
    pub n: f64,
    pub e: f64,
    pub z: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MagnetometerDataset {
    pub samples: Vec<MagnetometerSample>,
}

impl MagnetometerDataset {
    pub fn stations(&self) -> Vec<String> {
        let stations: BTreeSet<&str> = self.samples.iter().map(|s| s.station.as_str()).collect();
        stations.into_iter().map(String::from).collect()
    }
}

pub trait MagnetometerSource {
    /// `stations` restricts the fetch; `None` keeps every station.
    fn fetch(&mut self, window: &TimeWindow, stations: Option<&[String]>) -> PipelineResult<MagnetometerDataset>;
}

/// SuperMAG export as a JSON array; a missing file yields an empty dataset.
pub struct FileMagnetometerSource {
    path: PathBuf,
    logger: LogManager,
}

impl FileMagnetometerSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            logger: LogManager::named("magnetometer-source"),
        }
    }
}

impl MagnetometerSource for FileMagnetometerSource {
    fn fetch(&mut self, window: &TimeWindow, stations: Option<&[String]>) -> PipelineResult<MagnetometerDataset> {
        if !self.path.exists() {
            self.logger
                .warn(&format!("no magnetometer export at {}", self.path.display()));
            return Ok(MagnetometerDataset::default());
        }
        let samples: Vec<MagnetometerSample> = read_json_array(&self.path)?;
        let samples: Vec<MagnetometerSample> = samples
            .into_iter()
            .filter(|s| window.contains(s.time))
            .filter(|s| stations.map_or(true, |keep| keep.iter().any(|k| k.eq_ignore_ascii_case(&s.station))))
            .collect();
        let dataset = MagnetometerDataset { samples };
        self.logger.record(&format!(
            "{} samples from {} stations",
            dataset.samples.len(),
            dataset.stations().len()
        ));
        Ok(dataset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use tempfile::tempdir;

    #[test]
    fn filters_by_window_and_station() {
        let t0 = Utc.with_ymd_and_hms(2021, 10, 28, 14, 0, 0).unwrap();
        let sample = |minute: i64, station: &str| MagnetometerSample {
            time: t0 + Duration::minutes(minute),
            station: station.into(),
            n: 1.0,
            e: 2.0,
            z: 3.0,
        };
        let dir = tempdir().unwrap();
        let path = dir.path().join("supermag.json");
        let all = vec![sample(0, "OTT"), sample(5, "FRD"), sample(120, "OTT")];
        std::fs::write(&path, serde_json::to_string(&all).unwrap()).unwrap();

        let window = TimeWindow::new(t0, t0 + Duration::hours(1)).unwrap();
        let mut source = FileMagnetometerSource::new(&path);
        let everything = source.fetch(&window, None).unwrap();
        assert_eq!(everything.stations(), vec!["FRD", "OTT"]);

        let keep = vec!["ott".to_string()];
        let only_ott = source.fetch(&window, Some(&keep)).unwrap();
        assert_eq!(only_ott.samples.len(), 1);
    }

    #[test]
    fn missing_export_is_empty() {
        let t0 = Utc.with_ymd_and_hms(2021, 10, 28, 14, 0, 0).unwrap();
        let window = TimeWindow::new(t0, t0).unwrap();
        let mut source = FileMagnetometerSource::new("/no/such/supermag.json");
        assert!(source.fetch(&window, None).unwrap().samples.is_empty());
    }
}
