use super::read_json_array;
use crate::prelude::{PipelineResult, TimeWindow};
use crate::telemetry::log::LogManager;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::PathBuf;

/// One SuperDARN fitted range-gate record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RadarRecord {
    pub time: DateTime<Utc>,
    pub beam: u32,
    pub gate: u32,
    pub velocity: f64,
    pub power: f64,
    pub spectral_width: f64,
    #[serde(default)]
    pub ground_scatter: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RadarDataset {
    pub radar: String,
    pub records: Vec<RadarRecord>,
}

/// Per-radar records restricted to the event window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StagedRadar {
    pub radar: String,
    pub beams: Vec<u32>,
    pub record_count: usize,
    pub records: Vec<RadarRecord>,
}

impl RadarDataset {
    pub fn empty(radar: impl Into<String>) -> Self {
        Self {
            radar: radar.into(),
            records: Vec::new(),
        }
    }

    pub fn stage(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> StagedRadar {
        let records: Vec<RadarRecord> = self
            .records
            .iter()
            .filter(|r| r.time >= start && r.time <= end)
            .cloned()
            .collect();
        let beams: BTreeSet<u32> = records.iter().map(|r| r.beam).collect();
        StagedRadar {
            radar: self.radar.clone(),
            beams: beams.into_iter().collect(),
            record_count: records.len(),
            records,
        }
    }
}

pub trait RadarSource {
    fn fetch(&mut self, radar: &str, window: &TimeWindow) -> PipelineResult<RadarDataset>;
}

/// Reads `<dir>/<radar>.json`; a radar without a file contributes no records.
pub struct DirectoryRadarSource {
    dir: PathBuf,
    logger: LogManager,
}

impl DirectoryRadarSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            logger: LogManager::named("radar-source"),
        }
    }
}

impl RadarSource for DirectoryRadarSource {
    fn fetch(&mut self, radar: &str, window: &TimeWindow) -> PipelineResult<RadarDataset> {
        let path = self.dir.join(format!("{}.json", radar));
        if !path.exists() {
            self.logger
                .warn(&format!("no records for radar {} at {}", radar, path.display()));
            return Ok(RadarDataset::empty(radar));
        }
        let records: Vec<RadarRecord> = read_json_array(&path)?;
        let records: Vec<RadarRecord> = records.into_iter().filter(|r| window.contains(r.time)).collect();
        self.logger
            .record(&format!("radar {}: {} records", radar, records.len()));
        Ok(RadarDataset {
            radar: radar.to_string(),
            records,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use tempfile::tempdir;

    fn record(minute: i64, beam: u32) -> RadarRecord {
        RadarRecord {
            time: Utc.with_ymd_and_hms(2021, 10, 28, 14, 0, 0).unwrap() + Duration::minutes(minute),
            beam,
            gate: 20,
            velocity: -35.0,
            power: 12.0,
            spectral_width: 40.0,
            ground_scatter: false,
        }
    }

    #[test]
    fn staging_keeps_event_window_and_beams() {
        let dataset = RadarDataset {
            radar: "fhe".into(),
            records: vec![record(-5, 7), record(0, 7), record(10, 3), record(25, 1)],
        };
        let start = Utc.with_ymd_and_hms(2021, 10, 28, 14, 0, 0).unwrap();
        let staged = dataset.stage(start, start + Duration::minutes(20));
        assert_eq!(staged.record_count, 2);
        assert_eq!(staged.beams, vec![3, 7]);
    }

    #[test]
    fn missing_radar_file_is_empty() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join("bks.json"),
            serde_json::to_string(&vec![record(1, 0), record(90, 0)]).unwrap(),
        )
        .unwrap();
        let start = Utc.with_ymd_and_hms(2021, 10, 28, 14, 0, 0).unwrap();
        let window = TimeWindow::new(start, start + Duration::hours(1)).unwrap();

        let mut source = DirectoryRadarSource::new(dir.path());
        assert_eq!(source.fetch("bks", &window).unwrap().records.len(), 1);
        assert!(source.fetch("fhw", &window).unwrap().records.is_empty());
    }
}
