//! Contracts for the companion instruments fetched alongside HamSci.
//!
//! Each source is opaque to the pipeline; the file-backed implementations
//! read JSON arrays exported by the upstream fetchers.

pub mod flare;
pub mod magnetometer;
pub mod radar;

pub use flare::{FileFlareSource, FlareSample, FlareSeries, FlareSource, FlareSummary};
pub use magnetometer::{FileMagnetometerSource, MagnetometerDataset, MagnetometerSample, MagnetometerSource};
pub use radar::{DirectoryRadarSource, RadarDataset, RadarRecord, RadarSource, StagedRadar};

use crate::prelude::{PipelineError, PipelineResult};
use serde::de::DeserializeOwned;
use std::fs;
use std::path::Path;

pub(crate) fn read_json_array<T: DeserializeOwned>(path: &Path) -> PipelineResult<Vec<T>> {
    let contents = fs::read_to_string(path).map_err(|e| PipelineError::io(path, e))?;
    serde_json::from_str(&contents)
        .map_err(|e| PipelineError::Source(format!("{}: {}", path.display(), e)))
}
