//! Per-event bundle assembly and persistence.
//!
//! A bundle lands at `<stage_root>/<YYYY-MM-DD-HH-MM>/stage0.json`, keyed by
//! the event peak truncated to the minute. Staging the same event again
//! replaces the earlier bundle.

use crate::hamsci::{NodeDataset, NodeMetadata, ResponseParameters};
use crate::prelude::{Event, PipelineError, PipelineResult};
use crate::sources::{FlareSummary, StagedRadar};
use crate::telemetry::log::LogManager;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

pub const BUNDLE_FILE: &str = "stage0.json";

/// Response parameters merged with the station metadata of one node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HamsciRecord {
    #[serde(flatten)]
    pub metadata: NodeMetadata,
    pub frequency_hz: f64,
    pub sample_count: usize,
    #[serde(flatten)]
    pub parameters: ResponseParameters,
}

impl HamsciRecord {
    /// `None` for datasets that never went through extraction.
    pub fn from_dataset(dataset: &NodeDataset) -> Option<Self> {
        let parameters = *dataset.response_parameters()?;
        Some(Self {
            metadata: dataset.metadata.clone(),
            frequency_hz: dataset.frequency_hz,
            sample_count: dataset.len(),
            parameters,
        })
    }
}

/// Flare summary with the event's rise and fall times in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlareTable {
    #[serde(flatten)]
    pub summary: FlareSummary,
    pub rise_time: f64,
    pub fall_time: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StagedBundle {
    pub radar: Vec<StagedRadar>,
    pub hamsci: Vec<HamsciRecord>,
    pub flare: FlareTable,
}

pub struct EventStager {
    stage_root: PathBuf,
    logger: LogManager,
}

impl EventStager {
    pub fn new(stage_root: impl Into<PathBuf>) -> Self {
        Self {
            stage_root: stage_root.into(),
            logger: LogManager::named("event-stager"),
        }
    }

    pub fn bundle_path(&self, event: &Event) -> PathBuf {
        self.stage_root.join(event.key()).join(BUNDLE_FILE)
    }

    pub fn stage(
        &self,
        event: &Event,
        radar: Vec<StagedRadar>,
        hamsci: Vec<HamsciRecord>,
        flare: FlareSummary,
    ) -> PipelineResult<StagedBundle> {
        let bundle = StagedBundle {
            radar,
            hamsci,
            flare: FlareTable {
                summary: flare,
                rise_time: event.rise_time_secs(),
                fall_time: event.fall_time_secs(),
            },
        };

        let path = self.bundle_path(event);
        let dir = path
            .parent()
            .ok_or_else(|| PipelineError::Internal(format!("bundle path {} has no parent", path.display())))?;
        fs::create_dir_all(dir).map_err(|e| PipelineError::io(dir, e))?;

        let body = serde_json::to_vec_pretty(&bundle)?;
        let mut staging = NamedTempFile::new_in(dir).map_err(|e| PipelineError::io(dir, e))?;
        staging
            .write_all(&body)
            .map_err(|e| PipelineError::io(staging.path(), e))?;
        staging
            .persist(&path)
            .map_err(|e| PipelineError::io(&path, e.error))?;

        self.logger.record(&format!(
            "file: {} ({} radars, {} nodes)",
            path.display(),
            bundle.radar.len(),
            bundle.hamsci.len()
        ));
        Ok(bundle)
    }

    pub fn load(path: &Path) -> PipelineResult<StagedBundle> {
        let contents = fs::read_to_string(path).map_err(|e| PipelineError::io(path, e))?;
        Ok(serde_json::from_str(&contents)?)
    }
}
