pub mod doppler;
pub mod smoothing;

pub use doppler::DopplerStage;
pub use smoothing::SmoothingStage;

use crate::prelude::{PipelineResult, ProcessingStage, SeriesSample, StageConfig, StageInput};

/// Runs the raw carrier series through Doppler conversion and smoothing.
pub fn filter_series(config: &StageConfig, raw: Vec<SeriesSample>) -> PipelineResult<Vec<SeriesSample>> {
    let mut doppler = DopplerStage::new();
    doppler.initialize(config)?;
    let doppler_output = doppler.execute(StageInput { samples: raw })?;
    doppler.cleanup();

    let mut smoothing = SmoothingStage::new();
    smoothing.initialize(config)?;
    let smoothed = smoothing.execute(StageInput {
        samples: doppler_output.samples,
    })?;
    smoothing.cleanup();

    Ok(smoothed.samples)
}
