use crate::math::stats::StatsHelper;
use crate::prelude::{
    PipelineError, PipelineResult, ProcessingStage, SeriesSample, StageConfig, StageInput,
    StageMetadata, StageOutput,
};
use crate::telemetry::log::LogManager;

/// Converts measured carrier frequency into Doppler offset from the nominal beacon.
pub struct DopplerStage {
    config: Option<StageConfig>,
    logger: LogManager,
}

impl DopplerStage {
    pub fn new() -> Self {
        Self {
            config: None,
            logger: LogManager::named("doppler-stage"),
        }
    }
}

impl Default for DopplerStage {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessingStage for DopplerStage {
    fn initialize(&mut self, config: &StageConfig) -> PipelineResult<()> {
        if !config.nominal_frequency_hz.is_finite() || config.nominal_frequency_hz <= 0.0 {
            return Err(PipelineError::InvalidInput(format!(
                "nominal frequency must be positive, got {}",
                config.nominal_frequency_hz
            )));
        }
        self.config = Some(config.clone());
        Ok(())
    }

    fn execute(&mut self, input: StageInput) -> PipelineResult<StageOutput> {
        let config = self
            .config
            .as_ref()
            .ok_or_else(|| PipelineError::Internal("stage not initialized".into()))?;

        let samples: Vec<SeriesSample> = input
            .samples
            .iter()
            .filter(|s| s.value.is_finite())
            .map(|s| SeriesSample::new(s.utc, s.value - config.nominal_frequency_hz))
            .collect();
        let dropped = input.samples.len() - samples.len();

        let values: Vec<f64> = samples.iter().map(|s| s.value).collect();
        let mean = StatsHelper::mean(&values);
        self.logger.debug(&format!(
            "doppler mean {:.4} Hz over {} samples",
            mean,
            samples.len()
        ));

        let mut notes = vec![format!("doppler mean {:.4} Hz", mean)];
        if dropped > 0 {
            notes.push(format!("{} non-finite samples dropped", dropped));
        }

        Ok(StageOutput {
            samples,
            metadata: StageMetadata { notes },
        })
    }

    fn cleanup(&mut self) {
        self.config = None;
    }
}
