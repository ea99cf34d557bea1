use crate::math::stats::StatsHelper;
use crate::prelude::{
    PipelineError, PipelineResult, ProcessingStage, SeriesSample, StageConfig, StageInput,
    StageMetadata, StageOutput,
};
use crate::telemetry::log::LogManager;
use std::collections::VecDeque;

/// Trailing moving average; keeps the series length and timestamps.
pub struct SmoothingStage {
    window: Option<usize>,
    logger: LogManager,
}

impl SmoothingStage {
    pub fn new() -> Self {
        Self {
            window: None,
            logger: LogManager::named("smoothing-stage"),
        }
    }
}

impl Default for SmoothingStage {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessingStage for SmoothingStage {
    fn initialize(&mut self, config: &StageConfig) -> PipelineResult<()> {
        self.window = Some(config.smoothing_window.max(1));
        Ok(())
    }

    fn execute(&mut self, input: StageInput) -> PipelineResult<StageOutput> {
        let window = self
            .window
            .ok_or_else(|| PipelineError::Internal("stage not initialized".into()))?;

        let mut recent: VecDeque<f64> = VecDeque::with_capacity(window);
        let mut samples = Vec::with_capacity(input.samples.len());
        for sample in &input.samples {
            if recent.len() == window {
                recent.pop_front();
            }
            recent.push_back(sample.value);
            let span: Vec<f64> = recent.iter().copied().collect();
            samples.push(SeriesSample::new(sample.utc, StatsHelper::mean(&span)));
        }

        self.logger
            .debug(&format!("smoothed {} samples, window {}", samples.len(), window));
        Ok(StageOutput {
            samples,
            metadata: StageMetadata {
                notes: vec![format!("moving average window {}", window)],
            },
        })
    }

    fn cleanup(&mut self) {
        self.window = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn series(values: &[f64]) -> Vec<SeriesSample> {
        let t0 = Utc.with_ymd_and_hms(2021, 10, 28, 14, 0, 0).unwrap();
        values
            .iter()
            .enumerate()
            .map(|(i, &v)| SeriesSample::new(t0 + Duration::seconds(i as i64), v))
            .collect()
    }

    #[test]
    fn smoothing_stage_averages_trailing_window() {
        let mut stage = SmoothingStage::new();
        let config = StageConfig {
            nominal_frequency_hz: 10e6,
            smoothing_window: 2,
        };
        stage.initialize(&config).unwrap();

        let input = StageInput {
            samples: series(&[0.0, 2.0, 4.0, 4.0]),
        };
        let output = stage.execute(input.clone()).unwrap();
        let values: Vec<f64> = output.samples.iter().map(|s| s.value).collect();
        assert_eq!(values, vec![0.0, 1.0, 3.0, 4.0]);
        assert_eq!(output.samples[2].utc, input.samples[2].utc);
        stage.cleanup();
    }

    #[test]
    fn window_of_one_is_identity() {
        let mut stage = SmoothingStage::new();
        let config = StageConfig {
            nominal_frequency_hz: 10e6,
            smoothing_window: 0,
        };
        stage.initialize(&config).unwrap();
        let input = StageInput {
            samples: series(&[1.0, -3.0, 7.5]),
        };
        let output = stage.execute(input.clone()).unwrap();
        assert_eq!(output.samples, input.samples);
    }
}
