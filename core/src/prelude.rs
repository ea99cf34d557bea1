use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub use crate::credentials::CredentialError;
pub use crate::remote::ConnectionError;

/// A solar-flare occurrence: its peak and the analysis window around it.
///
/// Always ordered `start <= peak <= end`; deserialization goes through
/// [`Event::new`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "EventTimes")]
pub struct Event {
    start: DateTime<Utc>,
    peak: DateTime<Utc>,
    end: DateTime<Utc>,
}

#[derive(Deserialize)]
struct EventTimes {
    start: DateTime<Utc>,
    peak: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TryFrom<EventTimes> for Event {
    type Error = PipelineError;

    fn try_from(times: EventTimes) -> PipelineResult<Self> {
        Event::new(times.start, times.peak, times.end)
    }
}

impl Event {
    pub fn new(start: DateTime<Utc>, peak: DateTime<Utc>, end: DateTime<Utc>) -> PipelineResult<Self> {
        if start > peak || peak > end {
            return Err(PipelineError::InvalidEvent(format!(
                "expected start <= peak <= end, got {} / {} / {}",
                start, peak, end
            )));
        }
        Ok(Self { start, peak, end })
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn peak(&self) -> DateTime<Utc> {
        self.peak
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// Path key: peak timestamp truncated to the minute.
    pub fn key(&self) -> String {
        self.peak.format("%Y-%m-%d-%H-%M").to_string()
    }

    pub fn rise_time_secs(&self) -> f64 {
        seconds_between(self.start, self.peak)
    }

    pub fn fall_time_secs(&self) -> f64 {
        seconds_between(self.peak, self.end)
    }

    pub fn window(&self) -> TimeWindow {
        TimeWindow {
            start: self.start,
            end: self.end,
        }
    }
}

/// Real-valued seconds at microsecond resolution, falling back to
/// milliseconds for spans too long to count in microseconds.
pub(crate) fn seconds_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    let span = to - from;
    match span.num_microseconds() {
        Some(us) => us as f64 / 1e6,
        None => span.num_milliseconds() as f64 / 1e3,
    }
}

/// Inclusive UTC interval used to restrict fetches and series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> PipelineResult<Self> {
        if start > end {
            return Err(PipelineError::InvalidInput(format!(
                "window start {} is after end {}",
                start, end
            )));
        }
        Ok(Self { start, end })
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        instant >= self.start && instant <= self.end
    }

    /// Day-truncated bounds, used where only file dates are known.
    pub fn dates(&self) -> (NaiveDate, NaiveDate) {
        (self.start.date_naive(), self.end.date_naive())
    }
}

/// One point of a node's time series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesSample {
    pub utc: DateTime<Utc>,
    pub value: f64,
}

impl SeriesSample {
    pub fn new(utc: DateTime<Utc>, value: f64) -> Self {
        Self { utc, value }
    }
}

/// Shared configuration for each series processing stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageConfig {
    pub nominal_frequency_hz: f64,
    pub smoothing_window: usize,
}

/// Input payload for a processing stage.
#[derive(Debug, Clone)]
pub struct StageInput {
    pub samples: Vec<SeriesSample>,
}

/// Output produced by each stage.
#[derive(Debug, Clone)]
pub struct StageOutput {
    pub samples: Vec<SeriesSample>,
    pub metadata: StageMetadata,
}

/// Metadata used for chaining stages and telemetry.
#[derive(Debug, Clone, Default)]
pub struct StageMetadata {
    pub notes: Vec<String>,
}

/// Common error type for the acquisition and staging pipeline.
#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    #[error("credential failure: {0}")]
    Credential(#[from] CredentialError),
    #[error("connection failure: {0}")]
    Connection(#[from] ConnectionError),
    #[error("invalid event: {0}")]
    InvalidEvent(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("source failure: {0}")]
    Source(String),
    #[error("io failure on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("serialization failure: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("internal failure: {0}")]
    Internal(String),
}

impl PipelineError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PipelineError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type PipelineResult<T> = Result<T, PipelineError>;

/// Trait describing series processing stages.
pub trait ProcessingStage {
    fn initialize(&mut self, config: &StageConfig) -> PipelineResult<()>;
    fn execute(&mut self, input: StageInput) -> PipelineResult<StageOutput>;
    fn cleanup(&mut self);
}
