use super::read_json_array;
use crate::prelude::{PipelineError, PipelineResult, TimeWindow};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One GOES X-ray irradiance reading (W/m^2).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FlareSample {
    pub time: DateTime<Utc>,
    pub xrsa: f64,
    pub xrsb: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlareSeries {
    pub samples: Vec<FlareSample>,
}

/// Flare table derived from the irradiance series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlareSummary {
    pub peak_time: DateTime<Utc>,
    pub peak_xrsb: f64,
    pub peak_xrsa: f64,
    pub goes_class: String,
    pub sample_count: usize,
}

impl FlareSeries {
    pub fn restricted_to(&self, window: &TimeWindow) -> Self {
        Self {
            samples: self
                .samples
                .iter()
                .filter(|s| window.contains(s.time))
                .copied()
                .collect(),
        }
    }

    pub fn summarize(&self) -> PipelineResult<FlareSummary> {
        let peak = self
            .samples
            .iter()
            .filter(|s| s.xrsb.is_finite())
            .max_by(|a, b| a.xrsb.total_cmp(&b.xrsb))
            .ok_or_else(|| PipelineError::Source("flare series has no usable XRS-B samples".into()))?;
        let peak_xrsa = self
            .samples
            .iter()
            .map(|s| s.xrsa)
            .filter(|v| v.is_finite())
            .fold(f64::NEG_INFINITY, f64::max);

        Ok(FlareSummary {
            peak_time: peak.time,
            peak_xrsb: peak.xrsb,
            peak_xrsa,
            goes_class: goes_class(peak.xrsb),
            sample_count: self.samples.len(),
        })
    }
}

/// GOES class letter and magnitude for a long-channel flux, e.g. `M1.2`.
pub fn goes_class(xrsb: f64) -> String {
    if !xrsb.is_finite() || xrsb <= 0.0 {
        return "unknown".into();
    }
    let (letter, base) = match xrsb {
        f if f >= 1e-4 => ('X', 1e-4),
        f if f >= 1e-5 => ('M', 1e-5),
        f if f >= 1e-6 => ('C', 1e-6),
        f if f >= 1e-7 => ('B', 1e-7),
        _ => ('A', 1e-8),
    };
    format!("{}{:.1}", letter, xrsb / base)
}

pub trait FlareSource {
    fn fetch(&mut self, window: &TimeWindow) -> PipelineResult<FlareSeries>;
}

/// GOES series exported as a JSON array of `{time, xrsa, xrsb}`.
pub struct FileFlareSource {
    path: PathBuf,
}

impl FileFlareSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl FlareSource for FileFlareSource {
    fn fetch(&mut self, window: &TimeWindow) -> PipelineResult<FlareSeries> {
        let samples: Vec<FlareSample> = read_json_array(&self.path)?;
        Ok(FlareSeries { samples }.restricted_to(window))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use tempfile::tempdir;

    #[test]
    fn goes_class_boundaries() {
        assert_eq!(goes_class(1.23e-5), "M1.2");
        assert_eq!(goes_class(1e-4), "X1.0");
        assert_eq!(goes_class(9.9e-7), "B9.9");
        assert_eq!(goes_class(3e-9), "A0.3");
        assert_eq!(goes_class(0.0), "unknown");
    }

    #[test]
    fn file_source_restricts_and_summarizes() {
        let t0 = Utc.with_ymd_and_hms(2021, 10, 28, 15, 0, 0).unwrap();
        let samples: Vec<FlareSample> = (0..6)
            .map(|i| FlareSample {
                time: t0 + Duration::minutes(10 * i),
                xrsa: 1e-7 * (i + 1) as f64,
                xrsb: if i == 2 { 1.0e-3 } else { 1e-6 },
            })
            .collect();
        let dir = tempdir().unwrap();
        let path = dir.path().join("goes.json");
        std::fs::write(&path, serde_json::to_string(&samples).unwrap()).unwrap();

        let window = TimeWindow::new(t0, t0 + Duration::minutes(30)).unwrap();
        let series = FileFlareSource::new(&path).fetch(&window).unwrap();
        assert_eq!(series.samples.len(), 4);

        let summary = series.summarize().unwrap();
        assert_eq!(summary.peak_time, t0 + Duration::minutes(20));
        assert_eq!(summary.goes_class, "X10.0");
        assert!((summary.peak_xrsa - 4e-7).abs() < 1e-15);
    }

    #[test]
    fn empty_series_cannot_be_summarized() {
        assert!(FlareSeries::default().summarize().is_err());
    }
}
