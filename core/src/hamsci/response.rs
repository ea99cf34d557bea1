//! Flare-response parameters of a node's Doppler series.
//!
//! The rise sub-window is `[start, peak]` and the fall sub-window is
//! `[peak, end]`, both inclusive, so a sample exactly at the peak counts in
//! both. Areas use the trapezoidal rule with the spacing of the first two
//! samples applied to the whole series.

use super::loader::NodeDataset;
use crate::math::{Integrator, StatsHelper};
use crate::prelude::{seconds_between, Event, SeriesSample};
use crate::telemetry::log::LogManager;
use chrono::{DateTime, Utc};
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const DEFAULT_MIN_SAMPLES: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResponseParameters {
    pub rise_area: f64,
    pub fall_area: f64,
    /// Maximum over the rise sub-window; absent when it holds no samples.
    pub peak: Option<f64>,
}

/// Nodes that carried enough samples, now with parameters attached, and the
/// ids of those that did not.
#[derive(Debug, Clone, Default)]
pub struct ExtractionReport {
    pub nodes: BTreeMap<String, NodeDataset>,
    pub dropped: Vec<String>,
}

impl ExtractionReport {
    pub fn parameters(&self) -> BTreeMap<String, ResponseParameters> {
        self.nodes
            .iter()
            .filter_map(|(id, node)| node.response_parameters().map(|p| (id.clone(), *p)))
            .collect()
    }
}

pub struct ResponseExtractor {
    min_samples: usize,
    logger: LogManager,
}

impl ResponseExtractor {
    pub fn new(min_samples: usize) -> Self {
        Self {
            min_samples,
            logger: LogManager::named("response-extractor"),
        }
    }

    /// Keeps only nodes with more than `min_samples` filtered samples.
    pub fn extract(&self, nodes: BTreeMap<String, NodeDataset>, event: &Event) -> ExtractionReport {
        let mut report = ExtractionReport::default();
        for (node_id, mut node) in nodes {
            if node.len() <= self.min_samples || node.len() < 2 {
                self.logger.record(&format!(
                    "dropping node {}: {} samples",
                    node_id,
                    node.len()
                ));
                report.dropped.push(node_id);
                continue;
            }
            let parameters = Self::compute(&node.series, event);
            self.logger.debug(&format!("node {}: {:?}", node_id, parameters));
            node.attach(parameters);
            report.nodes.insert(node_id, node);
        }
        report
    }

    /// Parameters for a series of at least two samples.
    pub fn compute(series: &[SeriesSample], event: &Event) -> ResponseParameters {
        let del_t = match series {
            [first, second, ..] => seconds_between(first.utc, second.utc),
            _ => 0.0,
        };
        let within = |from: DateTime<Utc>, to: DateTime<Utc>| -> Array1<f64> {
            series
                .iter()
                .filter(|s| s.utc >= from && s.utc <= to)
                .map(|s| s.value)
                .collect()
        };
        let rise = within(event.start(), event.peak());
        let fall = within(event.peak(), event.end());

        ResponseParameters {
            rise_area: Integrator::trapezoid(rise.view(), del_t),
            fall_area: Integrator::trapezoid(fall.view(), del_t),
            peak: StatsHelper::max(rise.as_slice().unwrap_or_default()),
        }
    }
}

impl Default for ResponseExtractor {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_SAMPLES)
    }
}
