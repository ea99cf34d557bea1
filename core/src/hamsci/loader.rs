use super::nodes::{NodeCatalog, NodeMetadata};
use super::response::ResponseParameters;
use crate::prelude::{PipelineError, PipelineResult, SeriesSample, StageConfig, TimeWindow};
use crate::processing::filter_series;
use crate::remote::naming::RemoteFileRecord;
use crate::telemetry::log::LogManager;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// One node's filtered Doppler series over the requested window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeDataset {
    pub node_id: String,
    pub frequency_hz: f64,
    pub metadata: NodeMetadata,
    pub series: Vec<SeriesSample>,
    response_parameters: Option<ResponseParameters>,
}

impl NodeDataset {
    pub fn new(node_id: impl Into<String>, frequency_hz: f64, metadata: NodeMetadata, series: Vec<SeriesSample>) -> Self {
        Self {
            node_id: node_id.into(),
            frequency_hz,
            metadata,
            series,
            response_parameters: None,
        }
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    pub fn response_parameters(&self) -> Option<&ResponseParameters> {
        self.response_parameters.as_ref()
    }

    /// Replaces any earlier attachment from a previous extraction.
    pub(crate) fn attach(&mut self, parameters: ResponseParameters) {
        self.response_parameters = Some(parameters);
    }
}

/// A node that could not be turned into a dataset, with the reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedNode {
    pub node_id: String,
    pub reason: String,
}

/// Partial-success result of a load: the datasets built and the nodes left out.
#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    pub files_considered: usize,
    pub datasets: BTreeMap<String, NodeDataset>,
    pub skipped: Vec<SkippedNode>,
}

/// Builds per-node datasets from the local Grape mirror.
pub struct NodeDataLoader {
    catalog: NodeCatalog,
    smoothing_window: usize,
    logger: LogManager,
}

impl NodeDataLoader {
    pub fn new(catalog: NodeCatalog, smoothing_window: usize) -> Self {
        Self {
            catalog,
            smoothing_window,
            logger: LogManager::named("node-loader"),
        }
    }

    /// Loads every node with at least one mirrored file at `frequency_hz`
    /// dated inside the window. A missing or empty directory yields an empty
    /// report; failures of individual nodes land in `skipped`.
    pub fn load(&self, local_dir: &Path, window: &TimeWindow, frequency_hz: f64) -> PipelineResult<LoadReport> {
        let mut report = LoadReport::default();
        if !local_dir.is_dir() {
            self.logger
                .record(&format!("no local mirror at {}", local_dir.display()));
            return Ok(report);
        }

        let (first_day, last_day) = window.dates();
        let mut files_by_node: BTreeMap<String, Vec<PathBuf>> = BTreeMap::new();
        for entry in fs::read_dir(local_dir).map_err(|e| PipelineError::io(local_dir, e))? {
            let entry = entry.map_err(|e| PipelineError::io(local_dir, e))?;
            let name = entry.file_name().to_string_lossy().into_owned();
            let Ok(record) = RemoteFileRecord::parse(&name) else {
                continue;
            };
            if record.matches_frequency(frequency_hz / 1e6)
                && record.file_date >= first_day
                && record.file_date <= last_day
            {
                report.files_considered += 1;
                files_by_node.entry(record.node_id).or_default().push(entry.path());
            }
        }

        let stage_config = StageConfig {
            nominal_frequency_hz: frequency_hz,
            smoothing_window: self.smoothing_window,
        };
        for (node_id, mut files) in files_by_node {
            files.sort();
            self.logger.record(&format!("node {}: {} files", node_id, files.len()));
            match self.build_dataset(&node_id, &files, window, &stage_config) {
                Ok(dataset) => {
                    report.datasets.insert(node_id, dataset);
                }
                Err(reason) => {
                    self.logger.warn(&format!("skipping node {}: {}", node_id, reason));
                    report.skipped.push(SkippedNode { node_id, reason });
                }
            }
        }

        self.logger.record(&format!(
            "loaded {} nodes, skipped {}",
            report.datasets.len(),
            report.skipped.len()
        ));
        Ok(report)
    }

    fn build_dataset(
        &self,
        node_id: &str,
        files: &[PathBuf],
        window: &TimeWindow,
        stage_config: &StageConfig,
    ) -> Result<NodeDataset, String> {
        let metadata = self
            .catalog
            .get(node_id)
            .cloned()
            .ok_or_else(|| "node is not listed in the node metadata file".to_string())?;

        let mut raw = Vec::new();
        for file in files {
            let contents = fs::read_to_string(file).map_err(|e| format!("{}: {}", file.display(), e))?;
            let rows = parse_grape_rows(&contents).map_err(|e| format!("{}: {}", file.display(), e))?;
            raw.extend(rows.into_iter().filter(|s| window.contains(s.utc)));
        }
        raw.sort_by_key(|s| s.utc);
        raw.dedup_by_key(|s| s.utc);
        if raw.is_empty() {
            return Err("no samples inside the window".into());
        }

        let series = filter_series(stage_config, raw).map_err(|e| e.to_string())?;
        Ok(NodeDataset::new(node_id, stage_config.nominal_frequency_hz, metadata, series))
    }
}

/// Parses Grape data rows `UTC, Freq, Vpk`, skipping `#` comments and the header row.
pub fn parse_grape_rows(contents: &str) -> Result<Vec<SeriesSample>, String> {
    let mut samples = Vec::new();
    for (index, line) in contents.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut fields = line.split(',').map(str::trim);
        let stamp = fields.next().unwrap_or_default();
        if stamp.eq_ignore_ascii_case("utc") {
            continue;
        }
        let utc = DateTime::parse_from_rfc3339(stamp)
            .map(|t| t.with_timezone(&Utc))
            .map_err(|_| format!("line {}: bad timestamp {:?}", index + 1, stamp))?;
        let freq = fields
            .next()
            .ok_or_else(|| format!("line {}: missing frequency column", index + 1))?;
        let value = freq
            .parse::<f64>()
            .map_err(|_| format!("line {}: bad frequency {:?}", index + 1, freq))?;
        samples.push(SeriesSample::new(utc, value));
    }
    Ok(samples)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use tempfile::tempdir;

    fn window() -> TimeWindow {
        TimeWindow::new(
            Utc.with_ymd_and_hms(2021, 10, 28, 14, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2021, 10, 28, 14, 20, 0).unwrap(),
        )
        .unwrap()
    }

    fn grape_file(start_minute: i64, count: i64, offset_hz: f64) -> String {
        let t0 = Utc.with_ymd_and_hms(2021, 10, 28, 14, 0, 0).unwrap();
        let mut body = String::from("# Station Node Number N0000001\nUTC,Freq,Vpk\n");
        for i in 0..count {
            let t = t0 + Duration::minutes(start_minute) + Duration::seconds(60 * i);
            body.push_str(&format!("{},{},0.1\n", t.format("%Y-%m-%dT%H:%M:%SZ"), 10e6 + offset_hz));
        }
        body
    }

    fn catalog() -> NodeCatalog {
        NodeCatalog::from_entries([NodeMetadata::new("N0000001"), NodeMetadata::new("N0000002")])
    }

    #[test]
    fn missing_directory_is_empty_not_error() {
        let loader = NodeDataLoader::new(catalog(), 1);
        let report = loader.load(Path::new("/no/such/mirror"), &window(), 10e6).unwrap();
        assert!(report.datasets.is_empty());
        assert!(report.skipped.is_empty());
    }

    #[test]
    fn loads_window_restricted_doppler_series() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("2021-10-28T000000Z_N0000001_FRQ_WWV10.csv"),
            grape_file(-5, 30, 0.5),
        )
        .unwrap();
        fs::write(
            dir.path().join("2021-10-28T000000Z_N0000001_FRQ_WWV5.csv"),
            grape_file(0, 5, 0.0),
        )
        .unwrap();

        let loader = NodeDataLoader::new(catalog(), 1);
        let report = loader.load(dir.path(), &window(), 10e6).unwrap();
        assert_eq!(report.files_considered, 1);

        let dataset = &report.datasets["N0000001"];
        // 14:00 through 14:20 inclusive at one-minute cadence
        assert_eq!(dataset.len(), 21);
        assert!(dataset.series.iter().all(|s| window().contains(s.utc)));
        assert!(dataset.series.iter().all(|s| (s.value - 0.5).abs() < 1e-6));
        assert!(dataset.response_parameters().is_none());
    }

    #[test]
    fn failing_nodes_are_reported_not_fatal() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("2021-10-28T000000Z_N0000001_FRQ_WWV10.csv"),
            grape_file(0, 15, 1.0),
        )
        .unwrap();
        fs::write(
            dir.path().join("2021-10-28T000000Z_N0000002_FRQ_WWV10.csv"),
            "UTC,Freq,Vpk\nyesterday,10000000.0,0.1\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("2021-10-28T000000Z_N0000009_FRQ_WWV10.csv"),
            grape_file(0, 15, 1.0),
        )
        .unwrap();

        let loader = NodeDataLoader::new(catalog(), 3);
        let report = loader.load(dir.path(), &window(), 10e6).unwrap();
        assert_eq!(report.datasets.keys().collect::<Vec<_>>(), vec!["N0000001"]);

        let skipped: Vec<_> = report.skipped.iter().map(|s| s.node_id.as_str()).collect();
        assert_eq!(skipped, vec!["N0000002", "N0000009"]);
        assert!(report.skipped[0].reason.contains("bad timestamp"));
        assert!(report.skipped[1].reason.contains("node metadata"));
    }

    #[test]
    fn node_without_samples_in_window_is_skipped() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("2021-10-28T000000Z_N0000001_FRQ_WWV10.csv"),
            grape_file(60, 10, 0.0),
        )
        .unwrap();
        let loader = NodeDataLoader::new(catalog(), 1);
        let report = loader.load(dir.path(), &window(), 10e6).unwrap();
        assert!(report.datasets.is_empty());
        assert_eq!(report.skipped[0].reason, "no samples inside the window");
    }
}
