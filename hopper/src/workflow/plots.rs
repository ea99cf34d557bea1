use hoppercore::hamsci::NodeDataset;
use hoppercore::sources::FlareSeries;
use hoppercore::{Event, TimeWindow};
use log::info;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Receives the figures a run would draw. Implementations return the paths
/// they produced.
pub trait PlotSink {
    fn goes(
        &mut self,
        figures_dir: &Path,
        series: &FlareSeries,
        event: &Event,
        window: &TimeWindow,
    ) -> anyhow::Result<Vec<PathBuf>>;

    fn hamsci(
        &mut self,
        figures_dir: &Path,
        nodes: &BTreeMap<String, NodeDataset>,
        event: &Event,
        window: &TimeWindow,
    ) -> anyhow::Result<Vec<PathBuf>>;
}

/// Records figure requests in the log without drawing anything.
#[derive(Debug, Default)]
pub struct LoggingPlotter;

impl LoggingPlotter {
    pub fn new() -> Self {
        Self
    }
}

impl PlotSink for LoggingPlotter {
    fn goes(
        &mut self,
        figures_dir: &Path,
        series: &FlareSeries,
        event: &Event,
        window: &TimeWindow,
    ) -> anyhow::Result<Vec<PathBuf>> {
        let path = figures_dir.join("GOES.png");
        info!(
            "figure {}: {} XRS samples over {} .. {}, markers at {} / {} / {}",
            path.display(),
            series.samples.len(),
            window.start,
            window.end,
            event.start(),
            event.peak(),
            event.end()
        );
        Ok(vec![path])
    }

    fn hamsci(
        &mut self,
        figures_dir: &Path,
        nodes: &BTreeMap<String, NodeDataset>,
        event: &Event,
        window: &TimeWindow,
    ) -> anyhow::Result<Vec<PathBuf>> {
        let mut paths = vec![figures_dir.join("hamsci.png")];
        info!(
            "figure {}: {} nodes over {} .. {}",
            paths[0].display(),
            nodes.len(),
            window.start,
            window.end
        );
        for (index, (node_id, dataset)) in nodes.iter().enumerate() {
            let path = figures_dir.join(format!("hamsci_{}.png", index));
            info!(
                "figure {}: node {} ({} samples), peak marker {}",
                path.display(),
                node_id,
                dataset.len(),
                event.peak()
            );
            paths.push(path);
        }
        Ok(paths)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use hoppercore::hamsci::NodeMetadata;

    #[test]
    fn hamsci_figures_are_numbered_per_node() {
        let t = |m| Utc.with_ymd_and_hms(2021, 10, 28, 14, m, 0).unwrap();
        let event = Event::new(t(0), t(10), t(20)).unwrap();
        let window = TimeWindow::new(t(0), t(30)).unwrap();
        let mut nodes = BTreeMap::new();
        for id in ["N1", "N2"] {
            nodes.insert(id.to_string(), NodeDataset::new(id, 10e6, NodeMetadata::new(id), vec![]));
        }

        let mut plotter = LoggingPlotter::new();
        let dir = Path::new("figures");
        let goes = plotter.goes(dir, &FlareSeries::default(), &event, &window).unwrap();
        let hamsci = plotter.hamsci(dir, &nodes, &event, &window).unwrap();

        assert_eq!(goes, vec![dir.join("GOES.png")]);
        assert_eq!(
            hamsci,
            vec![dir.join("hamsci.png"), dir.join("hamsci_0.png"), dir.join("hamsci_1.png")]
        );
    }
}
