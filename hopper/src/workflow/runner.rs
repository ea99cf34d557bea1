use crate::workflow::config::{SourcesConfig, TransportKind, WorkflowConfig};
use crate::workflow::plots::{LoggingPlotter, PlotSink};
use anyhow::Context;
use hoppercore::credentials::RemoteCredential;
use hoppercore::hamsci::{NodeCatalog, NodeDataLoader, ResponseExtractor, SkippedNode};
use hoppercore::remote::{DirectoryTransport, FtpTransport, RemoteSession, RemoteSync, RemoteTransport, SyncReport};
use hoppercore::sources::{
    DirectoryRadarSource, FileFlareSource, FileMagnetometerSource, FlareSource, FlareSummary, MagnetometerSource,
    RadarSource,
};
use hoppercore::staging::{EventStager, HamsciRecord};
use hoppercore::{Event, TimeWindow};
use log::info;
use std::path::{Path, PathBuf};

/// One event to acquire: its timings, the data fetch window and the radars
/// to pull.
#[derive(Debug, Clone)]
pub struct EventSpec {
    pub event: Event,
    pub fetch_window: TimeWindow,
    pub radars: Vec<String>,
}

#[derive(Debug)]
pub struct EventReport {
    pub key: String,
    pub flare: FlareSummary,
    pub radar_records: usize,
    pub magnetometer_samples: usize,
    pub sync: SyncReport,
    pub skipped_nodes: Vec<SkippedNode>,
    pub dropped_nodes: Vec<String>,
    pub staged_nodes: usize,
    pub figures: Vec<PathBuf>,
    /// `None` when staging is disabled.
    pub bundle_path: Option<PathBuf>,
}

impl EventReport {
    pub fn omitted_nodes(&self) -> usize {
        self.skipped_nodes.len() + self.dropped_nodes.len()
    }
}

/// The external collaborators an event run pulls from.
pub struct Sources {
    pub flare: Box<dyn FlareSource>,
    pub radar: Box<dyn RadarSource>,
    pub magnetometer: Box<dyn MagnetometerSource>,
}

impl Sources {
    pub fn from_config(config: &SourcesConfig) -> Self {
        Self {
            flare: Box::new(FileFlareSource::new(&config.flare_file)),
            radar: Box::new(DirectoryRadarSource::new(&config.radar_dir)),
            magnetometer: Box::new(FileMagnetometerSource::new(&config.magnetometer_file)),
        }
    }
}

/// Builds the transport named by the config along with the root path to list.
pub fn open_transport(config: &WorkflowConfig) -> anyhow::Result<(Box<dyn RemoteTransport>, String)> {
    match config.remote.transport {
        TransportKind::Ftp => {
            let credential_file = &config.paths.credential_file;
            let credential = RemoteCredential::load(credential_file)
                .with_context(|| format!("loading credentials from {}", credential_file.display()))?
                .unlock()
                .context("unlocking remote credentials")?;
            let transport = FtpTransport::new(credential, config.remote.port, config.remote.timeout());
            Ok((Box::new(transport), config.remote.root.clone()))
        }
        TransportKind::Directory => {
            let transport = DirectoryTransport::new(&config.remote.root);
            Ok((Box::new(transport), String::new()))
        }
    }
}

/// Per-event acquisition and staging.
pub struct Hopper {
    config: WorkflowConfig,
    sources: Sources,
    plotter: Box<dyn PlotSink>,
}

impl Hopper {
    pub fn new(config: WorkflowConfig, sources: Sources, plotter: Box<dyn PlotSink>) -> Self {
        Self {
            config,
            sources,
            plotter,
        }
    }

    pub fn from_config(config: WorkflowConfig) -> Self {
        let sources = Sources::from_config(&config.sources);
        Self::new(config, sources, Box::new(LoggingPlotter::new()))
    }

    /// Runs the fixed sequence for one event. Any failing step aborts the
    /// event; nothing is checkpointed.
    pub fn run_event(&mut self, spec: &EventSpec) -> anyhow::Result<EventReport> {
        let event = &spec.event;
        let window = &spec.fetch_window;
        let key = event.key();
        let event_dir = self.config.paths.data_root.join(&key);
        let figures_dir = event_dir.join("figures");
        info!("event {}: fetch window {} .. {}", key, window.start, window.end);

        let flare_series = self
            .sources
            .flare
            .fetch(window)
            .with_context(|| format!("fetching flare series for {}", key))?;
        let flare = flare_series
            .summarize()
            .with_context(|| format!("summarizing flare series for {}", key))?;
        info!("event {}: GOES peak {} at {}", key, flare.goes_class, flare.peak_time);
        let mut figures = self
            .plotter
            .goes(&figures_dir, &flare_series, event, window)
            .context("plotting GOES series")?;

        let mut radars = Vec::with_capacity(spec.radars.len());
        for radar in &spec.radars {
            let dataset = self
                .sources
                .radar
                .fetch(radar, window)
                .with_context(|| format!("fetching radar {}", radar))?;
            radars.push(dataset.stage(event.start(), event.end()));
        }
        let radar_records = radars.iter().map(|r| r.record_count).sum();

        let magnetometer = self
            .sources
            .magnetometer
            .fetch(window, self.config.sources.magnetometer_stations.as_deref())
            .context("fetching magnetometer data")?;

        let mirror_dir = event_dir.join("hamsci");
        let sync = self.sync_remote(&mirror_dir, window)?;

        let catalog = NodeCatalog::load(&self.config.paths.node_list)
            .with_context(|| format!("loading node list {}", self.config.paths.node_list.display()))?;
        let loaded = NodeDataLoader::new(catalog, self.config.hamsci.smoothing_window)
            .load(&mirror_dir, window, self.config.hamsci.analysis_frequency_hz)
            .with_context(|| format!("loading node data from {}", mirror_dir.display()))?;
        let extracted = ResponseExtractor::new(self.config.hamsci.min_samples).extract(loaded.datasets, event);

        figures.extend(
            self.plotter
                .hamsci(&figures_dir, &extracted.nodes, event, window)
                .context("plotting HamSci nodes")?,
        );

        let hamsci: Vec<HamsciRecord> = extracted.nodes.values().filter_map(HamsciRecord::from_dataset).collect();
        let staged_nodes = hamsci.len();
        let bundle_path = if self.config.stage {
            let stager = EventStager::new(&self.config.paths.stage_root);
            stager
                .stage(event, radars, hamsci, flare.clone())
                .with_context(|| format!("staging event {}", key))?;
            Some(stager.bundle_path(event))
        } else {
            None
        };

        info!(
            "event {}: {} nodes staged, {} skipped, {} below sample threshold",
            key,
            staged_nodes,
            loaded.skipped.len(),
            extracted.dropped.len()
        );
        Ok(EventReport {
            key,
            flare,
            radar_records,
            magnetometer_samples: magnetometer.samples.len(),
            sync,
            skipped_nodes: loaded.skipped,
            dropped_nodes: extracted.dropped,
            staged_nodes,
            figures,
            bundle_path,
        })
    }

    fn sync_remote(&self, mirror_dir: &Path, window: &TimeWindow) -> anyhow::Result<SyncReport> {
        let (transport, root) = open_transport(&self.config)?;
        let endpoint = transport.endpoint();
        let mut session = RemoteSession::with_retry(transport, self.config.remote.retry_policy());
        session
            .connect()
            .with_context(|| format!("connecting to {}", endpoint))?;

        let synced = RemoteSync::new(mirror_dir).sync(
            &mut session,
            &root,
            window,
            Some(&self.config.hamsci.frequency_allowlist),
        );
        let closed = session.close();
        let report = synced.with_context(|| format!("mirroring {} into {}", endpoint, mirror_dir.display()))?;
        closed.with_context(|| format!("closing session to {}", endpoint))?;
        Ok(report)
    }
}
