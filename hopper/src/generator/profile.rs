use crate::generator::template::flash_profile;
use crate::workflow::config::{TransportKind, WorkflowConfig};
use crate::workflow::events::{parse_event_table, EventRow};
use anyhow::Context;
use chrono::{DateTime, Duration, Utc};
use hoppercore::sources::{FlareSample, MagnetometerSample, RadarRecord};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

const EVENT_TABLE: &str = "\
event,start,end,rads,s_time,e_time
2021-10-28 14:10:00,2021-10-28 14:00:00,2021-10-28 14:20:00,fhe-fhw,2021-10-28 13:00:00,2021-10-28 16:00:00
";

/// Configuration for generating a synthetic acquisition workspace.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub nodes: usize,
    pub cadence_secs: i64,
    /// Peak Doppler excursion of the flare response, Hz.
    pub response_hz: f64,
    pub noise_hz: f64,
    pub carrier_hz: f64,
    pub stations: Vec<String>,
    pub seed: u64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            nodes: 4,
            cadence_secs: 10,
            response_hz: 1.5,
            noise_hz: 0.02,
            carrier_hz: 10e6,
            stations: vec!["ABK".into(), "BOU".into()],
            seed: 0,
        }
    }
}

/// A generated workspace ready for [`crate::workflow::runner::Hopper`].
pub struct OfflineWorkspace {
    pub config: WorkflowConfig,
    pub config_file: PathBuf,
    pub events_file: PathBuf,
    pub rows: Vec<EventRow>,
}

fn jitter(rng: &mut StdRng, amplitude: f64) -> f64 {
    if amplitude > 0.0 {
        rng.gen_range(-amplitude..amplitude)
    } else {
        0.0
    }
}

fn instants(start: DateTime<Utc>, end: DateTime<Utc>, step_secs: i64) -> impl Iterator<Item = DateTime<Utc>> {
    let step = Duration::seconds(step_secs.max(1));
    std::iter::successors(Some(start), move |t| Some(*t + step)).take_while(move |t| *t <= end)
}

fn node_id(index: usize) -> String {
    format!("N{:07}", index + 1)
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> anyhow::Result<()> {
    let body = serde_json::to_vec_pretty(value).with_context(|| format!("encoding {}", path.display()))?;
    fs::write(path, body).with_context(|| format!("writing {}", path.display()))
}

fn grape_file(node: &str, row: &EventRow, config: &GeneratorConfig, carrier_hz: f64, rng: &mut StdRng) -> String {
    let mut body = format!(
        "# Node: {}\n# Center frequency: {} Hz\nUTC,Freq,Vpk\n",
        node, carrier_hz
    );
    for t in instants(row.s_time, row.e_time, config.cadence_secs) {
        let response = config.response_hz * flash_profile(t, row.start, row.event, row.end);
        let freq = carrier_hz + response + jitter(rng, config.noise_hz);
        let _ = writeln!(body, "{},{:.4},{:.3}", t.format("%Y-%m-%dT%H:%M:%SZ"), freq, 0.2 + response / 10.0);
    }
    body
}

fn write_remote(remote: &Path, row: &EventRow, config: &GeneratorConfig, rng: &mut StdRng) -> anyhow::Result<()> {
    fs::create_dir_all(remote).with_context(|| format!("creating {}", remote.display()))?;
    let day = row.s_time.format("%Y-%m-%d");
    for index in 0..config.nodes {
        let node = node_id(index);
        let name = format!("{}T000000Z_{}_FRQ_WWV10.csv", day, node);
        let body = grape_file(&node, row, config, config.carrier_hz, rng);
        fs::write(remote.join(&name), body).with_context(|| format!("writing {}", name))?;
    }
    // A second band for the first node; filtered out by the analysis frequency.
    let name = format!("{}T000000Z_{}_FRQ_CHU7p85.csv", day, node_id(0));
    let body = grape_file(&node_id(0), row, config, 7.85e6, rng);
    fs::write(remote.join(&name), body).with_context(|| format!("writing {}", name))?;
    fs::write(remote.join("README.txt"), "synthetic Grape repository\n").context("writing remote README")?;
    Ok(())
}

fn node_list(config: &GeneratorConfig) -> String {
    let mut body = String::from("node_id,callsign,grid_square,latitude,longitude,elevation_m,radio,antenna\n");
    // The last node is left out so the run exercises the unlisted-node path.
    for index in 0..config.nodes.saturating_sub(1) {
        let _ = writeln!(
            body,
            "{},W{}SIM,FN{:02},{:.2},{:.2},{},RX-888,dipole",
            node_id(index),
            index,
            index,
            40.0 + index as f64,
            -75.0 - index as f64,
            100 + 10 * index
        );
    }
    body
}

fn flare_series(row: &EventRow) -> Vec<FlareSample> {
    instants(row.s_time, row.e_time, 60)
        .map(|time| {
            let xrsb = 1e-6 + 2e-5 * flash_profile(time, row.start, row.event, row.end);
            FlareSample {
                time,
                xrsa: xrsb / 10.0,
                xrsb,
            }
        })
        .collect()
}

fn radar_records(row: &EventRow, rng: &mut StdRng) -> Vec<RadarRecord> {
    instants(row.s_time, row.e_time, 120)
        .enumerate()
        .map(|(index, time)| {
            let response = flash_profile(time, row.start, row.event, row.end);
            RadarRecord {
                time,
                beam: (index % 4) as u32,
                gate: 20 + (index % 10) as u32,
                velocity: -20.0 - 60.0 * response + jitter(rng, 5.0),
                power: 15.0 - 10.0 * response,
                spectral_width: 50.0,
                ground_scatter: index % 7 == 0,
            }
        })
        .collect()
}

fn magnetometer_samples(row: &EventRow, config: &GeneratorConfig, rng: &mut StdRng) -> Vec<MagnetometerSample> {
    let mut samples = Vec::new();
    for time in instants(row.s_time, row.e_time, 60) {
        let response = flash_profile(time, row.start, row.event, row.end);
        for station in &config.stations {
            samples.push(MagnetometerSample {
                time,
                station: station.clone(),
                n: 15.0 * response + jitter(rng, 1.0),
                e: jitter(rng, 1.0),
                z: -5.0 * response + jitter(rng, 1.0),
            });
        }
    }
    samples
}

/// Lays out a remote repository, node list, source files, event table and
/// workflow config under `root`, all for one synthetic M-class event.
pub fn build_offline_workspace(root: &Path, config: &GeneratorConfig) -> anyhow::Result<OfflineWorkspace> {
    let rows = parse_event_table(EVENT_TABLE)?;
    let row = rows.first().context("synthetic event table has no rows")?;
    let mut rng = StdRng::seed_from_u64(config.seed);

    let remote = root.join("remote");
    write_remote(&remote, row, config, &mut rng)?;

    let config_dir = root.join("config");
    let sources_dir = root.join("sources");
    let radar_dir = sources_dir.join("radar");
    for dir in [&config_dir, &radar_dir] {
        fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    }

    let node_list_path = config_dir.join("nodelist.csv");
    fs::write(&node_list_path, node_list(config)).context("writing node list")?;
    let events_file = config_dir.join("events.csv");
    fs::write(&events_file, EVENT_TABLE).context("writing event table")?;

    let flare_file = sources_dir.join("goes.json");
    write_json(&flare_file, &flare_series(row))?;
    for radar in &row.radars {
        write_json(&radar_dir.join(format!("{}.json", radar)), &radar_records(row, &mut rng))?;
    }
    let magnetometer_file = sources_dir.join("supermag.json");
    write_json(&magnetometer_file, &magnetometer_samples(row, config, &mut rng))?;

    let mut workflow = WorkflowConfig::default();
    workflow.paths.data_root = root.join("data");
    workflow.paths.stage_root = root.join("data").join("stage");
    workflow.paths.credential_file = config_dir.join("passcode.json");
    workflow.paths.node_list = node_list_path;
    workflow.remote.transport = TransportKind::Directory;
    workflow.remote.root = remote.display().to_string();
    workflow.hamsci.analysis_frequency_hz = config.carrier_hz;
    workflow.sources.flare_file = flare_file;
    workflow.sources.radar_dir = radar_dir;
    workflow.sources.magnetometer_file = magnetometer_file;
    workflow.validate()?;

    let config_file = config_dir.join("workflow.yaml");
    let yaml = serde_yaml::to_string(&workflow).context("encoding workflow config")?;
    fs::write(&config_file, yaml).with_context(|| format!("writing {}", config_file.display()))?;

    Ok(OfflineWorkspace {
        config: workflow,
        config_file,
        events_file,
        rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::events::load_event_table;
    use hoppercore::remote::RemoteFileRecord;
    use chrono::TimeZone;
    use tempfile::tempdir;

    fn event_day(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2021, 10, 28, h, m, 0).unwrap()
    }

    #[test]
    fn workspace_files_follow_the_input_formats() {
        let dir = tempdir().unwrap();
        let config = GeneratorConfig::default();
        let workspace = build_offline_workspace(dir.path(), &config).unwrap();

        let mut names: Vec<String> = fs::read_dir(dir.path().join("remote"))
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|n| n.ends_with(".csv"))
            .collect();
        names.sort();
        assert_eq!(names.len(), config.nodes + 1);
        let record = RemoteFileRecord::parse(&names[0]).unwrap();
        assert_eq!(record.node_id, "N0000001");
        assert!(names.iter().any(|n| RemoteFileRecord::parse(n).unwrap().frequency_mhz == 7.85));

        let rows = load_event_table(&workspace.events_file).unwrap();
        assert_eq!(rows, workspace.rows);
        assert_eq!(rows[0].event, event_day(14, 10));
        assert_eq!(rows[0].radars, vec!["fhe", "fhw"]);

        let reloaded = WorkflowConfig::load(&workspace.config_file).unwrap();
        assert_eq!(reloaded.remote.transport, TransportKind::Directory);
        assert_eq!(reloaded.paths.node_list, workspace.config.paths.node_list);
    }

    #[test]
    fn same_seed_generates_identical_series() {
        let first = tempdir().unwrap();
        let second = tempdir().unwrap();
        let config = GeneratorConfig {
            seed: 7,
            ..Default::default()
        };
        build_offline_workspace(first.path(), &config).unwrap();
        build_offline_workspace(second.path(), &config).unwrap();

        let name = "2021-10-28T000000Z_N0000002_FRQ_WWV10.csv";
        let a = fs::read_to_string(first.path().join("remote").join(name)).unwrap();
        let b = fs::read_to_string(second.path().join("remote").join(name)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn flare_series_peaks_as_an_m_class_event() {
        let rows = parse_event_table(EVENT_TABLE).unwrap();
        let series = flare_series(&rows[0]);
        let peak = series.iter().max_by(|a, b| a.xrsb.total_cmp(&b.xrsb)).unwrap();
        assert_eq!(peak.time, event_day(14, 10));
        assert!((peak.xrsb - 2.1e-5).abs() < 1e-12);
    }
}
