use crate::workflow::events::BatchMode;
use anyhow::Context;
use hoppercore::remote::ftp::DEFAULT_FTP_PORT;
use hoppercore::remote::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    pub paths: PathsConfig,
    pub remote: RemoteConfig,
    pub hamsci: HamsciConfig,
    pub sources: SourcesConfig,
    pub batch: BatchConfig,
    /// Write the per-event bundle after fetching.
    pub stage: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Per-event working data lands under `<data_root>/<event key>/`.
    pub data_root: PathBuf,
    pub stage_root: PathBuf,
    pub credential_file: PathBuf,
    pub node_list: PathBuf,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportKind {
    Ftp,
    /// `root` is a local directory standing in for the repository.
    Directory,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    pub transport: TransportKind,
    pub root: String,
    pub port: u16,
    pub timeout_secs: u64,
    pub connect_attempts: u32,
    pub retry_backoff_ms: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct HamsciConfig {
    /// Frequencies (MHz) to mirror; empty mirrors every frequency.
    pub frequency_allowlist: Vec<f64>,
    pub analysis_frequency_hz: f64,
    pub min_samples: usize,
    pub smoothing_window: usize,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    pub flare_file: PathBuf,
    pub radar_dir: PathBuf,
    pub magnetometer_file: PathBuf,
    pub magnetometer_stations: Option<Vec<String>>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    pub mode: BatchMode,
    pub fail_fast: bool,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            paths: PathsConfig::default(),
            remote: RemoteConfig::default(),
            hamsci: HamsciConfig::default(),
            sources: SourcesConfig::default(),
            batch: BatchConfig::default(),
            stage: true,
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            data_root: PathBuf::from("data"),
            stage_root: PathBuf::from("data/stage"),
            credential_file: PathBuf::from("config/passcode.json"),
            node_list: PathBuf::from("config/nodelist.csv"),
        }
    }
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            transport: TransportKind::Ftp,
            root: String::new(),
            port: DEFAULT_FTP_PORT,
            timeout_secs: 60,
            connect_attempts: 1,
            retry_backoff_ms: 2_000,
        }
    }
}

impl Default for HamsciConfig {
    fn default() -> Self {
        Self {
            frequency_allowlist: Vec::new(),
            analysis_frequency_hz: 10e6,
            min_samples: 10,
            smoothing_window: 1,
        }
    }
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            flare_file: PathBuf::from("data/sources/goes.json"),
            radar_dir: PathBuf::from("data/sources/radar"),
            magnetometer_file: PathBuf::from("data/sources/supermag.json"),
            magnetometer_stations: None,
        }
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            mode: BatchMode::All,
            fail_fast: false,
        }
    }
}

impl RemoteConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            attempts: self.connect_attempts,
            backoff: Duration::from_millis(self.retry_backoff_ms),
        }
    }
}

impl WorkflowConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref)
            .with_context(|| format!("reading workflow config {}", path_ref.display()))?;
        let config: WorkflowConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing workflow config {}", path_ref.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.remote.timeout_secs > 0,
            "remote.timeout_secs must be > 0, got {}",
            self.remote.timeout_secs
        );
        anyhow::ensure!(
            self.remote.connect_attempts > 0,
            "remote.connect_attempts must be > 0, got {}",
            self.remote.connect_attempts
        );
        anyhow::ensure!(
            self.hamsci.analysis_frequency_hz > 0.0,
            "hamsci.analysis_frequency_hz must be > 0, got {}",
            self.hamsci.analysis_frequency_hz
        );
        anyhow::ensure!(
            self.hamsci.smoothing_window > 0,
            "hamsci.smoothing_window must be > 0, got {}",
            self.hamsci.smoothing_window
        );
        anyhow::ensure!(
            self.remote.transport != TransportKind::Directory || !self.remote.root.is_empty(),
            "remote.root must name a directory when remote.transport is directory"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn defaults_match_single_attempt_ftp() {
        let cfg = WorkflowConfig::default();
        assert_eq!(cfg.remote.transport, TransportKind::Ftp);
        assert_eq!(cfg.remote.port, 21);
        assert_eq!(cfg.remote.retry_policy().attempts, 1);
        assert_eq!(cfg.hamsci.min_samples, 10);
        assert_eq!(cfg.batch.mode, BatchMode::All);
        assert!(cfg.stage);
        cfg.validate().unwrap();
    }

    #[test]
    fn config_load_reads_partial_yaml() {
        let mut temp = NamedTempFile::new().unwrap();
        temp.write_all(
            b"remote:\n  transport: directory\n  root: /srv/grape\n  connect_attempts: 3\nhamsci:\n  frequency_allowlist: [10.0, 5.0]\nbatch:\n  mode: first_only\n",
        )
        .unwrap();
        let path = temp.into_temp_path();
        let cfg = WorkflowConfig::load(&path).unwrap();
        assert_eq!(cfg.remote.transport, TransportKind::Directory);
        assert_eq!(cfg.remote.retry_policy().attempts, 3);
        assert_eq!(cfg.remote.port, DEFAULT_FTP_PORT);
        assert_eq!(cfg.hamsci.frequency_allowlist, vec![10.0, 5.0]);
        assert_eq!(cfg.batch.mode, BatchMode::FirstOnly);
    }

    #[test]
    fn validation_rejects_directory_transport_without_root() {
        let mut cfg = WorkflowConfig::default();
        cfg.remote.transport = TransportKind::Directory;
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("remote.root"));
    }

    #[test]
    fn validation_rejects_zero_attempts() {
        let mut cfg = WorkflowConfig::default();
        cfg.remote.connect_attempts = 0;
        assert!(cfg.validate().unwrap_err().to_string().contains("connect_attempts"));
    }
}
