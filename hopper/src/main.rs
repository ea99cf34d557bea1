use anyhow::Context;
use clap::{Parser, Subcommand};
use generator::profile::{build_offline_workspace, GeneratorConfig};
use hoppercore::credentials::CredentialVault;
use hoppercore::telemetry::MetricsRecorder;
use log::info;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use workflow::config::WorkflowConfig;
use workflow::events::{load_event_table, run_batch, BatchMode, BatchReport};
use workflow::runner::Hopper;

mod generator;
mod workflow;

#[derive(Parser)]
#[command(author, version, about = "Solar-flare event acquisition and staging driver")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Acquire and stage every event in the event table
    Run {
        /// Load a workflow config from YAML
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long, default_value = "config/events.csv")]
        events: PathBuf,
        /// Override the configured batch mode
        #[arg(long, value_enum)]
        mode: Option<BatchMode>,
        /// Stop at the first failed event
        #[arg(long, default_value_t = false)]
        fail_fast: bool,
        /// Fetch and plot without writing bundles
        #[arg(long, default_value_t = false)]
        no_stage: bool,
    },
    /// Encrypt remote credentials into a credential file
    Encrypt {
        #[arg(long)]
        host: String,
        #[arg(long)]
        user: String,
        #[arg(long)]
        password: String,
        #[arg(long, default_value = "config/passcode.json")]
        out: PathBuf,
    },
    /// Generate a synthetic workspace and run the full pipeline over it
    Offline {
        #[arg(long, default_value = "tools/data/offline")]
        workdir: PathBuf,
        #[arg(long, default_value_t = 0)]
        seed: u64,
    },
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    match Cli::parse().command {
        Command::Run {
            config,
            events,
            mode,
            fail_fast,
            no_stage,
        } => {
            let mut workflow_config = match config {
                Some(path) => WorkflowConfig::load(path)?,
                None => WorkflowConfig::default(),
            };
            if let Some(mode) = mode {
                workflow_config.batch.mode = mode;
            }
            workflow_config.batch.fail_fast |= fail_fast;
            if no_stage {
                workflow_config.stage = false;
            }
            run(workflow_config, &events)
        }
        Command::Encrypt {
            host,
            user,
            password,
            out,
        } => {
            write_credentials(&host, &user, &password, &out)?;
            println!("Credential file written to {}", out.display());
            Ok(())
        }
        Command::Offline { workdir, seed } => {
            let generator_config = GeneratorConfig {
                seed,
                ..Default::default()
            };
            let workspace = build_offline_workspace(&workdir, &generator_config)
                .with_context(|| format!("generating offline workspace in {}", workdir.display()))?;
            info!(
                "offline workspace ready with {} event(s), config at {}",
                workspace.rows.len(),
                workspace.config_file.display()
            );
            let report = run(workspace.config, &workspace.events_file);

            let summary = format!("workdir={} seed={} ok={}\n", workdir.display(), seed, report.is_ok());
            let mut log = OpenOptions::new()
                .create(true)
                .append(true)
                .open(workdir.join("offline_runs.log"))
                .context("opening offline run log")?;
            log.write_all(summary.as_bytes())?;
            report
        }
    }
}

/// Seals the credentials under a fresh passcode; parent directories of
/// `out` are created as needed.
fn write_credentials(host: &str, user: &str, password: &str, out: &Path) -> anyhow::Result<()> {
    CredentialVault::encrypt(host, user, password)
        .context("encrypting credentials")?
        .write_to(out)
        .with_context(|| format!("writing credential file {}", out.display()))
}

fn run(config: WorkflowConfig, events: &Path) -> anyhow::Result<()> {
    let rows = load_event_table(events)?;
    let mode = config.batch.mode;
    let fail_fast = config.batch.fail_fast;
    let metrics = MetricsRecorder::new();
    let mut hopper = Hopper::from_config(config);

    let report = run_batch(&mut hopper, &rows, mode, fail_fast, &metrics);
    print_report(&report);

    let snapshot = metrics.snapshot();
    info!(
        "batch metrics: {}",
        serde_json::to_string(&snapshot).context("encoding batch metrics")?
    );
    anyhow::ensure!(
        report.failed.is_empty(),
        "{} event(s) failed, first: {} ({})",
        report.failed.len(),
        report.failed[0].event,
        report.failed[0].error
    );
    Ok(())
}

fn print_report(report: &BatchReport) {
    for event in &report.completed {
        println!(
            "Event {} -> flare {}, synced {} files, staged {} nodes, omitted {}, radar records {}, magnetometer samples {}, figures {}, bundle {}",
            event.key,
            event.flare.goes_class,
            event.sync.synced,
            event.staged_nodes,
            event.omitted_nodes(),
            event.radar_records,
            event.magnetometer_samples,
            event.figures.len(),
            event
                .bundle_path
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "not staged".into())
        );
    }
    for failure in &report.failed {
        println!("Event {} failed: {}", failure.event, failure.error);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hoppercore::credentials::RemoteCredential;
    use tempfile::tempdir;

    #[test]
    fn encrypt_command_writes_an_unlockable_file_in_a_new_directory() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("fresh").join("config").join("passcode.json");
        write_credentials("ftp.example.org", "grape", "pw", &out).unwrap();

        let plain = RemoteCredential::load(&out).unwrap().unlock().unwrap();
        assert_eq!(plain.host, "ftp.example.org");
        assert_eq!(plain.user, "grape");
        assert_eq!(plain.password, "pw");
    }
}
