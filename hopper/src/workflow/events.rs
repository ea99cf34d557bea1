//! Event table input and the batch driver.

use crate::workflow::runner::{EventReport, EventSpec, Hopper};
use anyhow::{anyhow, Context};
use chrono::{DateTime, NaiveDateTime, Utc};
use clap::ValueEnum;
use hoppercore::telemetry::MetricsRecorder;
use hoppercore::{Event, TimeWindow};
use log::{error, info};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

const COLUMNS: [&str; 6] = ["event", "start", "end", "rads", "s_time", "e_time"];

/// One row of the event table.
#[derive(Debug, Clone, PartialEq)]
pub struct EventRow {
    pub event: DateTime<Utc>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub radars: Vec<String>,
    pub s_time: DateTime<Utc>,
    pub e_time: DateTime<Utc>,
}

impl EventRow {
    pub fn to_spec(&self) -> anyhow::Result<EventSpec> {
        Ok(EventSpec {
            event: Event::new(self.start, self.event, self.end)?,
            fetch_window: TimeWindow::new(self.s_time, self.e_time)?,
            radars: self.radars.clone(),
        })
    }
}

pub fn load_event_table<P: AsRef<Path>>(path: P) -> anyhow::Result<Vec<EventRow>> {
    let path_ref = path.as_ref();
    let contents = fs::read_to_string(path_ref)
        .with_context(|| format!("reading event table {}", path_ref.display()))?;
    parse_event_table(&contents).with_context(|| format!("parsing event table {}", path_ref.display()))
}

pub fn parse_event_table(contents: &str) -> anyhow::Result<Vec<EventRow>> {
    let mut lines = contents
        .lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'));

    let (_, header) = lines.next().ok_or_else(|| anyhow!("event table is empty"))?;
    let positions: HashMap<&str, usize> = header.split(',').map(str::trim).enumerate().map(|(i, c)| (c, i)).collect();
    for column in COLUMNS {
        anyhow::ensure!(positions.contains_key(column), "missing column {}", column);
    }

    let mut rows = Vec::new();
    for (line_no, line) in lines {
        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        let field = |name: &str| -> anyhow::Result<&str> {
            fields
                .get(positions[name])
                .copied()
                .ok_or_else(|| anyhow!("line {}: missing {}", line_no, name))
        };
        let stamp = |name: &str| -> anyhow::Result<DateTime<Utc>> {
            parse_timestamp(field(name)?).with_context(|| format!("line {}: column {}", line_no, name))
        };
        rows.push(EventRow {
            event: stamp("event")?,
            start: stamp("start")?,
            end: stamp("end")?,
            radars: field("rads")?
                .split('-')
                .map(str::trim)
                .filter(|r| !r.is_empty())
                .map(String::from)
                .collect(),
            s_time: stamp("s_time")?,
            e_time: stamp("e_time")?,
        });
    }
    Ok(rows)
}

/// Accepts RFC 3339 or a naive `YYYY-MM-DD[ T]HH:MM[:SS]` taken as UTC.
pub fn parse_timestamp(value: &str) -> anyhow::Result<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Ok(parsed.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(naive.and_utc());
        }
    }
    Err(anyhow!("unrecognized timestamp {:?}", value))
}

/// Which rows of the event table a batch processes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum BatchMode {
    All,
    FirstOnly,
}

#[derive(Debug, Clone)]
pub struct EventFailure {
    pub event: String,
    pub error: String,
}

#[derive(Debug, Default)]
pub struct BatchReport {
    pub completed: Vec<EventReport>,
    pub failed: Vec<EventFailure>,
}

/// Runs the orchestrator over the table, one event at a time.
///
/// A failed event aborts only itself unless `fail_fast` is set.
pub fn run_batch(
    hopper: &mut Hopper,
    rows: &[EventRow],
    mode: BatchMode,
    fail_fast: bool,
    metrics: &MetricsRecorder,
) -> BatchReport {
    let selected = match mode {
        BatchMode::All => rows,
        BatchMode::FirstOnly => &rows[..rows.len().min(1)],
    };
    info!("processing {} of {} events", selected.len(), rows.len());

    let mut report = BatchReport::default();
    for row in selected {
        let label = row.event.format("%Y-%m-%d-%H-%M").to_string();
        match row.to_spec().and_then(|spec| hopper.run_event(&spec)) {
            Ok(event_report) => {
                metrics.record_event(
                    event_report.sync.synced,
                    event_report.staged_nodes,
                    event_report.omitted_nodes(),
                );
                report.completed.push(event_report);
            }
            Err(err) => {
                error!("event {} aborted: {:#}", label, err);
                metrics.record_failure();
                report.failed.push(EventFailure {
                    event: label,
                    error: format!("{:#}", err),
                });
                if fail_fast {
                    break;
                }
            }
        }
    }
    report
}
