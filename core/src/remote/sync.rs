use super::naming::{matches_convention, RemoteFileRecord};
use super::remote_path;
use super::session::{RemoteSession, RemoteTransport};
use crate::prelude::{PipelineError, PipelineResult, TimeWindow};
use crate::telemetry::log::LogManager;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Counts for one sync pass. `synced` is the number of newly mirrored files.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub listed: usize,
    pub candidates: usize,
    pub parse_skipped: usize,
    pub outside_filter: usize,
    pub already_present: usize,
    pub synced: usize,
}

/// Incremental mirror of remote Grape files into one local directory.
pub struct RemoteSync {
    mirror_dir: PathBuf,
    logger: LogManager,
}

impl RemoteSync {
    pub fn new(mirror_dir: impl Into<PathBuf>) -> Self {
        Self {
            mirror_dir: mirror_dir.into(),
            logger: LogManager::named("remote-sync"),
        }
    }

    pub fn mirror_dir(&self) -> &Path {
        &self.mirror_dir
    }

    /// Lists `remote_root`, keeps files inside the window and allow-list and
    /// fetches those not already mirrored.
    ///
    /// The window is compared on dates only: a file dated on the window's
    /// start or end day is kept even if the window starts late or ends early
    /// that day. An empty allow-list means no frequency filtering.
    pub fn sync<T: RemoteTransport>(
        &self,
        session: &mut RemoteSession<T>,
        remote_root: &str,
        window: &TimeWindow,
        frequency_allowlist: Option<&[f64]>,
    ) -> PipelineResult<SyncReport> {
        fs::create_dir_all(&self.mirror_dir)
            .map_err(|e| PipelineError::io(&self.mirror_dir, e))?;

        let entries = session.list(remote_root)?;
        let (selected, mut report) = self.select(&entries, window, frequency_allowlist);
        self.logger.record(&format!(
            "{} remote files, {} candidates, {} after filtering",
            report.listed,
            report.candidates,
            selected.len()
        ));

        for record in selected {
            let target = self.mirror_dir.join(&record.filename);
            if target.exists() {
                report.already_present += 1;
                continue;
            }
            let mut staging = NamedTempFile::new_in(&self.mirror_dir)
                .map_err(|e| PipelineError::io(&self.mirror_dir, e))?;
            let bytes = session.retrieve(&remote_path(remote_root, &record.filename), staging.as_file_mut())?;
            staging
                .persist(&target)
                .map_err(|e| PipelineError::io(&target, e.error))?;
            self.logger
                .debug(&format!("mirrored {} ({} bytes)", record.filename, bytes));
            report.synced += 1;
        }

        self.logger.record(&format!(
            "synced {} new files, {} already present",
            report.synced, report.already_present
        ));
        Ok(report)
    }

    /// Filters raw listing entries down to the files worth mirroring.
    pub fn select(
        &self,
        entries: &[String],
        window: &TimeWindow,
        frequency_allowlist: Option<&[f64]>,
    ) -> (Vec<RemoteFileRecord>, SyncReport) {
        let mut report = SyncReport {
            listed: entries.len(),
            ..Default::default()
        };
        let (first_day, last_day) = window.dates();
        let allowlist = frequency_allowlist.filter(|list| !list.is_empty());

        let mut selected = Vec::new();
        for entry in entries {
            let name = entry.rsplit('/').next().unwrap_or(entry);
            if !matches_convention(name) {
                continue;
            }
            report.candidates += 1;
            let record = match RemoteFileRecord::parse(name) {
                Ok(record) => record,
                Err(reason) => {
                    self.logger.record(&format!("skipping {}: {}", name, reason));
                    report.parse_skipped += 1;
                    continue;
                }
            };
            let frequency_ok = allowlist
                .map(|list| list.iter().any(|&f| record.matches_frequency(f)))
                .unwrap_or(true);
            let date_ok = record.file_date >= first_day && record.file_date <= last_day;
            if frequency_ok && date_ok {
                selected.push(record);
            } else {
                report.outside_filter += 1;
            }
        }
        (selected, report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::session::tests::MemoryTransport;
    use chrono::{TimeZone, Utc};
    use tempfile::tempdir;

    fn october_window() -> TimeWindow {
        TimeWindow::new(
            Utc.with_ymd_and_hms(2021, 10, 28, 14, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2021, 10, 29, 2, 0, 0).unwrap(),
        )
        .unwrap()
    }

    fn remote_names() -> Vec<&'static str> {
        vec![
            "2021-10-27T000000Z_N0000001_FRQ_WWV10.csv",
            "2021-10-28T000000Z_N0000001_FRQ_WWV10.csv",
            "2021-10-28T000000Z_N0000002_FRQ_WWV5.csv",
            "2021-10-29T000000Z_N0000001_FRQ_WWV10.csv",
            "2021-10-28T000000Z_N0000003_FRQ_WWVten.csv",
            "2021-10-30T000000Z_N0000001_FRQ_WWV10.csv",
            "notes.txt",
        ]
    }

    #[test]
    fn selection_applies_window_and_allowlist() {
        let sync = RemoteSync::new("unused");
        let entries: Vec<String> = remote_names().into_iter().map(String::from).collect();
        let (selected, report) = sync.select(&entries, &october_window(), Some(&[10.0]));

        let names: Vec<_> = selected.iter().map(|r| r.filename.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "2021-10-28T000000Z_N0000001_FRQ_WWV10.csv",
                "2021-10-29T000000Z_N0000001_FRQ_WWV10.csv",
            ]
        );
        assert_eq!(report.listed, 7);
        assert_eq!(report.candidates, 6);
        assert_eq!(report.parse_skipped, 1);
        assert_eq!(report.outside_filter, 3);
    }

    #[test]
    fn window_boundaries_compare_on_dates() {
        let sync = RemoteSync::new("unused");
        // Window covers only the last minutes of the 29th, yet the whole day's file qualifies.
        let window = TimeWindow::new(
            Utc.with_ymd_and_hms(2021, 10, 29, 23, 50, 0).unwrap(),
            Utc.with_ymd_and_hms(2021, 10, 29, 23, 59, 0).unwrap(),
        )
        .unwrap();
        let entries = vec!["2021-10-29T000000Z_N0000001_FRQ_WWV10.csv".to_string()];
        let (selected, _) = sync.select(&entries, &window, None);
        assert_eq!(selected.len(), 1);
    }

    #[test]
    fn empty_allowlist_does_not_filter() {
        let sync = RemoteSync::new("unused");
        let entries: Vec<String> = remote_names().into_iter().map(String::from).collect();
        let (with_empty, _) = sync.select(&entries, &october_window(), Some(&[]));
        let (with_none, _) = sync.select(&entries, &october_window(), None);
        assert_eq!(with_empty, with_none);
        assert_eq!(with_none.len(), 3);
    }

    #[test]
    fn second_sync_fetches_nothing_and_keeps_mirror_identical() {
        let dir = tempdir().unwrap();
        let sync = RemoteSync::new(dir.path().join("hamsci"));
        let mut session = RemoteSession::new(MemoryTransport::with_files(remote_names()));
        session.connect().unwrap();

        let first = sync.sync(&mut session, "", &october_window(), None).unwrap();
        assert_eq!(first.synced, 3);
        let snapshot: Vec<(String, Vec<u8>)> = mirror_contents(sync.mirror_dir());

        let second = sync.sync(&mut session, "", &october_window(), None).unwrap();
        assert_eq!(second.synced, 0);
        assert_eq!(second.already_present, 3);
        assert_eq!(mirror_contents(sync.mirror_dir()), snapshot);
        assert_eq!(session.transport().retrievals.len(), 3);
    }

    #[test]
    fn empty_listing_syncs_nothing() {
        let dir = tempdir().unwrap();
        let sync = RemoteSync::new(dir.path());
        let mut session = RemoteSession::new(MemoryTransport::default());
        session.connect().unwrap();
        let report = sync.sync(&mut session, "", &october_window(), Some(&[2.5])).unwrap();
        assert_eq!(report, SyncReport::default());
    }

    #[test]
    fn sync_requires_connected_session() {
        let dir = tempdir().unwrap();
        let sync = RemoteSync::new(dir.path());
        let mut session = RemoteSession::new(MemoryTransport::with_files(remote_names()));
        assert!(matches!(
            sync.sync(&mut session, "", &october_window(), None),
            Err(PipelineError::Connection(_))
        ));
    }

    fn mirror_contents(dir: &Path) -> Vec<(String, Vec<u8>)> {
        let mut files: Vec<_> = fs::read_dir(dir)
            .unwrap()
            .map(|entry| {
                let entry = entry.unwrap();
                (
                    entry.file_name().to_string_lossy().into_owned(),
                    fs::read(entry.path()).unwrap(),
                )
            })
            .collect();
        files.sort();
        files
    }
}
