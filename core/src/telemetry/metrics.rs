use serde::Serialize;
use std::sync::Mutex;

/// Batch-level counters shared across event runs.
pub struct MetricsRecorder {
    inner: Mutex<Metrics>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Metrics {
    pub events_processed: usize,
    pub events_failed: usize,
    pub files_synced: usize,
    pub nodes_staged: usize,
    pub nodes_omitted: usize,
}

impl MetricsRecorder {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Metrics::default()),
        }
    }

    pub fn record_event(&self, files_synced: usize, nodes_staged: usize, nodes_omitted: usize) {
        if let Ok(mut metrics) = self.inner.lock() {
            metrics.events_processed += 1;
            metrics.files_synced += files_synced;
            metrics.nodes_staged += nodes_staged;
            metrics.nodes_omitted += nodes_omitted;
        }
    }

    pub fn record_failure(&self) {
        if let Ok(mut metrics) = self.inner.lock() {
            metrics.events_failed += 1;
        }
    }

    pub fn snapshot(&self) -> Metrics {
        self.inner
            .lock()
            .map(|metrics| *metrics)
            .unwrap_or_default()
    }
}

impl Default for MetricsRecorder {
    fn default() -> Self {
        Self::new()
    }
}
