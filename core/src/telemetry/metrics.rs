use serde::Serialize;
use std::sync::Mutex;

/// Counters for a single pipeline run. Built fresh by every run.
pub struct MetricsRecorder {
    inner: Mutex<RunStats>,
}

/// Snapshot of a run's counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunStats {
    pub frames: usize,
    pub frames_with_detections: usize,
    pub records: usize,
    pub malformed_frames: usize,
}

impl MetricsRecorder {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(RunStats::default()),
        }
    }

    pub fn record_frame(&self, records: usize) {
        if let Ok(mut stats) = self.inner.lock() {
            stats.frames += 1;
            stats.records += records;
            if records > 0 {
                stats.frames_with_detections += 1;
            }
        }
    }

    pub fn record_malformed(&self) {
        if let Ok(mut stats) = self.inner.lock() {
            stats.malformed_frames += 1;
        }
    }

    pub fn snapshot(&self) -> RunStats {
        self.inner.lock().map(|stats| *stats).unwrap_or_default()
    }
}

impl Default for MetricsRecorder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recorder_counts_frames_and_records() {
        let metrics = MetricsRecorder::new();
        metrics.record_frame(2);
        metrics.record_frame(0);
        metrics.record_malformed();

        let stats = metrics.snapshot();
        assert_eq!(stats.frames, 2);
        assert_eq!(stats.frames_with_detections, 1);
        assert_eq!(stats.records, 2);
        assert_eq!(stats.malformed_frames, 1);
    }
}
