use serde::Serialize;
use std::sync::Mutex;

/// Counters for one engine instance.
#[derive(Debug, Default)]
pub struct MetricsRecorder {
    inner: Mutex<MetricsSnapshot>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub loads: usize,
    pub accepted: usize,
    pub dropped: usize,
    pub selections: usize,
    pub decisions: usize,
    pub view_changes: usize,
}

impl MetricsRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_load(&self, accepted: usize, dropped: usize) {
        if let Ok(mut metrics) = self.inner.lock() {
            metrics.loads += 1;
            metrics.accepted += accepted;
            metrics.dropped += dropped;
        }
    }

    pub fn record_selection(&self) {
        if let Ok(mut metrics) = self.inner.lock() {
            metrics.selections += 1;
        }
    }

    pub fn record_decision(&self) {
        if let Ok(mut metrics) = self.inner.lock() {
            metrics.decisions += 1;
        }
    }

    pub fn record_view_change(&self) {
        if let Ok(mut metrics) = self.inner.lock() {
            metrics.view_changes += 1;
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        self.inner
            .lock()
            .map(|metrics| *metrics)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate() {
        let metrics = MetricsRecorder::new();
        metrics.record_load(3, 1);
        metrics.record_load(2, 0);
        metrics.record_selection();
        metrics.record_decision();
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.loads, 2);
        assert_eq!(snapshot.accepted, 5);
        assert_eq!(snapshot.dropped, 1);
        assert_eq!(snapshot.selections, 1);
        assert_eq!(snapshot.decisions, 1);
        assert_eq!(snapshot.view_changes, 0);
    }
}
