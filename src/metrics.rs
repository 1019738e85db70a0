use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters describing summarization activity.
#[derive(Default)]
pub struct SummaryMetrics {
    summaries_completed: AtomicU64,
    summaries_failed: AtomicU64,
    characters_summarized: AtomicU64,
}

impl SummaryMetrics {
    /// Create an empty metrics accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a successful summary and the size of the text that produced it.
    pub fn record_success(&self, input_chars: u64) {
        self.summaries_completed.fetch_add(1, Ordering::Relaxed);
        self.characters_summarized
            .fetch_add(input_chars, Ordering::Relaxed);
    }

    /// Record a request that terminated with an error.
    pub fn record_failure(&self) {
        self.summaries_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Return a snapshot of the current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            summaries_completed: self.summaries_completed.load(Ordering::Relaxed),
            summaries_failed: self.summaries_failed.load(Ordering::Relaxed),
            characters_summarized: self.characters_summarized.load(Ordering::Relaxed),
        }
    }
}

/// Immutable view of summarization counters used for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct MetricsSnapshot {
    /// Requests that produced a rendered summary since startup.
    pub summaries_completed: u64,
    /// Requests that ended in an error since startup.
    pub summaries_failed: u64,
    /// Total input characters sent for summarization.
    pub characters_summarized: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_successes_and_failures() {
        let metrics = SummaryMetrics::new();
        metrics.record_success(120);
        metrics.record_success(80);
        metrics.record_failure();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.summaries_completed, 2);
        assert_eq!(snapshot.summaries_failed, 1);
        assert_eq!(snapshot.characters_summarized, 200);
    }

    #[test]
    fn snapshot_starts_empty() {
        let metrics = SummaryMetrics::new();
        assert_eq!(metrics.snapshot().summaries_completed, 0);
        assert_eq!(metrics.snapshot().summaries_failed, 0);
    }
}
