//! Result statistics: how many hits (or documents) were processed and counted.
//!
//! "Processed" means stored in the result buffer, "counted" means seen and
//! counted but not necessarily stored. `processed <= counted` holds in every
//! snapshot.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Counts accumulated locally by one worker before they are merged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResultsTally {
    /// Hits stored.
    pub processed: u64,
    /// Hits counted.
    pub counted: u64,
}

impl ResultsTally {
    /// Record one hit; it is stored if the search was still storing.
    pub fn increment(&mut self, storing: bool) {
        self.counted += 1;
        if storing {
            self.processed += 1;
        }
    }

    /// Is there nothing to merge?
    pub fn is_empty(&self) -> bool {
        self.counted == 0
    }

    /// Return the tally and reset it to zero.
    pub fn take(&mut self) -> ResultsTally {
        std::mem::take(self)
    }
}

/// Whether the configured ceilings were hit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaxStats {
    /// More hits were found than could be stored.
    pub hits_processed_exceeded: bool,
    /// More hits were found than could be counted.
    pub hits_counted_exceeded: bool,
}

impl MaxStats {
    /// Was any ceiling hit?
    pub fn exceeded(&self) -> bool {
        self.hits_processed_exceeded || self.hits_counted_exceeded
    }
}

/// Point-in-time copy of [`ResultsStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultsStatsSnapshot {
    /// Items stored so far.
    pub processed_so_far: u64,
    /// Items counted so far.
    pub counted_so_far: u64,
    /// The processing ceiling was exceeded.
    pub ceiling_on_processing_exceeded: bool,
    /// The counting ceiling was exceeded.
    pub ceiling_on_counting_exceeded: bool,
    /// Retrieval has finished.
    pub done: bool,
}

/// Shared statistics, updated only under the collector's lock and readable
/// from any thread at any time.
#[derive(Debug, Default)]
pub struct ResultsStats {
    processed: AtomicU64,
    counted: AtomicU64,
    processing_exceeded: AtomicBool,
    counting_exceeded: AtomicBool,
    done: AtomicBool,
}

impl ResultsStats {
    /// Create zeroed statistics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add to the counters.
    ///
    /// `counted` is published before `processed`, so a reader that loads
    /// `processed` first never sees it above `counted`.
    pub(crate) fn add(&self, processed: u64, counted: u64) {
        debug_assert!(processed <= counted);
        self.counted.fetch_add(counted, Ordering::SeqCst);
        self.processed.fetch_add(processed, Ordering::SeqCst);
    }

    pub(crate) fn set_processing_exceeded(&self) {
        self.processing_exceeded.store(true, Ordering::SeqCst);
    }

    pub(crate) fn set_counting_exceeded(&self) {
        self.counting_exceeded.store(true, Ordering::SeqCst);
    }

    pub(crate) fn set_done(&self) {
        self.done.store(true, Ordering::SeqCst);
    }

    /// Items stored so far.
    pub fn processed_so_far(&self) -> u64 {
        self.processed.load(Ordering::SeqCst)
    }

    /// Items counted so far.
    pub fn counted_so_far(&self) -> u64 {
        self.counted.load(Ordering::SeqCst)
    }

    /// Has retrieval finished?
    pub fn done(&self) -> bool {
        self.done.load(Ordering::SeqCst)
    }

    /// Which ceilings were hit.
    pub fn max_stats(&self) -> MaxStats {
        MaxStats {
            hits_processed_exceeded: self.processing_exceeded.load(Ordering::SeqCst),
            hits_counted_exceeded: self.counting_exceeded.load(Ordering::SeqCst),
        }
    }

    /// Take a consistent-enough snapshot (`processed <= counted` holds).
    pub fn snapshot(&self) -> ResultsStatsSnapshot {
        let done = self.done();
        let processed_so_far = self.processed_so_far();
        let counted_so_far = self.counted_so_far();
        let max = self.max_stats();
        ResultsStatsSnapshot {
            processed_so_far,
            counted_so_far,
            ceiling_on_processing_exceeded: max.hits_processed_exceeded,
            ceiling_on_counting_exceeded: max.hits_counted_exceeded,
            done,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tally() {
        let mut tally = ResultsTally::default();
        assert!(tally.is_empty());
        tally.increment(true);
        tally.increment(true);
        tally.increment(false);
        assert_eq!(
            tally,
            ResultsTally {
                processed: 2,
                counted: 3
            }
        );

        let taken = tally.take();
        assert_eq!(taken.counted, 3);
        assert!(tally.is_empty());
    }

    #[test]
    fn test_stats_snapshot() {
        let stats = ResultsStats::new();
        stats.add(2, 5);
        stats.add(0, 1);
        stats.set_processing_exceeded();

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.processed_so_far, 2);
        assert_eq!(snapshot.counted_so_far, 6);
        assert!(snapshot.ceiling_on_processing_exceeded);
        assert!(!snapshot.ceiling_on_counting_exceeded);
        assert!(!snapshot.done);
        assert!(stats.max_stats().exceeded());

        stats.set_done();
        assert!(stats.done());
    }

    #[test]
    fn test_snapshot_serializes() {
        let snapshot = ResultsStatsSnapshot {
            processed_so_far: 1,
            counted_so_far: 2,
            ..Default::default()
        };
        let json = serde_json::to_value(snapshot).unwrap();
        assert_eq!(json["processed_so_far"], 1);
        assert_eq!(json["ceiling_on_counting_exceeded"], false);
    }
}
