//! Parallel, lazy fetching of hits from all segments.
//!
//! A [`FetchCoordinator`] owns one [`SegmentFetcher`] per segment. Callers ask
//! for a number of hits; the coordinator raises the shared request counters
//! and runs the fetchers on a small thread pool until the request is met or
//! everything has been read. Fetchers pause at document boundaries once the
//! request is met and continue where they left off on the next request.

pub mod collector;
pub mod coordinator;
pub mod parallel;
pub mod phase;
pub mod worker;

pub use collector::{HitCollector, SegmentHits, SegmentSink};
pub use coordinator::FetchCoordinator;
pub use parallel::make_equal_groups;
pub use phase::{Phase, SharedPhase};
pub use worker::{SegmentFetcher, WorkerState};

use std::sync::atomic::{AtomicU64, Ordering};

/// How many hits callers have asked for so far. Both values only grow.
#[derive(Debug, Default)]
pub struct RequestedCounts {
    process: AtomicU64,
    count: AtomicU64,
}

impl RequestedCounts {
    /// Create zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the counters to at least the given values.
    ///
    /// The processing counter is raised first: a fetcher that sees the new
    /// counting target must also see the processing target that goes with it.
    pub fn raise(&self, process: u64, count: u64) {
        self.process.fetch_max(process, Ordering::SeqCst);
        self.count.fetch_max(count, Ordering::SeqCst);
    }

    /// Requested number of stored hits.
    pub fn process(&self) -> u64 {
        self.process.load(Ordering::SeqCst)
    }

    /// Requested number of counted hits.
    pub fn count(&self) -> u64 {
        self.count.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requested_counts_only_grow() {
        let requested = RequestedCounts::new();
        requested.raise(10, 30);
        requested.raise(5, 20);
        assert_eq!(requested.process(), 10);
        assert_eq!(requested.count(), 30);
        requested.raise(15, 15);
        assert_eq!(requested.process(), 15);
        assert_eq!(requested.count(), 30);
    }
}
