//! Fetching the hits of one segment.

use std::fmt;
use std::sync::Arc;

use log::{debug, trace, warn};

use crate::abort::check_abort;
use crate::error::Result;
use crate::fetch::RequestedCounts;
use crate::fetch::collector::SegmentSink;
use crate::fetch::phase::Phase;
use crate::filter::{CollationCache, HitFilter, SegmentHitFilter};
use crate::hit::{Hit, HitBuffer};
use crate::segment::{CompiledQuery, SegmentRef};
use crate::sequence::{MatchSourceHits, SingleSlotHitSequence};
use crate::stats::{ResultsStats, ResultsTally};

/// Lifecycle of a [`SegmentFetcher`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    /// The match source has not been created yet.
    Uninitialized,
    /// Reading; may be paused between runs.
    Running,
    /// Finished, stopped by a ceiling, failed or interrupted.
    Done,
}

/// Hits of the document currently being read.
#[derive(Debug, Default)]
struct DocumentBatch {
    doc: Option<u32>,
    hits: HitBuffer,
    tally: ResultsTally,
}

impl DocumentBatch {
    fn add(&mut self, hit: &Hit, storing: bool) {
        self.doc = Some(hit.doc);
        self.tally.increment(storing);
        if storing {
            self.hits.push(hit);
        }
    }

    /// Hand the document to the sink; returns the resulting phase.
    fn flush_into(&mut self, sink: &mut SegmentSink) -> Phase {
        if self.tally.is_empty() {
            return sink.phase();
        }
        let tally = self.tally.take();
        let phase = sink.collect(&self.hits, tally.counted);
        self.hits.clear();
        phase
    }

    fn discard(&mut self) {
        self.hits.clear();
        self.tally = ResultsTally::default();
    }
}

enum Outcome {
    Paused,
    Exhausted,
    CeilingReached,
}

/// Reads one segment's match source, filters and deduplicates its hits, and
/// hands them to the collector one document at a time.
///
/// A fetcher is run repeatedly: each run continues where the previous one
/// paused.
pub struct SegmentFetcher {
    segment: SegmentRef,
    query: Arc<dyn CompiledQuery>,
    filter: HitFilter,
    cache: CollationCache,
    requested: Arc<RequestedCounts>,
    sink: SegmentSink,
    state: WorkerState,
    source: Option<MatchSourceHits>,
    segment_filter: Option<Box<dyn SegmentHitFilter>>,
    document: DocumentBatch,
    last_accepted: Option<Hit>,
}

impl SegmentFetcher {
    /// Create a fetcher; nothing is read until [`run`](Self::run) is called.
    pub fn new(
        segment: SegmentRef,
        query: Arc<dyn CompiledQuery>,
        filter: HitFilter,
        cache: CollationCache,
        requested: Arc<RequestedCounts>,
        sink: SegmentSink,
    ) -> Self {
        SegmentFetcher {
            segment,
            query,
            filter,
            cache,
            requested,
            sink,
            state: WorkerState::Uninitialized,
            source: None,
            segment_filter: None,
            document: DocumentBatch::default(),
            last_accepted: None,
        }
    }

    /// The segment being read.
    pub fn segment(&self) -> &SegmentRef {
        &self.segment
    }

    /// Current state.
    pub fn state(&self) -> WorkerState {
        self.state
    }

    /// Has this fetcher stopped for good?
    pub fn is_done(&self) -> bool {
        self.state == WorkerState::Done
    }

    /// Estimated work left, for balancing fetchers over threads.
    pub fn estimated_doc_count(&self) -> u64 {
        self.segment.estimated_doc_count()
    }

    /// Read hits until the requested counts are met at a document boundary,
    /// the segment is exhausted or a ceiling stops the search.
    ///
    /// Every completed document is published before returning, on success and
    /// on error. On error (interruption or a failing match source) the
    /// incomplete current document is dropped and the fetcher is done.
    pub fn run(&mut self) -> Result<()> {
        let result = self.fetch();
        if let Err(e) = &result {
            self.document.discard();
            self.finish();
            if e.is_interrupted() {
                debug!("fetching segment {} interrupted", self.segment.id());
            } else {
                warn!("fetching segment {} failed: {e}", self.segment.id());
            }
        }
        self.sink.flush();
        result
    }

    fn initialize(&mut self) -> Result<()> {
        let id = self.segment.id();
        let source = self
            .query
            .match_source(self.segment.as_ref())
            .map_err(|e| e.in_segment(id))?;
        let Some(source) = source else {
            trace!("segment {id} has no matches");
            self.state = WorkerState::Done;
            return Ok(());
        };
        self.segment_filter = self
            .filter
            .for_segment(&self.segment, &self.cache)
            .map_err(|e| e.in_segment(id))?;
        self.source = Some(MatchSourceHits::new(source));
        self.state = WorkerState::Running;
        Ok(())
    }

    fn fetch(&mut self) -> Result<()> {
        if self.state == WorkerState::Uninitialized {
            self.initialize()?;
        }
        let Some(source) = self.source.as_mut() else {
            return Ok(());
        };
        let id = self.segment.id();

        let outcome = loop {
            check_abort()?;
            if !source.advance().map_err(|e| e.in_segment(id))? {
                self.document.flush_into(&mut self.sink);
                break Outcome::Exhausted;
            }
            let hit = source.latest()?;

            if let Some(filter) = self.segment_filter.as_mut() {
                if !filter.test(hit, 0).map_err(|e| e.in_segment(id))? {
                    continue;
                }
            }
            if self.last_accepted.as_ref() == Some(hit) {
                continue;
            }

            let boundary = self.document.doc.is_some_and(|doc| doc != hit.doc);
            if boundary && self.document.flush_into(&mut self.sink) == Phase::Done {
                self.sink.report_overflow();
                break Outcome::CeilingReached;
            }
            self.document.add(hit, self.sink.phase().is_storing());
            match self.last_accepted.as_mut() {
                Some(last) => last.clone_from(hit),
                None => self.last_accepted = Some(hit.clone()),
            }

            if boundary && requests_met(&self.requested, self.sink.stats()) {
                break Outcome::Paused;
            }
        };

        match outcome {
            Outcome::Paused => trace!("segment {id} paused"),
            Outcome::Exhausted => {
                trace!("segment {id} exhausted");
                self.finish();
            }
            Outcome::CeilingReached => {
                trace!("segment {id} stopped at the counting ceiling");
                self.finish();
            }
        }
        Ok(())
    }

    /// Stop a paused fetcher because the counting ceiling was reached
    /// elsewhere. Hits it already read past the ceiling are reported.
    pub fn abandon(&mut self) {
        if !self.document.tally.is_empty() {
            self.sink.report_overflow();
        }
        self.document.discard();
        self.finish();
    }

    fn finish(&mut self) {
        self.state = WorkerState::Done;
        self.source = None;
        self.segment_filter = None;
    }
}

fn requests_met(requested: &RequestedCounts, stats: &ResultsStats) -> bool {
    stats.processed_so_far() >= requested.process() && stats.counted_so_far() >= requested.count()
}

impl fmt::Debug for SegmentFetcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SegmentFetcher")
            .field("segment", &self.segment.id())
            .field("state", &self.state)
            .field("pending", &self.document.tally)
            .finish()
    }
}
