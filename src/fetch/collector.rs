//! Collecting hits from segment workers into one result.
//!
//! Every segment appends to its own [`SharedHitBuffer`], with segment-local
//! document ids. The global result is a list of stretches: runs of consecutive
//! hits from one segment. A sink publishes a stretch once enough unpublished
//! hits have piled up, and always when flushed, so readers see hits in batches
//! without taking a lock per hit. Stretches only end at document boundaries,
//! so a document's hits are never split up in the global result.

use std::sync::Arc;

use log::trace;
use parking_lot::{Mutex, RwLock};

use crate::fetch::phase::{Phase, SharedPhase};
use crate::error::Result;
use crate::hit::{CapturedSpans, Hit, HitBuffer, SharedHitBuffer, global_doc};
use crate::segment::SegmentRef;
use crate::stats::ResultsStats;

/// Minimum number of hits in a published stretch (except on flush).
const MIN_STRETCH: usize = 10;

/// Maximum number of hits a sink holds back before publishing.
const MAX_STRETCH: usize = 10_000;

/// Hits a sink may hold back, given the current size of the global result.
fn stretch_threshold(global_size: usize) -> usize {
    (global_size / 10).clamp(MIN_STRETCH, MAX_STRETCH)
}

#[derive(Debug, Clone, Copy)]
struct Stretch {
    segment: usize,
    first_in_segment: usize,
    first_global: usize,
    len: usize,
}

#[derive(Debug, Default)]
struct GlobalView {
    stretches: Vec<Stretch>,
    size: usize,
}

impl GlobalView {
    fn locate(&self, index: usize) -> Option<(usize, usize)> {
        if index >= self.size {
            return None;
        }
        let pos = self
            .stretches
            .partition_point(|s| s.first_global <= index)
            .checked_sub(1)?;
        let stretch = &self.stretches[pos];
        Some((stretch.segment, stretch.first_in_segment + index - stretch.first_global))
    }
}

/// One segment's hits.
#[derive(Debug, Clone)]
pub struct SegmentHits {
    /// The segment.
    pub segment: SegmentRef,
    /// Its hits, with segment-local document ids.
    pub hits: SharedHitBuffer,
}

/// Merges per-segment batches into the result buffers and statistics.
#[derive(Debug)]
pub struct HitCollector {
    segments: Vec<SegmentHits>,
    view: RwLock<GlobalView>,
    collect_lock: Mutex<()>,
    stats: ResultsStats,
    docs_stats: ResultsStats,
    phase: SharedPhase,
    max_process: u64,
    max_count: u64,
}

impl HitCollector {
    /// Create a collector for `segments` with the given ceilings.
    pub fn new(segments: &[SegmentRef], max_process: u64, max_count: u64) -> Self {
        HitCollector {
            segments: segments
                .iter()
                .map(|segment| SegmentHits {
                    segment: Arc::clone(segment),
                    hits: SharedHitBuffer::new(),
                })
                .collect(),
            view: RwLock::new(GlobalView::default()),
            collect_lock: Mutex::new(()),
            stats: ResultsStats::new(),
            docs_stats: ResultsStats::new(),
            phase: SharedPhase::new(),
            max_process,
            max_count,
        }
    }

    /// Get the sink for segment number `segment`. Only one worker may use it.
    pub fn segment_sink(self: &Arc<Self>, segment: usize) -> SegmentSink {
        debug_assert!(segment < self.segments.len());
        SegmentSink {
            collector: Arc::clone(self),
            segment,
            published: 0,
            appended: 0,
        }
    }

    /// Current phase.
    pub fn phase(&self) -> Phase {
        self.phase.get()
    }

    /// Hit statistics.
    pub fn stats(&self) -> &ResultsStats {
        &self.stats
    }

    /// Document statistics.
    pub fn docs_stats(&self) -> &ResultsStats {
        &self.docs_stats
    }

    /// The per-segment hits.
    pub fn segments(&self) -> &[SegmentHits] {
        &self.segments
    }

    /// Number of hits in the global result.
    pub fn size(&self) -> usize {
        self.view.read().size
    }

    /// Copy global hit `index` into `out`, with a global document id.
    /// Returns false if the hit is not published yet.
    pub fn get_into(&self, index: usize, out: &mut Hit) -> Result<bool> {
        let Some((segment, local)) = self.view.read().locate(index) else {
            return Ok(false);
        };
        let slot = &self.segments[segment];
        if !slot.hits.get_into(local, out) {
            return Ok(false);
        }
        out.doc = global_doc(slot.segment.doc_base(), out.doc)?;
        Ok(true)
    }

    /// Read one column of global hit `index`.
    pub(crate) fn read<R>(&self, index: usize, f: impl FnOnce(&HitBuffer, usize, u32) -> R) -> Option<R> {
        let (segment, local) = self.view.read().locate(index)?;
        let slot = &self.segments[segment];
        let doc_base = slot.segment.doc_base();
        slot.hits
            .read(|hits| (local < hits.len()).then(|| f(hits, local, doc_base)))
    }

    /// Captures of global hit `index`.
    pub fn captures(&self, index: usize) -> Option<Option<CapturedSpans>> {
        self.read(index, |hits, local, _| hits.captures(local).cloned())
    }

    /// Mark retrieval as complete.
    pub fn mark_done(&self) {
        self.phase.advance_to(Phase::Done);
        self.stats.set_done();
        self.docs_stats.set_done();
    }

    fn phase_for(&self, processed: u64, counted: u64) -> Phase {
        if counted >= self.max_count {
            Phase::Done
        } else if processed >= self.max_process {
            Phase::CountingOnly
        } else {
            Phase::StoringAndCounting
        }
    }
}

/// Handle through which one worker hands its hits to the collector.
#[derive(Debug)]
pub struct SegmentSink {
    collector: Arc<HitCollector>,
    segment: usize,
    published: usize,
    appended: usize,
}

impl SegmentSink {
    /// Merge one complete document: the hits stored from it and the number of
    /// hits counted in it.
    ///
    /// Hits beyond the processing ceiling are dropped; counts beyond the
    /// counting ceiling are dropped too, and both are recorded in the
    /// statistics. Returns the phase after merging.
    pub fn collect(&mut self, batch: &HitBuffer, counted: u64) -> Phase {
        debug_assert!(batch.len() as u64 <= counted);
        let collector = &*self.collector;
        let stored = {
            let _guard = collector.collect_lock.lock();
            let stats = &collector.stats;

            let count_room = collector.max_count.saturating_sub(stats.counted_so_far());
            let accepted = counted.min(count_room);
            if accepted < counted {
                stats.set_counting_exceeded();
            }
            let store_room = collector.max_process.saturating_sub(stats.processed_so_far());
            let stored = (batch.len() as u64).min(store_room).min(accepted);
            if stored < counted {
                stats.set_processing_exceeded();
            }

            let stored = stored as usize;
            if stored == batch.len() {
                collector.segments[self.segment].hits.append(batch);
            } else if stored > 0 {
                let mut kept = batch.clone();
                kept.truncate(stored);
                collector.segments[self.segment].hits.append(&kept);
            }
            stats.add(stored as u64, accepted);
            collector
                .docs_stats
                .add(u64::from(stored > 0), u64::from(accepted > 0));

            let phase = collector.phase_for(stats.processed_so_far(), stats.counted_so_far());
            collector.phase.advance_to(phase);
            stored
        };
        self.appended += stored;

        let pending = self.appended - self.published;
        if pending > stretch_threshold(self.collector.size()) {
            self.publish();
        }
        self.collector.phase()
    }

    /// Record that a hit was found after the counting ceiling was reached.
    pub fn report_overflow(&self) {
        let stats = &self.collector.stats;
        stats.set_counting_exceeded();
        stats.set_processing_exceeded();
    }

    /// Publish all appended hits to the global result. Idempotent.
    pub fn flush(&mut self) {
        self.publish();
    }

    /// Current phase of the retrieval.
    pub fn phase(&self) -> Phase {
        self.collector.phase()
    }

    /// Hit statistics of the retrieval.
    pub fn stats(&self) -> &ResultsStats {
        &self.collector.stats
    }

    fn publish(&mut self) {
        let len = self.appended - self.published;
        if len == 0 {
            return;
        }
        let mut view = self.collector.view.write();
        let stretch = Stretch {
            segment: self.segment,
            first_in_segment: self.published,
            first_global: view.size,
            len,
        };
        trace!(
            "publishing {} hits of segment {} at {}",
            stretch.len, self.segment, stretch.first_global
        );
        view.size += stretch.len;
        view.stretches.push(stretch);
        self.published = self.appended;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segment::memory::MemorySegment;

    fn segments(count: usize) -> Vec<SegmentRef> {
        (0..count)
            .map(|i| {
                Arc::new(MemorySegment::empty(format!("s{i}"), (i * 100) as u32, 50)) as SegmentRef
            })
            .collect()
    }

    fn doc(doc: u32, hits: u32) -> HitBuffer {
        (0..hits).map(|i| Hit::new(doc, i, i + 1)).collect()
    }

    #[test]
    fn test_threshold() {
        assert_eq!(stretch_threshold(0), 10);
        assert_eq!(stretch_threshold(500), 50);
        assert_eq!(stretch_threshold(10_000_000), 10_000);
    }

    #[test]
    fn test_flush_publishes_with_global_doc_ids() {
        let collector = Arc::new(HitCollector::new(&segments(2), u64::MAX, u64::MAX));
        let mut a = collector.segment_sink(0);
        let mut b = collector.segment_sink(1);

        assert_eq!(a.collect(&doc(1, 2), 2), Phase::StoringAndCounting);
        assert_eq!(b.collect(&doc(3, 1), 1), Phase::StoringAndCounting);
        assert_eq!(collector.size(), 0);

        b.flush();
        a.flush();
        a.flush();
        assert_eq!(collector.size(), 3);

        let mut hit = Hit::default();
        assert!(collector.get_into(0, &mut hit).unwrap());
        assert_eq!(hit, Hit::new(103, 0, 1));
        assert!(collector.get_into(2, &mut hit).unwrap());
        assert_eq!(hit, Hit::new(1, 1, 2));
        assert!(!collector.get_into(3, &mut hit).unwrap());
        assert_eq!(collector.stats().counted_so_far(), 3);
        assert_eq!(collector.docs_stats().counted_so_far(), 2);
    }

    #[test]
    fn test_doc_id_overflow_is_an_error() {
        let last: SegmentRef = Arc::new(MemorySegment::empty("last", u32::MAX - 1, 2));
        let collector = Arc::new(HitCollector::new(&[last], u64::MAX, u64::MAX));
        let mut sink = collector.segment_sink(0);
        sink.collect(&doc(1, 1), 1);
        sink.collect(&doc(2, 1), 1);
        sink.flush();

        let mut hit = Hit::default();
        assert!(collector.get_into(0, &mut hit).unwrap());
        assert_eq!(hit.doc, u32::MAX);
        assert!(collector.get_into(1, &mut hit).is_err());
    }

    #[test]
    fn test_large_batches_publish_without_flush() {
        let collector = Arc::new(HitCollector::new(&segments(1), u64::MAX, u64::MAX));
        let mut sink = collector.segment_sink(0);
        sink.collect(&doc(0, 5), 5);
        assert_eq!(collector.size(), 0);
        sink.collect(&doc(1, 6), 6);
        assert_eq!(collector.size(), 11);
    }

    #[test]
    fn test_processing_ceiling_truncates() {
        let collector = Arc::new(HitCollector::new(&segments(1), 3, 100));
        let mut sink = collector.segment_sink(0);

        assert_eq!(sink.collect(&doc(0, 2), 2), Phase::StoringAndCounting);
        assert_eq!(sink.collect(&doc(1, 2), 2), Phase::CountingOnly);
        assert_eq!(sink.collect(&HitBuffer::new(), 4), Phase::CountingOnly);
        sink.flush();

        let stats = collector.stats().snapshot();
        assert_eq!(stats.processed_so_far, 3);
        assert_eq!(stats.counted_so_far, 8);
        assert!(stats.ceiling_on_processing_exceeded);
        assert!(!stats.ceiling_on_counting_exceeded);
        assert_eq!(collector.size(), 3);
        assert_eq!(collector.docs_stats().processed_so_far(), 2);
        assert_eq!(collector.docs_stats().counted_so_far(), 3);
    }

    #[test]
    fn test_counting_ceiling_finishes() {
        let collector = Arc::new(HitCollector::new(&segments(1), 2, 5));
        let mut sink = collector.segment_sink(0);
        sink.collect(&doc(0, 2), 2);
        assert_eq!(sink.collect(&HitBuffer::new(), 4), Phase::Done);

        let stats = collector.stats().snapshot();
        assert_eq!(stats.counted_so_far, 5);
        assert!(stats.ceiling_on_counting_exceeded);
        assert_eq!(collector.phase(), Phase::Done);
    }

    #[test]
    fn test_exact_ceiling_is_not_exceeded() {
        let collector = Arc::new(HitCollector::new(&segments(1), 2, 2));
        let mut sink = collector.segment_sink(0);
        assert_eq!(sink.collect(&doc(0, 2), 2), Phase::Done);
        let max = collector.stats().max_stats();
        assert!(!max.hits_processed_exceeded);
        assert!(!max.hits_counted_exceeded);

        sink.report_overflow();
        assert!(collector.stats().max_stats().hits_counted_exceeded);
    }
}
