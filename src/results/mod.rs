//! The public result set of a search.
//!
//! [`HitResults`] is cheap to clone; clones share the same retrieval. Hits are
//! fetched on demand: any method that needs more hits than are available calls
//! [`HitResults::ensure_results_read`], which blocks until enough hits exist
//! or retrieval has finished. Plain reads (`get`, `doc`, ...) never fetch; they
//! fail with [`HitstreamError::IndexNotAvailable`] if the hit wasn't made
//! available first.

mod derived;
mod view;
mod window;

pub use view::{HitIter, LazyView};
pub use window::HitWindow;

use std::sync::Arc;

use crate::config::SearchSettings;
use crate::error::{HitstreamError, Result};
use crate::fetch::{FetchCoordinator, Phase, SegmentHits};
use crate::filter::HitFilter;
use crate::hit::{CapturedSpans, Hit, HitBuffer, global_doc};
use crate::segment::{CompiledQuery, SegmentRef};
use crate::stats::{MaxStats, ResultsStatsSnapshot};

/// Hits of a query over a set of segments, fetched lazily.
#[derive(Debug, Clone)]
pub struct HitResults {
    coordinator: Arc<FetchCoordinator>,
    settings: SearchSettings,
}

impl HitResults {
    /// Prepare a search of `query` over `segments`. No hits are read until
    /// they are asked for.
    pub fn new(
        segments: &[SegmentRef],
        query: Arc<dyn CompiledQuery>,
        settings: SearchSettings,
    ) -> Result<Self> {
        Self::with_filter(segments, query, HitFilter::AcceptAll, settings)
    }

    /// Prepare a search keeping only hits that pass `filter`.
    pub fn with_filter(
        segments: &[SegmentRef],
        query: Arc<dyn CompiledQuery>,
        filter: HitFilter,
        settings: SearchSettings,
    ) -> Result<Self> {
        let coordinator = FetchCoordinator::new(
            segments,
            query,
            filter,
            settings.fetch.clone(),
            settings.cancellation.clone(),
        )?;
        Ok(HitResults {
            coordinator: Arc::new(coordinator),
            settings,
        })
    }

    /// Make sure `number` hits are available (`None`: all hits). Returns
    /// whether there are that many.
    pub fn ensure_results_read(&self, number: Option<u64>) -> Result<bool> {
        self.coordinator.ensure_results_read(number)
    }

    /// Number of hits available now, without fetching.
    pub fn size_so_far(&self) -> usize {
        self.coordinator.collector().size()
    }

    /// Make sure at least `n` hits are available; returns whether there are.
    pub fn size_at_least(&self, n: usize) -> Result<bool> {
        self.ensure_results_read(Some(n as u64))
    }

    /// Fetch all hits and return how many were stored.
    pub fn size(&self) -> Result<usize> {
        self.ensure_results_read(None)?;
        Ok(self.size_so_far())
    }

    /// Has retrieval finished?
    pub fn done_fetching(&self) -> bool {
        self.coordinator.all_fetched()
    }

    /// Current phase of the retrieval.
    pub fn phase(&self) -> Phase {
        self.coordinator.collector().phase()
    }

    fn unavailable(&self, index: usize) -> HitstreamError {
        HitstreamError::IndexNotAvailable {
            index,
            available: self.size_so_far(),
        }
    }

    /// Copy hit `index` into `out`.
    pub fn get_into(&self, index: usize, out: &mut Hit) -> Result<()> {
        if self.coordinator.collector().get_into(index, out)? {
            Ok(())
        } else {
            Err(self.unavailable(index))
        }
    }

    /// Copy of hit `index`.
    pub fn get(&self, index: usize) -> Result<Hit> {
        let mut hit = Hit::default();
        self.get_into(index, &mut hit)?;
        Ok(hit)
    }

    /// Global document id of hit `index`.
    pub fn doc(&self, index: usize) -> Result<u32> {
        self.coordinator
            .collector()
            .read(index, |hits, local, doc_base| global_doc(doc_base, hits.doc(local)))
            .ok_or_else(|| self.unavailable(index))?
    }

    /// Start of hit `index`.
    pub fn start(&self, index: usize) -> Result<u32> {
        self.coordinator
            .collector()
            .read(index, |hits, local, _| hits.start(local))
            .ok_or_else(|| self.unavailable(index))
    }

    /// End of hit `index`.
    pub fn end(&self, index: usize) -> Result<u32> {
        self.coordinator
            .collector()
            .read(index, |hits, local, _| hits.end(local))
            .ok_or_else(|| self.unavailable(index))
    }

    /// Captures of hit `index`.
    pub fn captures(&self, index: usize) -> Result<Option<CapturedSpans>> {
        self.coordinator
            .collector()
            .captures(index)
            .ok_or_else(|| self.unavailable(index))
    }

    /// Hit statistics.
    pub fn results_stats(&self) -> ResultsStatsSnapshot {
        self.coordinator.collector().stats().snapshot()
    }

    /// Document statistics: a document is processed when one of its hits was
    /// stored and counted when one was counted.
    pub fn docs_stats(&self) -> ResultsStatsSnapshot {
        self.coordinator.collector().docs_stats().snapshot()
    }

    /// Which ceilings were hit.
    pub fn max_stats(&self) -> MaxStats {
        self.coordinator.collector().stats().max_stats()
    }

    /// Up to `count` hits starting at `first`, plus whether more follow.
    ///
    /// `first` may equal the number of hits (giving an empty window) but not
    /// exceed it.
    pub fn window(&self, first: usize, count: usize) -> Result<HitWindow> {
        let hits = self.sublist(first, count)?;
        let end = first + hits.len();
        let has_next = hits.len() == count && self.size_at_least(end + 1)?;
        Ok(HitWindow::new(first, count, hits, has_next))
    }

    /// Copy of up to `count` hits starting at `first`.
    pub fn sublist(&self, first: usize, count: usize) -> Result<HitBuffer> {
        let end = first.saturating_add(count);
        self.ensure_results_read(Some(end as u64))?;
        let available = self.size_so_far();
        if first > available {
            return Err(HitstreamError::invalid_operation(format!(
                "window starts at {first} but only {available} hits exist"
            )));
        }
        let end = end.min(available);
        let mut hits = HitBuffer::with_capacity(end - first);
        let mut hit = Hit::default();
        for index in first..end {
            self.get_into(index, &mut hit)?;
            hits.push(&hit);
        }
        Ok(hits)
    }

    /// A random-access sequence over these hits.
    pub fn view(&self) -> LazyView {
        LazyView::new(self.clone())
    }

    /// Iterate over all hits, fetching as needed.
    pub fn iter(&self) -> HitIter {
        HitIter::new(self.clone())
    }

    /// A new result set with the hits of this one that pass `filter`.
    ///
    /// Each segment of the new result reads this result's hits for the same
    /// segment, so the segments are filtered in parallel and this result is
    /// only fetched as far as needed.
    pub fn filter(&self, filter: HitFilter) -> Result<HitResults> {
        let segments: Vec<SegmentRef> = self
            .hits_per_segment()
            .iter()
            .map(|s| Arc::clone(&s.segment))
            .collect();
        let query = Arc::new(derived::ParentHits::new(self.clone()));
        HitResults::with_filter(&segments, query, filter, self.settings.clone())
    }

    /// The hits of each segment, with segment-local document ids.
    pub fn hits_per_segment(&self) -> &[SegmentHits] {
        self.coordinator.collector().segments()
    }
}
