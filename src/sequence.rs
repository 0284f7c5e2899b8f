//! Lazy hit sequences.
//!
//! A sequence may still be producing hits. `size_at_least(n)` does whatever
//! work is needed (pulling from a match source, fetching more results, running
//! a filter) until `n` hits exist or the source is exhausted.
//!
//! Two flavours exist. A [`RandomAccessHitSequence`] allows re-reading any hit
//! it has produced; a [`SingleSlotHitSequence`] only keeps the most recent one,
//! which is how match sources behave.

use crate::error::{HitstreamError, Result};
use crate::filter::SegmentHitFilter;
use crate::hit::{Hit, HitBuffer};
use crate::segment::MatchSource;

/// A sequence of hits that may be produced lazily.
pub trait HitSequence {
    /// Number of hits produced so far, without doing any work.
    fn size_so_far(&self) -> usize;

    /// Make sure at least `n` hits are produced, if there are that many.
    /// Returns whether `n` was reached.
    fn size_at_least(&mut self, n: usize) -> Result<bool>;

    /// Produce all hits and return the total.
    fn size(&mut self) -> Result<usize> {
        self.size_at_least(usize::MAX)?;
        Ok(self.size_so_far())
    }
}

/// A sequence whose produced hits can all be read back.
pub trait RandomAccessHitSequence: HitSequence {
    /// Copy hit `index` into `out`. The hit must have been produced already.
    fn get_into(&self, index: usize, out: &mut Hit) -> Result<()>;

    /// Copy of hit `index`.
    fn get(&self, index: usize) -> Result<Hit> {
        let mut hit = Hit::default();
        self.get_into(index, &mut hit)?;
        Ok(hit)
    }
}

/// A sequence where only the most recently produced hit can be read.
pub trait SingleSlotHitSequence: HitSequence {
    /// The most recently produced hit.
    fn latest(&self) -> Result<&Hit>;

    /// Move the most recently produced hit out; the slot is left empty until
    /// the next hit is produced.
    fn take_latest(&mut self) -> Result<Hit>;
}

pub(crate) fn check_available(index: usize, available: usize) -> Result<()> {
    if index >= available {
        return Err(HitstreamError::IndexNotAvailable { index, available });
    }
    Ok(())
}

impl HitSequence for HitBuffer {
    fn size_so_far(&self) -> usize {
        self.len()
    }

    fn size_at_least(&mut self, n: usize) -> Result<bool> {
        Ok(self.len() >= n)
    }
}

impl RandomAccessHitSequence for HitBuffer {
    fn get_into(&self, index: usize, out: &mut Hit) -> Result<()> {
        check_available(index, self.len())?;
        HitBuffer::get_into(self, index, out);
        Ok(())
    }
}

/// Single-slot sequence over a [`MatchSource`].
pub struct MatchSourceHits {
    source: Box<dyn MatchSource>,
    current: Hit,
    has_current: bool,
    produced: usize,
    exhausted: bool,
}

impl MatchSourceHits {
    /// Wrap a match source.
    pub fn new(source: Box<dyn MatchSource>) -> Self {
        MatchSourceHits {
            source,
            current: Hit::default(),
            has_current: false,
            produced: 0,
            exhausted: false,
        }
    }

    /// Produce the next hit. Returns `false` once the source is exhausted.
    pub fn advance(&mut self) -> Result<bool> {
        if self.exhausted {
            return Ok(false);
        }
        if !self.source.advance()? {
            self.exhausted = true;
            self.has_current = false;
            return Ok(false);
        }
        self.source.copy_into(&mut self.current);
        self.has_current = true;
        self.produced += 1;
        Ok(true)
    }

    /// Has the source run out?
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }
}

impl HitSequence for MatchSourceHits {
    fn size_so_far(&self) -> usize {
        self.produced
    }

    fn size_at_least(&mut self, n: usize) -> Result<bool> {
        while self.produced < n {
            if !self.advance()? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

impl SingleSlotHitSequence for MatchSourceHits {
    fn latest(&self) -> Result<&Hit> {
        if !self.has_current {
            return Err(HitstreamError::invalid_operation(
                "no current hit: sequence not started, exhausted or slot taken",
            ));
        }
        Ok(&self.current)
    }

    fn take_latest(&mut self) -> Result<Hit> {
        self.latest()?;
        self.has_current = false;
        Ok(std::mem::take(&mut self.current))
    }
}

/// Random-access sequence of the hits of another sequence that pass a filter.
///
/// The filter sees the hits with the document ids of the underlying sequence,
/// so it should be bound to the segment those hits come from.
pub struct FilteredHits<S> {
    source: S,
    filter: Box<dyn SegmentHitFilter>,
    accepted: Vec<usize>,
    next_source_index: usize,
    exhausted: bool,
    scratch: Hit,
}

impl<S: RandomAccessHitSequence> FilteredHits<S> {
    /// Filter `source` lazily.
    pub fn new(source: S, filter: Box<dyn SegmentHitFilter>) -> Self {
        FilteredHits {
            source,
            filter,
            accepted: Vec::new(),
            next_source_index: 0,
            exhausted: false,
            scratch: Hit::default(),
        }
    }

    /// Number of underlying hits examined so far.
    pub fn examined(&self) -> usize {
        self.next_source_index
    }
}

impl<S: RandomAccessHitSequence> HitSequence for FilteredHits<S> {
    fn size_so_far(&self) -> usize {
        self.accepted.len()
    }

    fn size_at_least(&mut self, n: usize) -> Result<bool> {
        while self.accepted.len() < n && !self.exhausted {
            if !self.source.size_at_least(self.next_source_index + 1)? {
                self.exhausted = true;
                break;
            }
            self.source.get_into(self.next_source_index, &mut self.scratch)?;
            if self.filter.test(&self.scratch, 0)? {
                self.accepted.push(self.next_source_index);
            }
            self.next_source_index += 1;
        }
        Ok(self.accepted.len() >= n)
    }
}

impl<S: RandomAccessHitSequence> RandomAccessHitSequence for FilteredHits<S> {
    fn get_into(&self, index: usize, out: &mut Hit) -> Result<()> {
        check_available(index, self.accepted.len())?;
        self.source.get_into(self.accepted[index], out)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::filter::{CollationCache, HitFilter};
    use crate::segment::memory::{MemoryQuery, MemorySegment, Script};
    use crate::segment::{CompiledQuery, SegmentRef};

    fn buffer(triples: &[(u32, u32, u32)]) -> HitBuffer {
        triples.iter().map(|&(d, s, e)| Hit::new(d, s, e)).collect()
    }

    fn source(hits: &[(u32, u32, u32)]) -> MatchSourceHits {
        let segment = MemorySegment::empty("s", 0, 10);
        let query = MemoryQuery::Scripted(Script::new().with_hits("s", hits));
        MatchSourceHits::new(query.match_source(&segment).unwrap().unwrap())
    }

    #[test]
    fn test_buffer_requires_availability() {
        let mut hits = buffer(&[(0, 0, 1), (1, 0, 1)]);
        assert!(hits.size_at_least(2).unwrap());
        assert!(!hits.size_at_least(3).unwrap());
        assert_eq!(RandomAccessHitSequence::get(&hits, 1).unwrap(), Hit::new(1, 0, 1));
        assert!(matches!(
            RandomAccessHitSequence::get(&hits, 2),
            Err(HitstreamError::IndexNotAvailable { index: 2, available: 2 })
        ));
    }

    #[test]
    fn test_single_slot_only_exposes_latest() {
        let mut hits = source(&[(0, 0, 1), (0, 2, 3), (1, 0, 1)]);
        assert!(hits.latest().is_err());

        assert!(hits.size_at_least(2).unwrap());
        assert_eq!(hits.latest().unwrap(), &Hit::new(0, 2, 3));
        assert_eq!(hits.take_latest().unwrap(), Hit::new(0, 2, 3));
        assert!(hits.latest().is_err());

        assert_eq!(hits.size().unwrap(), 3);
        assert!(hits.is_exhausted());
        assert!(hits.latest().is_err());
    }

    #[test]
    fn test_filtered_is_lazy() {
        let segment: SegmentRef = Arc::new(MemorySegment::empty("s", 0, 10));
        let filter = HitFilter::from_fn(|hit| hit.doc % 2 == 0)
            .for_segment(&segment, &CollationCache::new())
            .unwrap()
            .unwrap();
        let source = buffer(&[(0, 0, 1), (1, 0, 1), (2, 0, 1), (3, 0, 1), (4, 0, 1)]);
        let mut filtered = FilteredHits::new(source, filter);

        assert!(filtered.size_at_least(2).unwrap());
        assert_eq!(filtered.examined(), 3);
        assert_eq!(filtered.get(1).unwrap(), Hit::new(2, 0, 1));
        assert!(filtered.get(2).is_err());

        assert!(!filtered.size_at_least(4).unwrap());
        assert_eq!(filtered.size().unwrap(), 3);
        assert_eq!(filtered.get(2).unwrap(), Hit::new(4, 0, 1));
    }
}
