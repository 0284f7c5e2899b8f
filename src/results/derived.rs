//! Match sources that read the hits of an existing result set.

use std::fmt;

use crate::error::{HitstreamError, Result};
use crate::hit::{CapturedSpans, Hit};
use crate::results::HitResults;
use crate::segment::{CompiledQuery, MatchSource, SegmentContext};

/// "Query" whose matches in a segment are the parent result's hits in that
/// segment.
pub(crate) struct ParentHits {
    parent: HitResults,
}

impl ParentHits {
    pub(crate) fn new(parent: HitResults) -> Self {
        ParentHits { parent }
    }
}

impl fmt::Debug for ParentHits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ParentHits")
    }
}

impl CompiledQuery for ParentHits {
    fn match_source(&self, segment: &dyn SegmentContext) -> Result<Option<Box<dyn MatchSource>>> {
        let index = self
            .parent
            .hits_per_segment()
            .iter()
            .position(|s| s.segment.id() == segment.id())
            .ok_or_else(|| {
                HitstreamError::internal(format!("segment {} not in parent results", segment.id()))
            })?;
        Ok(Some(Box::new(ParentSegmentSource {
            parent: self.parent.clone(),
            segment: index,
            next: 0,
            current: Hit::default(),
        })))
    }
}

/// Reads one segment's hits from the parent, asking the parent to fetch more
/// when it runs out.
struct ParentSegmentSource {
    parent: HitResults,
    segment: usize,
    next: usize,
    current: Hit,
}

impl MatchSource for ParentSegmentSource {
    fn advance(&mut self) -> Result<bool> {
        loop {
            let hits = &self.parent.hits_per_segment()[self.segment].hits;
            if hits.get_into(self.next, &mut self.current) {
                self.next += 1;
                return Ok(true);
            }
            if self.parent.done_fetching() {
                return Ok(false);
            }
            let before = self.parent.size_so_far();
            self.parent.ensure_results_read(Some(before as u64 + 1))?;
            // No growth means the parent stopped storing hits for good.
            let hits = &self.parent.hits_per_segment()[self.segment].hits;
            if self.parent.size_so_far() == before && hits.len() <= self.next {
                return Ok(false);
            }
        }
    }

    fn doc(&self) -> u32 {
        self.current.doc
    }

    fn start(&self) -> u32 {
        self.current.start
    }

    fn end(&self) -> u32 {
        self.current.end
    }

    fn captures(&self) -> Option<CapturedSpans> {
        self.current.captures.clone()
    }
}
