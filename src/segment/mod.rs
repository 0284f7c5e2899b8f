//! Index segments and the match sources read from them.
//!
//! A segment is one independently searchable part of the index. Query
//! compilation and the on-disk format live elsewhere; this module only defines
//! what the fetching engine needs from them.

pub mod memory;

use std::fmt;
use std::sync::Arc;

use crate::error::Result;
use crate::hit::{CapturedSpans, Hit};

/// One segment of the index, as seen by the fetching engine.
pub trait SegmentContext: Send + Sync + fmt::Debug {
    /// Stable identifier, used in logs and errors.
    fn id(&self) -> &str;

    /// Offset added to segment-local document ids to make them global.
    fn doc_base(&self) -> u32;

    /// Estimated number of documents, used to balance work over threads.
    fn estimated_doc_count(&self) -> u64;

    /// Token at `position` in segment-local document `doc`, if this segment
    /// can look up token text.
    fn token(&self, _doc: u32, _position: u32) -> Option<&str> {
        None
    }

    /// Text of the span `[start, end)`, tokens joined by single spaces.
    fn text(&self, doc: u32, start: u32, end: u32) -> Option<String> {
        let mut text = String::new();
        for position in start..end {
            if position > start {
                text.push(' ');
            }
            text.push_str(self.token(doc, position)?);
        }
        Some(text)
    }
}

/// Shared handle to a segment.
pub type SegmentRef = Arc<dyn SegmentContext>;

/// Iterator over the candidate matches of a query in one segment.
///
/// Matches come in non-decreasing document order and may contain duplicates.
/// The accessors describe the current match and are only valid after
/// [`advance`](MatchSource::advance) returned `true`; document ids are local to
/// the segment.
pub trait MatchSource: Send {
    /// Move to the next match. Returns `false` when exhausted.
    fn advance(&mut self) -> Result<bool>;

    /// Document of the current match.
    fn doc(&self) -> u32;

    /// Start of the current match.
    fn start(&self) -> u32;

    /// End of the current match.
    fn end(&self) -> u32;

    /// Captures of the current match.
    fn captures(&self) -> Option<CapturedSpans>;

    /// Copy the current match into `out`.
    fn copy_into(&self, out: &mut Hit) {
        out.set(self.doc(), self.start(), self.end(), self.captures());
    }
}

/// A query compiled against an index, able to produce a match source per segment.
pub trait CompiledQuery: Send + Sync + fmt::Debug {
    /// Create the match source for `segment`.
    ///
    /// Returns `None` if the query cannot match anything in this segment.
    fn match_source(&self, segment: &dyn SegmentContext) -> Result<Option<Box<dyn MatchSource>>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segment::memory::MemorySegment;

    #[test]
    fn test_text_joins_tokens() {
        let segment = MemorySegment::from_texts("s0", 0, &["the quick brown fox"]);
        assert_eq!(segment.text(0, 1, 3).as_deref(), Some("quick brown"));
        assert_eq!(segment.text(0, 3, 5), None);
        assert_eq!(segment.text(0, 2, 2).as_deref(), Some(""));
    }
}
