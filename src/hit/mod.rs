//! Hits and hit storage.

pub mod buffer;
pub mod match_info;

pub use buffer::{HitBuffer, SharedHitBuffer};
pub use match_info::{CapturedSpans, MatchInfo};

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{HitstreamError, Result};

/// A single match: document, token span and optional captures.
///
/// Hits read from a match source are copied into a scratch `Hit` that is
/// overwritten on every pull; keep a hit by cloning it or appending it to a
/// [`HitBuffer`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Hit {
    /// Document id.
    pub doc: u32,
    /// Start position (inclusive).
    pub start: u32,
    /// End position (exclusive).
    pub end: u32,
    /// Captured groups, tags and relations, if the query defines any.
    pub captures: Option<CapturedSpans>,
}

impl Hit {
    /// Create a hit without captures.
    pub fn new(doc: u32, start: u32, end: u32) -> Self {
        debug_assert!(start <= end, "hit start {start} after end {end}");
        Hit {
            doc,
            start,
            end,
            captures: None,
        }
    }

    /// Set the captures.
    pub fn with_captures(mut self, captures: CapturedSpans) -> Self {
        self.captures = Some(captures);
        self
    }

    /// Number of tokens covered.
    pub fn length(&self) -> u32 {
        self.end.saturating_sub(self.start)
    }

    /// Overwrite all fields, reusing this value as scratch space.
    pub fn set(&mut self, doc: u32, start: u32, end: u32, captures: Option<CapturedSpans>) {
        debug_assert!(start <= end, "hit start {start} after end {end}");
        self.doc = doc;
        self.start = start;
        self.end = end;
        self.captures = captures;
    }
}

/// Global id of segment-local document `local` in a segment whose first
/// document is `doc_base`. Fails if the sum does not fit a document id.
pub fn global_doc(doc_base: u32, local: u32) -> Result<u32> {
    doc_base.checked_add(local).ok_or_else(|| {
        HitstreamError::internal(format!(
            "document {local} of segment at {doc_base} is past the last document id"
        ))
    })
}

/// Indexed read access to a group of hits.
///
/// Implemented by [`HitBuffer`] and by [`Hit`] itself, so a filter can test
/// either a stored hit or a single hit that was just read.
pub trait HitAccess {
    /// Number of hits.
    fn hit_count(&self) -> usize;

    /// Document id of hit `index`.
    fn doc(&self, index: usize) -> u32;

    /// Start of hit `index`.
    fn start(&self, index: usize) -> u32;

    /// End of hit `index`.
    fn end(&self, index: usize) -> u32;

    /// Captures of hit `index`.
    fn captures(&self, index: usize) -> Option<&CapturedSpans>;
}

/// A single hit seen as a group of one; only index 0 is valid.
impl HitAccess for Hit {
    fn hit_count(&self) -> usize {
        1
    }

    fn doc(&self, index: usize) -> u32 {
        debug_assert_eq!(index, 0);
        self.doc
    }

    fn start(&self, index: usize) -> u32 {
        debug_assert_eq!(index, 0);
        self.start
    }

    fn end(&self, index: usize) -> u32 {
        debug_assert_eq!(index, 0);
        self.end
    }

    fn captures(&self, index: usize) -> Option<&CapturedSpans> {
        debug_assert_eq!(index, 0);
        self.captures.as_ref()
    }
}

impl fmt::Display for Hit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "doc {} [{}, {})", self.doc, self.start, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_identity_includes_captures() {
        let plain = Hit::new(1, 2, 3);
        let captured =
            Hit::new(1, 2, 3).with_captures(CapturedSpans::new(vec![Some(MatchInfo::span(2, 3))]));
        assert_ne!(plain, captured);
        assert_eq!(plain, Hit::new(1, 2, 3));
    }

    #[test]
    fn test_set_overwrites() {
        let mut hit = Hit::new(1, 2, 3);
        hit.set(4, 5, 9, None);
        assert_eq!(hit, Hit::new(4, 5, 9));
        assert_eq!(hit.length(), 4);
    }

    #[test]
    fn test_single_hit_access() {
        let hit = Hit::new(4, 5, 6);
        let access: &dyn HitAccess = &hit;
        assert_eq!(access.hit_count(), 1);
        assert_eq!(access.doc(0), 4);
        assert_eq!(access.end(0), 6);
        assert!(access.captures(0).is_none());
    }

    #[test]
    fn test_global_doc() {
        assert_eq!(global_doc(100, 3).unwrap(), 103);
        assert_eq!(global_doc(u32::MAX - 1, 1).unwrap(), u32::MAX);
        assert!(global_doc(u32::MAX - 1, 2).is_err());
        assert_eq!(Hit::new(3, 0, 1).to_string(), "doc 3 [0, 1)");
    }
}
