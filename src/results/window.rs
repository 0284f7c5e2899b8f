use crate::hit::HitBuffer;

/// A copied slice of a result set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HitWindow {
    first: usize,
    requested: usize,
    hits: HitBuffer,
    has_next: bool,
}

impl HitWindow {
    pub(crate) fn new(first: usize, requested: usize, hits: HitBuffer, has_next: bool) -> Self {
        HitWindow {
            first,
            requested,
            hits,
            has_next,
        }
    }

    /// Index of the first hit in the window.
    pub fn first(&self) -> usize {
        self.first
    }

    /// Requested window size; the window may be shorter at the end.
    pub fn requested(&self) -> usize {
        self.requested
    }

    /// Number of hits in the window.
    pub fn len(&self) -> usize {
        self.hits.len()
    }

    /// Is the window empty?
    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    /// Are there hits after this window?
    pub fn has_next(&self) -> bool {
        self.has_next
    }

    /// Are there hits before this window?
    pub fn has_previous(&self) -> bool {
        self.first > 0
    }

    /// The hits, with global document ids.
    pub fn hits(&self) -> &HitBuffer {
        &self.hits
    }

    /// Take the hits out of the window.
    pub fn into_hits(self) -> HitBuffer {
        self.hits
    }
}
