//! Sequence and iterator views on a [`HitResults`].

use crate::error::Result;
use crate::hit::Hit;
use crate::results::HitResults;
use crate::sequence::{HitSequence, RandomAccessHitSequence};

/// A [`RandomAccessHitSequence`] over a result set that may still be fetching.
#[derive(Debug, Clone)]
pub struct LazyView {
    results: HitResults,
}

impl LazyView {
    pub(crate) fn new(results: HitResults) -> Self {
        LazyView { results }
    }

    /// The underlying results.
    pub fn results(&self) -> &HitResults {
        &self.results
    }
}

impl HitSequence for LazyView {
    fn size_so_far(&self) -> usize {
        self.results.size_so_far()
    }

    fn size_at_least(&mut self, n: usize) -> Result<bool> {
        self.results.size_at_least(n)
    }

    fn size(&mut self) -> Result<usize> {
        self.results.size()
    }
}

impl RandomAccessHitSequence for LazyView {
    fn get_into(&self, index: usize, out: &mut Hit) -> Result<()> {
        self.results.get_into(index, out)
    }
}

/// Iterator over all hits of a result set, fetching as it goes.
///
/// Stops at the first error, after yielding it.
#[derive(Debug)]
pub struct HitIter {
    results: HitResults,
    next: usize,
    failed: bool,
}

impl HitIter {
    pub(crate) fn new(results: HitResults) -> Self {
        HitIter {
            results,
            next: 0,
            failed: false,
        }
    }
}

impl Iterator for HitIter {
    type Item = Result<Hit>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let index = self.next;
        let result = self
            .results
            .size_at_least(index + 1)
            .and_then(|available| available.then(|| self.results.get(index)).transpose());
        match result {
            Ok(Some(hit)) => {
                self.next += 1;
                Some(Ok(hit))
            }
            Ok(None) => None,
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}
