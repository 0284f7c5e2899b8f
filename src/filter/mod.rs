//! Hit filters.
//!
//! A [`HitFilter`] is specified once per search. Before reading a segment the
//! fetcher binds it to that segment with [`HitFilter::for_segment`], which does
//! the per-segment work (term lookups, collation keys) up front and returns a
//! [`SegmentHitFilter`] that is then tested against every candidate hit.

pub mod collation;
pub mod property;

pub use collation::{CollationCache, collation_key};
pub use property::{HitProperty, PropertyFilter, PropertyValue};

use std::fmt;
use std::sync::Arc;

use ahash::AHashSet;

use crate::error::Result;
use crate::hit::{Hit, HitAccess, global_doc};
use crate::segment::SegmentRef;

/// A filter bound to one segment.
///
/// `test` must give the same answer for the same hit; it may keep caches
/// between calls, hence `&mut self`.
pub trait SegmentHitFilter: Send {
    /// Should hit `index` of `hits` be kept? Document ids are segment-local.
    fn test(&mut self, hits: &dyn HitAccess, index: usize) -> Result<bool>;
}

/// A filter condition that can be bound to any segment.
pub trait HitPredicate: Send + Sync + fmt::Debug {
    /// Bind this predicate to `segment`.
    fn for_segment(
        &self,
        segment: &SegmentRef,
        cache: &CollationCache,
    ) -> Result<Box<dyn SegmentHitFilter>>;
}

/// Which hits to keep.
#[derive(Debug, Clone, Default)]
pub enum HitFilter {
    /// Keep every hit.
    #[default]
    AcceptAll,
    /// Keep hits for which the predicate holds.
    Predicate(Arc<dyn HitPredicate>),
}

impl HitFilter {
    /// Create a filter from a predicate.
    pub fn new<P: HitPredicate + 'static>(predicate: P) -> Self {
        HitFilter::Predicate(Arc::new(predicate))
    }

    /// Keep hits matching `f`. The hit passed in carries its global document id.
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(&Hit) -> bool + Send + Sync + 'static,
    {
        HitFilter::new(FnFilter::new(f))
    }

    /// Keep hits in the given (global) documents.
    pub fn docs<I: IntoIterator<Item = u32>>(docs: I) -> Self {
        HitFilter::new(DocFilter::new(docs))
    }

    /// Does this filter keep everything?
    pub fn is_accept_all(&self) -> bool {
        matches!(self, HitFilter::AcceptAll)
    }

    /// Keep hits this filter rejects.
    pub fn not(self) -> Self {
        match self {
            HitFilter::AcceptAll => HitFilter::new(RejectAll),
            HitFilter::Predicate(p) => HitFilter::new(NotFilter(p)),
        }
    }

    /// Keep hits both filters keep.
    pub fn and(self, other: HitFilter) -> Self {
        match (self, other) {
            (HitFilter::AcceptAll, f) | (f, HitFilter::AcceptAll) => f,
            (HitFilter::Predicate(a), HitFilter::Predicate(b)) => {
                HitFilter::new(AllFilter(vec![a, b]))
            }
        }
    }

    /// Bind to a segment. `None` means every hit is kept.
    pub fn for_segment(
        &self,
        segment: &SegmentRef,
        cache: &CollationCache,
    ) -> Result<Option<Box<dyn SegmentHitFilter>>> {
        match self {
            HitFilter::AcceptAll => Ok(None),
            HitFilter::Predicate(p) => p.for_segment(segment, cache).map(Some),
        }
    }
}

/// Rejects every hit.
#[derive(Debug, Clone, Copy)]
pub struct RejectAll;

impl HitPredicate for RejectAll {
    fn for_segment(&self, _: &SegmentRef, _: &CollationCache) -> Result<Box<dyn SegmentHitFilter>> {
        Ok(Box::new(Constant(false)))
    }
}

struct Constant(bool);

impl SegmentHitFilter for Constant {
    fn test(&mut self, _: &dyn HitAccess, _: usize) -> Result<bool> {
        Ok(self.0)
    }
}

/// Keeps hits whose document is in a set of global document ids.
#[derive(Debug, Clone)]
pub struct DocFilter {
    docs: Arc<AHashSet<u32>>,
}

impl DocFilter {
    /// Create a filter for the given global document ids.
    pub fn new<I: IntoIterator<Item = u32>>(docs: I) -> Self {
        DocFilter {
            docs: Arc::new(docs.into_iter().collect()),
        }
    }
}

impl HitPredicate for DocFilter {
    fn for_segment(&self, segment: &SegmentRef, _: &CollationCache) -> Result<Box<dyn SegmentHitFilter>> {
        let base = segment.doc_base();
        // The document count is only an estimate, so every id from the
        // segment's base on may belong to it.
        let local: AHashSet<u32> = self
            .docs
            .iter()
            .filter_map(|&doc| doc.checked_sub(base))
            .collect();
        if local.is_empty() {
            return Ok(Box::new(Constant(false)));
        }
        Ok(Box::new(SegmentDocFilter { docs: local }))
    }
}

struct SegmentDocFilter {
    docs: AHashSet<u32>,
}

impl SegmentHitFilter for SegmentDocFilter {
    fn test(&mut self, hits: &dyn HitAccess, index: usize) -> Result<bool> {
        Ok(self.docs.contains(&hits.doc(index)))
    }
}

type HitFn = dyn Fn(&Hit) -> bool + Send + Sync;

/// Keeps hits matching a closure.
#[derive(Clone)]
pub struct FnFilter {
    f: Arc<HitFn>,
}

impl FnFilter {
    /// Wrap a closure. It receives hits with global document ids.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Hit) -> bool + Send + Sync + 'static,
    {
        FnFilter { f: Arc::new(f) }
    }
}

impl fmt::Debug for FnFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FnFilter(..)")
    }
}

impl HitPredicate for FnFilter {
    fn for_segment(&self, segment: &SegmentRef, _: &CollationCache) -> Result<Box<dyn SegmentHitFilter>> {
        Ok(Box::new(SegmentFnFilter {
            f: Arc::clone(&self.f),
            doc_base: segment.doc_base(),
            scratch: Hit::default(),
        }))
    }
}

struct SegmentFnFilter {
    f: Arc<HitFn>,
    doc_base: u32,
    scratch: Hit,
}

impl SegmentHitFilter for SegmentFnFilter {
    fn test(&mut self, hits: &dyn HitAccess, index: usize) -> Result<bool> {
        self.scratch.set(
            global_doc(self.doc_base, hits.doc(index))?,
            hits.start(index),
            hits.end(index),
            hits.captures(index).cloned(),
        );
        Ok((self.f)(&self.scratch))
    }
}

/// Negation of a predicate.
#[derive(Debug, Clone)]
pub struct NotFilter(pub Arc<dyn HitPredicate>);

impl HitPredicate for NotFilter {
    fn for_segment(
        &self,
        segment: &SegmentRef,
        cache: &CollationCache,
    ) -> Result<Box<dyn SegmentHitFilter>> {
        let inner = self.0.for_segment(segment, cache)?;
        Ok(Box::new(SegmentNot(inner)))
    }
}

struct SegmentNot(Box<dyn SegmentHitFilter>);

impl SegmentHitFilter for SegmentNot {
    fn test(&mut self, hits: &dyn HitAccess, index: usize) -> Result<bool> {
        Ok(!self.0.test(hits, index)?)
    }
}

/// Conjunction of predicates.
#[derive(Debug, Clone)]
pub struct AllFilter(pub Vec<Arc<dyn HitPredicate>>);

impl HitPredicate for AllFilter {
    fn for_segment(
        &self,
        segment: &SegmentRef,
        cache: &CollationCache,
    ) -> Result<Box<dyn SegmentHitFilter>> {
        let clauses = self
            .0
            .iter()
            .map(|p| p.for_segment(segment, cache))
            .collect::<Result<Vec<_>>>()?;
        Ok(Box::new(SegmentAll(clauses)))
    }
}

struct SegmentAll(Vec<Box<dyn SegmentHitFilter>>);

impl SegmentHitFilter for SegmentAll {
    fn test(&mut self, hits: &dyn HitAccess, index: usize) -> Result<bool> {
        for clause in &mut self.0 {
            if !clause.test(hits, index)? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}
