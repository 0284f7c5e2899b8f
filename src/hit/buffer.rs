//! Columnar, append-only hit storage.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::hit::{CapturedSpans, Hit, HitAccess};

/// Growable hit storage with one column per hit field.
///
/// Hits are only ever appended; filtering or sorting produces a new buffer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HitBuffer {
    docs: Vec<u32>,
    starts: Vec<u32>,
    ends: Vec<u32>,
    captures: Vec<Option<CapturedSpans>>,
}

impl HitBuffer {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty buffer with room for `capacity` hits.
    pub fn with_capacity(capacity: usize) -> Self {
        HitBuffer {
            docs: Vec::with_capacity(capacity),
            starts: Vec::with_capacity(capacity),
            ends: Vec::with_capacity(capacity),
            captures: Vec::with_capacity(capacity),
        }
    }

    /// Number of hits.
    pub fn len(&self) -> usize {
        self.docs.len()
    }

    /// Is the buffer empty?
    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    /// Append a hit.
    pub fn push(&mut self, hit: &Hit) {
        self.docs.push(hit.doc);
        self.starts.push(hit.start);
        self.ends.push(hit.end);
        self.captures.push(hit.captures.clone());
    }

    /// Append a copy of hits `range` from another buffer.
    pub fn extend_from(&mut self, other: &HitBuffer, range: std::ops::Range<usize>) {
        self.docs.extend_from_slice(&other.docs[range.clone()]);
        self.starts.extend_from_slice(&other.starts[range.clone()]);
        self.ends.extend_from_slice(&other.ends[range.clone()]);
        self.captures.extend_from_slice(&other.captures[range]);
    }

    /// Document id of hit `index`.
    pub fn doc(&self, index: usize) -> u32 {
        self.docs[index]
    }

    /// Start position of hit `index`.
    pub fn start(&self, index: usize) -> u32 {
        self.starts[index]
    }

    /// End position of hit `index`.
    pub fn end(&self, index: usize) -> u32 {
        self.ends[index]
    }

    /// Captures of hit `index`.
    pub fn captures(&self, index: usize) -> Option<&CapturedSpans> {
        self.captures[index].as_ref()
    }

    /// Copy hit `index` into `out`.
    pub fn get_into(&self, index: usize, out: &mut Hit) {
        out.set(
            self.docs[index],
            self.starts[index],
            self.ends[index],
            self.captures[index].clone(),
        );
    }

    /// Copy of hit `index`.
    pub fn get(&self, index: usize) -> Hit {
        let mut hit = Hit::default();
        self.get_into(index, &mut hit);
        hit
    }

    /// Keep only the first `len` hits.
    pub fn truncate(&mut self, len: usize) {
        self.docs.truncate(len);
        self.starts.truncate(len);
        self.ends.truncate(len);
        self.captures.truncate(len);
    }

    /// Remove all hits, keeping the allocation.
    pub fn clear(&mut self) {
        self.truncate(0);
    }

    /// Iterate over copies of the hits.
    pub fn iter(&self) -> impl Iterator<Item = Hit> + '_ {
        (0..self.len()).map(move |i| self.get(i))
    }

    /// Number of distinct documents, assuming hits are grouped by document.
    pub fn doc_runs(&self) -> usize {
        let mut runs = 0;
        let mut prev = None;
        for &doc in &self.docs {
            if prev != Some(doc) {
                runs += 1;
                prev = Some(doc);
            }
        }
        runs
    }
}

impl FromIterator<Hit> for HitBuffer {
    fn from_iter<I: IntoIterator<Item = Hit>>(iter: I) -> Self {
        let mut buffer = HitBuffer::new();
        for hit in iter {
            buffer.push(&hit);
        }
        buffer
    }
}

impl HitAccess for HitBuffer {
    fn hit_count(&self) -> usize {
        self.len()
    }

    fn doc(&self, index: usize) -> u32 {
        self.docs[index]
    }

    fn start(&self, index: usize) -> u32 {
        self.starts[index]
    }

    fn end(&self, index: usize) -> u32 {
        self.ends[index]
    }

    fn captures(&self, index: usize) -> Option<&CapturedSpans> {
        self.captures[index].as_ref()
    }
}

/// A [`HitBuffer`] with one writer and any number of concurrent readers.
///
/// Readers may read any index below the length they observed; the writer only
/// appends, so those indices never change.
#[derive(Debug, Clone, Default)]
pub struct SharedHitBuffer {
    inner: Arc<RwLock<HitBuffer>>,
}

impl SharedHitBuffer {
    /// Create an empty shared buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of hits appended so far.
    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    /// Is the buffer empty?
    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    /// Append all hits of `batch`.
    pub fn append(&self, batch: &HitBuffer) {
        if batch.is_empty() {
            return;
        }
        self.inner.write().extend_from(batch, 0..batch.len());
    }

    /// Copy hit `index` into `out`. Returns false if it doesn't exist yet.
    pub fn get_into(&self, index: usize, out: &mut Hit) -> bool {
        let buffer = self.inner.read();
        if index >= buffer.len() {
            return false;
        }
        buffer.get_into(index, out);
        true
    }

    /// Run `f` with read access to the underlying buffer.
    pub fn read<R>(&self, f: impl FnOnce(&HitBuffer) -> R) -> R {
        f(&self.inner.read())
    }

    /// Copy of the current contents.
    pub fn snapshot(&self) -> HitBuffer {
        self.inner.read().clone()
    }
}
