//! Collation keys for case- and diacritic-insensitive comparison.

use std::sync::Arc;

use ahash::AHashMap;
use parking_lot::RwLock;
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

/// Compute the collation key of a string: compatibility decomposition with
/// combining marks removed, lowercased.
pub fn collation_key(text: &str) -> String {
    text.nfkd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .collect()
}

/// Cache of collation keys, shared by every segment filter of one search.
#[derive(Debug, Clone, Default)]
pub struct CollationCache {
    keys: Arc<RwLock<AHashMap<String, Arc<str>>>>,
}

impl CollationCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the collation key for `text`, computing it on first use.
    pub fn key(&self, text: &str) -> Arc<str> {
        if let Some(key) = self.keys.read().get(text) {
            return Arc::clone(key);
        }
        let key: Arc<str> = collation_key(text).into();
        self.keys
            .write()
            .entry(text.to_string())
            .or_insert(key)
            .clone()
    }

    /// Number of cached keys.
    pub fn len(&self) -> usize {
        self.keys.read().len()
    }

    /// Is the cache empty?
    pub fn is_empty(&self) -> bool {
        self.keys.read().is_empty()
    }
}
