//! Information captured while matching: groups, inline tags and relations.

use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// One piece of captured match information.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MatchInfo {
    /// A captured group, e.g. `A:[word="the"]`.
    Span {
        /// Start position (inclusive).
        start: u32,
        /// End position (exclusive).
        end: u32,
    },

    /// An inline tag the match occurred in, e.g. a sentence element.
    Tag {
        /// Tag name.
        name: Arc<str>,
        /// Start position (inclusive).
        start: u32,
        /// End position (exclusive).
        end: u32,
    },

    /// A relation between two spans, e.g. a dependency relation.
    Relation {
        /// Relation type.
        rel_type: Arc<str>,
        /// Source span start.
        source_start: u32,
        /// Source span end.
        source_end: u32,
        /// Target span start.
        target_start: u32,
        /// Target span end.
        target_end: u32,
    },
}

impl MatchInfo {
    /// Create a captured group.
    pub fn span(start: u32, end: u32) -> Self {
        MatchInfo::Span { start, end }
    }

    /// Create an inline tag capture.
    pub fn tag<S: Into<Arc<str>>>(name: S, start: u32, end: u32) -> Self {
        MatchInfo::Tag {
            name: name.into(),
            start,
            end,
        }
    }

    /// Create a relation capture.
    pub fn relation<S: Into<Arc<str>>>(rel_type: S, source: (u32, u32), target: (u32, u32)) -> Self {
        MatchInfo::Relation {
            rel_type: rel_type.into(),
            source_start: source.0,
            source_end: source.1,
            target_start: target.0,
            target_end: target.1,
        }
    }

    /// Start of the covered span; for relations the minimum of source and target.
    pub fn span_start(&self) -> u32 {
        match self {
            MatchInfo::Span { start, .. } | MatchInfo::Tag { start, .. } => *start,
            MatchInfo::Relation {
                source_start,
                target_start,
                ..
            } => (*source_start).min(*target_start),
        }
    }

    /// End of the covered span; for relations the maximum of source and target.
    pub fn span_end(&self) -> u32 {
        match self {
            MatchInfo::Span { end, .. } | MatchInfo::Tag { end, .. } => *end,
            MatchInfo::Relation {
                source_end,
                target_end,
                ..
            } => (*source_end).max(*target_end),
        }
    }
}

impl fmt::Display for MatchInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchInfo::Span { start, end } => write!(f, "span({start}-{end})"),
            MatchInfo::Tag { name, start, end } => write!(f, "tag({name}, {start}-{end})"),
            MatchInfo::Relation {
                rel_type,
                source_start,
                source_end,
                target_start,
                target_end,
            } => write!(
                f,
                "rel({rel_type}, {source_start}-{source_end} -> {target_start}-{target_end})"
            ),
        }
    }
}

/// The captures of one hit, one optional slot per capture the query defines.
///
/// Cheap to clone; the slots are shared and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CapturedSpans(Arc<[Option<MatchInfo>]>);

impl CapturedSpans {
    /// Create captures from a list of slots.
    pub fn new(slots: Vec<Option<MatchInfo>>) -> Self {
        CapturedSpans(slots.into())
    }

    /// Get the capture in a slot. Slots past the end read as empty, because
    /// different segments may register different numbers of captures.
    pub fn get(&self, index: usize) -> Option<&MatchInfo> {
        self.0.get(index).and_then(Option::as_ref)
    }
}

impl Deref for CapturedSpans {
    type Target = [Option<MatchInfo>];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<Vec<Option<MatchInfo>>> for CapturedSpans {
    fn from(slots: Vec<Option<MatchInfo>>) -> Self {
        CapturedSpans::new(slots)
    }
}
