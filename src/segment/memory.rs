//! In-memory segments and queries.
//!
//! Used by tests, benchmarks and the command line tool. Documents are stored
//! as token vectors; positions are word indices.

use std::fmt;
use std::io;
use std::sync::Arc;

use ahash::AHashMap;
use unicode_segmentation::UnicodeSegmentation;

use crate::error::{HitstreamError, Result};
use crate::hit::{CapturedSpans, Hit};
use crate::segment::{CompiledQuery, MatchSource, SegmentContext, SegmentRef};

/// A segment held entirely in memory.
#[derive(Debug, Clone)]
pub struct MemorySegment {
    id: String,
    doc_base: u32,
    docs: Vec<Vec<String>>,
}

impl MemorySegment {
    /// Create a segment from already tokenized documents.
    pub fn new<S: Into<String>>(id: S, doc_base: u32, docs: Vec<Vec<String>>) -> Self {
        MemorySegment {
            id: id.into(),
            doc_base,
            docs,
        }
    }

    /// Create a segment from plain texts, one document per text.
    pub fn from_texts<S: Into<String>>(id: S, doc_base: u32, texts: &[&str]) -> Self {
        let docs = texts.iter().map(|text| tokenize(text)).collect();
        Self::new(id, doc_base, docs)
    }

    /// Create a segment of `doc_count` empty documents, for scripted queries.
    pub fn empty<S: Into<String>>(id: S, doc_base: u32, doc_count: usize) -> Self {
        Self::new(id, doc_base, vec![Vec::new(); doc_count])
    }

    /// Number of documents.
    pub fn doc_count(&self) -> usize {
        self.docs.len()
    }
}

impl SegmentContext for MemorySegment {
    fn id(&self) -> &str {
        &self.id
    }

    fn doc_base(&self) -> u32 {
        self.doc_base
    }

    fn estimated_doc_count(&self) -> u64 {
        self.docs.len() as u64
    }

    fn token(&self, doc: u32, position: u32) -> Option<&str> {
        self.docs
            .get(doc as usize)?
            .get(position as usize)
            .map(String::as_str)
    }
}

/// Split text into word tokens.
pub fn tokenize(text: &str) -> Vec<String> {
    text.unicode_words().map(str::to_string).collect()
}

/// Distribute documents over `segment_count` segments of consecutive documents.
pub fn segments_from_texts(texts: &[&str], segment_count: usize) -> Vec<SegmentRef> {
    let segment_count = segment_count.max(1);
    let per_segment = texts.len().div_ceil(segment_count).max(1);
    texts
        .chunks(per_segment)
        .enumerate()
        .map(|(i, chunk)| {
            let doc_base = (i * per_segment) as u32;
            Arc::new(MemorySegment::from_texts(format!("segment-{i}"), doc_base, chunk))
                as SegmentRef
        })
        .collect()
}

/// One step of a scripted match source.
#[derive(Clone)]
pub enum ScriptStep {
    /// Produce this hit.
    Hit(Hit),
    /// Fail with this message.
    Fail(String),
    /// Run a callback, then continue with the next step.
    Call(Arc<dyn Fn() + Send + Sync>),
}

impl fmt::Debug for ScriptStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScriptStep::Hit(hit) => f.debug_tuple("Hit").field(hit).finish(),
            ScriptStep::Fail(msg) => f.debug_tuple("Fail").field(msg).finish(),
            ScriptStep::Call(_) => f.write_str("Call(..)"),
        }
    }
}

/// Fixed sequences of steps, keyed by segment id.
#[derive(Debug, Clone, Default)]
pub struct Script {
    steps: AHashMap<String, Vec<ScriptStep>>,
}

impl Script {
    /// Create an empty script.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the steps for one segment.
    pub fn with_segment<S: Into<String>>(mut self, segment: S, steps: Vec<ScriptStep>) -> Self {
        self.steps.insert(segment.into(), steps);
        self
    }

    /// Set plain hits `(doc, start, end)` for one segment.
    pub fn with_hits<S: Into<String>>(self, segment: S, hits: &[(u32, u32, u32)]) -> Self {
        let steps = hits
            .iter()
            .map(|&(doc, start, end)| ScriptStep::Hit(Hit::new(doc, start, end)))
            .collect();
        self.with_segment(segment, steps)
    }
}

/// Queries over [`MemorySegment`]s.
#[derive(Debug, Clone)]
pub enum MemoryQuery {
    /// A single word, case-insensitive.
    Term(String),
    /// Consecutive words, case-insensitive.
    Phrase(Vec<String>),
    /// All hits of all clauses in document order. A span matched by more than
    /// one clause is produced once per clause.
    AnyOf(Vec<MemoryQuery>),
    /// Steps defined per segment; segments without a script have no matches.
    Scripted(Script),
}

impl MemoryQuery {
    /// Parse a query string: one word is a term, several words a phrase.
    pub fn parse(query: &str) -> Result<Self> {
        let mut words = tokenize(query);
        match words.len() {
            0 => Err(HitstreamError::invalid_operation("empty query")),
            1 => Ok(MemoryQuery::Term(words.remove(0))),
            _ => Ok(MemoryQuery::Phrase(words)),
        }
    }

    fn hits(&self, segment: &dyn SegmentContext) -> Vec<Hit> {
        match self {
            MemoryQuery::Term(term) => phrase_hits(segment, &[term.to_lowercase()]),
            MemoryQuery::Phrase(words) => {
                let folded: Vec<String> = words.iter().map(|w| w.to_lowercase()).collect();
                phrase_hits(segment, &folded)
            }
            MemoryQuery::AnyOf(clauses) => {
                let mut hits: Vec<Hit> = clauses.iter().flat_map(|c| c.hits(segment)).collect();
                hits.sort_by_key(|h| (h.doc, h.start, h.end));
                hits
            }
            MemoryQuery::Scripted(script) => script
                .steps
                .get(segment.id())
                .into_iter()
                .flatten()
                .filter_map(|step| match step {
                    ScriptStep::Hit(hit) => Some(hit.clone()),
                    _ => None,
                })
                .collect(),
        }
    }
}

/// Find every occurrence of `folded_words` (already lowercased) in a segment.
fn phrase_hits(segment: &dyn SegmentContext, folded_words: &[String]) -> Vec<Hit> {
    let mut hits = Vec::new();
    if folded_words.is_empty() {
        return hits;
    }
    let width = folded_words.len() as u32;
    for doc in 0..segment.estimated_doc_count() as u32 {
        let tokens: Vec<String> = (0..)
            .map_while(|position| segment.token(doc, position))
            .map(str::to_lowercase)
            .collect();
        for (start, window) in tokens.windows(folded_words.len()).enumerate() {
            if window == folded_words {
                let start = start as u32;
                hits.push(Hit::new(doc, start, start + width));
            }
        }
    }
    hits
}

impl CompiledQuery for MemoryQuery {
    fn match_source(&self, segment: &dyn SegmentContext) -> Result<Option<Box<dyn MatchSource>>> {
        let steps = match self {
            MemoryQuery::Scripted(script) => script.steps.get(segment.id()).cloned(),
            _ => {
                let hits = self.hits(segment);
                (!hits.is_empty()).then(|| hits.into_iter().map(ScriptStep::Hit).collect())
            }
        };
        Ok(steps.map(|steps| {
            Box::new(ScriptedSource {
                steps,
                position: 0,
                current: Hit::default(),
            }) as Box<dyn MatchSource>
        }))
    }
}

/// Match source replaying a list of steps.
#[derive(Debug)]
struct ScriptedSource {
    steps: Vec<ScriptStep>,
    position: usize,
    current: Hit,
}

impl MatchSource for ScriptedSource {
    fn advance(&mut self) -> Result<bool> {
        while let Some(step) = self.steps.get(self.position) {
            self.position += 1;
            match step {
                ScriptStep::Hit(hit) => {
                    self.current.clone_from(hit);
                    return Ok(true);
                }
                ScriptStep::Fail(message) => {
                    return Err(io::Error::other(message.clone()).into());
                }
                ScriptStep::Call(callback) => callback(),
            }
        }
        Ok(false)
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

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(source: &mut dyn MatchSource) -> Vec<Hit> {
        let mut hits = Vec::new();
        while source.advance().unwrap() {
            let mut hit = Hit::default();
            source.copy_into(&mut hit);
            hits.push(hit);
        }
        hits
    }

    #[test]
    fn test_term_and_phrase() {
        let segment = MemorySegment::from_texts("s", 0, &["The cat sat", "a cat, the cat"]);
        let mut source = MemoryQuery::Term("cat".into())
            .match_source(&segment)
            .unwrap()
            .unwrap();
        assert_eq!(
            drain(source.as_mut()),
            vec![Hit::new(0, 1, 2), Hit::new(1, 1, 2), Hit::new(1, 3, 4)]
        );

        let mut source = MemoryQuery::parse("the cat")
            .unwrap()
            .match_source(&segment)
            .unwrap()
            .unwrap();
        assert_eq!(drain(source.as_mut()), vec![Hit::new(0, 0, 2), Hit::new(1, 2, 4)]);
    }

    #[test]
    fn test_no_matches_yields_no_source() {
        let segment = MemorySegment::from_texts("s", 0, &["nothing here"]);
        let source = MemoryQuery::Term("cat".into()).match_source(&segment).unwrap();
        assert!(source.is_none());
    }

    #[test]
    fn test_any_of_produces_duplicates() {
        let segment = MemorySegment::from_texts("s", 0, &["cat dog cat"]);
        let query = MemoryQuery::AnyOf(vec![
            MemoryQuery::Term("cat".into()),
            MemoryQuery::Term("cat".into()),
        ]);
        let mut source = query.match_source(&segment).unwrap().unwrap();
        assert_eq!(
            drain(source.as_mut()),
            vec![
                Hit::new(0, 0, 1),
                Hit::new(0, 0, 1),
                Hit::new(0, 2, 3),
                Hit::new(0, 2, 3)
            ]
        );
    }

    #[test]
    fn test_scripted_failure() {
        let segment = MemorySegment::empty("s", 0, 2);
        let script = Script::new().with_segment(
            "s",
            vec![
                ScriptStep::Hit(Hit::new(0, 0, 1)),
                ScriptStep::Fail("disk on fire".into()),
            ],
        );
        let mut source = MemoryQuery::Scripted(script)
            .match_source(&segment)
            .unwrap()
            .unwrap();
        assert!(source.advance().unwrap());
        let err = source.advance().unwrap_err();
        assert!(err.to_string().contains("disk on fire"));
    }

    #[test]
    fn test_segments_from_texts() {
        let segments = segments_from_texts(&["a", "b", "c", "d", "e"], 2);
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].doc_base(), 0);
        assert_eq!(segments[1].doc_base(), 3);
        assert_eq!(segments[1].estimated_doc_count(), 2);
        assert_eq!(segments[1].token(0, 0), Some("d"));
    }

    #[test]
    fn test_parse_empty_query() {
        assert!(MemoryQuery::parse("  ").is_err());
    }
}
