//! Filtering hits by comparing one of their properties to a value.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{HitstreamError, Result};
use crate::filter::{CollationCache, HitPredicate, SegmentHitFilter};
use crate::hit::HitAccess;
use crate::segment::SegmentRef;

/// A property of a hit that can be compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HitProperty {
    /// Global document id.
    DocId,
    /// Start position.
    HitStart,
    /// End position.
    HitEnd,
    /// Number of tokens.
    HitLength,
    /// Matched text.
    HitText,
    /// Text of a capture slot.
    CaptureText(usize),
}

impl HitProperty {
    /// Is this a text property?
    pub fn is_text(&self) -> bool {
        matches!(self, HitProperty::HitText | HitProperty::CaptureText(_))
    }
}

impl fmt::Display for HitProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HitProperty::DocId => f.write_str("docid"),
            HitProperty::HitStart => f.write_str("start"),
            HitProperty::HitEnd => f.write_str("end"),
            HitProperty::HitLength => f.write_str("length"),
            HitProperty::HitText => f.write_str("text"),
            HitProperty::CaptureText(i) => write!(f, "capture:{i}"),
        }
    }
}

/// Value a property is compared with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    /// Numeric value, for document ids and positions.
    Int(u64),
    /// Text, compared case- and diacritic-insensitively.
    Text(String),
}

/// Keeps hits whose property equals a value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyFilter {
    /// The property to compare.
    pub property: HitProperty,
    /// The value it must equal.
    pub value: PropertyValue,
}

impl PropertyFilter {
    /// Create a filter, checking that the value type fits the property.
    pub fn new(property: HitProperty, value: PropertyValue) -> Result<Self> {
        match (&value, property.is_text()) {
            (PropertyValue::Text(_), true) | (PropertyValue::Int(_), false) => {
                Ok(PropertyFilter { property, value })
            }
            _ => Err(HitstreamError::invalid_operation(format!(
                "cannot compare property {property} with {value:?}"
            ))),
        }
    }
}

impl HitPredicate for PropertyFilter {
    fn for_segment(
        &self,
        segment: &SegmentRef,
        cache: &CollationCache,
    ) -> Result<Box<dyn SegmentHitFilter>> {
        let target = match &self.value {
            PropertyValue::Int(n) => Target::Int(*n),
            PropertyValue::Text(text) => Target::Key(cache.key(text)),
        };
        Ok(Box::new(SegmentPropertyFilter {
            property: self.property,
            target,
            segment: Arc::clone(segment),
            cache: cache.clone(),
        }))
    }
}

enum Target {
    Int(u64),
    Key(Arc<str>),
}

struct SegmentPropertyFilter {
    property: HitProperty,
    target: Target,
    segment: SegmentRef,
    cache: CollationCache,
}

impl SegmentPropertyFilter {
    fn int_value(&self, hits: &dyn HitAccess, index: usize) -> u64 {
        match self.property {
            HitProperty::DocId => u64::from(self.segment.doc_base()) + u64::from(hits.doc(index)),
            HitProperty::HitStart => hits.start(index) as u64,
            HitProperty::HitEnd => hits.end(index) as u64,
            HitProperty::HitLength => hits.end(index).saturating_sub(hits.start(index)) as u64,
            HitProperty::HitText | HitProperty::CaptureText(_) => u64::MAX,
        }
    }

    fn text_value(&self, hits: &dyn HitAccess, index: usize) -> Option<String> {
        let doc = hits.doc(index);
        let (start, end) = match self.property {
            HitProperty::CaptureText(slot) => {
                let info = hits.captures(index)?.get(slot)?;
                (info.span_start(), info.span_end())
            }
            _ => (hits.start(index), hits.end(index)),
        };
        self.segment.text(doc, start, end)
    }
}

impl SegmentHitFilter for SegmentPropertyFilter {
    fn test(&mut self, hits: &dyn HitAccess, index: usize) -> Result<bool> {
        Ok(match &self.target {
            Target::Int(n) => self.int_value(hits, index) == *n,
            Target::Key(key) => self
                .text_value(hits, index)
                .is_some_and(|text| self.cache.key(&text) == *key),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::HitFilter;
    use crate::hit::{CapturedSpans, Hit, HitBuffer, MatchInfo};
    use crate::segment::memory::MemorySegment;

    fn segment() -> SegmentRef {
        Arc::new(MemorySegment::from_texts(
            "s",
            100,
            &["Das Café ist offen", "das cafe"],
        ))
    }

    fn run(filter: PropertyFilter, hits: &[Hit]) -> Vec<bool> {
        let cache = CollationCache::new();
        let buffer: HitBuffer = hits.iter().cloned().collect();
        let mut bound = HitFilter::new(filter)
            .for_segment(&segment(), &cache)
            .unwrap()
            .unwrap();
        (0..hits.len()).map(|i| bound.test(&buffer, i).unwrap()).collect()
    }

    #[test]
    fn test_text_is_collated() {
        let filter =
            PropertyFilter::new(HitProperty::HitText, PropertyValue::Text("CAFE".into())).unwrap();
        let hits = [Hit::new(0, 1, 2), Hit::new(1, 1, 2), Hit::new(0, 0, 1)];
        assert_eq!(run(filter, &hits), vec![true, true, false]);
    }

    #[test]
    fn test_numeric_properties() {
        let hits = [Hit::new(0, 1, 3), Hit::new(1, 0, 1)];
        let doc = PropertyFilter::new(HitProperty::DocId, PropertyValue::Int(101)).unwrap();
        assert_eq!(run(doc, &hits), vec![false, true]);
        let length = PropertyFilter::new(HitProperty::HitLength, PropertyValue::Int(2)).unwrap();
        assert_eq!(run(length, &hits), vec![true, false]);
    }

    #[test]
    fn test_doc_id_near_last_document_id() {
        let segment: SegmentRef = Arc::new(MemorySegment::empty("last", u32::MAX, 2));
        let target = u64::from(u32::MAX) + 1;
        let filter = PropertyFilter::new(HitProperty::DocId, PropertyValue::Int(target)).unwrap();
        let buffer: HitBuffer = [Hit::new(0, 0, 1), Hit::new(1, 0, 1)].into_iter().collect();
        let mut bound = HitFilter::new(filter)
            .for_segment(&segment, &CollationCache::new())
            .unwrap()
            .unwrap();
        assert!(!bound.test(&buffer, 0).unwrap());
        assert!(bound.test(&buffer, 1).unwrap());
    }

    #[test]
    fn test_capture_text() {
        let captured = Hit::new(0, 0, 4)
            .with_captures(CapturedSpans::new(vec![None, Some(MatchInfo::span(3, 4))]));
        let hits = [captured, Hit::new(0, 0, 4)];
        let filter =
            PropertyFilter::new(HitProperty::CaptureText(1), PropertyValue::Text("Offen".into()))
                .unwrap();
        assert_eq!(run(filter, &hits), vec![true, false]);
    }

    #[test]
    fn test_mismatched_value_type() {
        assert!(PropertyFilter::new(HitProperty::HitText, PropertyValue::Int(1)).is_err());
        assert!(PropertyFilter::new(HitProperty::HitStart, PropertyValue::Text("x".into())).is_err());
    }

    #[test]
    fn test_serde() {
        let filter =
            PropertyFilter::new(HitProperty::CaptureText(2), PropertyValue::Text("x".into())).unwrap();
        let json = serde_json::to_string(&filter).unwrap();
        assert_eq!(json, r#"{"property":{"capture_text":2},"value":"x"}"#);
        let parsed: PropertyFilter = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, filter);
    }
}
