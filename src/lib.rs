//! # Hitstream
//!
//! Lazy, bounded, parallel retrieval of the hits of a search over a
//! segmented corpus.
//!
//! ## Features
//!
//! - Hits are fetched on demand, only as far as a caller needs them
//! - Segments are read in parallel on a small per-search thread pool
//! - Separate ceilings on how many hits are stored and how many are counted
//! - Hits of one document are never split across a ceiling or interleaved
//!   with another document's hits
//! - Per-segment hit filters, including property filters with collation
//! - Cooperative cancellation from any thread

pub mod abort;
pub mod cli;
pub mod config;
pub mod error;
pub mod fetch;
pub mod filter;
pub mod hit;
pub mod results;
pub mod segment;
pub mod sequence;
pub mod stats;

pub mod prelude {
    pub use crate::abort::CancellationToken;
    pub use crate::config::{FetchConfig, SearchSettings};
    pub use crate::error::{HitstreamError, Result};
    pub use crate::fetch::Phase;
    pub use crate::filter::{HitFilter, HitProperty, PropertyFilter, PropertyValue};
    pub use crate::hit::{CapturedSpans, Hit, HitBuffer, MatchInfo};
    pub use crate::results::{HitResults, HitWindow};
    pub use crate::segment::memory::{MemoryQuery, MemorySegment, segments_from_texts};
    pub use crate::segment::{CompiledQuery, MatchSource, SegmentContext, SegmentRef};
    pub use crate::sequence::{HitSequence, RandomAccessHitSequence};
    pub use crate::stats::{MaxStats, ResultsStatsSnapshot};
}

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
