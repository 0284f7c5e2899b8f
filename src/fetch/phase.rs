//! The phase of a running retrieval.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

/// What workers do with the hits they read.
///
/// Phases only move forward: storing, then counting only, then done.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum Phase {
    /// Hits are stored and counted.
    StoringAndCounting = 0,
    /// The processing ceiling was reached; hits are only counted.
    CountingOnly = 1,
    /// The counting ceiling was reached or all segments are exhausted.
    Done = 2,
}

impl Phase {
    fn from_u8(value: u8) -> Phase {
        match value {
            0 => Phase::StoringAndCounting,
            1 => Phase::CountingOnly,
            _ => Phase::Done,
        }
    }

    /// Are hits stored in this phase?
    pub fn is_storing(self) -> bool {
        self == Phase::StoringAndCounting
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::StoringAndCounting => f.write_str("storing and counting"),
            Phase::CountingOnly => f.write_str("counting only"),
            Phase::Done => f.write_str("done"),
        }
    }
}

/// Phase shared by all workers of one retrieval.
#[derive(Debug, Default)]
pub struct SharedPhase(AtomicU8);

impl SharedPhase {
    /// Start in [`Phase::StoringAndCounting`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Current phase.
    pub fn get(&self) -> Phase {
        Phase::from_u8(self.0.load(Ordering::SeqCst))
    }

    /// Move forward to `phase`; never moves back. Returns the resulting phase.
    pub fn advance_to(&self, phase: Phase) -> Phase {
        let previous = self.0.fetch_max(phase as u8, Ordering::SeqCst);
        Phase::from_u8(previous.max(phase as u8))
    }
}
