//! Error types for the Hitstream library.
//!
//! All fallible operations return [`Result`], whose error type is the
//! [`HitstreamError`] enum. Reaching a configured hit ceiling is *not* an
//! error; it is reported through the result statistics instead.
//!
//! # Examples
//!
//! ```
//! use hitstream::error::{HitstreamError, Result};
//!
//! fn example_operation() -> Result<()> {
//!     Err(HitstreamError::invalid_config("max hits to process exceeds max hits to count"))
//! }
//!
//! match example_operation() {
//!     Ok(_) => println!("Success"),
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```

use std::io;
use std::sync::Arc;

use thiserror::Error;

/// The main error type for Hitstream operations.
#[derive(Error, Debug)]
pub enum HitstreamError {
    /// I/O errors (reading corpus files, index data, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A match source failed while reading one segment.
    #[error("Segment {segment} failed: {message}")]
    Segment {
        /// Identifier of the failing segment.
        segment: String,
        /// Description of the underlying failure.
        message: String,
        /// The underlying failure, if there was one. Shared so that a
        /// remembered failure can be replayed with its cause.
        #[source]
        source: Option<Arc<HitstreamError>>,
    },

    /// The search was cancelled through its cancellation token.
    #[error("Search interrupted")]
    Interrupted,

    /// A hit index was read before it was guaranteed to be available.
    #[error("Hit index {index} is not available (available: {available})")]
    IndexNotAvailable {
        /// The requested index.
        index: usize,
        /// Number of hits available when the read was attempted.
        available: usize,
    },

    /// Invalid operation (contract violation by the caller).
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// Invalid configuration values.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Thread pool construction errors.
    #[error("Thread pool error: {0}")]
    ThreadPool(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error for other cases
    #[error("Error: {0}")]
    Other(String),
}

/// Result type alias for operations that may fail with HitstreamError.
pub type Result<T> = std::result::Result<T, HitstreamError>;

impl HitstreamError {
    /// Create a new segment failure.
    pub fn segment<S: Into<String>, M: Into<String>>(segment: S, message: M) -> Self {
        HitstreamError::Segment {
            segment: segment.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Create a new invalid operation error.
    pub fn invalid_operation<S: Into<String>>(msg: S) -> Self {
        HitstreamError::InvalidOperation(msg.into())
    }

    /// Create a new invalid config error.
    pub fn invalid_config<S: Into<String>>(msg: S) -> Self {
        HitstreamError::InvalidConfig(msg.into())
    }

    /// Create a new thread pool error.
    pub fn thread_pool<S: Into<String>>(msg: S) -> Self {
        HitstreamError::ThreadPool(msg.into())
    }

    /// Create a new generic error.
    pub fn other<S: Into<String>>(msg: S) -> Self {
        HitstreamError::Other(msg.into())
    }

    /// Create a new internal error.
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        HitstreamError::Other(format!("Internal error: {}", msg.into()))
    }

    /// Is this the interruption raised by a cancelled search?
    pub fn is_interrupted(&self) -> bool {
        matches!(self, HitstreamError::Interrupted)
    }

    /// Attach a segment id to an error raised while reading that segment.
    ///
    /// Interruptions and segment errors pass through unchanged so they are not
    /// wrapped twice.
    pub fn in_segment(self, segment: &str) -> Self {
        match self {
            e @ (HitstreamError::Interrupted | HitstreamError::Segment { .. }) => e,
            other => HitstreamError::Segment {
                segment: segment.to_string(),
                message: other.to_string(),
                source: Some(Arc::new(other)),
            },
        }
    }

    /// Rebuild an equivalent error so a remembered failure can be reported to
    /// more than one caller.
    pub(crate) fn replay(&self) -> Self {
        match self {
            HitstreamError::Interrupted => HitstreamError::Interrupted,
            HitstreamError::Segment {
                segment,
                message,
                source,
            } => HitstreamError::Segment {
                segment: segment.clone(),
                message: message.clone(),
                source: source.clone(),
            },
            HitstreamError::IndexNotAvailable { index, available } => {
                HitstreamError::IndexNotAvailable {
                    index: *index,
                    available: *available,
                }
            }
            HitstreamError::InvalidOperation(msg) => HitstreamError::InvalidOperation(msg.clone()),
            HitstreamError::InvalidConfig(msg) => HitstreamError::InvalidConfig(msg.clone()),
            HitstreamError::ThreadPool(msg) => HitstreamError::ThreadPool(msg.clone()),
            other => HitstreamError::Other(other.to_string()),
        }
    }
}
