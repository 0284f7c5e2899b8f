//! Cooperative cancellation.
//!
//! A search owns a [`CancellationToken`]. Any thread doing work for that
//! search installs the token as its thread-local abort signal with
//! [`CancellationToken::enter`]; long loops then call [`check_abort`] at points
//! where stopping leaves no half-written state behind.

use std::cell::RefCell;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use log::debug;

use crate::error::{HitstreamError, Result};

thread_local! {
    static CURRENT: RefCell<Option<CancellationToken>> = const { RefCell::new(None) };
}

/// Shared flag used to abort a running search.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Create a new, not yet cancelled token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Has cancellation been requested?
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Install this token as the current thread's abort signal until the
    /// returned guard is dropped.
    pub fn enter(&self) -> AbortScope {
        let previous = CURRENT.with(|current| current.replace(Some(self.clone())));
        AbortScope { previous }
    }
}

/// Guard returned by [`CancellationToken::enter`]; restores the previous
/// signal on drop.
#[must_use = "the token is only installed while the scope is alive"]
#[derive(Debug)]
pub struct AbortScope {
    previous: Option<CancellationToken>,
}

impl Drop for AbortScope {
    fn drop(&mut self) {
        let previous = self.previous.take();
        CURRENT.with(|current| *current.borrow_mut() = previous);
    }
}

/// Return [`HitstreamError::Interrupted`] if the current thread's search was
/// cancelled.
pub fn check_abort() -> Result<()> {
    let cancelled = CURRENT.with(|current| {
        current
            .borrow()
            .as_ref()
            .is_some_and(CancellationToken::is_cancelled)
    });
    if cancelled {
        debug!("search was cancelled, aborting");
        return Err(HitstreamError::Interrupted);
    }
    Ok(())
}
