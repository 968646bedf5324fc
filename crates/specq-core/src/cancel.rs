//! Cooperative cancellation for provider execution.
//!
//! Compilation of a specification is pure in-memory graph construction and
//! never checks a token; cancellation is only meaningful while a source is
//! materializing a query.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

///
/// CancelToken
///
/// Cheap, cloneable cancellation flag. All clones share one flag; calling
/// `cancel` on any of them cancels the operation for all observers.
/// Sources check the token between rows and fail with
/// `SourceError::Cancelled`.
///

#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Signal cancellation to every clone of this token.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}
