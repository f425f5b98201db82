//! Cooperative cancellation for long-running analysis operations.
//!
//! The engine is single-threaded, but hosts typically flip the flag from an
//! event loop or a request-dispatch thread while a check or merge is in
//! flight. Operations probe the token between entries and between rules and
//! return a partial result with a `cancelled` marker; they never abandon an
//! in-progress mutation.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Shared cancellation flag handed to `check`, `merge`, and query execution.
///
/// Cloning is cheap; all clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// Create a token that has not been cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    /// True once `cancel` has been called on any clone of this token.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}
