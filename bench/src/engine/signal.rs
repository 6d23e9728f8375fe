//! Round-level failure flag

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Flag raised by any failing task and read by orchestration at round boundaries
///
/// Clones share the same flag. Concurrent raises are idempotent.
#[derive(Debug, Clone, Default)]
pub struct ErrorSignal(Arc<AtomicBool>);

impl ErrorSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that a failure occurred
    pub fn raise(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether any failure was recorded since the last reset
    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Clear the flag at the start of an independent round
    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}
