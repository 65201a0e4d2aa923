//! Cancel request flag shared between the cancel button and the main loop

use portable_atomic::{AtomicBool, Ordering};

/// Pending cancel request.
///
/// The button side only ever calls [`CancelFlag::request`]; the main loop
/// consumes the request at its poll points with [`CancelFlag::take`] and
/// drops a stale one with [`CancelFlag::clear`] when an alarm starts ringing.
#[derive(Debug, Default)]
pub struct CancelFlag {
    /// Set when a cancel press has not been consumed yet
    pending: AtomicBool,
}

impl CancelFlag {
    /// A flag with nothing pending
    pub const fn new() -> Self {
        Self {
            pending: AtomicBool::new(false),
        }
    }

    /// Record a cancel press
    pub fn request(&self) {
        self.pending.store(true, Ordering::Release);
    }

    /// Consume the pending request, returning whether there was one
    pub fn take(&self) -> bool {
        self.pending.swap(false, Ordering::AcqRel)
    }

    /// Drop any pending request
    pub fn clear(&self) {
        self.pending.store(false, Ordering::Release);
    }
}
