//! Cooperative cancellation for running filters.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

/// Shared flag that asks a running filter to stop.
///
/// Clones observe the same flag, so one clone can be handed to another
/// thread and cancelled from there while the filter waits on its program.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    /// A token that has not been cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. The running program is killed at the next poll.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    /// Whether cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}
