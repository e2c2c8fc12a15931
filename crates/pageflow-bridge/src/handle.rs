//! Request identifiers and cancellation handles.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Identifies one `run_async`/`run_async_cached` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(pub(crate) u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "req#{}", self.0)
    }
}

/// Best-effort cancellation handle.
///
/// Cancelling suppresses every delivery for the request that has not yet run
/// on the UI thread. A task already executing on a worker keeps running, and
/// a shared cached fetch still completes for its other waiters.
#[derive(Debug, Clone)]
pub struct TaskHandle {
    id: RequestId,
    cancelled: Arc<AtomicBool>,
}

impl TaskHandle {
    pub(crate) fn new(id: RequestId) -> Self {
        Self {
            id,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// The request this handle controls.
    pub fn id(&self) -> RequestId {
        self.id
    }

    /// Suppress any delivery that has not happened yet.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Whether [`cancel`](Self::cancel) was called.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    pub(crate) fn flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancelled)
    }
}
