//! Hand-off from worker threads to the UI-owning thread.
//!
//! Workers never call user callbacks. They enqueue a [`UiMessage`] on a
//! multi-producer channel; the UI thread drains the channel once per tick and
//! runs the callbacks there.
//!
//! ```text
//! [worker] --Deliver{request, outcome}--> [channel] --drain--> [UI thread: on_success/on_error]
//! [any thread] --Run(closure)----------->
//! ```

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crossbeam_channel::Sender;

use crate::error::TaskError;
use crate::handle::RequestId;

/// Shared, type-erased cached value.
pub(crate) type Payload = Arc<dyn Any + Send + Sync>;

/// Result of one attempt, as carried across the channel.
pub(crate) enum Outcome {
    /// Result of an uncached task; delivered to exactly one request.
    Owned(Box<dyn Any + Send>),
    /// Cached value shared by every waiter.
    Shared(Payload),
    /// The attempt failed.
    Failed(TaskError),
}

impl Outcome {
    pub(crate) fn owned<T: Send + 'static>(value: T) -> Self {
        Self::Owned(Box::new(value))
    }

    /// Outcome of a shared fetch, one per waiting request.
    pub(crate) fn shared(result: &Result<Payload, TaskError>) -> Self {
        match result {
            Ok(payload) => Self::Shared(Arc::clone(payload)),
            Err(error) => Self::Failed(error.clone()),
        }
    }
}

impl fmt::Debug for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Owned(_) => f.write_str("Owned(..)"),
            Self::Shared(_) => f.write_str("Shared(..)"),
            Self::Failed(error) => f.debug_tuple("Failed").field(error).finish(),
        }
    }
}

/// One unit of work for the UI thread.
pub(crate) enum UiMessage {
    /// Deliver an outcome to a registered request. `last` removes the
    /// request's callbacks after delivery.
    Deliver {
        request: RequestId,
        outcome: Outcome,
        last: bool,
    },
    /// Run an arbitrary closure posted through [`UiHandle::post`].
    Run(Box<dyn FnOnce() + Send>),
}

/// Thread-safe handle for enqueueing work onto the UI-owning thread.
///
/// Cheap to clone and safe to use from any number of threads. Work posted
/// here runs the next time the bridge's queue is drained.
#[derive(Clone)]
pub struct UiHandle {
    sender: Sender<UiMessage>,
}

impl UiHandle {
    pub(crate) fn new(sender: Sender<UiMessage>) -> Self {
        Self { sender }
    }

    /// Enqueue `work` to run on the UI thread.
    ///
    /// Returns `false` if the bridge owning the queue has been dropped.
    pub fn post<F>(&self, work: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        self.sender.send(UiMessage::Run(Box::new(work))).is_ok()
    }

    pub(crate) fn deliver(&self, request: RequestId, outcome: Outcome, last: bool) {
        let message = UiMessage::Deliver {
            request,
            outcome,
            last,
        };
        if self.sender.send(message).is_err() {
            // Receiver gone means the bridge was dropped; nobody is listening.
            tracing::trace!(%request, "Dropped delivery after bridge teardown");
        }
    }
}

impl fmt::Debug for UiHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UiHandle")
            .field("queued", &self.sender.len())
            .finish()
    }
}
