//! Deferred navigation requests and the context handed to view factories.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

use pageflow_bridge::AsyncBridge;
use pageflow_store::SharedStore;

use crate::view::Params;

/// A navigation request queued by a view.
#[derive(Debug, Clone, PartialEq)]
pub enum NavRequest {
    /// Replace the stack with `route`.
    Navigate {
        route: String,
        params: Option<Params>,
    },
    /// Push `route` on top of the stack.
    Push {
        route: String,
        params: Option<Params>,
    },
    /// Go back one entry.
    Pop,
}

/// Navigation handle held by views.
///
/// Views cannot call the controller while it is running their lifecycle
/// callbacks, so requests are queued here and applied by the controller as
/// soon as the current operation finishes, or by
/// [`NavigationController::process_requests`](crate::NavigationController::process_requests).
#[derive(Clone, Default)]
pub struct Navigator {
    queue: Rc<RefCell<VecDeque<NavRequest>>>,
}

impl Navigator {
    /// Create a handle with an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a stack replacement.
    pub fn navigate(&self, route: impl Into<String>, params: Option<Params>) {
        self.request(NavRequest::Navigate {
            route: route.into(),
            params,
        });
    }

    /// Request a push.
    pub fn push(&self, route: impl Into<String>, params: Option<Params>) {
        self.request(NavRequest::Push {
            route: route.into(),
            params,
        });
    }

    /// Request going back.
    pub fn pop(&self) {
        self.request(NavRequest::Pop);
    }

    /// Number of requests not yet applied.
    pub fn pending(&self) -> usize {
        self.queue.borrow().len()
    }

    fn request(&self, request: NavRequest) {
        tracing::trace!(?request, "Navigation request queued");
        self.queue.borrow_mut().push_back(request);
    }

    pub(crate) fn next(&self) -> Option<NavRequest> {
        self.queue.borrow_mut().pop_front()
    }
}

impl fmt::Debug for Navigator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Navigator")
            .field("pending", &self.pending())
            .finish()
    }
}

/// Everything a view factory may hand to the view it builds.
#[derive(Clone, Debug)]
pub struct ViewContext {
    navigator: Navigator,
    store: SharedStore,
    bridge: Rc<AsyncBridge>,
}

impl ViewContext {
    pub(crate) fn new(navigator: Navigator, store: SharedStore, bridge: Rc<AsyncBridge>) -> Self {
        Self {
            navigator,
            store,
            bridge,
        }
    }

    /// Handle for requesting navigation.
    pub fn navigator(&self) -> &Navigator {
        &self.navigator
    }

    /// The application's shared store.
    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    /// The application's execution bridge.
    pub fn bridge(&self) -> &Rc<AsyncBridge> {
        &self.bridge
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requests_are_fifo_and_shared_between_clones() {
        let navigator = Navigator::new();
        let clone = navigator.clone();
        navigator.push("profile", None);
        clone.pop();

        assert_eq!(navigator.pending(), 2);
        assert!(matches!(
            navigator.next(),
            Some(NavRequest::Push { route, .. }) if route == "profile"
        ));
        assert_eq!(clone.next(), Some(NavRequest::Pop));
        assert_eq!(navigator.next(), None);
    }
}
