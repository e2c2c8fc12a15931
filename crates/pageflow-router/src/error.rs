//! Navigation error types.

use thiserror::Error;

/// Errors raised synchronously by [`NavigationController`](crate::NavigationController).
///
/// Every failing operation leaves the route registry, the stack and the view
/// cache exactly as they were.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum NavigationError {
    /// No route with this name is registered.
    #[error("route '{name}' is not registered")]
    RouteNotFound {
        /// The requested route name.
        name: String,
    },

    /// A route with this name already exists.
    #[error("route '{name}' is already registered")]
    RouteAlreadyRegistered {
        /// The duplicate route name.
        name: String,
    },

    /// Nothing has been navigated to yet.
    #[error("navigation stack is empty")]
    EmptyStack,

    /// The view cannot be evicted while it is shown.
    #[error("view for route '{name}' is currently active")]
    ViewActive {
        /// The route whose view is visible.
        name: String,
    },
}

impl NavigationError {
    pub(crate) fn not_found(name: &str) -> Self {
        Self::RouteNotFound {
            name: name.to_string(),
        }
    }

    /// Returns a user-friendly error message suitable for a status line.
    #[must_use]
    pub fn user_message(&self) -> &str {
        match self {
            Self::RouteNotFound { .. } => "That page does not exist.",
            Self::RouteAlreadyRegistered { .. } => "That page is defined twice.",
            Self::EmptyStack => "No page is open yet.",
            Self::ViewActive { .. } => "The page is still open.",
        }
    }

    /// Whether the error stems from application setup rather than user input.
    pub fn is_programming_error(&self) -> bool {
        matches!(
            self,
            Self::RouteAlreadyRegistered { .. } | Self::ViewActive { .. }
        )
    }
}

/// Result type alias for navigation operations.
pub type Result<T> = std::result::Result<T, NavigationError>;
