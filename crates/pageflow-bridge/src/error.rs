//! Error types for the execution bridge.

use std::sync::Arc;

use thiserror::Error;

/// Failure of a submitted task, delivered through `on_error`.
///
/// Cloneable so one failed fetch can be delivered to every caller that was
/// waiting on it.
#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum TaskError {
    /// The task returned an error.
    #[error("task failed: {0:#}")]
    Failed(Arc<anyhow::Error>),

    /// The task panicked on its worker thread.
    #[error("task panicked: {0}")]
    Panicked(String),

    /// A cached value was delivered to a caller expecting a different type.
    #[error("cached value for '{key}' is not a {expected}")]
    TypeMismatch {
        /// Cache key that was shared by incompatible callers.
        key: String,
        /// Type name the caller asked for.
        expected: &'static str,
    },

    /// The bridge was shut down before the task could be submitted.
    #[error("execution bridge is shut down")]
    Shutdown,
}

impl TaskError {
    /// Wrap an error returned by a task.
    pub fn failed(error: anyhow::Error) -> Self {
        Self::Failed(Arc::new(error))
    }

    /// Returns a user-friendly error message suitable for display in a view.
    #[must_use]
    pub fn user_message(&self) -> &str {
        match self {
            Self::Failed(_) => "The operation could not be completed.",
            Self::Panicked(_) | Self::TypeMismatch { .. } => "An unexpected error occurred.",
            Self::Shutdown => "The application is shutting down.",
        }
    }

    /// Returns the task's own error, if it returned one.
    pub fn source_error(&self) -> Option<&anyhow::Error> {
        match self {
            Self::Failed(error) => Some(error),
            _ => None,
        }
    }
}

/// Errors raised while constructing a bridge.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum BridgeError {
    /// Configuration values are out of range.
    #[error("invalid bridge configuration: {0}")]
    InvalidConfig(String),

    /// The worker pool could not be started.
    #[error("failed to start worker pool: {0}")]
    WorkerPool(#[from] std::io::Error),
}

/// Result type alias for bridge construction.
pub type Result<T> = std::result::Result<T, BridgeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_keeps_source_chain() {
        let error = TaskError::failed(anyhow::anyhow!("connection refused").context("fetch user"));
        assert_eq!(
            error.to_string(),
            "task failed: fetch user: connection refused"
        );
        assert!(error.source_error().is_some());
    }

    #[test]
    fn user_messages() {
        assert!(TaskError::Shutdown.user_message().contains("shutting down"));
        assert!(
            TaskError::Panicked("boom".into())
                .user_message()
                .contains("unexpected")
        );
    }
}
