//! Error types for catalog operations.

use thiserror::Error;

use crate::types::NodeStatus;

/// Result type alias for catalog operations.
pub type Result<T> = std::result::Result<T, CatalogError>;

/// Errors that can occur during catalog operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// No node exists at the given path.
    #[error("no catalog node at '{path}'")]
    NotFound {
        /// The path that was looked up.
        path: String,
    },

    /// A status transition not allowed by the lifecycle state machine.
    #[error("illegal status transition {from} -> {to} for '{path}'")]
    IllegalTransition {
        /// The node path.
        path: String,
        /// Current status.
        from: NodeStatus,
        /// Requested status.
        to: NodeStatus,
    },

    /// A validated reload was refused because of breaking changes.
    #[error("reload rejected, breaking changes: {summary}")]
    BreakingChanges {
        /// Human-readable diff summary.
        summary: String,
    },

    /// A governance request was not found or already decided.
    #[error("request conflict: {message}")]
    RequestConflict {
        /// Description of the conflict.
        message: String,
    },

    /// The catalog definition could not be parsed.
    #[error("catalog definition error: {message}")]
    Definition {
        /// Description of the failure.
        message: String,
    },
}

impl CatalogError {
    /// Creates a not-found error for a path.
    #[must_use]
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound { path: path.into() }
    }

    /// Creates a definition error.
    #[must_use]
    pub fn definition(message: impl Into<String>) -> Self {
        Self::Definition {
            message: message.into(),
        }
    }

    /// Creates a request-conflict error.
    #[must_use]
    pub fn request_conflict(message: impl Into<String>) -> Self {
        Self::RequestConflict {
            message: message.into(),
        }
    }
}
