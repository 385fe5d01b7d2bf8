//! Error types for resolution.

use thiserror::Error;

/// Result type alias for resolution operations.
pub type Result<T> = std::result::Result<T, ResolveError>;

/// Errors surfaced by the resolution engine.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The moniker string failed to parse, or a template placeholder
    /// could not be resolved.
    #[error(transparent)]
    Core(#[from] waypost_core::Error),

    /// Neither the path nor any ancestor has a catalog node.
    #[error("unknown moniker: no catalog node at '{path}'")]
    UnknownMoniker {
        /// The registry key that was looked up.
        path: String,
    },

    /// The path is known but no binding is inheritable anywhere up the
    /// chain.
    #[error("no source binding at or above '{path}'")]
    NoBinding {
        /// The registry key that was looked up.
        path: String,
    },

    /// An unclassified failure.
    #[error("internal error: {message}")]
    Internal {
        /// Description of the failure.
        message: String,
    },
}

impl ResolveError {
    /// True when the error maps to a not-found outcome.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::UnknownMoniker { .. } | Self::NoBinding { .. })
    }
}
