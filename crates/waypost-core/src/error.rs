//! Error types and result aliases shared across Waypost components.

/// The result type used throughout the core crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Machine-readable sub-reason for a moniker parse failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonikerErrorKind {
    /// The domain part is missing or malformed.
    BadDomain,
    /// A path segment is empty or contains invalid characters.
    BadSegment,
    /// The `@version` suffix is neither `latest` nor a valid `YYYYMMDD` date.
    BadVersion,
    /// The `/vN` suffix is not a positive integer revision.
    BadRevision,
    /// The query-parameter section is malformed.
    BadParams,
}

impl MonikerErrorKind {
    /// Returns the stable string form used in API error payloads.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::BadDomain => "bad_domain",
            Self::BadSegment => "bad_segment",
            Self::BadVersion => "bad_version",
            Self::BadRevision => "bad_revision",
            Self::BadParams => "bad_params",
        }
    }
}

impl std::fmt::Display for MonikerErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Errors produced by the core parsing and expansion primitives.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A moniker string could not be parsed.
    #[error("invalid moniker ({kind}): {message}")]
    InvalidMoniker {
        /// Sub-reason for the rejection.
        kind: MonikerErrorKind,
        /// Description of what was rejected.
        message: String,
    },

    /// A query template contained a placeholder that could not be resolved.
    #[error("unresolved template placeholder: {{{placeholder}}}")]
    TemplateMissing {
        /// The placeholder text, without braces.
        placeholder: String,
    },

    /// A serialization step failed.
    #[error("serialization error: {message}")]
    Serialization {
        /// Description of the failure.
        message: String,
    },

    /// An internal error that should not occur in normal operation.
    #[error("internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },
}

impl Error {
    /// Creates an invalid-moniker error.
    #[must_use]
    pub fn invalid_moniker(kind: MonikerErrorKind, message: impl Into<String>) -> Self {
        Self::InvalidMoniker {
            kind,
            message: message.into(),
        }
    }

    /// Creates a template placeholder error.
    #[must_use]
    pub fn template_missing(placeholder: impl Into<String>) -> Self {
        Self::TemplateMissing {
            placeholder: placeholder.into(),
        }
    }

    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}
