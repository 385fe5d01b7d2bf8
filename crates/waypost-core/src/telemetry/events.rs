//! Telemetry event types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome of a moniker operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventOutcome {
    /// The operation completed.
    Success,
    /// The operation failed.
    Error,
    /// The moniker had no catalog entry.
    NotFound,
}

/// Kind of operation that produced an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Operation {
    /// A moniker was resolved to a source binding.
    Resolve,
    /// A client reported fetching data from the resolved source.
    Read,
    /// Node metadata was described.
    Describe,
    /// Children of a path were listed.
    List,
    /// Ownership/lineage was queried.
    Lineage,
}

/// Identity of the caller making a request.
///
/// Read operations are anonymous; callers may self-identify through
/// headers for chargeback and lineage purposes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallerIdentity {
    /// Application/client identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_id: Option<String>,
    /// Team or department.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team: Option<String>,
}

impl CallerIdentity {
    /// Creates a caller identity from optional header values.
    #[must_use]
    pub fn new(app_id: Option<String>, team: Option<String>) -> Self {
        Self { app_id, team }
    }

    /// Primary identifier for this caller.
    #[must_use]
    pub fn principal(&self) -> &str {
        self.app_id.as_deref().unwrap_or("anonymous")
    }
}

/// A single usage event.
///
/// Captures everything needed for lineage ("what was accessed"),
/// governance ("by whom"), and debugging ("what went wrong").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageEvent {
    /// When the event occurred (UTC).
    pub timestamp: DateTime<Utc>,
    /// Request ID for correlation.
    pub request_id: String,
    /// Who made the request.
    pub caller: CallerIdentity,
    /// The full moniker string as received.
    pub moniker: String,
    /// The operation performed.
    pub operation: Operation,
    /// How it went.
    pub outcome: EventOutcome,
    /// Resolved source type, when resolution got that far.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_type: Option<String>,
    /// Wall-clock latency in milliseconds.
    pub latency_ms: f64,
    /// Effective accountable owner at access time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_at_access: Option<String>,
    /// True when the resolved node was deprecated.
    pub deprecated: bool,
    /// Successor path of the resolved node, when set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub successor: Option<String>,
    /// Original path when the resolution followed a successor redirect.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirected_from: Option<String>,
    /// Error description for failed operations.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl UsageEvent {
    /// Creates an event with the required fields; optional details are
    /// attached with the `with_*` builders.
    #[must_use]
    pub fn new(
        moniker: impl Into<String>,
        operation: Operation,
        caller: CallerIdentity,
        outcome: EventOutcome,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            request_id: ulid::Ulid::new().to_string(),
            caller,
            moniker: moniker.into(),
            operation,
            outcome,
            source_type: None,
            latency_ms: 0.0,
            owner_at_access: None,
            deprecated: false,
            successor: None,
            redirected_from: None,
            error_message: None,
        }
    }

    /// Sets the request id used for correlation.
    #[must_use]
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = request_id.into();
        self
    }

    /// Sets the observed latency.
    #[must_use]
    pub fn with_latency_ms(mut self, latency_ms: f64) -> Self {
        self.latency_ms = latency_ms;
        self
    }

    /// Sets the resolved source type.
    #[must_use]
    pub fn with_source_type(mut self, source_type: impl Into<String>) -> Self {
        self.source_type = Some(source_type.into());
        self
    }

    /// Sets the effective owner at access time.
    #[must_use]
    pub fn with_owner(mut self, owner: Option<String>) -> Self {
        self.owner_at_access = owner;
        self
    }

    /// Attaches deprecation details.
    #[must_use]
    pub fn with_deprecation(
        mut self,
        deprecated: bool,
        successor: Option<String>,
        redirected_from: Option<String>,
    ) -> Self {
        self.deprecated = deprecated;
        self.successor = successor;
        self.redirected_from = redirected_from;
        self
    }

    /// Attaches an error description.
    #[must_use]
    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(message.into());
        self
    }
}
