//! Append-only audit trail for mutating registry operations.
//!
//! Audit appends must never fail the operation they record: the log is
//! an in-memory ring bounded at a fixed capacity, and evicted entries
//! are counted rather than erroring.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default number of retained audit entries.
pub const DEFAULT_AUDIT_CAPACITY: usize = 10_000;

/// Kind of change an audit entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditKind {
    /// A node appeared during a reload.
    NodeAdded,
    /// A node disappeared during a reload.
    NodeRemoved,
    /// A node's binding fingerprint changed during a reload.
    BindingChanged,
    /// A node's lifecycle status changed.
    StatusChanged,
    /// A proposed moniker was submitted for review.
    RequestSubmitted,
    /// A proposed moniker was approved and materialized.
    RequestApproved,
    /// A proposed moniker was rejected.
    RequestRejected,
    /// The catalog was atomically replaced.
    CatalogReloaded,
}

/// One audit record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    /// When the change happened (UTC).
    pub timestamp: DateTime<Utc>,
    /// Who drove the change.
    pub actor: String,
    /// The affected node path (empty for catalog-wide entries).
    pub path: String,
    /// What kind of change.
    pub kind: AuditKind,
    /// Value before the change, when meaningful.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub before: Option<String>,
    /// Value after the change, when meaningful.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub after: Option<String>,
    /// Free-text reason supplied by the actor.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl AuditEntry {
    /// Creates an entry stamped with the current time.
    #[must_use]
    pub fn new(kind: AuditKind, actor: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            actor: actor.into(),
            path: path.into(),
            kind,
            before: None,
            after: None,
            reason: None,
        }
    }

    /// Attaches before/after values.
    #[must_use]
    pub fn with_change(mut self, before: Option<String>, after: Option<String>) -> Self {
        self.before = before;
        self.after = after;
        self
    }

    /// Attaches a free-text reason.
    #[must_use]
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}

/// Bounded, append-only audit log.
#[derive(Debug)]
pub struct AuditLog {
    entries: Mutex<VecDeque<AuditEntry>>,
    capacity: usize,
    dropped: AtomicU64,
}

impl Default for AuditLog {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_AUDIT_CAPACITY)
    }
}

impl AuditLog {
    /// Creates a log retaining at most `capacity` entries.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(VecDeque::new()),
            capacity: capacity.max(1),
            dropped: AtomicU64::new(0),
        }
    }

    /// Appends an entry, evicting the oldest when full. Never fails.
    pub fn append(&self, entry: AuditEntry) {
        let Ok(mut entries) = self.entries.lock() else {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            return;
        };
        if entries.len() >= self.capacity {
            entries.pop_front();
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
        entries.push_back(entry);
    }

    /// Returns up to `limit` most recent entries, oldest first,
    /// optionally filtered by exact path.
    #[must_use]
    pub fn entries(&self, path: Option<&str>, limit: usize) -> Vec<AuditEntry> {
        let Ok(entries) = self.entries.lock() else {
            return Vec::new();
        };
        let filtered: Vec<AuditEntry> = entries
            .iter()
            .filter(|e| path.is_none_or(|p| e.path == p))
            .cloned()
            .collect();
        let skip = filtered.len().saturating_sub(limit);
        filtered.into_iter().skip(skip).collect()
    }

    /// Number of entries evicted or lost since startup.
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Current number of retained entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    /// Returns true when the log holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
