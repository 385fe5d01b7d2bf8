//! Governance request queue for proposed monikers.
//!
//! Submitters propose new monikers; approvers either materialize them
//! as catalog nodes or reject them with a reason. The queue is the
//! workflow audit trail; the catalog stays the source of truth for
//! which paths exist.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CatalogError, Result};
use crate::types::{Ownership, SourceBinding};

/// Workflow status of a moniker request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    /// Awaiting review.
    Pending,
    /// Approved and materialized in the catalog.
    Approved,
    /// Rejected with a reason.
    Rejected,
}

impl RequestStatus {
    /// Returns the lowercase wire name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }
}

impl std::str::FromStr for RequestStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            other => Err(format!("unknown request status '{other}'")),
        }
    }
}

/// Who submitted a request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequesterInfo {
    /// Display name.
    pub name: String,
    /// Contact email.
    pub email: String,
    /// Team, for chargeback.
    #[serde(default)]
    pub team: String,
    /// Application id, when submitted by a service.
    #[serde(default)]
    pub app_id: String,
}

/// A request to create a new moniker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonikerRequest {
    /// Unique request id.
    pub id: String,
    /// Proposed catalog path.
    pub path: String,
    /// Proposed display name.
    #[serde(default)]
    pub display_name: String,
    /// Proposed description.
    #[serde(default)]
    pub description: String,
    /// Who asked.
    pub requester: RequesterInfo,
    /// Why the moniker should exist.
    #[serde(default)]
    pub justification: String,
    /// Proposed governance roles.
    #[serde(default)]
    pub ownership: Ownership,
    /// Proposed source binding.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_binding: Option<SourceBinding>,
    /// Proposed tags.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Workflow status.
    pub status: RequestStatus,
    /// Reviewer, once decided.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reviewed_by: Option<String>,
    /// Decision time, once decided.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reviewed_at: Option<DateTime<Utc>>,
    /// Reason, for rejected requests.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
    /// Submission time.
    pub created_at: DateTime<Utc>,
}

/// Fields supplied by the submitter.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RequestSubmission {
    /// Proposed catalog path.
    pub path: String,
    /// Proposed display name.
    #[serde(default)]
    pub display_name: String,
    /// Proposed description.
    #[serde(default)]
    pub description: String,
    /// Who is asking.
    #[serde(default)]
    pub requester: RequesterInfo,
    /// Why the moniker should exist.
    #[serde(default)]
    pub justification: String,
    /// Proposed governance roles.
    #[serde(default)]
    pub ownership: Ownership,
    /// Proposed source binding.
    #[serde(default)]
    pub source_binding: Option<SourceBinding>,
    /// Proposed tags.
    #[serde(default)]
    pub tags: Vec<String>,
}

/// In-memory registry of moniker requests.
#[derive(Debug, Default)]
pub struct RequestRegistry {
    requests: Mutex<HashMap<String, MonikerRequest>>,
}

impl RequestRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueues a submission for review and returns the stored request.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::RequestConflict`] when a pending request
    /// already exists for the same path.
    pub fn submit(&self, submission: RequestSubmission) -> Result<MonikerRequest> {
        let mut requests = self.lock();
        let duplicate = requests
            .values()
            .any(|r| r.path == submission.path && r.status == RequestStatus::Pending);
        if duplicate {
            return Err(CatalogError::request_conflict(format!(
                "a pending request for '{}' already exists",
                submission.path
            )));
        }

        let request = MonikerRequest {
            id: uuid::Uuid::new_v4().to_string(),
            path: submission.path,
            display_name: submission.display_name,
            description: submission.description,
            requester: submission.requester,
            justification: submission.justification,
            ownership: submission.ownership,
            source_binding: submission.source_binding,
            tags: submission.tags,
            status: RequestStatus::Pending,
            reviewed_by: None,
            reviewed_at: None,
            rejection_reason: None,
            created_at: Utc::now(),
        };
        requests.insert(request.id.clone(), request.clone());
        Ok(request)
    }

    /// Looks up a request by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<MonikerRequest> {
        self.lock().get(id).cloned()
    }

    /// Lists requests, newest first, optionally filtered by status.
    #[must_use]
    pub fn list(&self, status: Option<RequestStatus>) -> Vec<MonikerRequest> {
        let mut requests: Vec<MonikerRequest> = self
            .lock()
            .values()
            .filter(|r| status.is_none_or(|s| r.status == s))
            .cloned()
            .collect();
        requests.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        requests
    }

    /// Marks a pending request approved.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::RequestConflict`] when the request does
    /// not exist or was already decided.
    pub fn approve(&self, id: &str, actor: &str) -> Result<MonikerRequest> {
        self.decide(id, actor, RequestStatus::Approved, None)
    }

    /// Marks a pending request rejected with a reason.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::RequestConflict`] when the request does
    /// not exist or was already decided.
    pub fn reject(&self, id: &str, actor: &str, reason: impl Into<String>) -> Result<MonikerRequest> {
        self.decide(id, actor, RequestStatus::Rejected, Some(reason.into()))
    }

    fn decide(
        &self,
        id: &str,
        actor: &str,
        status: RequestStatus,
        reason: Option<String>,
    ) -> Result<MonikerRequest> {
        let mut requests = self.lock();
        let request = requests
            .get_mut(id)
            .ok_or_else(|| CatalogError::request_conflict(format!("no request '{id}'")))?;
        if request.status != RequestStatus::Pending {
            return Err(CatalogError::request_conflict(format!(
                "request '{id}' was already {}",
                request.status.as_str()
            )));
        }
        request.status = status;
        request.reviewed_by = Some(actor.to_string());
        request.reviewed_at = Some(Utc::now());
        request.rejection_reason = reason;
        Ok(request.clone())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, MonikerRequest>> {
        match self.requests.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn submission(path: &str) -> RequestSubmission {
        RequestSubmission {
            path: path.to_string(),
            requester: RequesterInfo {
                name: "Dana Quant".into(),
                email: "dana@firm.com".into(),
                team: "credit-analytics".into(),
                app_id: String::new(),
            },
            justification: "needed for the new credit dashboard".into(),
            ..RequestSubmission::default()
        }
    }

    #[test]
    fn submit_then_approve() {
        let registry = RequestRegistry::new();
        let request = registry.submit(submission("foo.bar/baz")).unwrap();
        assert_eq!(request.status, RequestStatus::Pending);

        let approved = registry.approve(&request.id, "approver@firm.com").unwrap();
        assert_eq!(approved.status, RequestStatus::Approved);
        assert_eq!(approved.reviewed_by.as_deref(), Some("approver@firm.com"));
        assert!(approved.reviewed_at.is_some());
    }

    #[test]
    fn double_decision_conflicts() {
        let registry = RequestRegistry::new();
        let request = registry.submit(submission("foo.bar/baz")).unwrap();
        registry.approve(&request.id, "approver").unwrap();
        assert!(registry.approve(&request.id, "approver").is_err());
        assert!(registry.reject(&request.id, "approver", "late").is_err());
    }

    #[test]
    fn duplicate_pending_path_conflicts() {
        let registry = RequestRegistry::new();
        registry.submit(submission("foo.bar/baz")).unwrap();
        assert!(registry.submit(submission("foo.bar/baz")).is_err());
    }

    #[test]
    fn rejected_path_can_be_resubmitted() {
        let registry = RequestRegistry::new();
        let request = registry.submit(submission("foo.bar/baz")).unwrap();
        registry.reject(&request.id, "approver", "missing owner").unwrap();
        assert!(registry.submit(submission("foo.bar/baz")).is_ok());
    }

    #[test]
    fn list_filters_by_status() {
        let registry = RequestRegistry::new();
        let a = registry.submit(submission("a.one")).unwrap();
        registry.submit(submission("b.two")).unwrap();
        registry.reject(&a.id, "approver", "nope").unwrap();

        assert_eq!(registry.list(Some(RequestStatus::Pending)).len(), 1);
        assert_eq!(registry.list(Some(RequestStatus::Rejected)).len(), 1);
        assert_eq!(registry.list(None).len(), 2);
    }
}
