//! Governance controller: lifecycle transitions, validated reloads and
//! the request/approval workflow.

use std::sync::Arc;

use serde::Serialize;

use waypost_catalog::{
    AuditEntry, AuditKind, CatalogNode, CatalogRegistry, MonikerRequest, NodeStatus,
    RequestRegistry, RequestStatus, RequestSubmission, StatusUpdate,
};
use waypost_catalog::error::{CatalogError, Result};

use crate::cache::ResolveCache;

/// Feature toggles for governance behavior.
#[derive(Debug, Clone)]
pub struct GovernanceOptions {
    /// Master switch for deprecation behavior. When off, reloads skip
    /// diffing entirely.
    pub deprecation_enabled: bool,
    /// Diff-and-audit reloads instead of plain swaps.
    pub validated_reload: bool,
    /// Default for refusing reloads with breaking changes.
    pub block_breaking_reload: bool,
}

impl Default for GovernanceOptions {
    fn default() -> Self {
        Self {
            deprecation_enabled: true,
            validated_reload: true,
            block_breaking_reload: false,
        }
    }
}

/// Outcome of a catalog reload.
#[derive(Debug, Clone, Serialize)]
pub struct ReloadOutcome {
    /// Whether the new snapshot was published.
    pub applied: bool,
    /// Number of nodes in the proposed set.
    pub node_count: usize,
    /// Human-readable diff summary; absent for unvalidated reloads.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diff_summary: Option<String>,
    /// Paths added by the reload.
    pub added_count: usize,
    /// Paths removed by the reload.
    pub removed_count: usize,
    /// Paths whose binding fingerprint changed.
    pub binding_changed_count: usize,
    /// Paths whose status changed.
    pub status_changed_count: usize,
    /// Whether the diff contained breaking changes.
    pub has_breaking_changes: bool,
    /// Successor validation warnings; the reload stays applied.
    pub successor_errors: Vec<String>,
}

/// Drives every mutating operation against the catalog: status
/// transitions, validated hot-reloads, and request approval. Holds the
/// resolver cache so mutations invalidate stale results.
pub struct GovernanceController {
    registry: Arc<CatalogRegistry>,
    requests: RequestRegistry,
    cache: Arc<ResolveCache>,
    options: GovernanceOptions,
}

impl GovernanceController {
    /// Creates a controller over `registry`, invalidating `cache` on
    /// mutation.
    #[must_use]
    pub fn new(
        registry: Arc<CatalogRegistry>,
        cache: Arc<ResolveCache>,
        options: GovernanceOptions,
    ) -> Self {
        Self {
            registry,
            requests: RequestRegistry::new(),
            cache,
            options,
        }
    }

    /// Hot-reloads the catalog from a parsed node set.
    ///
    /// With validated reload enabled this diffs, audits each change,
    /// refuses when `block_breaking` (defaulting from options) and the
    /// diff is breaking, then swaps atomically. Successor validation
    /// runs after an applied reload; its findings are returned as
    /// warnings without reverting. With the deprecation toggle off it
    /// falls back to a plain atomic replace.
    pub fn reload_catalog(
        &self,
        nodes: Vec<CatalogNode>,
        block_breaking: Option<bool>,
        actor: &str,
    ) -> ReloadOutcome {
        let node_count = nodes.len();

        if !(self.options.deprecation_enabled && self.options.validated_reload) {
            self.registry.atomic_replace(nodes);
            self.cache.purge_all();
            tracing::info!(nodes = node_count, actor = actor, "catalog reloaded (no diff)");
            return ReloadOutcome {
                applied: true,
                node_count,
                diff_summary: None,
                added_count: 0,
                removed_count: 0,
                binding_changed_count: 0,
                status_changed_count: 0,
                has_breaking_changes: false,
                successor_errors: Vec::new(),
            };
        }

        let block = block_breaking.unwrap_or(self.options.block_breaking_reload);
        let (diff, applied) = self.registry.validated_replace(nodes, block, actor);

        let successor_errors = if applied {
            self.cache.purge_all();
            let errors = self.registry.validate_successors();
            if !errors.is_empty() {
                tracing::warn!(errors = ?errors, "successor validation warnings after reload");
            }
            tracing::info!(nodes = node_count, actor = actor, "catalog hot-reloaded");
            errors
        } else {
            Vec::new()
        };

        ReloadOutcome {
            applied,
            node_count,
            diff_summary: Some(diff.summary()),
            added_count: diff.added_paths.len(),
            removed_count: diff.removed_paths.len(),
            binding_changed_count: diff.binding_changed_paths.len(),
            status_changed_count: diff.status_changed_paths.len(),
            has_breaking_changes: diff.has_breaking_changes(),
            successor_errors,
        }
    }

    /// Drives the node lifecycle state machine and invalidates affected
    /// cache entries.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::NotFound`] for unknown paths and
    /// [`CatalogError::IllegalTransition`] for moves the state machine
    /// forbids.
    pub fn update_node_status(
        &self,
        path: &str,
        new_status: NodeStatus,
        actor: &str,
        update: StatusUpdate,
    ) -> Result<CatalogNode> {
        let node = self.registry.update_status(path, new_status, actor, update)?;
        self.cache.purge_path(path);
        Ok(node)
    }

    /// Enqueues a proposed moniker for review.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::RequestConflict`] when a pending request
    /// for the same path already exists.
    pub fn submit_request(&self, submission: RequestSubmission) -> Result<MonikerRequest> {
        let request = self.requests.submit(submission)?;
        self.registry.append_audit(
            AuditEntry::new(AuditKind::RequestSubmitted, request.requester.email.clone(), &request.path)
                .with_reason(request.justification.clone()),
        );
        tracing::info!(
            request_id = %request.id,
            path = %request.path,
            "moniker request submitted"
        );
        Ok(request)
    }

    /// Lists requests, optionally filtered by status.
    #[must_use]
    pub fn list_requests(&self, status: Option<RequestStatus>) -> Vec<MonikerRequest> {
        self.requests.list(status)
    }

    /// Looks up one request.
    #[must_use]
    pub fn get_request(&self, id: &str) -> Option<MonikerRequest> {
        self.requests.get(id)
    }

    /// Approves a pending request, materializing the moniker as a
    /// catalog node and transitioning it DRAFT→ACTIVE.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::RequestConflict`] when the request was
    /// already decided or the path already exists in the catalog.
    pub fn approve_request(&self, id: &str, actor: &str) -> Result<MonikerRequest> {
        let Some(pending) = self.requests.get(id) else {
            return Err(CatalogError::request_conflict(format!("no request '{id}'")));
        };
        if self.registry.get(&pending.path).is_some() {
            return Err(CatalogError::request_conflict(format!(
                "path '{}' already exists in the catalog",
                pending.path
            )));
        }

        let request = self.requests.approve(id, actor)?;

        let mut node = CatalogNode::new(request.path.clone()).with_status(NodeStatus::Draft);
        if !request.display_name.is_empty() {
            node.display_name = request.display_name.clone();
        }
        node.description = request.description.clone();
        node.ownership = request.ownership.clone();
        node.source_binding = request.source_binding.clone();
        node.tags = request.tags.clone();

        self.registry.insert_node(node, actor);
        self.registry
            .update_status(&request.path, NodeStatus::Active, actor, StatusUpdate::default())?;
        self.registry.append_audit(
            AuditEntry::new(AuditKind::RequestApproved, actor, &request.path)
                .with_reason(format!("request {id} approved")),
        );
        self.cache.purge_path(&request.path);

        tracing::info!(request_id = id, path = %request.path, actor = actor, "moniker request approved");
        Ok(request)
    }

    /// Rejects a pending request with a reason.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::RequestConflict`] when the request does
    /// not exist or was already decided.
    pub fn reject_request(&self, id: &str, actor: &str, reason: &str) -> Result<MonikerRequest> {
        let request = self.requests.reject(id, actor, reason)?;
        self.registry.append_audit(
            AuditEntry::new(AuditKind::RequestRejected, actor, &request.path)
                .with_reason(reason.to_string()),
        );
        tracing::info!(request_id = id, path = %request.path, actor = actor, "moniker request rejected");
        Ok(request)
    }
}
