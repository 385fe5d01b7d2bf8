//! Catalog registry: the authoritative path → node mapping.
//!
//! The registry keeps an immutable [`CatalogSnapshot`] behind a single
//! swapped reference. Readers clone the `Arc` once at request entry and
//! never observe a partially applied reload; writers build a complete
//! new snapshot and swap it in one step. Snapshot versions are
//! monotonic: a request that observed version V never later observes an
//! earlier one.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, RwLock};

use crate::audit::{AuditEntry, AuditKind, AuditLog};
use crate::diff::CatalogDiff;
use crate::error::{CatalogError, Result};
use crate::types::{CatalogNode, NodeStatus, ResolvedOwnership, SourceBinding};

/// Successor chains longer than this are reported as invalid and
/// truncated during resolution.
pub const MAX_SUCCESSOR_DEPTH: usize = 5;

/// Counts of catalog nodes by status and bindings by source type.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct CatalogStats {
    /// Total nodes.
    pub total: usize,
    /// Node count per lifecycle status.
    pub by_status: BTreeMap<String, usize>,
    /// Binding count per source type.
    pub by_source_type: BTreeMap<String, usize>,
}

/// One page of catalog paths.
#[derive(Debug, Clone, serde::Serialize)]
pub struct CatalogPage {
    /// Paths in this page, sorted.
    pub paths: Vec<String>,
    /// Cursor for the next page; absent on the last page.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
}

/// An immutable view of the catalog at one version.
///
/// Lookups are O(1); a sorted path index backs ordered iteration,
/// search and pagination.
#[derive(Debug, Default)]
pub struct CatalogSnapshot {
    version: u64,
    nodes: HashMap<String, CatalogNode>,
    sorted_paths: Vec<String>,
    children: HashMap<String, BTreeSet<String>>,
}

impl CatalogSnapshot {
    fn build(nodes: Vec<CatalogNode>, version: u64) -> Self {
        let mut node_map = HashMap::with_capacity(nodes.len());
        let mut children: HashMap<String, BTreeSet<String>> = HashMap::new();
        for node in nodes {
            // Link the whole ancestor chain so virtual branch paths
            // (registered only through their descendants) still appear
            // in listings and the tree.
            let mut current = node.path.clone();
            while let Some(parent) = parent_of(&current) {
                let inserted = children
                    .entry(parent.to_string())
                    .or_default()
                    .insert(current.clone());
                if !inserted {
                    break;
                }
                current = parent.to_string();
            }
            node_map.insert(node.path.clone(), node);
        }
        let mut sorted_paths: Vec<String> = node_map.keys().cloned().collect();
        sorted_paths.sort();
        Self {
            version,
            nodes: node_map,
            sorted_paths,
            children,
        }
    }

    /// Snapshot version; strictly increasing across swaps.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Number of nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True when the catalog is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Looks up a node by exact path.
    #[must_use]
    pub fn get(&self, path: &str) -> Option<&CatalogNode> {
        self.nodes.get(path)
    }

    /// True when a node exists at `path`.
    #[must_use]
    pub fn contains(&self, path: &str) -> bool {
        self.nodes.contains_key(path)
    }

    /// All nodes, sorted by path.
    pub fn iter(&self) -> impl Iterator<Item = &CatalogNode> {
        self.sorted_paths
            .iter()
            .filter_map(|path| self.nodes.get(path))
    }

    /// Map of path → node, for diffing.
    #[must_use]
    pub fn node_map(&self) -> &HashMap<String, CatalogNode> {
        &self.nodes
    }

    /// Immediate child suffixes of `path` (use `""` for the roots).
    #[must_use]
    pub fn list_children(&self, path: &str) -> Vec<String> {
        self.children
            .get(path)
            .map(|set| set.iter().map(|child| suffix_of(path, child)).collect())
            .unwrap_or_default()
    }

    /// Full paths of the immediate children of `path`.
    #[must_use]
    pub fn child_paths(&self, path: &str) -> Vec<String> {
        self.children
            .get(path)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Effective ownership for `path` after the inheritance walk.
    ///
    /// Each field independently takes the deepest definition along the
    /// root-to-node walk. Computed on demand; nothing is denormalized.
    #[must_use]
    pub fn ownership_of(&self, path: &str) -> ResolvedOwnership {
        let mut resolved = ResolvedOwnership::default();
        for ancestor in ancestor_paths(path) {
            if let Some(node) = self.nodes.get(&ancestor) {
                resolved.apply(&ancestor, &node.ownership);
            }
        }
        if let Some(node) = self.nodes.get(path) {
            resolved.apply(path, &node.ownership);
        }
        resolved
    }

    /// Nearest binding at or above `path`, with the path that defines
    /// it. DRAFT and ARCHIVED nodes do not donate bindings.
    #[must_use]
    pub fn source_binding_of(&self, path: &str) -> Option<(&SourceBinding, &str)> {
        if let Some(node) = self.nodes.get(path) {
            if node.status.donates_binding() {
                if let Some(binding) = &node.source_binding {
                    return Some((binding, node.path.as_str()));
                }
            }
        }
        for ancestor in ancestor_paths(path).into_iter().rev() {
            if let Some(node) = self.nodes.get(&ancestor) {
                if !node.status.donates_binding() {
                    continue;
                }
                if let Some(binding) = &node.source_binding {
                    return Some((binding, node.path.as_str()));
                }
            }
        }
        None
    }

    /// True when `path` or any of its ancestors has a node.
    #[must_use]
    pub fn known_path(&self, path: &str) -> bool {
        if self.nodes.contains_key(path) {
            return true;
        }
        ancestor_paths(path)
            .iter()
            .any(|ancestor| self.nodes.contains_key(ancestor))
    }

    /// Case-insensitive search over path, display name, description and
    /// tags, capped at `limit` results.
    #[must_use]
    pub fn search(&self, query: &str, status: Option<NodeStatus>, limit: usize) -> Vec<&CatalogNode> {
        let needle = query.to_lowercase();
        let mut results = Vec::new();
        for node in self.iter() {
            if status.is_some_and(|s| node.status != s) {
                continue;
            }
            let matched = node.path.to_lowercase().contains(&needle)
                || node.display_name.to_lowercase().contains(&needle)
                || node.description.to_lowercase().contains(&needle)
                || node.tags.iter().any(|t| t.to_lowercase().contains(&needle));
            if matched {
                results.push(node);
                if results.len() >= limit {
                    break;
                }
            }
        }
        results
    }

    /// Node and binding counts.
    #[must_use]
    pub fn stats(&self) -> CatalogStats {
        let mut stats = CatalogStats {
            total: self.nodes.len(),
            ..CatalogStats::default()
        };
        for node in self.iter() {
            *stats
                .by_status
                .entry(node.status.as_str().to_string())
                .or_default() += 1;
            if let Some(binding) = &node.source_binding {
                *stats
                    .by_source_type
                    .entry(binding.source_type.as_str().to_string())
                    .or_default() += 1;
            }
        }
        stats
    }

    /// Sorted page of paths after `cursor`, optionally filtered by
    /// status. The cursor is the last path of the previous page.
    #[must_use]
    pub fn page(&self, cursor: Option<&str>, limit: usize, status: Option<NodeStatus>) -> CatalogPage {
        let paths: Vec<String> = self
            .iter()
            .filter(|node| status.is_none_or(|s| node.status == s))
            .map(|node| node.path.clone())
            .filter(|path| cursor.is_none_or(|c| path.as_str() > c))
            .take(limit)
            .collect();
        let next_cursor = if paths.len() == limit {
            paths.last().cloned()
        } else {
            None
        };
        CatalogPage { paths, next_cursor }
    }
}

/// Thread-safe registry of catalog nodes.
///
/// Concurrent reads go through an atomic snapshot reference; mutations
/// are serialized behind the write lock and produce audit entries.
#[derive(Debug)]
pub struct CatalogRegistry {
    snapshot: RwLock<Arc<CatalogSnapshot>>,
    audit: AuditLog,
}

impl Default for CatalogRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl CatalogRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            snapshot: RwLock::new(Arc::new(CatalogSnapshot::default())),
            audit: AuditLog::default(),
        }
    }

    /// Creates a registry seeded with `nodes`.
    #[must_use]
    pub fn from_nodes(nodes: Vec<CatalogNode>) -> Self {
        let registry = Self::new();
        registry.atomic_replace(nodes);
        registry
    }

    /// Returns the current snapshot. Cheap; callers hold it for the
    /// duration of one request.
    #[must_use]
    pub fn snapshot(&self) -> Arc<CatalogSnapshot> {
        match self.snapshot.read() {
            Ok(guard) => Arc::clone(&guard),
            // A poisoned lock still holds a complete snapshot.
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    /// Looks up a node by path.
    #[must_use]
    pub fn get(&self, path: &str) -> Option<CatalogNode> {
        self.snapshot().get(path).cloned()
    }

    /// Immediate child suffixes of `path`.
    #[must_use]
    pub fn list_children(&self, path: &str) -> Vec<String> {
        self.snapshot().list_children(path)
    }

    /// Effective ownership for `path`.
    #[must_use]
    pub fn ownership_of(&self, path: &str) -> ResolvedOwnership {
        self.snapshot().ownership_of(path)
    }

    /// Nearest binding at or above `path` with its defining path.
    #[must_use]
    pub fn source_binding_of(&self, path: &str) -> Option<(SourceBinding, String)> {
        let snapshot = self.snapshot();
        snapshot
            .source_binding_of(path)
            .map(|(binding, at)| (binding.clone(), at.to_string()))
    }

    /// Publishes `nodes` as a new snapshot in a single step.
    pub fn atomic_replace(&self, nodes: Vec<CatalogNode>) {
        let mut guard = match self.snapshot.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let next = CatalogSnapshot::build(nodes, guard.version() + 1);
        tracing::info!(
            version = next.version(),
            nodes = next.len(),
            "catalog snapshot published"
        );
        *guard = Arc::new(next);
    }

    /// Diffs the live catalog against a proposed node set.
    #[must_use]
    pub fn diff(&self, new_nodes: &[CatalogNode]) -> CatalogDiff {
        let new_map: HashMap<String, CatalogNode> = new_nodes
            .iter()
            .map(|n| (n.path.clone(), n.clone()))
            .collect();
        CatalogDiff::between(self.snapshot().node_map(), &new_map)
    }

    /// Diffs, audits every change, and swaps unless `block_breaking`
    /// is set and the diff is breaking.
    ///
    /// Returns the diff and whether the replacement was applied.
    pub fn validated_replace(
        &self,
        new_nodes: Vec<CatalogNode>,
        block_breaking: bool,
        actor: &str,
    ) -> (CatalogDiff, bool) {
        // Diff and swap run under the same writer; mutating operations
        // are serialized by convention at the governance layer.
        let diff = self.diff(&new_nodes);

        for path in &diff.removed_paths {
            self.audit.append(
                AuditEntry::new(AuditKind::NodeRemoved, actor, path)
                    .with_reason("node removed during catalog reload"),
            );
        }
        for path in &diff.binding_changed_paths {
            self.audit.append(
                AuditEntry::new(AuditKind::BindingChanged, actor, path)
                    .with_reason("source binding changed during catalog reload"),
            );
        }
        for path in &diff.added_paths {
            self.audit.append(
                AuditEntry::new(AuditKind::NodeAdded, actor, path)
                    .with_reason("node added during catalog reload"),
            );
        }

        tracing::info!(summary = %diff.summary(), "catalog reload diff");

        if block_breaking && diff.has_breaking_changes() {
            tracing::warn!(
                summary = %diff.summary(),
                "catalog reload blocked: breaking changes detected"
            );
            return (diff, false);
        }

        self.atomic_replace(new_nodes);
        self.audit.append(
            AuditEntry::new(AuditKind::CatalogReloaded, actor, "")
                .with_reason(diff.summary()),
        );
        (diff, true)
    }

    /// Validates every successor pointer: the target must exist, must
    /// not be the node itself, and chains must not cycle or exceed
    /// [`MAX_SUCCESSOR_DEPTH`] hops.
    #[must_use]
    pub fn validate_successors(&self) -> Vec<String> {
        let snapshot = self.snapshot();
        let mut errors = Vec::new();

        for node in snapshot.iter() {
            let Some(successor) = &node.successor else {
                continue;
            };
            if successor == &node.path {
                errors.push(format!("{}: successor points to itself", node.path));
                continue;
            }
            if !snapshot.contains(successor) {
                errors.push(format!(
                    "{}: successor '{successor}' does not exist",
                    node.path
                ));
                continue;
            }

            let mut visited = BTreeSet::new();
            visited.insert(node.path.as_str());
            let mut current = successor.as_str();
            let mut hops = 1;
            loop {
                if !visited.insert(current) {
                    errors.push(format!(
                        "{}: successor chain contains a cycle at '{current}'",
                        node.path
                    ));
                    break;
                }
                let Some(next) = snapshot.get(current).and_then(|n| n.successor.as_deref()) else {
                    break;
                };
                hops += 1;
                if hops > MAX_SUCCESSOR_DEPTH {
                    errors.push(format!(
                        "{}: successor chain exceeds {MAX_SUCCESSOR_DEPTH} hops",
                        node.path
                    ));
                    break;
                }
                current = next;
            }
        }

        errors
    }

    /// Drives the lifecycle state machine for one node.
    ///
    /// On a transition to DEPRECATED the update's deprecation metadata
    /// is stored on the node. Writes one audit entry.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::NotFound`] for unknown paths and
    /// [`CatalogError::IllegalTransition`] when the state machine
    /// forbids the move.
    pub fn update_status(
        &self,
        path: &str,
        new_status: NodeStatus,
        actor: &str,
        update: StatusUpdate,
    ) -> Result<CatalogNode> {
        let mut guard = match self.snapshot.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let current = guard
            .get(path)
            .ok_or_else(|| CatalogError::not_found(path))?;

        if !current.status.can_transition_to(new_status) {
            return Err(CatalogError::IllegalTransition {
                path: path.to_string(),
                from: current.status,
                to: new_status,
            });
        }

        let mut node = current.clone();
        let old_status = node.status;
        node.status = new_status;
        if new_status == NodeStatus::Deprecated {
            if update.deprecation_message.is_some() {
                node.deprecation_message = update.deprecation_message.clone();
            }
            if update.successor.is_some() {
                node.successor = update.successor.clone();
            }
            if update.sunset_deadline.is_some() {
                node.sunset_deadline = update.sunset_deadline;
            }
            if update.migration_guide_url.is_some() {
                node.migration_guide_url = update.migration_guide_url.clone();
            }
        }

        let mut nodes: Vec<CatalogNode> = guard.iter().cloned().collect();
        if let Some(slot) = nodes.iter_mut().find(|n| n.path == path) {
            *slot = node.clone();
        }
        let next = CatalogSnapshot::build(nodes, guard.version() + 1);
        *guard = Arc::new(next);
        drop(guard);

        let mut entry = AuditEntry::new(AuditKind::StatusChanged, actor, path).with_change(
            Some(old_status.as_str().to_string()),
            Some(new_status.as_str().to_string()),
        );
        if let Some(reason) = &update.reason {
            entry = entry.with_reason(reason.clone());
        }
        self.audit.append(entry);

        tracing::info!(
            path = path,
            from = old_status.as_str(),
            to = new_status.as_str(),
            actor = actor,
            "node status updated"
        );
        Ok(node)
    }

    /// Inserts or replaces a single node, keeping the rest of the
    /// snapshot intact. Used when an approved request materializes.
    pub fn insert_node(&self, node: CatalogNode, actor: &str) {
        let mut guard = match self.snapshot.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let mut nodes: Vec<CatalogNode> = guard
            .iter()
            .filter(|n| n.path != node.path)
            .cloned()
            .collect();
        let path = node.path.clone();
        nodes.push(node);
        let next = CatalogSnapshot::build(nodes, guard.version() + 1);
        *guard = Arc::new(next);
        drop(guard);

        self.audit
            .append(AuditEntry::new(AuditKind::NodeAdded, actor, path));
    }

    /// Appends an audit entry on behalf of a governance operation.
    pub fn append_audit(&self, entry: AuditEntry) {
        self.audit.append(entry);
    }

    /// Returns audit entries, optionally filtered by path.
    #[must_use]
    pub fn audit_log(&self, path: Option<&str>, limit: usize) -> Vec<AuditEntry> {
        self.audit.entries(path, limit)
    }

    /// Number of audit entries evicted from the bounded log.
    #[must_use]
    pub fn audit_dropped(&self) -> u64 {
        self.audit.dropped()
    }
}

/// Returns the parent path, handling both `.` and `/` separators:
/// `analytics.risk/var` → `analytics.risk`, `analytics.risk` →
/// `analytics`, `analytics` → `""` (root). Empty input has no parent.
#[must_use]
pub fn parent_of(path: &str) -> Option<&str> {
    if path.is_empty() {
        return None;
    }
    if let Some(idx) = path.rfind('/') {
        return Some(&path[..idx]);
    }
    if let Some(idx) = path.rfind('.') {
        return Some(&path[..idx]);
    }
    Some("")
}

/// All ancestor paths from root order down to the parent, e.g.
/// `analytics.risk/var` → `["analytics", "analytics.risk"]`.
#[must_use]
pub fn ancestor_paths(path: &str) -> Vec<String> {
    let mut result = Vec::new();
    let mut current = path;
    while let Some(parent) = parent_of(current) {
        if parent.is_empty() {
            break;
        }
        result.push(parent.to_string());
        current = parent;
    }
    result.reverse();
    result
}

fn suffix_of(parent: &str, child: &str) -> String {
    child
        .strip_prefix(parent)
        .map(|s| s.trim_start_matches(['/', '.']).to_string())
        .unwrap_or_else(|| child.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Ownership, SourceType};
    use serde_json::json;

    fn binding(query: &str) -> SourceBinding {
        let serde_json::Value::Object(config) = json!({ "query": query }) else {
            unreachable!()
        };
        SourceBinding::new(SourceType::Snowflake, config)
    }

    fn sample_nodes() -> Vec<CatalogNode> {
        vec![
            CatalogNode::new("prices").with_ownership(Ownership {
                accountable_owner: Some("prices-governance@firm.com".into()),
                ..Ownership::default()
            }),
            CatalogNode::new("prices.equity")
                .with_binding(binding("SELECT * FROM equity WHERE {filter[0]:symbol}"))
                .with_ownership(Ownership {
                    support_channel: Some("#equity-data".into()),
                    ..Ownership::default()
                }),
            CatalogNode::new("rates.libor/usd")
                .with_status(NodeStatus::Deprecated)
                .with_successor("rates.sofr/usd")
                .with_binding(binding("SELECT * FROM libor")),
            CatalogNode::new("rates.sofr/usd").with_binding(binding("SELECT * FROM sofr")),
        ]
    }

    #[test]
    fn parent_handles_both_separators() {
        assert_eq!(parent_of("analytics.risk/var"), Some("analytics.risk"));
        assert_eq!(parent_of("analytics.risk"), Some("analytics"));
        assert_eq!(parent_of("analytics"), Some(""));
        assert_eq!(parent_of(""), None);
    }

    #[test]
    fn ancestors_run_root_to_parent() {
        assert_eq!(
            ancestor_paths("analytics.risk/var/v2x"),
            vec!["analytics", "analytics.risk", "analytics.risk/var"]
        );
        assert!(ancestor_paths("analytics").is_empty());
    }

    #[test]
    fn get_and_children() {
        let registry = CatalogRegistry::from_nodes(sample_nodes());
        assert!(registry.get("prices.equity").is_some());
        assert!(registry.get("prices.bond").is_none());
        assert_eq!(registry.list_children("prices"), vec!["equity"]);
        assert_eq!(registry.list_children("rates.libor"), vec!["usd"]);
    }

    #[test]
    fn virtual_branch_paths_are_linked_into_the_hierarchy() {
        let registry = CatalogRegistry::from_nodes(sample_nodes());
        let snapshot = registry.snapshot();
        // "rates" and "rates.libor" exist only through their
        // descendants but still list and appear under the root.
        assert_eq!(snapshot.list_children(""), vec!["prices", "rates"]);
        assert_eq!(snapshot.list_children("rates"), vec!["libor", "sofr"]);
    }

    #[test]
    fn ownership_inherits_field_by_field() {
        let registry = CatalogRegistry::from_nodes(sample_nodes());
        let resolved = registry.ownership_of("prices.equity/AAPL");
        assert_eq!(
            resolved.accountable_owner.as_deref(),
            Some("prices-governance@firm.com")
        );
        assert_eq!(resolved.accountable_owner_defined_at.as_deref(), Some("prices"));
        assert_eq!(resolved.data_specialist, None);
        assert_eq!(resolved.support_channel.as_deref(), Some("#equity-data"));
        assert_eq!(
            resolved.support_channel_defined_at.as_deref(),
            Some("prices.equity")
        );
    }

    #[test]
    fn binding_is_inherited_from_nearest_ancestor() {
        let registry = CatalogRegistry::from_nodes(sample_nodes());
        let (binding, at) = registry.source_binding_of("prices.equity/AAPL").unwrap();
        assert_eq!(at, "prices.equity");
        assert!(binding.query_template().unwrap().contains("equity"));
        assert!(registry.source_binding_of("fx.spot").is_none());
    }

    #[test]
    fn archived_and_draft_nodes_do_not_donate_bindings() {
        let mut nodes = sample_nodes();
        nodes.push(
            CatalogNode::new("prices.equity/frozen")
                .with_status(NodeStatus::Archived)
                .with_binding(binding("SELECT * FROM frozen")),
        );
        let registry = CatalogRegistry::from_nodes(nodes);
        // The archived node's own binding is skipped; the parent donates.
        let (_, at) = registry
            .source_binding_of("prices.equity/frozen")
            .unwrap();
        assert_eq!(at, "prices.equity");
    }

    #[test]
    fn atomic_replace_is_idempotent() {
        let registry = CatalogRegistry::from_nodes(sample_nodes());
        let diff = registry.diff(&sample_nodes());
        assert!(diff.is_empty());
        registry.atomic_replace(sample_nodes());
        assert!(registry.diff(&sample_nodes()).is_empty());
    }

    #[test]
    fn validated_replace_blocks_breaking_changes() {
        let registry = CatalogRegistry::from_nodes(sample_nodes());
        let before_version = registry.snapshot().version();

        let mut new_nodes = sample_nodes();
        new_nodes.retain(|n| n.path != "rates.libor/usd");
        if let Some(node) = new_nodes.iter_mut().find(|n| n.path == "prices.equity") {
            node.source_binding = Some(binding("SELECT changed FROM equity"));
        }

        let (diff, applied) = registry.validated_replace(new_nodes.clone(), true, "reloader");
        assert!(!applied);
        assert!(diff.has_breaking_changes());
        assert_eq!(diff.removed_paths.len(), 1);
        assert_eq!(diff.binding_changed_paths.len(), 1);
        // Registry stays on the old snapshot.
        assert_eq!(registry.snapshot().version(), before_version);
        assert!(registry.get("rates.libor/usd").is_some());

        let (_, applied) = registry.validated_replace(new_nodes, false, "reloader");
        assert!(applied);
        assert!(registry.get("rates.libor/usd").is_none());
    }

    #[test]
    fn validated_replace_writes_audit_entries() {
        let registry = CatalogRegistry::from_nodes(sample_nodes());
        let mut new_nodes = sample_nodes();
        new_nodes.push(CatalogNode::new("fx.spot"));
        let (_, applied) = registry.validated_replace(new_nodes, true, "reloader");
        assert!(applied);
        let entries = registry.audit_log(Some("fx.spot"), 10);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].kind, AuditKind::NodeAdded);
        assert_eq!(entries[0].actor, "reloader");
    }

    #[test]
    fn successor_validation_flags_missing_self_and_deep_chains() {
        let mut nodes = vec![
            CatalogNode::new("a.one").with_successor("a.two"),
            CatalogNode::new("a.self").with_successor("a.self"),
            CatalogNode::new("a.missing").with_successor("a.nowhere"),
        ];
        // Chain of 7: c.0 -> c.1 -> ... -> c.6
        for i in 0..7 {
            let mut node = CatalogNode::new(format!("c.n{i}"));
            if i < 6 {
                node = node.with_successor(format!("c.n{}", i + 1));
            }
            nodes.push(node);
        }
        nodes.push(CatalogNode::new("a.two"));

        let registry = CatalogRegistry::from_nodes(nodes);
        let errors = registry.validate_successors();

        assert!(errors.iter().any(|e| e.contains("a.self") && e.contains("itself")));
        assert!(errors.iter().any(|e| e.contains("a.nowhere")));
        assert!(errors.iter().any(|e| e.contains("c.n0") && e.contains("exceeds")));
        assert!(!errors.iter().any(|e| e.starts_with("a.one:")));
    }

    #[test]
    fn successor_cycles_are_detected() {
        let registry = CatalogRegistry::from_nodes(vec![
            CatalogNode::new("x.a").with_successor("x.b"),
            CatalogNode::new("x.b").with_successor("x.a"),
        ]);
        let errors = registry.validate_successors();
        assert!(errors.iter().any(|e| e.contains("cycle")));
    }

    #[test]
    fn update_status_enforces_state_machine_and_audits() {
        let registry = CatalogRegistry::from_nodes(sample_nodes());

        let node = registry
            .update_status(
                "prices.equity",
                NodeStatus::Deprecated,
                "governor",
                StatusUpdate {
                    reason: Some("superseded".into()),
                    deprecation_message: Some("use prices.equity_v2".into()),
                    successor: Some("rates.sofr/usd".into()),
                    ..StatusUpdate::default()
                },
            )
            .unwrap();
        assert_eq!(node.status, NodeStatus::Deprecated);
        assert_eq!(node.successor.as_deref(), Some("rates.sofr/usd"));
        assert_eq!(node.deprecation_message.as_deref(), Some("use prices.equity_v2"));

        // Deprecated -> Active is not allowed.
        let err = registry
            .update_status(
                "prices.equity",
                NodeStatus::Active,
                "governor",
                StatusUpdate::default(),
            )
            .unwrap_err();
        assert!(matches!(err, CatalogError::IllegalTransition { .. }));

        let err = registry
            .update_status("no.such", NodeStatus::Active, "governor", StatusUpdate::default())
            .unwrap_err();
        assert!(matches!(err, CatalogError::NotFound { .. }));

        let entries = registry.audit_log(Some("prices.equity"), 10);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].before.as_deref(), Some("ACTIVE"));
        assert_eq!(entries[0].after.as_deref(), Some("DEPRECATED"));
    }

    #[test]
    fn snapshots_are_monotonic_and_atomic_under_concurrent_reads() {
        use std::sync::atomic::{AtomicBool, Ordering};

        // Two generations that must never be observed mixed.
        fn generation(marker: &str) -> Vec<CatalogNode> {
            vec![
                CatalogNode::new("gen.a").with_description(marker),
                CatalogNode::new("gen.b").with_description(marker),
            ]
        }

        let registry = Arc::new(CatalogRegistry::from_nodes(generation("g0")));
        let stop = Arc::new(AtomicBool::new(false));

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let registry = Arc::clone(&registry);
                let stop = Arc::clone(&stop);
                std::thread::spawn(move || {
                    let mut last_version = 0;
                    while !stop.load(Ordering::Relaxed) {
                        let snapshot = registry.snapshot();
                        assert!(snapshot.version() >= last_version, "version went backwards");
                        last_version = snapshot.version();
                        let a = snapshot.get("gen.a").expect("gen.a present");
                        let b = snapshot.get("gen.b").expect("gen.b present");
                        assert_eq!(a.description, b.description, "mixed snapshot observed");
                    }
                })
            })
            .collect();

        for i in 0..200 {
            registry.atomic_replace(generation(&format!("g{i}")));
        }
        stop.store(true, Ordering::Relaxed);
        for reader in readers {
            reader.join().expect("reader panicked");
        }
    }
}

/// Optional metadata accompanying a status update.
#[derive(Debug, Clone, Default)]
pub struct StatusUpdate {
    /// Free-text reason recorded in the audit trail.
    pub reason: Option<String>,
    /// Message shown to callers of the deprecated node.
    pub deprecation_message: Option<String>,
    /// Replacement path.
    pub successor: Option<String>,
    /// Date after which the node is expected to be archived.
    pub sunset_deadline: Option<chrono::NaiveDate>,
    /// Migration instructions for callers.
    pub migration_guide_url: Option<String>,
}
