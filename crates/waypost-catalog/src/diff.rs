//! Catalog diffing for validated reloads.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::types::CatalogNode;

/// Result of diffing the live catalog against a proposed node set.
///
/// `removed_paths` and `binding_changed_paths` are breaking: existing
/// callers would stop resolving or silently get a different contract.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogDiff {
    /// Paths present only in the proposed set.
    pub added_paths: Vec<String>,
    /// Paths present only in the live catalog.
    pub removed_paths: Vec<String>,
    /// Paths whose binding fingerprint differs.
    pub binding_changed_paths: Vec<String>,
    /// Paths whose lifecycle status differs.
    pub status_changed_paths: Vec<String>,
}

impl CatalogDiff {
    /// Computes the diff between two node maps keyed by path. The
    /// resulting path lists are sorted.
    #[must_use]
    pub fn between(
        old: &HashMap<String, CatalogNode>,
        new: &HashMap<String, CatalogNode>,
    ) -> Self {
        let mut diff = Self::default();

        for path in new.keys() {
            if !old.contains_key(path) {
                diff.added_paths.push(path.clone());
            }
        }
        for (path, old_node) in old {
            let Some(new_node) = new.get(path) else {
                diff.removed_paths.push(path.clone());
                continue;
            };

            let old_fp = old_node.source_binding.as_ref().map(|b| b.fingerprint());
            let new_fp = new_node.source_binding.as_ref().map(|b| b.fingerprint());
            if old_fp != new_fp {
                diff.binding_changed_paths.push(path.clone());
            }
            if old_node.status != new_node.status {
                diff.status_changed_paths.push(path.clone());
            }
        }

        diff.added_paths.sort();
        diff.removed_paths.sort();
        diff.binding_changed_paths.sort();
        diff.status_changed_paths.sort();
        diff
    }

    /// True when applying the diff would break existing callers.
    #[must_use]
    pub fn has_breaking_changes(&self) -> bool {
        !self.removed_paths.is_empty() || !self.binding_changed_paths.is_empty()
    }

    /// True when nothing changed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.added_paths.is_empty()
            && self.removed_paths.is_empty()
            && self.binding_changed_paths.is_empty()
            && self.status_changed_paths.is_empty()
    }

    /// Short human-readable summary, e.g. `2 added, 1 binding changed`.
    #[must_use]
    pub fn summary(&self) -> String {
        let mut parts = Vec::new();
        if !self.added_paths.is_empty() {
            parts.push(format!("{} added", self.added_paths.len()));
        }
        if !self.removed_paths.is_empty() {
            parts.push(format!("{} removed", self.removed_paths.len()));
        }
        if !self.binding_changed_paths.is_empty() {
            parts.push(format!("{} binding changed", self.binding_changed_paths.len()));
        }
        if !self.status_changed_paths.is_empty() {
            parts.push(format!("{} status changed", self.status_changed_paths.len()));
        }
        if parts.is_empty() {
            "no changes".to_string()
        } else {
            parts.join(", ")
        }
    }
}
