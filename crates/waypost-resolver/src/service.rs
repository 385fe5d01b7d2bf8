//! Resolution engine.
//!
//! Orchestrates parse → registry lookup → successor redirect → template
//! expansion → ownership rollup, and emits one usage event per
//! operation. The service never touches the data source itself: the
//! result tells the client where and how to fetch.

use std::sync::Arc;
use std::time::Instant;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use waypost_catalog::{
    CatalogNode, CatalogRegistry, CatalogSnapshot, MAX_SUCCESSOR_DEPTH, NodeStatus,
    ResolvedOwnership, SourceBinding, SourceType,
};
use waypost_core::moniker::MonikerPath;
use waypost_core::telemetry::{CallerIdentity, EventOutcome, Operation, TelemetryEmitter, UsageEvent};
use waypost_core::template;

use crate::cache::{CacheConfig, ResolveCache};
use crate::error::{ResolveError, Result};

/// Config keys consumed while building the query; everything else is
/// passed through as connection attributes.
const QUERY_KEYS: &[&str] = &[
    "query",
    "table",
    "path_template",
    "file_pattern",
    "securities",
    "instruments",
];

/// Feature toggles for the resolution path.
#[derive(Debug, Clone)]
pub struct ResolverOptions {
    /// Master switch for deprecation behavior.
    pub deprecation_enabled: bool,
    /// Follow successor pointers of deprecated nodes during resolve.
    pub redirect_on_resolve: bool,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self {
            deprecation_enabled: true,
            redirect_on_resolve: true,
        }
    }
}

/// Everything a client needs to fetch the data behind a moniker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolveResult {
    /// The moniker as requested (canonical form).
    pub moniker: String,
    /// The registry key the request resolved at.
    pub path: String,
    /// Kind of data source.
    pub source_type: String,
    /// Connection attributes for the client.
    pub connection: serde_json::Map<String, serde_json::Value>,
    /// Expanded query, path template or file pattern.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    /// Column descriptors, when the binding declares them.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<serde_json::Value>,
    /// Operation tags permitted against the source.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub allowed_operations: Vec<String>,
    /// Whether the source is read-only. Not enforced server-side.
    pub read_only: bool,
    /// Effective ownership with provenance.
    pub ownership: ResolvedOwnership,
    /// Lifecycle status of the resolving node.
    pub status: NodeStatus,
    /// Deprecation message, when deprecated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deprecation_message: Option<String>,
    /// Immediate successor of the resolving node, when set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub successor: Option<String>,
    /// Expected archival date, when deprecated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sunset_deadline: Option<NaiveDate>,
    /// Migration instructions, when deprecated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub migration_guide_url: Option<String>,
    /// Requested path when the binding came from a successor redirect.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirected_from: Option<String>,
    /// Path of the node that donated the binding.
    pub binding_path: String,
}

/// Node metadata for `/describe`.
#[derive(Debug, Clone, Serialize)]
pub struct DescribeResult {
    /// The moniker as requested.
    pub moniker: String,
    /// The registry key.
    pub path: String,
    /// The catalog node, when one exists at the exact path.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node: Option<CatalogNode>,
    /// Effective ownership with provenance.
    pub ownership: ResolvedOwnership,
    /// Whether a binding is inheritable at this path.
    pub has_source_binding: bool,
    /// Source type of the inheritable binding.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_type: Option<String>,
}

/// Children listing for `/list`.
#[derive(Debug, Clone, Serialize)]
pub struct ListResult {
    /// The moniker as requested.
    pub moniker: String,
    /// The registry key.
    pub path: String,
    /// Immediate child suffixes, sorted.
    pub children: Vec<String>,
    /// Effective ownership with provenance.
    pub ownership: ResolvedOwnership,
}

/// Ownership chain for `/lineage`.
#[derive(Debug, Clone, Serialize)]
pub struct LineageResult {
    /// The moniker as requested.
    pub moniker: String,
    /// The registry key.
    pub path: String,
    /// Effective ownership with provenance.
    pub ownership: ResolvedOwnership,
    /// Source type of the inheritable binding.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_type: Option<String>,
    /// Path of the node that defines the binding.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub binding_defined_at: Option<String>,
    /// Ancestor paths from root down to the node itself.
    pub path_hierarchy: Vec<String>,
}

/// The moniker resolution service.
///
/// Resolves monikers to source connection info, never the data itself.
pub struct ResolverService {
    registry: Arc<CatalogRegistry>,
    cache: Arc<ResolveCache>,
    telemetry: Arc<TelemetryEmitter>,
    options: ResolverOptions,
}

impl ResolverService {
    /// Creates a resolver over `registry`, emitting usage events to
    /// `telemetry`.
    #[must_use]
    pub fn new(
        registry: Arc<CatalogRegistry>,
        telemetry: Arc<TelemetryEmitter>,
        cache_config: CacheConfig,
        options: ResolverOptions,
    ) -> Self {
        Self {
            registry,
            cache: Arc::new(ResolveCache::new(cache_config)),
            telemetry,
            options,
        }
    }

    /// The result cache, shared with the governance controller for
    /// invalidation.
    #[must_use]
    pub fn cache(&self) -> Arc<ResolveCache> {
        Arc::clone(&self.cache)
    }

    /// Resolves a moniker to source connection info.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::Core`] for parse and template failures,
    /// [`ResolveError::UnknownMoniker`] when no catalog node exists, and
    /// [`ResolveError::NoBinding`] when no binding is inheritable.
    pub fn resolve(&self, moniker_str: &str, caller: &CallerIdentity) -> Result<ResolveResult> {
        let start = Instant::now();
        let outcome = self.resolve_inner(moniker_str);
        let latency_ms = start.elapsed().as_secs_f64() * 1000.0;

        match &outcome {
            Ok(result) => {
                let deprecated =
                    self.options.deprecation_enabled && result.status == NodeStatus::Deprecated;
                let event = UsageEvent::new(
                    moniker_str,
                    Operation::Resolve,
                    caller.clone(),
                    EventOutcome::Success,
                )
                .with_latency_ms(latency_ms)
                .with_source_type(result.source_type.clone())
                .with_owner(result.ownership.accountable_owner.clone())
                .with_deprecation(
                    deprecated,
                    result.successor.clone(),
                    result.redirected_from.clone(),
                );
                self.telemetry.emit(event);
            }
            Err(err) => self.emit_failure(moniker_str, Operation::Resolve, caller, latency_ms, err),
        }
        outcome
    }

    fn resolve_inner(&self, moniker_str: &str) -> Result<ResolveResult> {
        let path = MonikerPath::parse(moniker_str)?;
        let key = path.registry_key();
        let canonical = path.canonical();

        if let Some(hit) = self.cache.get(&canonical) {
            return Ok(hit);
        }

        let snapshot = self.registry.snapshot();

        let Some((binding, binding_path)) = snapshot.source_binding_of(&key) else {
            if snapshot.known_path(&key) {
                return Err(ResolveError::NoBinding { path: key });
            }
            return Err(ResolveError::UnknownMoniker { path: key });
        };
        let mut binding = binding.clone();
        let mut binding_path = binding_path.to_string();

        // The exact node supplies identity; a bare sub-path borrows it
        // from the binding node.
        let resolving = snapshot
            .get(&key)
            .or_else(|| snapshot.get(&binding_path))
            .cloned()
            .ok_or_else(|| ResolveError::Internal {
                message: format!("binding node '{binding_path}' vanished mid-resolve"),
            })?;

        let mut redirected_from = None;
        if self.options.deprecation_enabled
            && self.options.redirect_on_resolve
            && resolving.status == NodeStatus::Deprecated
        {
            if let Some(first_successor) = resolving.successor.clone() {
                redirected_from = Some(key.clone());
                let (b, bp) = follow_successors(&snapshot, &key, &first_successor)
                    .unwrap_or((binding, binding_path));
                binding = b;
                binding_path = bp;
            }
        }

        let (connection, query) = build_source(&binding, &path)?;
        let ownership = snapshot.ownership_of(&key);

        let result = ResolveResult {
            moniker: canonical.clone(),
            path: key,
            source_type: binding.source_type.as_str().to_string(),
            connection,
            query,
            schema: binding.schema.clone(),
            allowed_operations: binding.allowed_operations.iter().cloned().collect(),
            read_only: binding.read_only,
            ownership,
            status: resolving.status,
            deprecation_message: resolving.deprecation_message.clone(),
            successor: resolving.successor.clone(),
            sunset_deadline: resolving.sunset_deadline,
            migration_guide_url: resolving.migration_guide_url.clone(),
            redirected_from,
            binding_path,
        };

        self.cache.insert(canonical, result.clone());
        Ok(result)
    }

    /// Returns node metadata without expanding the binding.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::Core`] when the moniker fails to parse.
    pub fn describe(&self, moniker_str: &str, caller: &CallerIdentity) -> Result<DescribeResult> {
        let start = Instant::now();
        let outcome = (|| {
            let path = MonikerPath::parse(moniker_str)?;
            let key = path.registry_key();
            let snapshot = self.registry.snapshot();
            if !snapshot.known_path(&key) {
                return Err(ResolveError::UnknownMoniker { path: key });
            }
            let binding = snapshot.source_binding_of(&key);
            Ok(DescribeResult {
                moniker: path.canonical(),
                node: snapshot.get(&key).cloned(),
                ownership: snapshot.ownership_of(&key),
                has_source_binding: binding.is_some(),
                source_type: binding.map(|(b, _)| b.source_type.as_str().to_string()),
                path: key,
            })
        })();
        self.finish(moniker_str, Operation::Describe, caller, start, &outcome);
        outcome
    }

    /// Lists immediate children of a path.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::Core`] when the moniker fails to parse.
    pub fn list_children(&self, moniker_str: &str, caller: &CallerIdentity) -> Result<ListResult> {
        let start = Instant::now();
        let outcome = (|| {
            let path = MonikerPath::parse(moniker_str)?;
            let key = path.registry_key();
            let snapshot = self.registry.snapshot();
            let mut children = snapshot.list_children(&key);
            children.sort();
            Ok(ListResult {
                moniker: path.canonical(),
                children,
                ownership: snapshot.ownership_of(&key),
                path: key,
            })
        })();
        self.finish(moniker_str, Operation::List, caller, start, &outcome);
        outcome
    }

    /// Returns the ownership chain and binding provenance for a path.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::Core`] when the moniker fails to parse.
    pub fn lineage(&self, moniker_str: &str, caller: &CallerIdentity) -> Result<LineageResult> {
        let start = Instant::now();
        let outcome = (|| {
            let path = MonikerPath::parse(moniker_str)?;
            let key = path.registry_key();
            let snapshot = self.registry.snapshot();
            let binding = snapshot.source_binding_of(&key);
            let mut hierarchy = waypost_catalog::registry::ancestor_paths(&key);
            hierarchy.push(key.clone());
            Ok(LineageResult {
                moniker: path.canonical(),
                ownership: snapshot.ownership_of(&key),
                source_type: binding.map(|(b, _)| b.source_type.as_str().to_string()),
                binding_defined_at: binding.map(|(_, at)| at.to_string()),
                path_hierarchy: hierarchy,
                path: key,
            })
        })();
        self.finish(moniker_str, Operation::Lineage, caller, start, &outcome);
        outcome
    }

    /// Records an access event reported by a client after it fetched
    /// data from the resolved source.
    pub fn record_access(
        &self,
        moniker_str: &str,
        caller: &CallerIdentity,
        outcome: EventOutcome,
        latency_ms: f64,
        source_type: Option<String>,
        error_message: Option<String>,
    ) {
        let owner = MonikerPath::parse(moniker_str).ok().and_then(|path| {
            self.registry
                .snapshot()
                .ownership_of(&path.registry_key())
                .accountable_owner
        });
        let mut event = UsageEvent::new(moniker_str, Operation::Read, caller.clone(), outcome)
            .with_latency_ms(latency_ms)
            .with_owner(owner);
        if let Some(source_type) = source_type {
            event = event.with_source_type(source_type);
        }
        if let Some(message) = error_message {
            event = event.with_error(message);
        }
        self.telemetry.emit(event);
    }

    fn finish<T>(
        &self,
        moniker_str: &str,
        operation: Operation,
        caller: &CallerIdentity,
        start: Instant,
        outcome: &Result<T>,
    ) {
        let latency_ms = start.elapsed().as_secs_f64() * 1000.0;
        match outcome {
            Ok(_) => {
                let event =
                    UsageEvent::new(moniker_str, operation, caller.clone(), EventOutcome::Success)
                        .with_latency_ms(latency_ms);
                self.telemetry.emit(event);
            }
            Err(err) => self.emit_failure(moniker_str, operation, caller, latency_ms, err),
        }
    }

    fn emit_failure(
        &self,
        moniker_str: &str,
        operation: Operation,
        caller: &CallerIdentity,
        latency_ms: f64,
        err: &ResolveError,
    ) {
        let outcome = if err.is_not_found() {
            EventOutcome::NotFound
        } else {
            EventOutcome::Error
        };
        let event = UsageEvent::new(moniker_str, operation, caller.clone(), outcome)
            .with_latency_ms(latency_ms)
            .with_error(err.to_string());
        self.telemetry.emit(event);
    }
}

/// Follows a successor chain from `origin`, up to
/// [`MAX_SUCCESSOR_DEPTH`] hops, and returns the binding of the last
/// reached node. A broken or overlong chain degrades to whatever was
/// last reached and logs; it never fails the request.
fn follow_successors(
    snapshot: &CatalogSnapshot,
    origin: &str,
    first_successor: &str,
) -> Option<(SourceBinding, String)> {
    let mut current = first_successor.to_string();
    let mut best: Option<(SourceBinding, String)> = None;

    for hop in 0..MAX_SUCCESSOR_DEPTH {
        match snapshot.source_binding_of(&current) {
            Some((binding, at)) => best = Some((binding.clone(), at.to_string())),
            None => {
                tracing::warn!(
                    origin = origin,
                    successor = %current,
                    "successor has no inheritable binding; using last reached node"
                );
                break;
            }
        }
        let next = snapshot
            .get(&current)
            .filter(|node| node.status == NodeStatus::Deprecated)
            .and_then(|node| node.successor.clone());
        match next {
            Some(next) if next == current => {
                tracing::warn!(origin = origin, successor = %current, "self-referential successor");
                break;
            }
            Some(next) => {
                if hop + 1 == MAX_SUCCESSOR_DEPTH {
                    tracing::warn!(
                        origin = origin,
                        max_hops = MAX_SUCCESSOR_DEPTH,
                        "successor chain exceeded maximum depth; using last reached node"
                    );
                    break;
                }
                current = next;
            }
            None => break,
        }
    }

    best
}

/// Splits binding config into connection attributes and the expanded
/// query. The query comes from `query` when present, otherwise from the
/// source type's conventional template key.
fn build_source(
    binding: &SourceBinding,
    path: &MonikerPath,
) -> Result<(serde_json::Map<String, serde_json::Value>, Option<String>)> {
    let config = &binding.config;
    let str_key =
        |key: &str| -> Option<&str> { config.get(key).and_then(serde_json::Value::as_str) };

    let query = if let Some(q) = str_key("query") {
        Some(template::expand(q, path)?)
    } else {
        match binding.source_type {
            SourceType::Snowflake | SourceType::Oracle | SourceType::Opensearch => str_key("table")
                .map(|t| template::expand(t, path).map(|t| format!("SELECT * FROM {t}")))
                .transpose()?,
            SourceType::Rest => Some(template::expand(
                str_key("path_template").unwrap_or("/{path}"),
                path,
            )?),
            SourceType::Static => Some(template::expand(
                str_key("file_pattern").unwrap_or("{path}.json"),
                path,
            )?),
            SourceType::Excel => Some(template::expand(
                str_key("file_pattern").unwrap_or("{path}.xlsx"),
                path,
            )?),
            SourceType::File => Some(template::expand(
                str_key("file_pattern").unwrap_or("{path}"),
                path,
            )?),
            SourceType::Bloomberg => Some(template::expand(
                str_key("securities").unwrap_or("{path}"),
                path,
            )?),
            SourceType::Refinitiv => Some(template::expand(
                str_key("instruments").unwrap_or("{path}"),
                path,
            )?),
        }
    };

    let connection: serde_json::Map<String, serde_json::Value> = config
        .iter()
        .filter(|(key, _)| !QUERY_KEYS.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();

    Ok((connection, query))
}
