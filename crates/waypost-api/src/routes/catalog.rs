//! Catalog browsing and governance routes.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use waypost_catalog::{
    CatalogNode, CatalogSnapshot, NodeStatus, StatusUpdate, parse_catalog_yaml,
};

use crate::auth::{Role, require_role};
use crate::context::CallerContext;
use crate::error::{ApiError, ApiResult};
use crate::server::AppState;

const DEFAULT_PAGE_LIMIT: usize = 100;
const DEFAULT_SEARCH_LIMIT: usize = 50;
const DEFAULT_AUDIT_LIMIT: usize = 100;
const DEFAULT_TREE_DEPTH: usize = 3;
const MAX_TREE_DEPTH: usize = 10;

/// Query parameters for `/catalog`.
#[derive(Debug, Default, Deserialize)]
pub struct CatalogQuery {
    /// Last path of the previous page.
    pub cursor: Option<String>,
    /// Page size.
    pub limit: Option<usize>,
    /// Status filter.
    pub status: Option<String>,
}

/// Query parameters for `/catalog/search`.
#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    /// Free-text query.
    pub q: String,
    /// Status filter.
    pub status: Option<String>,
    /// Result cap.
    pub limit: Option<usize>,
}

/// Query parameters for `/tree`.
#[derive(Debug, Default, Deserialize)]
pub struct TreeQuery {
    /// Maximum depth rendered below each root.
    pub depth: Option<usize>,
}

/// Query parameters for audit listing.
#[derive(Debug, Default, Deserialize)]
pub struct AuditQuery {
    /// Maximum entries returned.
    pub limit: Option<usize>,
}

/// One node of the `/tree` rendering.
#[derive(Debug, Serialize, ToSchema)]
pub struct TreeNode {
    /// Full catalog path.
    pub path: String,
    /// Display name.
    pub display_name: String,
    /// Lifecycle status.
    #[schema(value_type = String)]
    pub status: NodeStatus,
    /// Whether the node itself defines a binding.
    pub has_binding: bool,
    /// Child nodes, up to the requested depth.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TreeNode>,
}

/// Body for `PUT /catalog/{path}/status`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct StatusUpdateRequest {
    /// Target status.
    pub status: String,
    /// Who is driving the change.
    pub actor: String,
    /// Free-text reason for the audit trail.
    #[serde(default)]
    pub reason: Option<String>,
    /// Message shown to callers once deprecated.
    #[serde(default)]
    pub deprecation_message: Option<String>,
    /// Replacement path.
    #[serde(default)]
    pub successor: Option<String>,
    /// Expected archival date.
    #[serde(default)]
    pub sunset_deadline: Option<NaiveDate>,
    /// Migration instructions.
    #[serde(default)]
    pub migration_guide_url: Option<String>,
}

/// Body for `POST /catalog/reload`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ReloadRequest {
    /// Catalog definition as YAML text; when absent the configured
    /// catalog file is re-read.
    #[serde(default)]
    pub definition: Option<String>,
    /// Overrides the configured breaking-change gate.
    #[serde(default)]
    pub block_breaking: Option<bool>,
    /// Actor recorded in audit entries.
    #[serde(default)]
    pub actor: Option<String>,
}

fn parse_status(raw: Option<&str>) -> ApiResult<Option<NodeStatus>> {
    raw.map(|s| {
        s.parse::<NodeStatus>()
            .map_err(|e| ApiError::bad_request(e))
    })
    .transpose()
}

/// Describe a moniker path.
///
/// GET /describe/{path}
#[utoipa::path(
    get,
    path = "/describe/{path}",
    tag = "catalog",
    params(("path" = String, Path, description = "Moniker path")),
    responses(
        (status = 200, description = "Node metadata with effective ownership"),
        (status = 404, description = "Unknown path"),
    )
)]
pub(crate) async fn describe(
    ctx: CallerContext,
    State(state): State<Arc<AppState>>,
    Path(path): Path<String>,
) -> ApiResult<Response> {
    let result = state
        .resolver
        .describe(&path, &ctx.caller)
        .map_err(|e| ApiError::from(e).with_request_id(ctx.request_id.clone()))?;
    Ok(Json(result).into_response())
}

/// List immediate children of a path.
///
/// GET /list/{path}
#[utoipa::path(
    get,
    path = "/list/{path}",
    tag = "catalog",
    params(("path" = String, Path, description = "Moniker path")),
    responses((status = 200, description = "Immediate child suffixes"))
)]
pub(crate) async fn list_children(
    ctx: CallerContext,
    State(state): State<Arc<AppState>>,
    Path(path): Path<String>,
) -> ApiResult<Response> {
    let result = state
        .resolver
        .list_children(&path, &ctx.caller)
        .map_err(|e| ApiError::from(e).with_request_id(ctx.request_id.clone()))?;
    Ok(Json(result).into_response())
}

/// Ownership chain for a path.
///
/// GET /lineage/{path}
#[utoipa::path(
    get,
    path = "/lineage/{path}",
    tag = "catalog",
    params(("path" = String, Path, description = "Moniker path")),
    responses((status = 200, description = "Ownership with provenance and binding origin"))
)]
pub(crate) async fn lineage(
    ctx: CallerContext,
    State(state): State<Arc<AppState>>,
    Path(path): Path<String>,
) -> ApiResult<Response> {
    let result = state
        .resolver
        .lineage(&path, &ctx.caller)
        .map_err(|e| ApiError::from(e).with_request_id(ctx.request_id.clone()))?;
    Ok(Json(result).into_response())
}

/// Render the hierarchy from the roots.
///
/// GET /tree
#[utoipa::path(
    get,
    path = "/tree",
    tag = "catalog",
    params(("depth" = Option<usize>, Query, description = "Maximum depth")),
    responses((status = 200, description = "Catalog tree", body = [TreeNode]))
)]
pub(crate) async fn tree_root(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TreeQuery>,
) -> ApiResult<Json<Vec<TreeNode>>> {
    let depth = query.depth.unwrap_or(DEFAULT_TREE_DEPTH).min(MAX_TREE_DEPTH);
    let snapshot = state.registry.snapshot();
    let roots = snapshot.child_paths("");
    Ok(Json(
        roots
            .iter()
            .map(|root| build_tree(&snapshot, root, depth))
            .collect(),
    ))
}

/// Render the hierarchy below one path.
///
/// GET /tree/{path}
#[utoipa::path(
    get,
    path = "/tree/{path}",
    tag = "catalog",
    params(
        ("path" = String, Path, description = "Subtree root"),
        ("depth" = Option<usize>, Query, description = "Maximum depth"),
    ),
    responses(
        (status = 200, description = "Subtree", body = TreeNode),
        (status = 404, description = "Unknown path"),
    )
)]
pub(crate) async fn tree_subtree(
    State(state): State<Arc<AppState>>,
    Path(path): Path<String>,
    Query(query): Query<TreeQuery>,
) -> ApiResult<Json<TreeNode>> {
    let depth = query.depth.unwrap_or(DEFAULT_TREE_DEPTH).min(MAX_TREE_DEPTH);
    let snapshot = state.registry.snapshot();
    if !snapshot.contains(&path) {
        return Err(ApiError::not_found(format!("no catalog node at '{path}'")));
    }
    Ok(Json(build_tree(&snapshot, &path, depth)))
}

fn build_tree(snapshot: &CatalogSnapshot, path: &str, depth: usize) -> TreeNode {
    let node = snapshot.get(path);
    let children = if depth == 0 {
        Vec::new()
    } else {
        snapshot
            .child_paths(path)
            .iter()
            .map(|child| build_tree(snapshot, child, depth - 1))
            .collect()
    };
    TreeNode {
        path: path.to_string(),
        display_name: node.map_or_else(
            || path.rsplit(['/', '.']).next().unwrap_or(path).to_string(),
            |n| n.display_name.clone(),
        ),
        status: node.map_or(NodeStatus::Active, |n| n.status),
        has_binding: node.is_some_and(|n| n.source_binding.is_some()),
        children,
    }
}

/// Paginated catalog listing.
///
/// GET /catalog
#[utoipa::path(
    get,
    path = "/catalog",
    tag = "catalog",
    params(
        ("cursor" = Option<String>, Query, description = "Last path of the previous page"),
        ("limit" = Option<usize>, Query, description = "Page size"),
        ("status" = Option<String>, Query, description = "Status filter"),
    ),
    responses((status = 200, description = "One page of catalog paths"))
)]
pub(crate) async fn list_catalog(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CatalogQuery>,
) -> ApiResult<Response> {
    let status = parse_status(query.status.as_deref())?;
    let page = state.registry.snapshot().page(
        query.cursor.as_deref(),
        query.limit.unwrap_or(DEFAULT_PAGE_LIMIT),
        status,
    );
    Ok(Json(page).into_response())
}

/// Search result entry.
#[derive(Debug, Serialize, ToSchema)]
pub struct SearchHit {
    /// Catalog path.
    pub path: String,
    /// Display name.
    pub display_name: String,
    /// Description.
    pub description: String,
    /// Lifecycle status.
    #[schema(value_type = String)]
    pub status: NodeStatus,
    /// Tags.
    pub tags: Vec<String>,
}

/// Free-text catalog search.
///
/// GET /catalog/search?q=…
#[utoipa::path(
    get,
    path = "/catalog/search",
    tag = "catalog",
    params(
        ("q" = String, Query, description = "Free-text query"),
        ("status" = Option<String>, Query, description = "Status filter"),
        ("limit" = Option<usize>, Query, description = "Result cap"),
    ),
    responses((status = 200, description = "Matching nodes", body = [SearchHit]))
)]
pub(crate) async fn search(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Json<Vec<SearchHit>>> {
    let status = parse_status(query.status.as_deref())?;
    let snapshot = state.registry.snapshot();
    let hits = snapshot
        .search(&query.q, status, query.limit.unwrap_or(DEFAULT_SEARCH_LIMIT))
        .into_iter()
        .map(|node| SearchHit {
            path: node.path.clone(),
            display_name: node.display_name.clone(),
            description: node.description.clone(),
            status: node.status,
            tags: node.tags.clone(),
        })
        .collect();
    Ok(Json(hits))
}

/// Catalog counts.
///
/// GET /catalog/stats
#[utoipa::path(
    get,
    path = "/catalog/stats",
    tag = "catalog",
    responses((status = 200, description = "Counts by status and source type"))
)]
pub(crate) async fn stats(State(state): State<Arc<AppState>>) -> ApiResult<Response> {
    Ok(Json(state.registry.snapshot().stats()).into_response())
}

/// Dispatches `GET /catalog/{path}/audit`.
///
/// The wildcard segment must end in `/audit`; axum cannot put literal
/// segments after a wildcard.
pub(crate) async fn catalog_path_get(
    State(state): State<Arc<AppState>>,
    Path(path): Path<String>,
    Query(query): Query<AuditQuery>,
) -> ApiResult<Response> {
    let Some(path) = path.strip_suffix("/audit") else {
        return Err(ApiError::not_found("unknown catalog operation"));
    };
    let entries = state
        .registry
        .audit_log(Some(path), query.limit.unwrap_or(DEFAULT_AUDIT_LIMIT));
    Ok(Json(entries).into_response())
}

/// Dispatches `PUT /catalog/{path}/status` (approve lane).
pub(crate) async fn catalog_path_put(
    ctx: CallerContext,
    State(state): State<Arc<AppState>>,
    Path(path): Path<String>,
    Json(request): Json<StatusUpdateRequest>,
) -> ApiResult<Response> {
    let Some(path) = path.strip_suffix("/status") else {
        return Err(ApiError::not_found("unknown catalog operation"));
    };
    require_role(ctx.role, Role::Approver)?;

    let status: NodeStatus = request
        .status
        .parse()
        .map_err(|e: String| ApiError::bad_request(e))?;
    let node = state
        .governance
        .update_node_status(
            path,
            status,
            &request.actor,
            StatusUpdate {
                reason: request.reason,
                deprecation_message: request.deprecation_message,
                successor: request.successor,
                sunset_deadline: request.sunset_deadline,
                migration_guide_url: request.migration_guide_url,
            },
        )
        .map_err(|e| ApiError::from(e).with_request_id(ctx.request_id.clone()))?;
    Ok(Json(node).into_response())
}

/// Validated catalog hot-reload (approve lane).
///
/// POST /catalog/reload
#[utoipa::path(
    post,
    path = "/catalog/reload",
    tag = "catalog",
    request_body = ReloadRequest,
    responses(
        (status = 200, description = "Reload applied"),
        (status = 409, description = "Reload refused: breaking changes"),
        (status = 403, description = "Approve token required"),
    ),
    security(("bearerAuth" = []))
)]
pub(crate) async fn reload(
    ctx: CallerContext,
    State(state): State<Arc<AppState>>,
    Json(request): Json<ReloadRequest>,
) -> ApiResult<Response> {
    require_role(ctx.role, Role::Approver)?;

    let nodes: Vec<CatalogNode> = match &request.definition {
        Some(text) => parse_catalog_yaml(text)
            .map_err(|e| ApiError::from(e).with_request_id(ctx.request_id.clone()))?,
        None => {
            let Some(file) = &state.config.catalog_file else {
                return Err(ApiError::bad_request(
                    "no definition supplied and no catalog file configured",
                ));
            };
            waypost_catalog::load_catalog_file(file)
                .map_err(|e| ApiError::from(e).with_request_id(ctx.request_id.clone()))?
        }
    };

    let actor = request.actor.as_deref().unwrap_or("api");
    let outcome = state
        .governance
        .reload_catalog(nodes, request.block_breaking, actor);

    let status = if outcome.applied {
        StatusCode::OK
    } else {
        StatusCode::CONFLICT
    };
    Ok((status, Json(outcome)).into_response())
}
