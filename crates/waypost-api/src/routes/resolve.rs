//! Resolution routes.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, RawQuery, State};
use axum::http::HeaderValue;
use axum::http::header::HeaderName;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use waypost_catalog::NodeStatus;
use waypost_resolver::ResolveResult;

use crate::context::CallerContext;
use crate::error::{ApiError, ApiResult};
use crate::server::AppState;

/// Header flagging a deprecated resolution.
pub const DEPRECATED_HEADER: &str = "x-moniker-deprecated";
/// Header carrying the successor path.
pub const SUCCESSOR_HEADER: &str = "x-moniker-successor";
/// Header carrying the original path of a redirected resolution.
pub const REDIRECTED_FROM_HEADER: &str = "x-moniker-redirected-from";

/// Batch resolution request.
#[derive(Debug, Deserialize, ToSchema)]
pub struct BatchResolveRequest {
    /// Monikers to resolve.
    pub monikers: Vec<String>,
}

/// Batch resolution response with per-moniker outcomes.
#[derive(Debug, Serialize, ToSchema)]
pub struct BatchResolveResponse {
    /// Successful resolutions keyed by requested moniker.
    #[schema(value_type = Object)]
    pub results: BTreeMap<String, ResolveResult>,
    /// Error messages keyed by requested moniker.
    pub errors: BTreeMap<String, String>,
    /// Number of monikers requested.
    pub total: usize,
    /// Number resolved.
    pub succeeded: usize,
    /// Number failed.
    pub failed: usize,
}

/// Resolve a moniker.
///
/// GET /resolve/{path}
#[utoipa::path(
    get,
    path = "/resolve/{path}",
    tag = "resolution",
    params(("path" = String, Path, description = "Moniker path, optionally with @version, /vN and ?params")),
    responses(
        (status = 200, description = "Resolved source binding"),
        (status = 400, description = "Invalid moniker"),
        (status = 404, description = "Unknown moniker or no binding"),
        (status = 422, description = "Template expansion failed"),
    )
)]
pub(crate) async fn resolve_moniker(
    ctx: CallerContext,
    State(state): State<Arc<AppState>>,
    Path(path): Path<String>,
    RawQuery(query): RawQuery,
) -> ApiResult<Response> {
    let moniker = match query {
        Some(q) if !q.is_empty() => format!("{path}?{q}"),
        _ => path,
    };

    let result = state
        .resolver
        .resolve(&moniker, &ctx.caller)
        .map_err(|e| ApiError::from(e).with_request_id(ctx.request_id.clone()))?;

    let deprecated = result.status == NodeStatus::Deprecated;
    let successor = result.successor.clone();
    let redirected_from = result.redirected_from.clone();

    let mut response = Json(result).into_response();
    let headers = response.headers_mut();
    if deprecated {
        headers.insert(
            HeaderName::from_static(DEPRECATED_HEADER),
            HeaderValue::from_static("true"),
        );
    }
    if let Some(successor) = successor {
        if let Ok(value) = HeaderValue::from_str(&successor) {
            headers.insert(HeaderName::from_static(SUCCESSOR_HEADER), value);
        }
    }
    if let Some(redirected_from) = redirected_from {
        if let Ok(value) = HeaderValue::from_str(&redirected_from) {
            headers.insert(HeaderName::from_static(REDIRECTED_FROM_HEADER), value);
        }
    }
    Ok(response)
}

/// Resolve a batch of monikers; failures are reported per member.
///
/// POST /resolve/batch
#[utoipa::path(
    post,
    path = "/resolve/batch",
    tag = "resolution",
    request_body = BatchResolveRequest,
    responses(
        (status = 200, description = "Per-moniker results and errors", body = BatchResolveResponse),
        (status = 400, description = "Empty batch"),
    )
)]
pub(crate) async fn batch_resolve(
    ctx: CallerContext,
    State(state): State<Arc<AppState>>,
    Json(request): Json<BatchResolveRequest>,
) -> ApiResult<Json<BatchResolveResponse>> {
    if request.monikers.is_empty() {
        return Err(ApiError::bad_request("monikers must not be empty")
            .with_request_id(ctx.request_id.clone()));
    }

    let mut results = BTreeMap::new();
    let mut errors = BTreeMap::new();
    for moniker in &request.monikers {
        match state.resolver.resolve(moniker, &ctx.caller) {
            Ok(result) => {
                results.insert(moniker.clone(), result);
            }
            Err(err) => {
                errors.insert(moniker.clone(), err.to_string());
            }
        }
    }

    let total = request.monikers.len();
    let succeeded = results.len();
    let failed = errors.len();
    Ok(Json(BatchResolveResponse {
        results,
        errors,
        total,
        succeeded,
        failed,
    }))
}
