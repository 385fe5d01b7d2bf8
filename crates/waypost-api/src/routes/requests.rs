//! Moniker request workflow routes.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use utoipa::ToSchema;

use waypost_catalog::{RequestStatus, RequestSubmission};

use crate::auth::{Role, require_role};
use crate::context::CallerContext;
use crate::error::{ApiError, ApiResult};
use crate::server::AppState;

/// Query parameters for `GET /requests`.
#[derive(Debug, Default, Deserialize)]
pub struct RequestListQuery {
    /// Status filter (`pending`, `approved`, `rejected`).
    pub status: Option<String>,
}

/// Body for approve/reject decisions.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct DecisionRequest {
    /// Reviewer recorded on the request.
    #[serde(default)]
    pub actor: Option<String>,
    /// Rejection reason; required when rejecting.
    #[serde(default)]
    pub reason: Option<String>,
}

/// Submit a proposed moniker (submit lane).
///
/// POST /requests
#[utoipa::path(
    post,
    path = "/requests",
    tag = "requests",
    responses(
        (status = 201, description = "Request enqueued for review"),
        (status = 403, description = "Submit token required"),
        (status = 409, description = "Pending request already exists for the path"),
    ),
    security(("bearerAuth" = []))
)]
pub(crate) async fn submit(
    ctx: CallerContext,
    State(state): State<Arc<AppState>>,
    Json(submission): Json<RequestSubmission>,
) -> ApiResult<Response> {
    require_role(ctx.role, Role::Submitter)?;
    if submission.path.trim().is_empty() {
        return Err(ApiError::bad_request("path must not be empty"));
    }
    let request = state
        .governance
        .submit_request(submission)
        .map_err(|e| ApiError::from(e).with_request_id(ctx.request_id.clone()))?;
    Ok((StatusCode::CREATED, Json(request)).into_response())
}

/// List requests (submit lane).
///
/// GET /requests?status=…
#[utoipa::path(
    get,
    path = "/requests",
    tag = "requests",
    params(("status" = Option<String>, Query, description = "Status filter")),
    responses(
        (status = 200, description = "Requests, newest first"),
        (status = 403, description = "Submit token required"),
    ),
    security(("bearerAuth" = []))
)]
pub(crate) async fn list(
    ctx: CallerContext,
    State(state): State<Arc<AppState>>,
    Query(query): Query<RequestListQuery>,
) -> ApiResult<Response> {
    require_role(ctx.role, Role::Submitter)?;
    let status = query
        .status
        .as_deref()
        .map(str::parse::<RequestStatus>)
        .transpose()
        .map_err(ApiError::bad_request)?;
    Ok(Json(state.governance.list_requests(status)).into_response())
}

/// Approve a request, materializing the moniker (approve lane).
///
/// POST /requests/{id}/approve
#[utoipa::path(
    post,
    path = "/requests/{id}/approve",
    tag = "requests",
    params(("id" = String, Path, description = "Request id")),
    request_body = DecisionRequest,
    responses(
        (status = 200, description = "Request approved; node is ACTIVE"),
        (status = 403, description = "Approve token required"),
        (status = 409, description = "Already decided or path exists"),
    ),
    security(("bearerAuth" = []))
)]
pub(crate) async fn approve(
    ctx: CallerContext,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(decision): Json<DecisionRequest>,
) -> ApiResult<Response> {
    require_role(ctx.role, Role::Approver)?;
    let actor = decision.actor.as_deref().unwrap_or("approver");
    let request = state
        .governance
        .approve_request(&id, actor)
        .map_err(|e| ApiError::from(e).with_request_id(ctx.request_id.clone()))?;
    Ok(Json(request).into_response())
}

/// Reject a request with a reason (approve lane).
///
/// POST /requests/{id}/reject
#[utoipa::path(
    post,
    path = "/requests/{id}/reject",
    tag = "requests",
    params(("id" = String, Path, description = "Request id")),
    request_body = DecisionRequest,
    responses(
        (status = 200, description = "Request rejected"),
        (status = 403, description = "Approve token required"),
        (status = 409, description = "Already decided"),
    ),
    security(("bearerAuth" = []))
)]
pub(crate) async fn reject(
    ctx: CallerContext,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(decision): Json<DecisionRequest>,
) -> ApiResult<Response> {
    require_role(ctx.role, Role::Approver)?;
    let actor = decision.actor.as_deref().unwrap_or("approver");
    let reason = decision
        .reason
        .as_deref()
        .ok_or_else(|| ApiError::bad_request("reason is required to reject a request"))?;
    let request = state
        .governance
        .reject_request(&id, actor, reason)
        .map_err(|e| ApiError::from(e).with_request_id(ctx.request_id.clone()))?;
    Ok(Json(request).into_response())
}
