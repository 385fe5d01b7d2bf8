//! Client-reported access telemetry.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde::Deserialize;
use utoipa::ToSchema;

use waypost_core::EventOutcome;

use crate::context::CallerContext;
use crate::error::{ApiError, ApiResult};
use crate::server::AppState;

/// Body for `POST /telemetry/access`.
///
/// Clients report back after fetching data from the resolved source so
/// the registry sees actual reads, not just resolutions.
#[derive(Debug, Deserialize, ToSchema)]
pub struct AccessReport {
    /// The moniker that was fetched.
    pub moniker: String,
    /// How the fetch went.
    #[schema(value_type = String)]
    pub outcome: EventOutcome,
    /// Client-observed latency in milliseconds.
    #[serde(default)]
    pub latency_ms: f64,
    /// Source type the client connected to.
    #[serde(default)]
    pub source_type: Option<String>,
    /// Error description for failed fetches.
    #[serde(default)]
    pub error_message: Option<String>,
}

/// Record a client access event.
///
/// POST /telemetry/access
#[utoipa::path(
    post,
    path = "/telemetry/access",
    tag = "telemetry",
    request_body = AccessReport,
    responses((status = 202, description = "Event accepted (best-effort)"))
)]
pub(crate) async fn report_access(
    ctx: CallerContext,
    State(state): State<Arc<AppState>>,
    Json(report): Json<AccessReport>,
) -> ApiResult<StatusCode> {
    if report.moniker.trim().is_empty() {
        return Err(ApiError::bad_request("moniker must not be empty"));
    }
    state.resolver.record_access(
        &report.moniker,
        &ctx.caller,
        report.outcome,
        report.latency_ms,
        report.source_type,
        report.error_message,
    );
    Ok(StatusCode::ACCEPTED)
}
