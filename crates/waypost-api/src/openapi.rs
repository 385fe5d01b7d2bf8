//! OpenAPI document for the Waypost API.

use axum::Json;
use utoipa::OpenApi;

/// The API document.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Waypost",
        description = "Moniker resolution service: resolves hierarchical \
                       names to data-source bindings. Control plane only; \
                       clients connect to sources directly.",
    ),
    paths(
        crate::server::health,
        crate::routes::resolve::resolve_moniker,
        crate::routes::resolve::batch_resolve,
        crate::routes::catalog::describe,
        crate::routes::catalog::list_children,
        crate::routes::catalog::lineage,
        crate::routes::catalog::tree_root,
        crate::routes::catalog::tree_subtree,
        crate::routes::catalog::list_catalog,
        crate::routes::catalog::search,
        crate::routes::catalog::stats,
        crate::routes::catalog::reload,
        crate::routes::requests::submit,
        crate::routes::requests::list,
        crate::routes::requests::approve,
        crate::routes::requests::reject,
        crate::routes::telemetry::report_access,
    ),
    components(schemas(
        crate::error::ApiErrorBody,
        crate::server::HealthResponse,
        crate::routes::resolve::BatchResolveRequest,
        crate::routes::resolve::BatchResolveResponse,
        crate::routes::catalog::TreeNode,
        crate::routes::catalog::SearchHit,
        crate::routes::catalog::StatusUpdateRequest,
        crate::routes::catalog::ReloadRequest,
        crate::routes::requests::DecisionRequest,
        crate::routes::telemetry::AccessReport,
    )),
    tags(
        (name = "resolution", description = "Moniker resolution"),
        (name = "catalog", description = "Catalog browsing and governance"),
        (name = "requests", description = "Moniker request workflow"),
        (name = "telemetry", description = "Client access reporting"),
        (name = "health", description = "Service health"),
    )
)]
pub struct ApiDoc;

/// Serves the generated OpenAPI document.
///
/// GET /openapi.json
pub(crate) async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
