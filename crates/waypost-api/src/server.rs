//! Server wiring: shared state, router assembly and serving.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::error_handling::HandleErrorLayer;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router, middleware};
use serde::Serialize;
use tower::ServiceBuilder;
use tower::limit::ConcurrencyLimitLayer;
use tower::timeout::TimeoutLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::ToSchema;

use waypost_catalog::{CatalogNode, CatalogRegistry, CatalogStats};
use waypost_core::telemetry::{TelemetryEmitter, TelemetrySink, TelemetryStats, TracingSink};
use waypost_resolver::{GovernanceController, ResolverService};

use crate::auth::AuthTokens;
use crate::config::Config;
use crate::context::CallerContext;
use crate::error::{ApiError, ApiErrorBody};
use crate::routes;

/// Health check response.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Service status.
    pub status: String,
    /// Catalog node counts.
    #[schema(value_type = Object)]
    pub catalog: CatalogStats,
    /// Resolution cache entry count.
    pub cache_size: usize,
    /// Telemetry emitter counters.
    #[schema(value_type = Object)]
    pub telemetry: TelemetryStats,
    /// Audit entries evicted from the bounded log.
    pub audit_dropped: u64,
}

/// Shared application state for all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Config,
    /// The catalog registry.
    pub registry: Arc<CatalogRegistry>,
    /// The resolution engine.
    pub resolver: Arc<ResolverService>,
    /// The governance controller.
    pub governance: Arc<GovernanceController>,
    /// The usage event emitter.
    pub telemetry: Arc<TelemetryEmitter>,
    /// Resolved lane tokens.
    pub tokens: AuthTokens,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .field("tokens", &self.tokens)
            .finish_non_exhaustive()
    }
}

impl AppState {
    /// Builds application state from configuration and a seeded node
    /// set, emitting telemetry to `sink`.
    ///
    /// Must be called from within a tokio runtime: the telemetry worker
    /// is spawned here.
    #[must_use]
    pub fn new(
        config: Config,
        nodes: Vec<CatalogNode>,
        tokens: AuthTokens,
        sink: Arc<dyn TelemetrySink>,
    ) -> Self {
        let registry = Arc::new(CatalogRegistry::from_nodes(nodes));
        let telemetry = Arc::new(TelemetryEmitter::start(
            config.telemetry.to_telemetry_config(),
            sink,
        ));
        let resolver = Arc::new(ResolverService::new(
            Arc::clone(&registry),
            Arc::clone(&telemetry),
            config.cache.to_cache_config(),
            config.deprecation.to_resolver_options(),
        ));
        let governance = Arc::new(GovernanceController::new(
            Arc::clone(&registry),
            resolver.cache(),
            config.deprecation.to_governance_options(),
        ));
        Self {
            config,
            registry,
            resolver,
            governance,
            telemetry,
            tokens,
        }
    }

    /// State with a tracing sink; the production default.
    #[must_use]
    pub fn with_tracing_sink(config: Config, nodes: Vec<CatalogNode>, tokens: AuthTokens) -> Self {
        Self::new(config, nodes, tokens, Arc::new(TracingSink))
    }
}

/// Assembles the API router.
pub fn router(state: Arc<AppState>) -> Router {
    let request_timeout = Duration::from_secs(state.config.request_timeout_secs.max(1));
    let concurrency_limit = state.config.concurrency_limit;

    let router = Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics_endpoint))
        .route("/openapi.json", get(crate::openapi::openapi_json))
        .route("/resolve/batch", post(routes::resolve::batch_resolve))
        .route("/resolve/*path", get(routes::resolve::resolve_moniker))
        .route("/describe/*path", get(routes::catalog::describe))
        .route("/list/*path", get(routes::catalog::list_children))
        .route("/lineage/*path", get(routes::catalog::lineage))
        .route("/tree", get(routes::catalog::tree_root))
        .route("/tree/*path", get(routes::catalog::tree_subtree))
        .route("/catalog", get(routes::catalog::list_catalog))
        .route("/catalog/search", get(routes::catalog::search))
        .route("/catalog/stats", get(routes::catalog::stats))
        .route("/catalog/reload", post(routes::catalog::reload))
        .route(
            "/catalog/*path",
            get(routes::catalog::catalog_path_get).put(routes::catalog::catalog_path_put),
        )
        .route(
            "/requests",
            post(routes::requests::submit).get(routes::requests::list),
        )
        .route("/requests/:id/approve", post(routes::requests::approve))
        .route("/requests/:id/reject", post(routes::requests::reject))
        .route("/telemetry/access", post(routes::telemetry::report_access))
        .fallback(not_found)
        .layer(middleware::from_fn(crate::metrics::metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );

    let router = match concurrency_limit {
        Some(limit) => router.layer(ConcurrencyLimitLayer::new(limit)),
        None => router,
    };

    let router = router.layer(
        ServiceBuilder::new()
            .layer(HandleErrorLayer::new(handle_timeout_error))
            .layer(TimeoutLayer::new(request_timeout)),
    );

    router.with_state(state)
}

/// Serves the API until shutdown, then drains telemetry (bounded).
///
/// # Errors
///
/// Returns an error when the listen address cannot be bound.
pub async fn serve(state: Arc<AppState>) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", state.config.host, state.config.port)
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid listen address: {e}"))?;

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(addr = %addr, "waypost listening");

    let app = router(Arc::clone(&state));
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    state.telemetry.stop().await;
    tracing::info!("waypost shut down cleanly");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to install shutdown signal handler");
    }
}

/// Health endpoint with catalog, cache and telemetry counters.
///
/// GET /health
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses((status = 200, description = "Service health", body = HealthResponse))
)]
pub(crate) async fn health(
    axum::extract::State(state): axum::extract::State<Arc<AppState>>,
) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        catalog: state.registry.snapshot().stats(),
        cache_size: state.resolver.cache().len(),
        telemetry: state.telemetry.stats(),
        audit_dropped: state.registry.audit_dropped(),
    })
}

/// Prometheus exposition, optionally gated by a shared secret.
///
/// GET /metrics
pub(crate) async fn metrics_endpoint(
    ctx: CallerContext,
    axum::extract::State(state): axum::extract::State<Arc<AppState>>,
    headers: axum::http::HeaderMap,
) -> Result<String, ApiError> {
    if let Some(secret) = state.config.metrics_secret.as_deref() {
        let presented = headers
            .get("X-Metrics-Secret")
            .and_then(|v| v.to_str().ok());
        let bearer = headers
            .get("Authorization")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "));
        if presented != Some(secret) && bearer != Some(secret) {
            return Err(ApiError::forbidden("metrics secret required")
                .with_request_id(ctx.request_id));
        }
    }
    Ok(crate::metrics::prometheus_handle()
        .map(|handle| handle.render())
        .unwrap_or_default())
}

async fn not_found(uri: axum::extract::OriginalUri) -> ApiError {
    ApiError::not_found(format!("not found: {}", uri.0.path()))
}

async fn handle_timeout_error(
    _err: tower::BoxError,
) -> (StatusCode, Json<ApiErrorBody>) {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(ApiErrorBody {
            code: "SERVICE_UNAVAILABLE".to_string(),
            message: "request timed out".to_string(),
            request_id: None,
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn router_builds_with_default_config() {
        let state = Arc::new(AppState::with_tracing_sink(
            Config::default(),
            Vec::new(),
            AuthTokens::fixed("s", "a"),
        ));
        let _router = router(state);
    }

    #[tokio::test]
    async fn router_builds_with_concurrency_limit() {
        let config = Config {
            concurrency_limit: Some(64),
            ..Config::default()
        };
        let state = Arc::new(AppState::with_tracing_sink(
            config,
            Vec::new(),
            AuthTokens::fixed("s", "a"),
        ));
        let _router = router(state);
    }
}
