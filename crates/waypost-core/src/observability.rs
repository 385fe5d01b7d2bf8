//! Observability infrastructure.
//!
//! Structured logging with consistent spans. Initialization helpers and
//! span constructors used across all Waypost components.

use std::sync::Once;
use tracing::Span;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

static INIT: Once = Once::new();

/// Log output format.
#[derive(Debug, Clone, Copy, Default)]
pub enum LogFormat {
    /// JSON structured logs (for production).
    Json,
    /// Pretty-printed logs (for development).
    #[default]
    Pretty,
}

/// Initializes the logging subsystem.
///
/// Call once at application startup. Safe to call multiple times;
/// subsequent calls are no-ops. Log levels come from `RUST_LOG`
/// (default `info`).
pub fn init_logging(format: LogFormat) {
    INIT.call_once(|| {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        match format {
            LogFormat::Json => {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(fmt::layer().json())
                    .init();
            }
            LogFormat::Pretty => {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(fmt::layer().pretty())
                    .init();
            }
        }
    });
}

/// Creates a span for resolution operations with standard fields.
#[must_use]
pub fn resolve_span(operation: &str, moniker: &str, request_id: &str) -> Span {
    tracing::info_span!(
        "resolve",
        op = operation,
        moniker = moniker,
        request_id = request_id,
    )
}

/// Creates a span for governance operations.
#[must_use]
pub fn governance_span(operation: &str, path: &str, actor: &str) -> Span {
    tracing::info_span!(
        "governance",
        op = operation,
        path = path,
        actor = actor,
    )
}
