//! `waypost` binary entrypoint.
//!
//! Loads configuration from environment variables, seeds the catalog
//! from the configured definition file and starts the HTTP server.
//! Exits non-zero on unrecoverable startup errors (malformed catalog,
//! port bind failure).

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]

use std::sync::Arc;

use anyhow::{Context, Result};

use waypost_api::auth::AuthTokens;
use waypost_api::config::Config;
use waypost_api::server::{AppState, serve};
use waypost_core::{LogFormat, init_logging};

fn choose_log_format(config: &Config) -> LogFormat {
    if config.debug {
        LogFormat::Pretty
    } else {
        LogFormat::Json
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;
    init_logging(choose_log_format(&config));
    let _metrics = waypost_api::metrics::init_metrics();

    let nodes = match config.catalog_file.as_deref() {
        Some(path) => waypost_catalog::load_catalog_file(path)
            .with_context(|| format!("loading catalog from {}", path.display()))?,
        None => {
            tracing::warn!("WAYPOST_CATALOG_FILE not set; starting with an empty catalog");
            Vec::new()
        }
    };

    let tokens = AuthTokens::from_config(&config);
    let state = Arc::new(AppState::with_tracing_sink(config, nodes, tokens));

    let errors = state.registry.validate_successors();
    for error in &errors {
        tracing::warn!(error = %error, "successor validation warning at startup");
    }

    serve(state).await
}
