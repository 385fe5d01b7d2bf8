//! Shared helpers for router-level tests.

// Each test binary uses a different subset of these helpers.
#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use tower::ServiceExt;

use waypost_api::auth::AuthTokens;
use waypost_api::config::Config;
use waypost_api::server::{AppState, router};
use waypost_catalog::parse_catalog_yaml;
use waypost_core::telemetry::MemorySink;

pub const SUBMIT_TOKEN: &str = "submit-test-token";
pub const APPROVE_TOKEN: &str = "approve-test-token";

/// The seeded catalog used across the router tests.
pub const SAMPLE_CATALOG: &str = r##"
prices:
  ownership:
    accountable_owner: prices-governance@firm.com
prices.equity:
  display_name: Equity prices
  description: End-of-day equity prices
  tags: [prices, equity]
  ownership:
    support_channel: "#equity-help"
  source_binding:
    type: snowflake
    config:
      account: acme.eu-west-1
      database: MARKET
      query: "SELECT s,p FROM E WHERE {filter[0]:symbol} AND trade_date = {version_date}"
rates.libor/usd:
  status: deprecated
  deprecation_message: LIBOR has ceased
  successor: rates.sofr/usd
  source_binding:
    type: snowflake
    config:
      query: "SELECT * FROM libor"
rates.sofr/usd:
  source_binding:
    type: snowflake
    config:
      query: "SELECT * FROM sofr"
fx.spot:
  description: Spot FX rates, no binding yet
"##;

/// Builds a router over the sample catalog with fixed lane tokens and a
/// capture sink. Must run inside a tokio runtime.
pub fn seeded_app() -> (Router, Arc<AppState>, Arc<MemorySink>) {
    app_with_catalog(SAMPLE_CATALOG)
}

/// Builds a router over an arbitrary catalog definition.
pub fn app_with_catalog(definition: &str) -> (Router, Arc<AppState>, Arc<MemorySink>) {
    let nodes = parse_catalog_yaml(definition).expect("sample catalog parses");
    let sink = Arc::new(MemorySink::new());
    let state = Arc::new(AppState::new(
        Config::default(),
        nodes,
        AuthTokens::fixed(SUBMIT_TOKEN, APPROVE_TOKEN),
        sink.clone(),
    ));
    (router(Arc::clone(&state)), state, sink)
}

/// Sends a GET request and returns status, headers and parsed body.
pub async fn get(
    app: &Router,
    uri: &str,
) -> (StatusCode, axum::http::HeaderMap, serde_json::Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(uri)
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("request succeeds");
    split(response).await
}

/// Sends a JSON request with an optional bearer token.
pub async fn send_json(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: serde_json::Value,
) -> (StatusCode, axum::http::HeaderMap, serde_json::Value) {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let response = app
        .clone()
        .oneshot(
            builder
                .body(Body::from(body.to_string()))
                .expect("request builds"),
        )
        .await
        .expect("request succeeds");
    split(response).await
}

async fn split(
    response: axum::response::Response,
) -> (StatusCode, axum::http::HeaderMap, serde_json::Value) {
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body reads");
    let value = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null)
    };
    (status, headers, value)
}
