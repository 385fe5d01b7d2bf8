//! Router-level tests for the resolution surface.

mod common;

use axum::http::StatusCode;
use common::{get, seeded_app, send_json};
use serde_json::json;

#[tokio::test]
async fn resolves_symbol_and_date_version() {
    let (app, _state, _sink) = seeded_app();
    let (status, _headers, body) = get(&app, "/resolve/prices.equity/AAPL@20260115").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["source_type"], "snowflake");
    assert_eq!(
        body["query"],
        "SELECT s,p FROM E WHERE symbol = 'AAPL' AND trade_date = TO_DATE('20260115','YYYYMMDD')"
    );
    assert_eq!(body["path"], "prices.equity/AAPL");
    assert_eq!(body["binding_path"], "prices.equity");
    assert_eq!(body["connection"]["account"], "acme.eu-west-1");
    assert!(body["connection"].get("query").is_none());
    assert_eq!(body["read_only"], true);
}

#[tokio::test]
async fn resolves_all_segment_with_latest_version() {
    let (app, _state, _sink) = seeded_app();
    let (status, _headers, body) = get(&app, "/resolve/prices.equity/ALL@latest").await;

    assert_eq!(status, StatusCode::OK);
    let query = body["query"].as_str().expect("query present");
    assert!(query.contains("1=1"), "{query}");
    assert!(query.contains("'__LATEST__'"), "{query}");
}

#[tokio::test]
async fn deprecated_moniker_redirects_with_headers() {
    let (app, _state, _sink) = seeded_app();
    let (status, headers, body) = get(&app, "/resolve/rates.libor/usd").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["path"], "rates.libor/usd");
    assert_eq!(body["redirected_from"], "rates.libor/usd");
    assert_eq!(body["successor"], "rates.sofr/usd");
    assert_eq!(body["query"], "SELECT * FROM sofr");
    assert_eq!(body["status"], "DEPRECATED");
    assert_eq!(body["deprecation_message"], "LIBOR has ceased");

    assert_eq!(
        headers.get("x-moniker-deprecated").map(|v| v.to_str().unwrap()),
        Some("true")
    );
    assert_eq!(
        headers.get("x-moniker-successor").map(|v| v.to_str().unwrap()),
        Some("rates.sofr/usd")
    );
    assert_eq!(
        headers
            .get("x-moniker-redirected-from")
            .map(|v| v.to_str().unwrap()),
        Some("rates.libor/usd")
    );
}

#[tokio::test]
async fn active_resolution_has_no_deprecation_headers() {
    let (app, _state, _sink) = seeded_app();
    let (status, headers, _body) = get(&app, "/resolve/rates.sofr/usd").await;
    assert_eq!(status, StatusCode::OK);
    assert!(headers.get("x-moniker-deprecated").is_none());
    assert!(headers.get("x-moniker-successor").is_none());
}

#[tokio::test]
async fn invalid_moniker_is_400_with_stable_code() {
    let (app, _state, _sink) = seeded_app();
    let (status, _headers, body) = get(&app, "/resolve/NotADomain").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_MONIKER");
    assert!(body["message"].as_str().unwrap().contains("bad_domain"));
}

#[tokio::test]
async fn unknown_moniker_is_404() {
    let (app, _state, _sink) = seeded_app();
    let (status, _headers, body) = get(&app, "/resolve/does.not/exist").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn known_path_without_binding_is_404_no_binding() {
    let (app, _state, _sink) = seeded_app();
    let (status, _headers, body) = get(&app, "/resolve/fx.spot").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NO_BINDING");
}

#[tokio::test]
async fn moniker_query_params_pass_through_the_url() {
    let (app, _state, _sink) = seeded_app();
    let (status, _headers, body) =
        get(&app, "/resolve/prices.equity/AAPL@20260115?fields=px_last").await;
    assert_eq!(status, StatusCode::OK);
    let moniker = body["moniker"].as_str().unwrap();
    assert!(moniker.contains("fields=px_last"), "{moniker}");
}

#[tokio::test]
async fn batch_resolve_reports_partial_failures() {
    let (app, _state, _sink) = seeded_app();
    let (status, _headers, body) = send_json(
        &app,
        "POST",
        "/resolve/batch",
        None,
        json!({
            "monikers": [
                "prices.equity/AAPL@20260115",
                "does.not/exist",
                "rates.sofr/usd",
            ]
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 3);
    assert_eq!(body["succeeded"], 2);
    assert_eq!(body["failed"], 1);
    assert!(body["results"]["prices.equity/AAPL@20260115"]["query"].is_string());
    assert!(body["errors"]["does.not/exist"].is_string());
}

#[tokio::test]
async fn empty_batch_is_rejected() {
    let (app, _state, _sink) = seeded_app();
    let (status, _headers, _body) =
        send_json(&app, "POST", "/resolve/batch", None, json!({"monikers": []})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn resolve_emits_telemetry_to_the_sink() {
    let (app, state, sink) = seeded_app();
    let (status, _headers, _body) = get(&app, "/resolve/prices.equity/AAPL@20260115").await;
    assert_eq!(status, StatusCode::OK);

    state.telemetry.stop().await;
    let events = sink.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].moniker, "prices.equity/AAPL@20260115");
    assert_eq!(
        events[0].owner_at_access.as_deref(),
        Some("prices-governance@firm.com")
    );
}
