//! Router-level tests for governance: validated reload, request
//! workflow, status transitions, audit.

mod common;

use axum::http::StatusCode;
use common::{APPROVE_TOKEN, SUBMIT_TOKEN, get, seeded_app, send_json};
use serde_json::json;

/// The sample catalog minus `rates.libor/usd`, with the equity SQL text
/// changed: one removal plus one binding change, both breaking.
const BREAKING_CATALOG: &str = r##"
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
      query: "SELECT s,p,v FROM E_V2 WHERE {filter[0]:symbol}"
rates.sofr/usd:
  source_binding:
    type: snowflake
    config:
      query: "SELECT * FROM sofr"
fx.spot:
  description: Spot FX rates, no binding yet
"##;

#[tokio::test]
async fn blocked_reload_keeps_old_snapshot() {
    let (app, _state, _sink) = seeded_app();

    let (status, _headers, body) = send_json(
        &app,
        "POST",
        "/catalog/reload",
        Some(APPROVE_TOKEN),
        json!({"definition": BREAKING_CATALOG, "block_breaking": true, "actor": "reloader"}),
    )
    .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["applied"], false);
    assert_eq!(body["removed_count"], 1);
    assert_eq!(body["binding_changed_count"], 1);
    assert_eq!(body["has_breaking_changes"], true);

    // The registry stays on the old snapshot: the removed moniker still
    // resolves with the old SQL.
    let (status, _headers, body) = get(&app, "/resolve/rates.libor/usd").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["query"], "SELECT * FROM sofr");
    let (_, _, body) = get(&app, "/resolve/prices.equity/AAPL@20260115").await;
    assert!(body["query"].as_str().unwrap().contains("FROM E "));
}

#[tokio::test]
async fn unblocked_reload_applies_and_purges_the_cache() {
    let (app, _state, _sink) = seeded_app();

    // Populate the cache with the old binding.
    let (_, _, body) = get(&app, "/resolve/prices.equity/AAPL@20260115").await;
    assert!(body["query"].as_str().unwrap().contains("FROM E "));

    let (status, _headers, body) = send_json(
        &app,
        "POST",
        "/catalog/reload",
        Some(APPROVE_TOKEN),
        json!({"definition": BREAKING_CATALOG, "block_breaking": false, "actor": "reloader"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["applied"], true);
    assert_eq!(body["has_breaking_changes"], true);

    // Stale cache entries are gone; the new SQL is served.
    let (status, _headers, body) = get(&app, "/resolve/prices.equity/AAPL@20260115").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["query"].as_str().unwrap().contains("E_V2"));

    // The removed moniker no longer resolves.
    let (status, _headers, _body) = get(&app, "/resolve/rates.libor/usd").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn reload_reports_successor_warnings_without_reverting() {
    let (app, _state, _sink) = seeded_app();
    let definition = format!(
        "{}broken.old:\n  status: deprecated\n  successor: broken.nowhere\n",
        common::SAMPLE_CATALOG
    );
    let (status, _headers, body) = send_json(
        &app,
        "POST",
        "/catalog/reload",
        Some(APPROVE_TOKEN),
        json!({"definition": definition, "block_breaking": true}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["applied"], true);
    let warnings = body["successor_errors"].as_array().unwrap();
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].as_str().unwrap().contains("broken.nowhere"));
}

#[tokio::test]
async fn reload_requires_the_approve_token() {
    let (app, _state, _sink) = seeded_app();
    for token in [None, Some(SUBMIT_TOKEN), Some("wrong")] {
        let (status, _headers, body) = send_json(
            &app,
            "POST",
            "/catalog/reload",
            token,
            json!({"definition": common::SAMPLE_CATALOG}),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN, "token {token:?}");
        assert_eq!(body["code"], "FORBIDDEN");
    }
}

#[tokio::test]
async fn submit_then_approve_materializes_the_moniker() {
    let (app, _state, _sink) = seeded_app();

    let submission = json!({
        "path": "foo.bar/baz",
        "display_name": "Baz",
        "requester": {"name": "Dana Quant", "email": "dana@firm.com", "team": "credit"},
        "justification": "needed for the credit dashboard",
        "source_binding": {
            "type": "rest",
            "config": {"base_url": "https://api.firm.com", "path_template": "/baz/{path}"}
        }
    });

    // Submitting anonymously is forbidden.
    let (status, _headers, _body) =
        send_json(&app, "POST", "/requests", None, submission.clone()).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _headers, created) =
        send_json(&app, "POST", "/requests", Some(SUBMIT_TOKEN), submission).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["status"], "pending");
    let id = created["id"].as_str().unwrap().to_string();

    // The submit token cannot approve.
    let (status, _headers, body) = send_json(
        &app,
        "POST",
        &format!("/requests/{id}/approve"),
        Some(SUBMIT_TOKEN),
        json!({"actor": "dana@firm.com"}),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "FORBIDDEN");

    let (status, _headers, approved) = send_json(
        &app,
        "POST",
        &format!("/requests/{id}/approve"),
        Some(APPROVE_TOKEN),
        json!({"actor": "approver@firm.com"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(approved["status"], "approved");

    // The new moniker resolves immediately as ACTIVE.
    let (status, _headers, body) = get(&app, "/resolve/foo.bar/baz").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ACTIVE");
    assert_eq!(body["source_type"], "rest");
    assert_eq!(body["query"], "/baz/baz");

    // Approving twice conflicts.
    let (status, _headers, _body) = send_json(
        &app,
        "POST",
        &format!("/requests/{id}/approve"),
        Some(APPROVE_TOKEN),
        json!({}),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn reject_requires_a_reason() {
    let (app, _state, _sink) = seeded_app();
    let (_, _, created) = send_json(
        &app,
        "POST",
        "/requests",
        Some(SUBMIT_TOKEN),
        json!({"path": "foo.bar/qux", "requester": {"name": "D", "email": "d@firm.com"}}),
    )
    .await;
    let id = created["id"].as_str().unwrap();

    let (status, _headers, _body) = send_json(
        &app,
        "POST",
        &format!("/requests/{id}/reject"),
        Some(APPROVE_TOKEN),
        json!({}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _headers, rejected) = send_json(
        &app,
        "POST",
        &format!("/requests/{id}/reject"),
        Some(APPROVE_TOKEN),
        json!({"reason": "owner missing"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(rejected["status"], "rejected");
    assert_eq!(rejected["rejection_reason"], "owner missing");
}

#[tokio::test]
async fn request_listing_is_submit_lane_and_filterable() {
    let (app, _state, _sink) = seeded_app();
    let (_, _, _created) = send_json(
        &app,
        "POST",
        "/requests",
        Some(SUBMIT_TOKEN),
        json!({"path": "foo.bar/one", "requester": {"name": "D", "email": "d@firm.com"}}),
    )
    .await;

    let (status, _headers, _body) = get(&app, "/requests").await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _headers, body) = send_json(
        &app,
        "GET",
        "/requests?status=pending",
        Some(SUBMIT_TOKEN),
        json!(null),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn status_update_deprecates_with_metadata() {
    let (app, _state, _sink) = seeded_app();

    // The approve lane is required.
    let (status, _headers, _body) = send_json(
        &app,
        "PUT",
        "/catalog/prices.equity/status",
        Some(SUBMIT_TOKEN),
        json!({"status": "DEPRECATED", "actor": "governor"}),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _headers, node) = send_json(
        &app,
        "PUT",
        "/catalog/prices.equity/status",
        Some(APPROVE_TOKEN),
        json!({
            "status": "DEPRECATED",
            "actor": "governor",
            "reason": "superseded",
            "deprecation_message": "use prices.equity_v2",
            "successor": "rates.sofr/usd",
            "sunset_deadline": "2026-12-31",
            "migration_guide_url": "https://wiki/migrations/equity-v2"
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(node["status"], "DEPRECATED");
    assert_eq!(node["successor"], "rates.sofr/usd");
    assert_eq!(node["sunset_deadline"], "2026-12-31");

    // Illegal transition: DEPRECATED -> ACTIVE.
    let (status, _headers, body) = send_json(
        &app,
        "PUT",
        "/catalog/prices.equity/status",
        Some(APPROVE_TOKEN),
        json!({"status": "ACTIVE", "actor": "governor"}),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "CONFLICT");

    // Unknown path.
    let (status, _headers, _body) = send_json(
        &app,
        "PUT",
        "/catalog/no.such/status",
        Some(APPROVE_TOKEN),
        json!({"status": "ARCHIVED", "actor": "governor"}),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn audit_trail_is_queryable_per_path() {
    let (app, _state, _sink) = seeded_app();
    let (_, _, _node) = send_json(
        &app,
        "PUT",
        "/catalog/prices.equity/status",
        Some(APPROVE_TOKEN),
        json!({"status": "DEPRECATED", "actor": "governor", "reason": "superseded"}),
    )
    .await;

    let (status, _headers, body) = get(&app, "/catalog/prices.equity/audit").await;
    assert_eq!(status, StatusCode::OK);
    let entries = body.as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["kind"], "status_changed");
    assert_eq!(entries[0]["actor"], "governor");
    assert_eq!(entries[0]["before"], "ACTIVE");
    assert_eq!(entries[0]["after"], "DEPRECATED");
    assert_eq!(entries[0]["reason"], "superseded");
}
