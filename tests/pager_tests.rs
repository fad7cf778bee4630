// Pagination and retry behaviour of the audit feed client, driven through a
// scripted transport so no network is involved.

mod common;

use cato_audit_feed::audit_api::{AuditApiClient, RetryPolicy};
use cato_audit_feed::ExportError;
use common::{page, records, ScriptedTransport};
use serde_json::json;

const ENDPOINT: &str = "https://api.example.test/graphql2";

fn client(transport: &ScriptedTransport, max_retries: u32) -> AuditApiClient<&ScriptedTransport> {
    AuditApiClient::new(transport, ENDPOINT, "test-key")
        .with_retry_policy(RetryPolicy::immediate(max_retries))
}

#[tokio::test]
async fn test_collects_every_page_in_order() {
    let transport = ScriptedTransport::new()
        .respond_json(page(records(0, 2), "m1", true))
        .respond_json(page(records(2, 2), "m2", true))
        .respond_json(page(records(4, 2), "m3", true))
        .respond_json(page(vec![], "m3", false));

    let client = client(&transport, 5);
    let all = client
        .pager("4242", "last.P1D")
        .collect_records()
        .await
        .unwrap();

    let ids: Vec<&str> = all
        .iter()
        .map(|r| r["event.id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, ["0", "1", "2", "3", "4", "5"]);
    assert_eq!(transport.calls(), 4);
    assert_eq!(client.api_calls(), 4);
}

#[tokio::test]
async fn test_marker_is_threaded_through_requests() {
    let transport = ScriptedTransport::new()
        .respond_json(page(records(0, 1), "abc", true))
        .respond_json(page(records(1, 1), "def", false));

    let client = client(&transport, 5);
    client
        .pager("4242", "last.P2D")
        .collect_records()
        .await
        .unwrap();

    let variables = transport.variables();
    assert_eq!(variables[0]["marker"], "");
    assert_eq!(variables[1]["marker"], "abc");
    assert_eq!(variables[0]["accountIDs"], json!(["4242"]));
    assert_eq!(variables[0]["timeFrame"], "last.P2D");
}

#[tokio::test]
async fn test_request_carries_api_key() {
    let transport = ScriptedTransport::new().respond_json(page(vec![], "", false));

    let client = client(&transport, 0);
    client.pager("4242", "last.P1D").collect_records().await.unwrap();

    let request = &transport.requests()[0];
    assert_eq!(request.url, ENDPOINT);
    assert_eq!(request.method, reqwest::Method::POST);
    assert!(request
        .headers
        .iter()
        .any(|(name, value)| name == "x-api-key" && value == "test-key"));
}

#[tokio::test]
async fn test_event_timestamp_is_injected() {
    let transport = ScriptedTransport::new().respond_json(page(records(7, 1), "", false));

    let client = client(&transport, 0);
    let all = client
        .pager("4242", "last.P1D")
        .collect_records()
        .await
        .unwrap();

    assert_eq!(all[0]["event_timestamp"], json!(1_700_000_000_007_i64));
}

#[tokio::test]
async fn test_rate_limits_within_bound_succeed() {
    let transport = ScriptedTransport::new()
        .rate_limited(4)
        .respond_json(page(records(0, 3), "", false));

    let client = client(&transport, 5);
    let all = client
        .pager("4242", "last.P1D")
        .collect_records()
        .await
        .unwrap();

    assert_eq!(all.len(), 3);
    assert_eq!(transport.calls(), 5);
}

#[tokio::test]
async fn test_rate_limit_exhaustion() {
    let transport = ScriptedTransport::new().rate_limited(6);

    let client = client(&transport, 5);
    let err = client
        .pager("4242", "last.P1D")
        .collect_records()
        .await
        .unwrap_err();

    assert!(matches!(err, ExportError::RateLimit { attempts: 6, .. }));
    assert!(err.is_retry_exhausted());
    assert_eq!(transport.calls(), 6);
}

#[tokio::test]
async fn test_graphql_rate_limit_is_retried() {
    let transport = ScriptedTransport::new()
        .respond_json(json!({"errors": [{"message": "rate limit for operation: auditFeed"}]}))
        .respond_json(page(records(0, 1), "", false));

    let client = client(&transport, 5);
    let all = client
        .pager("4242", "last.P1D")
        .collect_records()
        .await
        .unwrap();

    assert_eq!(all.len(), 1);
    assert_eq!(transport.calls(), 2);
}

#[tokio::test]
async fn test_transient_failures_are_retried() {
    let transport = ScriptedTransport::new()
        .respond(503, "unavailable")
        .fail("connection reset")
        .respond_json(page(records(0, 2), "", false));

    let client = client(&transport, 5);
    let all = client
        .pager("4242", "last.P1D")
        .collect_records()
        .await
        .unwrap();

    assert_eq!(all.len(), 2);
    assert_eq!(transport.calls(), 3);
}

#[tokio::test]
async fn test_transient_exhaustion_reports_last_failure() {
    let transport = ScriptedTransport::new()
        .respond(502, "bad gateway")
        .respond(502, "bad gateway")
        .respond(502, "bad gateway");

    let client = client(&transport, 2);
    let err = client
        .fetch_audit_page("4242", "last.P1D", None)
        .await
        .unwrap_err();

    match err {
        ExportError::TransientNetwork {
            attempts, status, ..
        } => {
            assert_eq!(attempts, 3);
            assert_eq!(status, Some(502));
        }
        other => panic!("expected TransientNetwork, got {other:?}"),
    }
}

#[tokio::test]
async fn test_unauthorized_is_not_retried() {
    let transport = ScriptedTransport::new()
        .respond(401, "invalid key")
        .respond_json(page(records(0, 1), "", false));

    let client = client(&transport, 5);
    let err = client
        .pager("4242", "last.P1D")
        .collect_records()
        .await
        .unwrap_err();

    assert!(matches!(err, ExportError::Authorization { status: 401, .. }));
    assert_eq!(transport.calls(), 1);
}

#[tokio::test]
async fn test_malformed_payload() {
    let transport = ScriptedTransport::new()
        .respond_json(json!({"data": {"auditFeed": {"marker": "x", "accounts": []}}}));

    let client = client(&transport, 5);
    let err = client
        .fetch_audit_page("4242", "last.P1D", None)
        .await
        .unwrap_err();

    assert!(matches!(err, ExportError::MalformedResponse { .. }));
    assert_eq!(transport.calls(), 1);
}

#[tokio::test]
async fn test_has_more_without_marker_fails() {
    let transport = ScriptedTransport::new().respond_json(page(records(0, 1), "", true));

    let client = client(&transport, 5);
    let mut pager = client.pager("4242", "last.P1D");
    let err = pager.next_page().await.unwrap_err();

    assert!(matches!(err, ExportError::MalformedResponse { .. }));
    assert!(pager.is_finished());
    assert!(pager.next_page().await.unwrap().is_none());
}

#[tokio::test]
async fn test_stalled_marker_fails() {
    let transport = ScriptedTransport::new()
        .respond_json(page(records(0, 1), "same", true))
        .respond_json(page(vec![], "same", true));

    let client = client(&transport, 5);
    let err = client
        .pager("4242", "last.P1D")
        .collect_records()
        .await
        .unwrap_err();

    assert!(err.to_string().contains("stalled"));
    assert_eq!(transport.calls(), 2);
}

#[tokio::test]
async fn test_pager_counters() {
    let transport = ScriptedTransport::new()
        .respond_json(page(records(0, 3), "m1", true))
        .respond_json(page(records(3, 1), "m2", false));

    let client = client(&transport, 5);
    let mut pager = client.pager("4242", "last.P1D");

    let first = pager.next_page().await.unwrap().unwrap();
    assert_eq!(first.records.len(), 3);
    assert!(first.has_more);
    assert_eq!(pager.pages_fetched(), 1);

    pager.next_page().await.unwrap().unwrap();
    assert_eq!(pager.records_fetched(), 4);
    assert!(pager.is_finished());
    assert!(pager.next_page().await.unwrap().is_none());
    assert_eq!(transport.calls(), 2);
}
