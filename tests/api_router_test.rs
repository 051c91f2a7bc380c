//! HTTP API tests
//!
//! Drives the axum router in-process with `oneshot`; submissions go to a
//! mockito document server.

mod common;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use claimwright::adapters::database::InMemoryClaimStore;
use claimwright::adapters::fhir::FhirSubmissionClient;
use claimwright::api::{router, AppState};
use claimwright::config::DocumentServerConfig;
use claimwright::core::ClaimOrchestrator;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

const FHIR_JSON: &str = "application/fhir+json";

fn app(base_url: &str) -> Router {
    let client = FhirSubmissionClient::new(&DocumentServerConfig {
        base_url: base_url.to_string(),
        timeout_seconds: 5,
        ..Default::default()
    })
    .unwrap();
    let orchestrator = ClaimOrchestrator::new(
        common::bundled_resolver(),
        Arc::new(client),
        Arc::new(InMemoryClaimStore::new()),
    );
    router(AppState::new(Arc::new(orchestrator)), true)
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<String>) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(body.map(Body::from).unwrap_or_else(Body::empty))
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

fn single_body(code: &str) -> String {
    json!({
        "items": [{"code": code}],
        "encounter_id": "enc-9",
        "patient": {"id": "p-1"},
        "practitioner": {"id": "d-1"}
    })
    .to_string()
}

#[tokio::test]
async fn test_health_reports_backend() {
    let app = app("http://127.0.0.1:9");
    let (status, body) = send(&app, "GET", "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["records_backend"], "memory");
}

#[tokio::test]
async fn test_build_returns_preview() {
    let app = app("http://127.0.0.1:9");
    let request = json!({
        "items": [{"code": "36"}, {"code": "10990"}],
        "encounter": {"start": "2026-03-02T09:00:00Z"},
        "patient": {"name": "Alex Citizen"},
        "practitioner": {"id": "d-1"}
    });
    let (status, body) = send(&app, "POST", "/claim/build", Some(request.to_string())).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["form"], "transaction");
    assert_eq!(body["total"]["amount"], "83.05");
    assert_eq!(body["claim"]["resourceType"], "Claim");
    assert_eq!(body["bundle"]["type"], "transaction");
}

#[tokio::test]
async fn test_malformed_body_is_bad_request() {
    let app = app("http://127.0.0.1:9");
    let (status, body) = send(&app, "POST", "/claim/build", Some("{ nope".to_string())).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "validation");
}

#[tokio::test]
async fn test_empty_items_is_bad_request() {
    let app = app("http://127.0.0.1:9");
    let request = json!({"items": [], "encounter_id": "enc-9", "patient": {"id": "p-1"}, "practitioner": {"id": "d-1"}});
    let (status, body) = send(&app, "POST", "/claim/build", Some(request.to_string())).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "validation");
}

#[tokio::test]
async fn test_unknown_code_lists_missing_codes() {
    let app = app("http://127.0.0.1:9");
    let (status, body) = send(&app, "POST", "/claim/build", Some(single_body("99999"))).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["kind"], "metadata_not_found");
    assert_eq!(body["missing_codes"], json!(["99999"]));
}

#[tokio::test]
async fn test_submit_then_list_and_stats() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/Claim")
        .with_status(201)
        .with_header("content-type", FHIR_JSON)
        .with_body(r#"{"resourceType":"Claim","id":"c-100"}"#)
        .create_async()
        .await;
    let app = app(&server.url());

    let (status, body) = send(&app, "POST", "/claim/submit", Some(single_body("23"))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["record"]["server_claim_id"], "c-100");

    let (status, body) = send(&app, "GET", "/claim", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (_, body) = send(&app, "GET", "/claim/patient/p-1", None).await;
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (_, body) = send(&app, "GET", "/claim/patient/p-2", None).await;
    assert!(body.as_array().unwrap().is_empty());

    let (status, body) = send(&app, "GET", "/claim/stats", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_claims"], 1);
    assert_eq!(body["single_submissions"], 1);
}

#[tokio::test]
async fn test_rejection_is_unprocessable_with_issues() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/Claim")
        .with_status(422)
        .with_header("content-type", FHIR_JSON)
        .with_body(
            json!({
                "resourceType": "OperationOutcome",
                "issue": [{"severity": "error", "code": "invalid", "diagnostics": "Unknown encounter"}]
            })
            .to_string(),
        )
        .create_async()
        .await;
    let app = app(&server.url());

    let (status, body) = send(&app, "POST", "/claim/submit", Some(single_body("23"))).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["kind"], "rejected");
    assert_eq!(body["issues"][0]["diagnostics"], "Unknown encounter");
}

#[tokio::test]
async fn test_server_failure_is_bad_gateway() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/Claim")
        .with_status(503)
        .create_async()
        .await;
    let app = app(&server.url());

    let (status, body) = send(&app, "POST", "/claim/submit", Some(single_body("23"))).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["kind"], "transport_failure");

    let (_, body) = send(&app, "GET", "/claim", None).await;
    assert!(body.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_bundle_endpoint_refuses_existing_encounter() {
    let app = app("http://127.0.0.1:9");
    let (status, body) =
        send(&app, "POST", "/claim/bundle/submit", Some(single_body("23"))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "validation");
}

#[tokio::test]
async fn test_synthetic_party_without_demographics_is_bad_request() {
    let app = app("http://127.0.0.1:9");
    let request = json!({
        "items": [{"code": "23"}],
        "patient": {"id": "urn:uuid:7d44b88c-1b7e-4f4b-9a53-0e2f1c9d4a10"},
        "practitioner": {"id": "d-1"}
    });

    for uri in ["/claim/build", "/claim/bundle/submit"] {
        let (status, body) = send(&app, "POST", uri, Some(request.to_string())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(body["kind"], "validation", "{uri}");
    }
}

#[tokio::test]
async fn test_synthetic_party_with_demographics_is_created_under_its_id() {
    let app = app("http://127.0.0.1:9");
    let urn = "urn:uuid:7d44b88c-1b7e-4f4b-9a53-0e2f1c9d4a10";
    let request = json!({
        "items": [{"code": "23"}],
        "patient": {"id": urn, "name": "Alex Citizen"},
        "practitioner": {"id": "d-1"}
    });
    let (status, body) = send(&app, "POST", "/claim/build", Some(request.to_string())).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["bundle"]["entry"][0]["fullUrl"], urn);
    assert_eq!(body["bundle"]["entry"][0]["resource"]["resourceType"], "Patient");
    assert_eq!(body["claim"]["patient"]["reference"], urn);
}
