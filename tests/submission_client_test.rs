//! Integration tests for the document server submission client
//!
//! A mockito server stands in for the FHIR server; the timeout test uses a
//! raw listener that accepts connections and never answers.

mod common;

use claimwright::adapters::fhir::{DocumentSubmitter, FhirSubmissionClient};
use claimwright::config::DocumentServerConfig;
use claimwright::domain::{IssueSeverity, ResourceType, Submission, SubmissionOutcome};
use mockito::Matcher;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use test_case::test_case;
use tokio::net::TcpListener;

const FHIR_JSON: &str = "application/fhir+json";

fn client_for(base_url: &str, timeout_seconds: u64) -> FhirSubmissionClient {
    FhirSubmissionClient::new(&DocumentServerConfig {
        base_url: base_url.to_string(),
        timeout_seconds,
        ..Default::default()
    })
    .unwrap()
}

fn claim_submission() -> Submission {
    Submission::Resource {
        resource_type: ResourceType::Claim,
        document: json!({
            "resourceType": "Claim",
            "patient": {"reference": "Patient/p-1"},
            "total": {"value": 39.1, "currency": "AUD"}
        }),
    }
}

/// Encounter and claim against existing parties
fn transaction() -> Submission {
    common::transaction_submission(&common::existing_parties())
}

#[tokio::test]
async fn test_created_claim_is_accepted() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/Claim")
        .match_header("content-type", FHIR_JSON)
        .match_header("accept", FHIR_JSON)
        .match_body(Matcher::PartialJson(json!({"resourceType": "Claim"})))
        .with_status(201)
        .with_header("content-type", "application/fhir+json; charset=utf-8")
        .with_body(r#"{"resourceType":"Claim","id":"c-100","meta":{"versionId":"1"}}"#)
        .expect(1)
        .create_async()
        .await;

    let outcome = client_for(&server.url(), 5).submit(&claim_submission()).await;

    mock.assert_async().await;
    match outcome {
        SubmissionOutcome::Accepted(ids) => {
            assert_eq!(ids.id_for(ResourceType::Claim), Some("c-100"));
            assert_eq!(ids.assigned[0].version.as_deref(), Some("1"));
        }
        other => panic!("expected Accepted, got {other:?}"),
    }
}

#[tokio::test]
async fn test_bearer_token_is_sent() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/Claim")
        .match_header("authorization", "Bearer tok-1")
        .with_status(201)
        .with_header("content-type", FHIR_JSON)
        .with_body(r#"{"resourceType":"Claim","id":"c-1"}"#)
        .create_async()
        .await;

    let client = FhirSubmissionClient::new(&DocumentServerConfig {
        base_url: server.url(),
        bearer_token: Some(claimwright::config::secret_string("tok-1".to_string())),
        ..Default::default()
    })
    .unwrap();

    assert!(client.submit(&claim_submission()).await.is_accepted());
    mock.assert_async().await;
}

#[tokio::test]
async fn test_validation_failure_is_rejected_verbatim() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/Claim")
        .with_status(422)
        .with_header("content-type", FHIR_JSON)
        .with_body(
            json!({
                "resourceType": "OperationOutcome",
                "issue": [
                    {
                        "severity": "error",
                        "code": "required",
                        "diagnostics": "Claim.insurance: minimum required = 1",
                        "expression": ["Claim.insurance"]
                    },
                    {
                        "severity": "warning",
                        "code": "business-rule",
                        "diagnostics": "Provider is not registered for this item"
                    }
                ]
            })
            .to_string(),
        )
        .create_async()
        .await;

    let outcome = client_for(&server.url(), 5).submit(&claim_submission()).await;

    match outcome {
        SubmissionOutcome::Rejected(issues) => {
            assert_eq!(issues.len(), 2);
            assert_eq!(issues[0].severity, IssueSeverity::Error);
            assert_eq!(issues[0].code, "required");
            assert_eq!(
                issues[0].diagnostics.as_deref(),
                Some("Claim.insurance: minimum required = 1")
            );
            assert_eq!(issues[1].severity, IssueSeverity::Warning);
        }
        other => panic!("expected Rejected, got {other:?}"),
    }
}

#[tokio::test]
async fn test_client_error_without_outcome_gets_synthesized_issue() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/Claim")
        .with_status(400)
        .create_async()
        .await;

    let outcome = client_for(&server.url(), 5).submit(&claim_submission()).await;

    match outcome {
        SubmissionOutcome::Rejected(issues) => {
            assert_eq!(issues.len(), 1);
            assert_eq!(issues[0].code, "processing");
        }
        other => panic!("expected Rejected, got {other:?}"),
    }
}

#[tokio::test]
async fn test_wrong_content_type_is_transport_failure() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/Claim")
        .with_status(201)
        .with_header("content-type", "text/html")
        .with_body("<html>proxy login</html>")
        .create_async()
        .await;

    let outcome = client_for(&server.url(), 5).submit(&claim_submission()).await;

    match outcome {
        SubmissionOutcome::TransportFailure(message) => {
            assert!(message.contains("text/html"), "{message}");
        }
        other => panic!("expected TransportFailure, got {other:?}"),
    }
}

#[tokio::test]
async fn test_server_error_is_transport_failure_and_not_retried() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/Claim")
        .with_status(503)
        .with_header("content-type", FHIR_JSON)
        .with_body(r#"{"resourceType":"OperationOutcome","issue":[]}"#)
        .expect(1)
        .create_async()
        .await;

    let outcome = client_for(&server.url(), 5).submit(&claim_submission()).await;

    mock.assert_async().await;
    assert!(matches!(outcome, SubmissionOutcome::TransportFailure(_)));
}

#[tokio::test]
async fn test_accepted_without_id_is_transport_failure() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/Claim")
        .with_status(201)
        .create_async()
        .await;

    let outcome = client_for(&server.url(), 5).submit(&claim_submission()).await;
    assert!(matches!(outcome, SubmissionOutcome::TransportFailure(_)));
}

#[tokio::test]
async fn test_location_header_supplies_id() {
    let mut server = mockito::Server::new_async().await;
    let location = format!("{}/Claim/c-55/_history/1", server.url());
    server
        .mock("POST", "/Claim")
        .with_status(201)
        .with_header("location", &location)
        .create_async()
        .await;

    let outcome = client_for(&server.url(), 5).submit(&claim_submission()).await;
    match outcome {
        SubmissionOutcome::Accepted(ids) => {
            assert_eq!(ids.id_for(ResourceType::Claim), Some("c-55"))
        }
        other => panic!("expected Accepted, got {other:?}"),
    }
}

#[test_case(307 ; "temporary redirect")]
#[test_case(308 ; "permanent redirect")]
#[tokio::test]
async fn test_body_preserving_redirect_is_followed(status: usize) {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/Claim")
        .with_status(status)
        .with_header("location", &format!("{}/moved/Claim", server.url()))
        .expect(1)
        .create_async()
        .await;
    let moved = server
        .mock("POST", "/moved/Claim")
        .match_body(Matcher::PartialJson(json!({"resourceType": "Claim"})))
        .with_status(201)
        .with_header("content-type", FHIR_JSON)
        .with_body(r#"{"resourceType":"Claim","id":"c-r"}"#)
        .expect(1)
        .create_async()
        .await;

    let outcome = client_for(&server.url(), 5).submit(&claim_submission()).await;

    moved.assert_async().await;
    match outcome {
        SubmissionOutcome::Accepted(ids) => {
            assert_eq!(ids.id_for(ResourceType::Claim), Some("c-r"))
        }
        other => panic!("expected Accepted, got {other:?}"),
    }
}

#[test_case(301 ; "moved permanently")]
#[test_case(302 ; "found")]
#[test_case(303 ; "see other")]
#[tokio::test]
async fn test_body_dropping_redirect_is_not_followed(status: usize) {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/Claim")
        .with_status(status)
        .with_header("location", &format!("{}/moved/Claim", server.url()))
        .create_async()
        .await;
    let moved_post = server
        .mock("POST", "/moved/Claim")
        .expect(0)
        .create_async()
        .await;
    let moved_get = server
        .mock("GET", "/moved/Claim")
        .expect(0)
        .create_async()
        .await;

    let outcome = client_for(&server.url(), 5).submit(&claim_submission()).await;

    moved_post.assert_async().await;
    moved_get.assert_async().await;
    match outcome {
        SubmissionOutcome::TransportFailure(message) => {
            assert!(message.contains(&status.to_string()), "{message}");
            assert!(message.contains("/moved/Claim"), "{message}");
        }
        other => panic!("expected TransportFailure, got {other:?}"),
    }
}

#[tokio::test]
async fn test_redirect_chain_beyond_limit_is_transport_failure() {
    let mut server = mockito::Server::new_async().await;
    let hops = ["/Claim", "/hop/1", "/hop/2", "/hop/3"];
    for pair in hops.windows(2) {
        server
            .mock("POST", pair[0])
            .with_status(307)
            .with_header("location", &format!("{}{}", server.url(), pair[1]))
            .create_async()
            .await;
    }
    let last = server
        .mock("POST", "/hop/3")
        .with_status(201)
        .with_header("content-type", FHIR_JSON)
        .with_body(r#"{"resourceType":"Claim","id":"c-far"}"#)
        .expect(0)
        .create_async()
        .await;

    let client = FhirSubmissionClient::new(&DocumentServerConfig {
        base_url: server.url(),
        max_redirects: 2,
        ..Default::default()
    })
    .unwrap();
    let outcome = client.submit(&claim_submission()).await;

    last.assert_async().await;
    match outcome {
        SubmissionOutcome::TransportFailure(message) => {
            assert!(message.contains("too many redirects"), "{message}");
        }
        other => panic!("expected TransportFailure, got {other:?}"),
    }
}

#[tokio::test]
async fn test_transaction_posts_bundle_to_base() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/")
        .match_body(Matcher::PartialJson(
            json!({"resourceType": "Bundle", "type": "transaction"}),
        ))
        .with_status(200)
        .with_header("content-type", FHIR_JSON)
        .with_body(
            json!({
                "resourceType": "Bundle",
                "type": "transaction-response",
                "entry": [
                    {"response": {"status": "201 Created", "location": "Encounter/e-1/_history/1"}},
                    {"response": {"status": "201 Created", "location": "Claim/c-1/_history/1"}}
                ]
            })
            .to_string(),
        )
        .create_async()
        .await;

    let outcome = client_for(&server.url(), 5)
        .submit(&transaction())
        .await;

    mock.assert_async().await;
    match outcome {
        SubmissionOutcome::Accepted(ids) => {
            assert_eq!(ids.id_for(ResourceType::Encounter), Some("e-1"));
            assert_eq!(ids.id_for(ResourceType::Claim), Some("c-1"));
        }
        other => panic!("expected Accepted, got {other:?}"),
    }
}

#[tokio::test]
async fn test_transaction_with_failed_entry_is_partial() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/")
        .with_status(200)
        .with_header("content-type", FHIR_JSON)
        .with_body(
            json!({
                "resourceType": "Bundle",
                "type": "transaction-response",
                "entry": [
                    {"response": {"status": "201 Created", "location": "Encounter/e-1"}},
                    {"response": {
                        "status": "422 Unprocessable Entity",
                        "outcome": {
                            "resourceType": "OperationOutcome",
                            "issue": [{"severity": "error", "code": "invalid", "diagnostics": "bad item"}]
                        }
                    }}
                ]
            })
            .to_string(),
        )
        .create_async()
        .await;

    let outcome = client_for(&server.url(), 5)
        .submit(&transaction())
        .await;

    match outcome {
        SubmissionOutcome::PartiallyApplied(partial) => {
            assert_eq!(partial.applied().count(), 1);
            let failed: Vec<_> = partial.failed().collect();
            assert_eq!(failed.len(), 1);
            assert_eq!(failed[0].index, 1);
            assert_eq!(failed[0].resource_type, Some(ResourceType::Claim));
            assert_eq!(failed[0].issues[0].diagnostics.as_deref(), Some("bad item"));
        }
        other => panic!("expected PartiallyApplied, got {other:?}"),
    }
}

#[tokio::test]
async fn test_unresponsive_server_times_out_after_one_attempt() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let connections = Arc::new(AtomicUsize::new(0));

    let counter = connections.clone();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            counter.fetch_add(1, Ordering::SeqCst);
            held.push(socket);
        }
    });

    let client = client_for(&format!("http://{addr}/fhir"), 1);
    let started = Instant::now();
    let outcome = client.submit(&claim_submission()).await;
    let elapsed = started.elapsed();

    match outcome {
        SubmissionOutcome::TransportFailure(message) => {
            assert!(message.contains("timed out"), "{message}");
        }
        other => panic!("expected TransportFailure, got {other:?}"),
    }
    assert!(elapsed >= Duration::from_millis(900), "{elapsed:?}");
    assert!(elapsed < Duration::from_secs(5), "{elapsed:?}");

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(connections.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_connection_refused_is_transport_failure() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let outcome = client_for(&format!("http://{addr}"), 2)
        .submit(&claim_submission())
        .await;
    assert!(matches!(outcome, SubmissionOutcome::TransportFailure(_)));
}
