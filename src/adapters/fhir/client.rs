//! Document server submission client
//!
//! Sends one resource or one transaction bundle per call and classifies the
//! response into a [`SubmissionOutcome`]. Requests are never retried.

use super::models::{synthesized_issue, OperationOutcome, ResourceBody, ResponseBundle};
use crate::config::{DocumentServerConfig, SecretString};
use crate::domain::{
    AssignedId, ClaimwrightError, EntryResult, Issue, PartialApplication, Result, ServerIds,
    Submission, SubmissionOutcome, TransactionPayload,
};
use crate::log_submission_outcome;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, ACCEPT, CONTENT_TYPE, LOCATION};
use reqwest::redirect::Policy;
use reqwest::{Client, ClientBuilder, StatusCode};
use secrecy::ExposeSecret;
use serde_json::Value;
use std::time::{Duration, Instant};
use tokio::sync::watch;

/// Anything that can take a submission to a document server
#[async_trait]
pub trait DocumentSubmitter: Send + Sync {
    /// Submits once and reports how it ended
    async fn submit(&self, submission: &Submission) -> SubmissionOutcome;

    /// Like [`submit`](Self::submit), but gives up with a transport failure
    /// as soon as `cancel` turns `true`
    async fn submit_cancellable(
        &self,
        submission: &Submission,
        cancel: &mut watch::Receiver<bool>,
    ) -> SubmissionOutcome {
        tokio::select! {
            biased;
            _ = cancelled(cancel) => {
                tracing::warn!(submission = %submission.label(), "Submission cancelled");
                SubmissionOutcome::TransportFailure("submission cancelled".to_string())
            }
            outcome = self.submit(submission) => outcome,
        }
    }
}

/// Follows 307/308 only, up to `max_redirects`
///
/// 301/302/303 would replay the POST as a bodiless GET, so they stop and the
/// redirect response itself is classified.
fn redirect_policy(max_redirects: usize) -> Policy {
    Policy::custom(move |attempt| match attempt.status() {
        StatusCode::TEMPORARY_REDIRECT | StatusCode::PERMANENT_REDIRECT => {
            if attempt.previous().len() > max_redirects {
                attempt.error(format!("exceeded the limit of {max_redirects} redirects"))
            } else {
                attempt.follow()
            }
        }
        _ => attempt.stop(),
    })
}

/// Resolves once the signal is `true`; never resolves if the sender is gone
async fn cancelled(cancel: &mut watch::Receiver<bool>) {
    loop {
        if *cancel.borrow_and_update() {
            return;
        }
        if cancel.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

/// HTTP client for a FHIR document server
///
/// # Example
///
/// ```no_run
/// use claimwright::adapters::fhir::{DocumentSubmitter, FhirSubmissionClient};
/// use claimwright::config::DocumentServerConfig;
///
/// # async fn example() -> claimwright::domain::Result<()> {
/// let config = DocumentServerConfig {
///     base_url: "https://fhir.example.org/r4".to_string(),
///     ..Default::default()
/// };
/// let client = FhirSubmissionClient::new(&config)?;
/// assert_eq!(client.base_url(), "https://fhir.example.org/r4");
/// # Ok(())
/// # }
/// ```
pub struct FhirSubmissionClient {
    base_url: String,
    client: Client,
    media_type: String,
    timeout: Duration,
    bearer_token: Option<SecretString>,
}

impl FhirSubmissionClient {
    /// Create a client from configuration
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the HTTP client cannot be built.
    pub fn new(config: &DocumentServerConfig) -> Result<Self> {
        let client = ClientBuilder::new()
            .timeout(config.timeout())
            .redirect(redirect_policy(config.max_redirects))
            .danger_accept_invalid_certs(!config.tls_verify)
            .build()
            .map_err(|e| {
                ClaimwrightError::Configuration(format!("Failed to build HTTP client: {e}"))
            })?;

        Ok(Self {
            base_url: config.normalized_base_url(),
            client,
            media_type: config.media_type.trim().to_ascii_lowercase(),
            timeout: config.timeout(),
            bearer_token: config.bearer_token.clone(),
        })
    }

    /// Base URL without a trailing slash
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, submission: &Submission) -> String {
        match submission.path() {
            "" => self.base_url.clone(),
            path => format!("{}/{}", self.base_url, path),
        }
    }

    async fn send(&self, submission: &Submission) -> SubmissionOutcome {
        let url = self.endpoint(submission);
        let body = match serde_json::to_vec(&submission.body()) {
            Ok(body) => body,
            Err(e) => {
                return SubmissionOutcome::TransportFailure(format!(
                    "failed to encode request body: {e}"
                ))
            }
        };

        let mut request = self
            .client
            .post(&url)
            .header(CONTENT_TYPE, self.media_type.as_str())
            .header(ACCEPT, self.media_type.as_str())
            .body(body);
        if let Some(token) = &self.bearer_token {
            request = request.bearer_auth(token.expose_secret().as_ref());
        }

        tracing::debug!(url = %url, submission = %submission.label(), "Sending submission");

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => return SubmissionOutcome::TransportFailure(self.describe_send_error(&e)),
        };

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = match response.bytes().await {
            Ok(bytes) => bytes,
            Err(e) => return SubmissionOutcome::TransportFailure(self.describe_send_error(&e)),
        };

        self.classify(submission, status, &headers, &bytes)
    }

    fn describe_send_error(&self, error: &reqwest::Error) -> String {
        if error.is_timeout() {
            format!("request timed out after {}s", self.timeout.as_secs())
        } else if error.is_redirect() {
            format!("too many redirects: {error}")
        } else if error.is_connect() {
            format!("connection failed: {error}")
        } else {
            format!("request failed: {error}")
        }
    }

    fn content_type_matches(&self, headers: &HeaderMap) -> bool {
        headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| {
                v.split(';')
                    .next()
                    .unwrap_or_default()
                    .trim()
                    .eq_ignore_ascii_case(&self.media_type)
            })
            .unwrap_or(false)
    }

    fn classify(
        &self,
        submission: &Submission,
        status: StatusCode,
        headers: &HeaderMap,
        body: &[u8],
    ) -> SubmissionOutcome {
        if status.is_server_error() {
            return SubmissionOutcome::TransportFailure(format!(
                "document server returned {status}"
            ));
        }
        if status.is_redirection() {
            let location = headers
                .get(LOCATION)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("none");
            return SubmissionOutcome::TransportFailure(format!(
                "document server redirected with {status} to {location}; \
                 only 307/308 redirects keep the request body"
            ));
        }
        if !status.is_success() && !status.is_client_error() {
            return SubmissionOutcome::TransportFailure(format!(
                "unexpected response status {status}"
            ));
        }

        let has_body = !body.iter().all(u8::is_ascii_whitespace);
        if has_body && !self.content_type_matches(headers) {
            let received = headers
                .get(CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("none");
            return SubmissionOutcome::TransportFailure(format!(
                "expected content type {} but received {received} (status {status})",
                self.media_type
            ));
        }

        let json: Option<Value> = if has_body {
            match serde_json::from_slice(body) {
                Ok(v) => Some(v),
                Err(e) => {
                    return SubmissionOutcome::TransportFailure(format!(
                        "response body is not valid JSON: {e}"
                    ))
                }
            }
        } else {
            None
        };

        if status.is_client_error() {
            return SubmissionOutcome::Rejected(rejection_issues(status, json.as_ref()));
        }

        let location = headers
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        match submission {
            Submission::Resource { .. } => accepted_single(json.as_ref(), location.as_deref()),
            Submission::Transaction(payload) => classify_transaction(payload, json.as_ref()),
        }
    }
}

#[async_trait]
impl DocumentSubmitter for FhirSubmissionClient {
    async fn submit(&self, submission: &Submission) -> SubmissionOutcome {
        let started = Instant::now();
        let outcome = self.send(submission).await;
        log_submission_outcome!(submission.label(), &outcome, started.elapsed());
        outcome
    }
}

fn rejection_issues(status: StatusCode, json: Option<&Value>) -> Vec<Issue> {
    let issues = json
        .and_then(OperationOutcome::from_value)
        .map(OperationOutcome::into_issues)
        .unwrap_or_default();
    if issues.is_empty() {
        vec![synthesized_issue(
            status.as_u16(),
            status.canonical_reason().unwrap_or("client error"),
        )]
    } else {
        issues
    }
}

fn accepted_single(json: Option<&Value>, location: Option<&str>) -> SubmissionOutcome {
    let from_body = json
        .and_then(|v| serde_json::from_value::<ResourceBody>(v.clone()).ok())
        .and_then(|b| b.assigned_id());
    let assigned = from_body.or_else(|| location.and_then(AssignedId::from_location));

    match assigned {
        Some(id) => SubmissionOutcome::Accepted(ServerIds { assigned: vec![id] }),
        None => SubmissionOutcome::TransportFailure(
            "document server accepted the resource but reported no id".to_string(),
        ),
    }
}

fn classify_transaction(payload: &TransactionPayload, json: Option<&Value>) -> SubmissionOutcome {
    let Some(bundle) = json.and_then(ResponseBundle::from_value) else {
        return SubmissionOutcome::TransportFailure(
            "transaction response is not a transaction-response Bundle".to_string(),
        );
    };

    if bundle.entry.len() != payload.len() {
        return SubmissionOutcome::TransportFailure(format!(
            "transaction response has {} entries for {} request entries",
            bundle.entry.len(),
            payload.len()
        ));
    }

    let mut results = Vec::with_capacity(bundle.entry.len());
    let mut assigned = Vec::with_capacity(bundle.entry.len());
    for (index, (entry, request)) in bundle.entry.iter().zip(payload.entries()).enumerate() {
        let Some(response) = &entry.response else {
            return SubmissionOutcome::TransportFailure(format!(
                "transaction response entry #{index} has no response"
            ));
        };
        let Some(status) = response.status_code() else {
            return SubmissionOutcome::TransportFailure(format!(
                "transaction response entry #{index} has unreadable status '{}'",
                response.status
            ));
        };

        let result = EntryResult {
            index,
            resource_type: Some(request.resource_type),
            status,
            location: response.location.clone(),
            issues: response.issues(),
        };

        if result.succeeded() {
            let id = response
                .location
                .as_deref()
                .and_then(AssignedId::from_location)
                .or_else(|| {
                    entry
                        .resource
                        .as_ref()
                        .and_then(|r| serde_json::from_value::<ResourceBody>(r.clone()).ok())
                        .and_then(|b| b.assigned_id())
                });
            match id {
                Some(id) => assigned.push(id),
                None => {
                    return SubmissionOutcome::TransportFailure(format!(
                        "transaction response entry #{index} succeeded without a location"
                    ))
                }
            }
        }
        results.push(result);
    }

    let applied = results.iter().filter(|r| r.succeeded()).count();
    if applied == results.len() {
        SubmissionOutcome::Accepted(ServerIds { assigned })
    } else if applied == 0 {
        let issues = results
            .iter()
            .flat_map(|r| {
                if r.issues.is_empty() {
                    vec![synthesized_issue(
                        r.status,
                        &format!("transaction entry #{} was not applied", r.index),
                    )]
                } else {
                    r.issues.clone()
                }
            })
            .collect();
        SubmissionOutcome::Rejected(issues)
    } else {
        SubmissionOutcome::PartiallyApplied(PartialApplication { entries: results })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BundleEntry, ResourceType, SyntheticId};
    use serde_json::json;
    use uuid::Uuid;

    fn client() -> FhirSubmissionClient {
        FhirSubmissionClient::new(&DocumentServerConfig {
            base_url: "http://localhost:9/fhir/".to_string(),
            ..Default::default()
        })
        .unwrap()
    }

    fn payload(types: &[ResourceType]) -> TransactionPayload {
        TransactionPayload::from_entries(
            types
                .iter()
                .enumerate()
                .map(|(i, rt)| {
                    BundleEntry::create(
                        SyntheticId::from_uuid(Uuid::from_u128(i as u128 + 1)),
                        *rt,
                        json!({"resourceType": rt.as_str()}),
                    )
                })
                .collect(),
        )
    }

    #[test]
    fn test_endpoints() {
        let client = client();
        assert_eq!(client.base_url(), "http://localhost:9/fhir");
        let single = Submission::Resource {
            resource_type: ResourceType::Claim,
            document: json!({}),
        };
        assert_eq!(client.endpoint(&single), "http://localhost:9/fhir/Claim");
        let tx = Submission::Transaction(payload(&[]));
        assert_eq!(client.endpoint(&tx), "http://localhost:9/fhir");
    }

    #[test]
    fn test_single_accepted_from_location_only() {
        let outcome = accepted_single(None, Some("http://x/fhir/Claim/77/_history/1"));
        match outcome {
            SubmissionOutcome::Accepted(ids) => {
                assert_eq!(ids.id_for(ResourceType::Claim), Some("77"))
            }
            other => panic!("expected Accepted, got {other:?}"),
        }
    }

    #[test]
    fn test_transaction_mixed_is_partial() {
        let payload = payload(&[ResourceType::Encounter, ResourceType::Claim]);
        let body = json!({
            "resourceType": "Bundle",
            "type": "transaction-response",
            "entry": [
                {"response": {"status": "201 Created", "location": "Encounter/e1/_history/1"}},
                {"response": {"status": "422 Unprocessable Entity"}}
            ]
        });
        match classify_transaction(&payload, Some(&body)) {
            SubmissionOutcome::PartiallyApplied(partial) => {
                assert_eq!(partial.applied().count(), 1);
                assert_eq!(partial.failed().next().unwrap().index, 1);
            }
            other => panic!("expected PartiallyApplied, got {other:?}"),
        }
    }

    #[test]
    fn test_transaction_none_applied_is_rejected() {
        let payload = payload(&[ResourceType::Claim]);
        let body = json!({
            "resourceType": "Bundle",
            "type": "transaction-response",
            "entry": [{"response": {"status": "400 Bad Request"}}]
        });
        match classify_transaction(&payload, Some(&body)) {
            SubmissionOutcome::Rejected(issues) => {
                assert_eq!(issues.len(), 1);
                assert!(issues[0].diagnostics.as_deref().unwrap().contains("#0"));
            }
            other => panic!("expected Rejected, got {other:?}"),
        }
    }

    #[test]
    fn test_transaction_entry_count_mismatch() {
        let payload = payload(&[ResourceType::Encounter, ResourceType::Claim]);
        let body = json!({
            "resourceType": "Bundle",
            "type": "transaction-response",
            "entry": [{"response": {"status": "201 Created", "location": "Claim/1"}}]
        });
        assert!(matches!(
            classify_transaction(&payload, Some(&body)),
            SubmissionOutcome::TransportFailure(_)
        ));
    }

    #[test]
    fn test_rejection_without_outcome_synthesizes_issue() {
        let issues = rejection_issues(StatusCode::BAD_REQUEST, Some(&json!({"error": "bad"})));
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].code, "processing");
        assert!(issues[0].diagnostics.as_deref().unwrap().contains("400"));
    }

    #[tokio::test]
    async fn test_cancellation_before_send() {
        let client = client();
        let (tx, mut rx) = watch::channel(false);
        tx.send(true).unwrap();
        let submission = Submission::Resource {
            resource_type: ResourceType::Claim,
            document: json!({"resourceType": "Claim"}),
        };
        let outcome = client.submit_cancellable(&submission, &mut rx).await;
        assert_eq!(
            outcome,
            SubmissionOutcome::TransportFailure("submission cancelled".to_string())
        );
    }
}
