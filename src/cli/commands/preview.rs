//! Preview command implementation
//!
//! Runs a claim request through resolution, building and assembly without
//! contacting the document server or any database, then prints the result.

use crate::adapters::catalog::{BundledCatalog, NoPrimaryCatalog};
use crate::adapters::database::InMemoryClaimStore;
use crate::adapters::fhir::FhirSubmissionClient;
use crate::config::{load_config, ClaimwrightConfig};
use crate::core::request::ClaimRequest;
use crate::core::{ClaimOrchestrator, MetadataResolver, PreviewOutcome};
use crate::domain::{ClaimwrightError, Currency, Result};
use clap::Args;
use std::fs;
use std::sync::Arc;

/// Arguments for the preview command
#[derive(Args, Debug)]
pub struct PreviewArgs {
    /// Path to a JSON claim request
    #[arg(short, long)]
    pub request: String,

    /// Print the whole transaction bundle instead of just the claim
    #[arg(long)]
    pub bundle: bool,
}

impl PreviewArgs {
    /// Execute the preview command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(request = %self.request, "Previewing claim request");

        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("❌ Configuration is invalid");
                eprintln!("   Error: {e}");
                return Ok(2);
            }
        };

        let orchestrator = match offline_orchestrator(&config) {
            Ok(o) => o,
            Err(e) => {
                eprintln!("❌ Bundled catalog does not match configuration");
                eprintln!("   Error: {e}");
                return Ok(2);
            }
        };

        let outcome = match self.read_request() {
            Ok(request) => orchestrator.preview(request).await,
            Err(e) => Err(e),
        };

        match outcome {
            Ok(outcome) => {
                println!("{}", self.render(&outcome)?);
                Ok(0)
            }
            Err(e) if e.is_caller_fixable() => {
                eprintln!("❌ Claim request rejected ({})", e.kind());
                eprintln!("   Error: {e}");
                Ok(1)
            }
            Err(e) => {
                eprintln!("❌ Preview failed");
                eprintln!("   Error: {e}");
                Ok(5)
            }
        }
    }

    fn read_request(&self) -> Result<ClaimRequest> {
        let raw = fs::read_to_string(&self.request).map_err(|e| {
            ClaimwrightError::Validation(format!("cannot read {}: {e}", self.request))
        })?;
        let value = serde_json::from_str(&raw).map_err(|e| {
            ClaimwrightError::Validation(format!("{} is not valid JSON: {e}", self.request))
        })?;
        ClaimRequest::from_value(value)
    }

    fn render(&self, outcome: &PreviewOutcome) -> serde_json::Result<String> {
        match (&outcome.bundle, self.bundle) {
            (Some(bundle), true) => serde_json::to_string_pretty(bundle),
            _ => serde_json::to_string_pretty(outcome),
        }
    }
}

/// Orchestrator backed only by the bundled catalog and an in-memory store
fn offline_orchestrator(config: &ClaimwrightConfig) -> Result<ClaimOrchestrator> {
    let currency =
        Currency::new(&config.catalog.currency).map_err(ClaimwrightError::Configuration)?;
    let resolver = MetadataResolver::new(
        Arc::new(NoPrimaryCatalog),
        BundledCatalog::load(&currency)?,
        &config.catalog,
    );
    // Never called: preview does not submit
    let submitter = FhirSubmissionClient::new(&config.document_server)?;

    Ok(ClaimOrchestrator::new(
        Arc::new(resolver),
        Arc::new(submitter),
        Arc::new(InMemoryClaimStore::new()),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::loader::ENV_MUTEX;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn config_file() -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[document_server]\nbase_url = \"http://127.0.0.1:9/unreachable\"\n"
        )
        .unwrap();
        file
    }

    fn request_file(body: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{body}").unwrap();
        file
    }

    async fn run(body: &str, bundle: bool) -> i32 {
        let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
        let config = config_file();
        let request = request_file(body);
        PreviewArgs {
            request: request.path().to_str().unwrap().to_string(),
            bundle,
        }
        .execute(config.path().to_str().unwrap())
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_preview_transaction_form_offline() {
        let body = r#"{
            "items": [{"code": "36"}],
            "encounter": {"start": "2026-03-02T09:00:00Z"},
            "patient": {"name": "Alex Citizen"},
            "practitioner": {"id": "d-1"}
        }"#;
        assert_eq!(run(body, true).await, 0);
    }

    #[tokio::test]
    async fn test_preview_single_form_offline() {
        let body = r#"{
            "items": [{"code": "23"}],
            "encounter_id": "enc-9",
            "patient": {"id": "p-1"},
            "practitioner": {"id": "d-1"}
        }"#;
        assert_eq!(run(body, false).await, 0);
    }

    #[tokio::test]
    async fn test_unknown_code_exits_1() {
        let body = r#"{
            "items": [{"code": "99999"}],
            "encounter_id": "enc-9",
            "patient": {"id": "p-1"},
            "practitioner": {"id": "d-1"}
        }"#;
        assert_eq!(run(body, false).await, 1);
    }

    #[tokio::test]
    async fn test_malformed_json_exits_1() {
        assert_eq!(run("{ not json", false).await, 1);
    }

    #[tokio::test]
    async fn test_missing_request_file_exits_1() {
        let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
        let config = config_file();
        let code = PreviewArgs {
            request: "no-such-request.json".to_string(),
            bundle: false,
        }
        .execute(config.path().to_str().unwrap())
        .await
        .unwrap();
        assert_eq!(code, 1);
    }

    #[tokio::test]
    async fn test_missing_config_exits_2() {
        let request = request_file("{}");
        let code = PreviewArgs {
            request: request.path().to_str().unwrap().to_string(),
            bundle: false,
        }
        .execute("does-not-exist-claimwright.toml")
        .await
        .unwrap();
        assert_eq!(code, 2);
    }
}
