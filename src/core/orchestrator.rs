//! Claim orchestrator
//!
//! Runs one request through resolution, building, assembly and (for the
//! submit modes) submission and local persistence:
//!
//! ```text
//! Resolving -> Building -> Assembling -> Submitting -> Persisting -> Done
//!      \___________\___________\____________\_____________\--> Aborted
//! ```
//!
//! Only an `Accepted` outcome is ever persisted. A local write that fails
//! after the server accepted the claim does not undo anything remotely; the
//! receipt carries a reconciliation warning instead.

use crate::adapters::catalog::BundledCatalog;
use crate::adapters::database::{create_stores, ClaimRecordStore};
use crate::adapters::fhir::{DocumentSubmitter, FhirSubmissionClient};
use crate::config::ClaimwrightConfig;
use crate::core::assembler::{
    assemble_single, assemble_transaction, claim_document, IdGenerator, RandomIdGenerator,
};
use crate::core::builder::ClaimBuilder;
use crate::core::digest::payload_digest;
use crate::core::request::{ClaimInput, ClaimRequest};
use crate::core::resolver::MetadataResolver;
use crate::domain::{
    ClaimRecord, ClaimResource, ClaimwrightError, Currency, EncounterResource, Money,
    ResourceType, Result, ServerIds, Submission, SubmissionError, SubmissionMode,
    SubmissionOutcome, TransactionPayload,
};
use crate::log_state_transition;
use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;
use uuid::Uuid;

/// Where a request is in the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestState {
    Received,
    Resolving,
    Building,
    Assembling,
    Submitting,
    Persisting,
    Done,
    Aborted,
}

impl fmt::Display for RequestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RequestState::Received => "received",
            RequestState::Resolving => "resolving",
            RequestState::Building => "building",
            RequestState::Assembling => "assembling",
            RequestState::Submitting => "submitting",
            RequestState::Persisting => "persisting",
            RequestState::Done => "done",
            RequestState::Aborted => "aborted",
        };
        f.write_str(s)
    }
}

/// State of one request, logging every transition
#[derive(Debug)]
struct RequestTrace {
    id: Uuid,
    mode: &'static str,
    state: RequestState,
}

impl RequestTrace {
    fn start(mode: &'static str) -> Self {
        let id = Uuid::new_v4();
        tracing::debug!(request_id = %id, mode, "Claim request received");
        Self {
            id,
            mode,
            state: RequestState::Received,
        }
    }

    fn advance(&mut self, to: RequestState) {
        log_state_transition!(self.id, self.state, to);
        self.state = to;
    }

    fn finish<T>(mut self, result: &Result<T>) {
        match result {
            Ok(_) => self.advance(RequestState::Done),
            Err(e) => {
                let failed_in = self.state;
                self.advance(RequestState::Aborted);
                if e.is_caller_fixable() {
                    tracing::info!(
                        request_id = %self.id,
                        mode = self.mode,
                        failed_in = %failed_in,
                        kind = e.kind(),
                        error = %e,
                        "Claim request aborted"
                    );
                } else {
                    tracing::warn!(
                        request_id = %self.id,
                        mode = self.mode,
                        failed_in = %failed_in,
                        kind = e.kind(),
                        error = %e,
                        "Claim request aborted"
                    );
                }
            }
        }
    }
}

/// Which assembly form a preview used
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PreviewForm {
    Single,
    Transaction,
}

/// Result of a preview: what would be sent, nothing sent
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreviewOutcome {
    pub form: PreviewForm,

    /// Assembled `Claim` document
    pub claim: Value,

    /// Full transaction bundle for the transaction form
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bundle: Option<Value>,

    pub total: Money,

    /// Digest of what would be submitted
    pub payload_digest: String,
}

/// Result of an accepted submission
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmitReceipt {
    pub record: ClaimRecord,

    /// Set when the claim was accepted but the local record was not written
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reconciliation_warning: Option<String>,
}

/// Composes resolution, building, assembly and submission
pub struct ClaimOrchestrator {
    resolver: Arc<MetadataResolver>,
    builder: ClaimBuilder,
    submitter: Arc<dyn DocumentSubmitter>,
    records: Arc<dyn ClaimRecordStore>,
    shutdown: Option<watch::Receiver<bool>>,
}

impl ClaimOrchestrator {
    pub fn new(
        resolver: Arc<MetadataResolver>,
        submitter: Arc<dyn DocumentSubmitter>,
        records: Arc<dyn ClaimRecordStore>,
    ) -> Self {
        let builder = ClaimBuilder::new(resolver.modifiers().clone());
        Self {
            resolver,
            builder,
            submitter,
            records,
            shutdown: None,
        }
    }

    /// Wires stores, resolver and submission client from configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog currency is invalid, the bundled
    /// catalog does not match it, or a configured store cannot be created.
    pub async fn from_config(config: &ClaimwrightConfig) -> Result<Self> {
        let currency = Currency::new(&config.catalog.currency)
            .map_err(ClaimwrightError::Configuration)?;
        let stores = create_stores(config).await?;
        let resolver = MetadataResolver::new(
            stores.catalog,
            BundledCatalog::load(&currency)?,
            &config.catalog,
        );
        let submitter = FhirSubmissionClient::new(&config.document_server)?;

        tracing::info!(
            document_server = %submitter.base_url(),
            currency = %currency,
            "Claim orchestrator ready"
        );

        Ok(Self::new(
            Arc::new(resolver),
            Arc::new(submitter),
            stores.records,
        ))
    }

    /// In-flight submissions are abandoned once `shutdown` turns `true`
    pub fn with_shutdown(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    /// Claim record store
    pub fn records(&self) -> &Arc<dyn ClaimRecordStore> {
        &self.records
    }

    /// Assembles a claim without touching the network or local storage
    ///
    /// Uses the single form when the request names an existing encounter,
    /// the transaction form otherwise.
    pub async fn preview(&self, request: ClaimRequest) -> Result<PreviewOutcome> {
        let mut trace = RequestTrace::start("preview");
        let result = self.run_preview(&mut trace, request).await;
        trace.finish(&result);
        result
    }

    /// Submits a claim against an existing encounter
    pub async fn submit_single(&self, request: ClaimRequest) -> Result<SubmitReceipt> {
        let mut trace = RequestTrace::start("single");
        let result = self.run_single(&mut trace, request).await;
        trace.finish(&result);
        result
    }

    /// Submits encounter, claim and any new parties as one transaction
    pub async fn submit_bundle(&self, request: ClaimRequest) -> Result<SubmitReceipt> {
        let mut trace = RequestTrace::start("bundle");
        let result = self.run_bundle(&mut trace, request).await;
        trace.finish(&result);
        result
    }

    async fn run_preview(
        &self,
        trace: &mut RequestTrace,
        request: ClaimRequest,
    ) -> Result<PreviewOutcome> {
        let input = request.into_input(Utc::now())?;
        if input.encounter_ref.is_some() {
            require_persisted_parties(&input)?;
        }
        let (encounter, claim) = self.prepare(trace, &input).await?;

        trace.advance(RequestState::Assembling);
        match &input.encounter_ref {
            Some(encounter_ref) => {
                let assembled = assemble_single(&claim, encounter_ref)?;
                let document = claim_document(&assembled)?;
                Ok(PreviewOutcome {
                    form: PreviewForm::Single,
                    payload_digest: payload_digest(&document)?,
                    claim: document,
                    bundle: None,
                    total: assembled.total,
                })
            }
            None => {
                let payload =
                    self.transaction(&input, &encounter, &claim, &mut RandomIdGenerator)?;
                let bundle = payload.to_bundle();
                let document = payload
                    .entries()
                    .last()
                    .map(|entry| entry.resource.clone())
                    .unwrap_or(Value::Null);
                Ok(PreviewOutcome {
                    form: PreviewForm::Transaction,
                    payload_digest: payload_digest(&bundle)?,
                    claim: document,
                    bundle: Some(bundle),
                    total: claim.total,
                })
            }
        }
    }

    async fn run_single(
        &self,
        trace: &mut RequestTrace,
        request: ClaimRequest,
    ) -> Result<SubmitReceipt> {
        let input = request.into_input(Utc::now())?;
        let encounter_ref = input.encounter_ref.clone().ok_or_else(|| {
            ClaimwrightError::Validation(
                "encounter_id: single submission requires an existing encounter".to_string(),
            )
        })?;
        require_persisted_parties(&input)?;
        let (_, claim) = self.prepare(trace, &input).await?;

        trace.advance(RequestState::Assembling);
        let assembled = assemble_single(&claim, &encounter_ref)?;
        let document = claim_document(&assembled)?;
        let digest = payload_digest(&document)?;

        trace.advance(RequestState::Submitting);
        let server_ids = self
            .submit(Submission::Resource {
                resource_type: ResourceType::Claim,
                document,
            })
            .await?;

        trace.advance(RequestState::Persisting);
        let patient_id = input
            .parties
            .patient
            .reference
            .persisted_id()
            .map(str::to_string);
        Ok(self
            .persist(SubmissionMode::Single, &assembled, server_ids, patient_id, digest)
            .await)
    }

    async fn run_bundle(
        &self,
        trace: &mut RequestTrace,
        request: ClaimRequest,
    ) -> Result<SubmitReceipt> {
        let input = request.into_input(Utc::now())?;
        if input.encounter_ref.is_some() {
            return Err(ClaimwrightError::Validation(
                "encounter_id: bundle submission creates its own encounter".to_string(),
            ));
        }
        let (encounter, claim) = self.prepare(trace, &input).await?;

        trace.advance(RequestState::Assembling);
        let payload = self.transaction(&input, &encounter, &claim, &mut RandomIdGenerator)?;
        let digest = payload_digest(&payload.to_bundle())?;

        trace.advance(RequestState::Submitting);
        let server_ids = self.submit(Submission::Transaction(payload)).await?;

        trace.advance(RequestState::Persisting);
        let patient_id = input
            .parties
            .patient
            .reference
            .persisted_id()
            .or_else(|| server_ids.id_for(ResourceType::Patient))
            .map(str::to_string);
        Ok(self
            .persist(SubmissionMode::Bundle, &claim, server_ids, patient_id, digest)
            .await)
    }

    /// Resolves codes and builds the records
    async fn prepare(
        &self,
        trace: &mut RequestTrace,
        input: &ClaimInput,
    ) -> Result<(EncounterResource, ClaimResource)> {
        trace.advance(RequestState::Resolving);
        let resolved = self.resolver.resolve(&input.codes()).await?;

        trace.advance(RequestState::Building);
        self.builder.build(
            &input.items,
            &resolved,
            &input.notes,
            &input.context,
            &input.parties,
            &input.header,
        )
    }

    fn transaction(
        &self,
        input: &ClaimInput,
        encounter: &EncounterResource,
        claim: &ClaimResource,
        ids: &mut dyn IdGenerator,
    ) -> Result<TransactionPayload> {
        assemble_transaction(
            &input.parties.patient,
            &input.parties.practitioner,
            encounter,
            claim,
            ids,
        )
    }

    /// Sends once and turns anything but `Accepted` into an error
    async fn submit(&self, submission: Submission) -> Result<ServerIds> {
        let outcome = match &self.shutdown {
            Some(shutdown) => {
                let mut shutdown = shutdown.clone();
                self.submitter
                    .submit_cancellable(&submission, &mut shutdown)
                    .await
            }
            None => self.submitter.submit(&submission).await,
        };
        match outcome {
            SubmissionOutcome::Accepted(ids) => Ok(ids),
            SubmissionOutcome::Rejected(issues) => Err(SubmissionError::Rejected(issues).into()),
            SubmissionOutcome::PartiallyApplied(details) => {
                Err(SubmissionError::PartiallyApplied(details).into())
            }
            SubmissionOutcome::TransportFailure(cause) => {
                Err(SubmissionError::Transport(cause).into())
            }
        }
    }

    /// Writes the local record; never fails once the server accepted
    async fn persist(
        &self,
        mode: SubmissionMode,
        claim: &ClaimResource,
        server_ids: ServerIds,
        patient_id: Option<String>,
        digest: String,
    ) -> SubmitReceipt {
        let server_claim_id = server_ids
            .id_for(ResourceType::Claim)
            .unwrap_or_default()
            .to_string();
        let record = ClaimRecord::from_accepted(
            mode,
            claim,
            server_claim_id.clone(),
            server_ids,
            patient_id,
            digest,
            Utc::now(),
        );

        let mut warnings = Vec::new();
        if server_claim_id.is_empty() {
            warnings.push("Document server accepted the claim without reporting its id".to_string());
        }
        if let Err(e) = self.records.save(&record).await {
            tracing::error!(
                record_id = %record.id,
                server_claim_id = %server_claim_id,
                backend = self.records.backend_name(),
                error = %e,
                "Claim accepted but the local record could not be saved"
            );
            warnings.push(format!(
                "Claim accepted as Claim/{server_claim_id} but the local record could not be saved: {e}"
            ));
        }

        tracing::info!(
            record_id = %record.id,
            mode = %mode,
            server_claim_id = %server_claim_id,
            total = %record.total,
            "Claim submitted"
        );

        SubmitReceipt {
            record,
            reconciliation_warning: if warnings.is_empty() {
                None
            } else {
                Some(warnings.join("; "))
            },
        }
    }
}

fn require_persisted_parties(input: &ClaimInput) -> Result<()> {
    if input.parties_persisted() {
        return Ok(());
    }
    Err(ClaimwrightError::Validation(
        "patient and practitioner must be existing resources ({id}) when an encounter_id is given"
            .to_string(),
    ))
}
