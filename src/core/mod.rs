//! Core business logic for Claimwright.
//!
//! This module turns a claim request into a submitted FHIR document.
//!
//! # Modules
//!
//! - [`request`] - Loose request bodies and their conversion to domain values
//! - [`resolver`] - Billing code metadata resolution with cache and fallback
//! - [`builder`] - Encounter and claim records from resolved items
//! - [`assembler`] - FHIR serialization, reference resolution, transactions
//! - [`digest`] - Payload digests for local records
//! - [`orchestrator`] - Preview, single-submit and bundle-submit modes
//!
//! # Workflow
//!
//! 1. **Convert**: validate the request into typed items, notes and parties
//! 2. **Resolve**: look up every billing code (cache, primary store, bundled catalog)
//! 3. **Build**: price line items and link encounter and claim records
//! 4. **Assemble**: serialize to FHIR JSON, single resource or transaction
//! 5. **Submit**: one POST to the document server, never retried
//! 6. **Persist**: write a local record, only after `Accepted`
//!
//! # Example
//!
//! ```rust,no_run
//! use claimwright::adapters::catalog::{BundledCatalog, NoPrimaryCatalog};
//! use claimwright::adapters::database::InMemoryClaimStore;
//! use claimwright::adapters::fhir::FhirSubmissionClient;
//! use claimwright::config::load_config;
//! use claimwright::core::orchestrator::ClaimOrchestrator;
//! use claimwright::core::request::ClaimRequest;
//! use claimwright::core::resolver::MetadataResolver;
//! use claimwright::domain::Currency;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("claimwright.toml")?;
//! let currency = Currency::new(&config.catalog.currency)?;
//!
//! let resolver = MetadataResolver::new(
//!     Arc::new(NoPrimaryCatalog),
//!     BundledCatalog::load(&currency)?,
//!     &config.catalog,
//! );
//! let orchestrator = ClaimOrchestrator::new(
//!     Arc::new(resolver),
//!     Arc::new(FhirSubmissionClient::new(&config.document_server)?),
//!     Arc::new(InMemoryClaimStore::new()),
//! );
//!
//! let request = ClaimRequest::from_value(serde_json::json!({
//!     "items": [{"code": "23"}],
//!     "encounter_id": "enc-1",
//!     "patient": {"id": "p-1"},
//!     "practitioner": {"id": "d-1"}
//! }))?;
//! let receipt = orchestrator.submit_single(request).await?;
//! println!("Server claim id: {}", receipt.record.server_claim_id);
//! # Ok(())
//! # }
//! ```

pub mod assembler;
pub mod builder;
pub mod digest;
pub mod orchestrator;
pub mod request;
pub mod resolver;

pub use orchestrator::{ClaimOrchestrator, PreviewOutcome, SubmitReceipt};
pub use resolver::MetadataResolver;
