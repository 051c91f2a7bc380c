// Claimwright - FHIR claim assembly and submission service
// Copyright (c) 2026 Claimwright Contributors
// Licensed under the MIT License

//! # Claimwright - FHIR claim assembly and submission
//!
//! Claimwright turns a clinician's selection of billing codes, optional
//! modifiers and free-text notes into FHIR R4 `Encounter` and `Claim`
//! documents, and submits them to a remote FHIR document server either as a
//! single `Claim` against an existing encounter or as one atomic
//! `transaction` bundle.
//!
//! ## Overview
//!
//! - **Resolving** billing codes through a primary catalog store, an
//!   in-memory cache and the bundled catalog
//! - **Building** priced encounter and claim resources with exact decimal money
//! - **Assembling** single documents or transaction bundles whose internal
//!   references are all resolvable
//! - **Submitting** with one bounded attempt and classifying the response as
//!   accepted, rejected, partially applied or a transport failure
//! - **Recording** accepted claims locally for listing and totals
//!
//! ## Architecture
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`api`] - HTTP endpoints (axum)
//! - [`core`] - Resolution, building, assembly and orchestration
//! - [`adapters`] - FHIR server, PostgreSQL and catalog integrations
//! - [`domain`] - Core domain types and errors
//! - [`config`] - Configuration management
//! - [`logging`] - Structured logging
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use claimwright::config::load_config;
//! use claimwright::core::request::ClaimRequest;
//! use claimwright::core::ClaimOrchestrator;
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = load_config("claimwright.toml")?;
//!     let orchestrator = ClaimOrchestrator::from_config(&config).await?;
//!
//!     let request = ClaimRequest::from_value(json!({
//!         "items": [{"code": "23", "modifiers": ["AH"]}],
//!         "encounter": {"start": "2026-03-02T09:00:00Z"},
//!         "patient": {"name": "Alex Citizen"},
//!         "practitioner": {"id": "d-1"}
//!     }))?;
//!
//!     let receipt = orchestrator.submit_bundle(request).await?;
//!     println!("Claim {} total {}", receipt.record.server_claim_id, receipt.record.total);
//!     Ok(())
//! }
//! ```
//!
//! ## Error Handling
//!
//! Every fallible operation returns [`domain::Result`], whose error type
//! [`domain::ClaimwrightError`] separates caller-fixable problems
//! (validation, unknown codes, remote rejection) from transport and
//! infrastructure faults.

pub mod adapters;
pub mod api;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod logging;
