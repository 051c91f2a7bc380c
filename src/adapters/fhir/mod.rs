//! FHIR document server integration
//!
//! [`FhirSubmissionClient`] posts single resources to `{base}/{type}` and
//! transaction bundles to `{base}`, then turns the response into a
//! [`SubmissionOutcome`](crate::domain::SubmissionOutcome).

pub mod client;
pub mod models;

pub use client::{DocumentSubmitter, FhirSubmissionClient};
pub use models::OperationOutcome;
