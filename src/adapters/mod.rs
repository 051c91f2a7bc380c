//! External system integrations for Claimwright.
//!
//! - [`fhir`] - Document server submission client
//! - [`catalog`] - Billing code catalog contract and the bundled catalog
//! - [`database`] - Local claim record storage (trait-based)
//! - [`postgresql`] - PostgreSQL implementations of the catalog and record stores
//!
//! Adapters isolate external dependencies behind traits so the core can be
//! tested against in-memory implementations.

pub mod catalog;
pub mod database;
pub mod fhir;
pub mod postgresql;
