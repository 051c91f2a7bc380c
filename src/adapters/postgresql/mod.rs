//! PostgreSQL integration
//!
//! One pooled [`PostgresClient`] backs both the primary billing catalog and
//! the local claim record store.

pub mod catalog;
pub mod client;
pub(crate) mod models;
pub mod records;

pub use catalog::PostgresCatalogStore;
pub use client::PostgresClient;
pub use records::PostgresClaimStore;
