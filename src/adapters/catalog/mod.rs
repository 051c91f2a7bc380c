//! Billing code catalog stores
//!
//! The resolver consults a primary [`CatalogStore`] first and falls back to
//! the [`BundledCatalog`] compiled into the binary. Only the read contract
//! matters here; how a primary store is populated is out of scope.

pub mod bundled;

pub use bundled::BundledCatalog;

use crate::domain::{BillingCode, CatalogError};
use async_trait::async_trait;
use std::collections::HashMap;

/// Answer of a primary store that could be reached
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogLookup {
    /// Codes the store knows, keyed by normalized code. May hold fewer
    /// entries than requested; absent codes are misses.
    Found(HashMap<String, BillingCode>),

    /// No primary store is configured for this deployment
    NotConfigured,
}

impl CatalogLookup {
    /// Codes found, empty when not configured
    pub fn into_found(self) -> HashMap<String, BillingCode> {
        match self {
            CatalogLookup::Found(found) => found,
            CatalogLookup::NotConfigured => HashMap::new(),
        }
    }
}

/// Read contract of a billing code catalog
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Looks up a batch of normalized codes in one round trip
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Unavailable`] when the store cannot answer.
    /// Unknown codes are not an error.
    async fn lookup(&self, codes: &[String]) -> Result<CatalogLookup, CatalogError>;

    /// Store name for logs
    fn name(&self) -> &'static str;
}

/// Primary store placeholder for deployments without one
#[derive(Debug, Default, Clone, Copy)]
pub struct NoPrimaryCatalog;

#[async_trait]
impl CatalogStore for NoPrimaryCatalog {
    async fn lookup(&self, _codes: &[String]) -> Result<CatalogLookup, CatalogError> {
        Ok(CatalogLookup::NotConfigured)
    }

    fn name(&self) -> &'static str {
        "none"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_no_primary_is_not_configured() {
        let lookup = NoPrimaryCatalog.lookup(&["23".to_string()]).await.unwrap();
        assert_eq!(lookup, CatalogLookup::NotConfigured);
        assert!(lookup.into_found().is_empty());
    }
}
