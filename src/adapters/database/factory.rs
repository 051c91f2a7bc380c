//! Store factory
//!
//! Creates the catalog and claim record stores selected by configuration,
//! sharing one PostgreSQL pool between them when both use it.

use super::memory::InMemoryClaimStore;
use super::traits::ClaimRecordStore;
use crate::adapters::catalog::{CatalogStore, NoPrimaryCatalog};
use crate::adapters::postgresql::{PostgresCatalogStore, PostgresClaimStore, PostgresClient};
use crate::config::schema::{CatalogPrimary, ClaimwrightConfig, StorageBackend};
use crate::domain::{ClaimwrightError, Result};
use std::sync::Arc;

/// Stores selected by configuration
pub struct Stores {
    pub catalog: Arc<dyn CatalogStore>,
    pub records: Arc<dyn ClaimRecordStore>,
}

/// Create the primary catalog store and the claim record store
///
/// When PostgreSQL is used by either store the schema is bootstrapped first.
///
/// # Errors
///
/// Returns an error if the PostgreSQL configuration is missing or the schema
/// cannot be applied.
pub async fn create_stores(config: &ClaimwrightConfig) -> Result<Stores> {
    let needs_postgres = config.catalog.primary == CatalogPrimary::PostgreSQL
        || config.storage.backend == StorageBackend::PostgreSQL;

    let pg = if needs_postgres {
        let pg_config = config.postgresql.as_ref().ok_or_else(|| {
            ClaimwrightError::Configuration("postgresql configuration is missing".to_string())
        })?;

        tracing::info!("Creating PostgreSQL client");
        let client = Arc::new(PostgresClient::new(pg_config)?);
        client.ensure_schema().await?;
        Some(client)
    } else {
        None
    };

    let catalog: Arc<dyn CatalogStore> = match (config.catalog.primary, &pg) {
        (CatalogPrimary::PostgreSQL, Some(client)) => {
            Arc::new(PostgresCatalogStore::new(client.clone()))
        }
        _ => Arc::new(NoPrimaryCatalog),
    };

    let records: Arc<dyn ClaimRecordStore> = match (config.storage.backend, &pg) {
        (StorageBackend::PostgreSQL, Some(client)) => {
            Arc::new(PostgresClaimStore::new(client.clone()))
        }
        _ => Arc::new(InMemoryClaimStore::new()),
    };

    tracing::info!(
        catalog = catalog.name(),
        records = records.backend_name(),
        "Stores created"
    );

    Ok(Stores { catalog, records })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_defaults() {
        let config: ClaimwrightConfig =
            toml::from_str("[document_server]\nbase_url = \"http://localhost/fhir\"\n").unwrap();
        let stores = create_stores(&config).await.unwrap();
        assert_eq!(stores.catalog.name(), "none");
        assert_eq!(stores.records.backend_name(), "memory");
    }
}
