//! Primary billing catalog backed by the `billing_codes` table

use super::client::PostgresClient;
use super::models::billing_code_from_row;
use crate::adapters::catalog::{CatalogLookup, CatalogStore};
use crate::domain::CatalogError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

const LOOKUP_SQL: &str = "SELECT code, description, unit_price::text AS unit_price, currency, category \
     FROM billing_codes WHERE active AND code = ANY($1)";

/// Catalog store reading active billing codes from PostgreSQL
pub struct PostgresCatalogStore {
    client: Arc<PostgresClient>,
}

impl PostgresCatalogStore {
    pub fn new(client: Arc<PostgresClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl CatalogStore for PostgresCatalogStore {
    async fn lookup(&self, codes: &[String]) -> Result<CatalogLookup, CatalogError> {
        let rows = self
            .client
            .query(LOOKUP_SQL, &[&codes])
            .await
            .map_err(|e| CatalogError::Unavailable(e.to_string()))?;

        let mut found = HashMap::with_capacity(rows.len());
        for row in &rows {
            match billing_code_from_row(row) {
                Ok(code) => {
                    found.insert(code.code.clone(), code);
                }
                // A bad row is a miss for that code; the bundled catalog may still answer
                Err(e) => tracing::warn!(error = %e, "Skipping invalid billing_codes row"),
            }
        }

        tracing::debug!(
            requested = codes.len(),
            found = found.len(),
            "Primary catalog lookup finished"
        );
        Ok(CatalogLookup::Found(found))
    }

    fn name(&self) -> &'static str {
        "postgresql"
    }
}
