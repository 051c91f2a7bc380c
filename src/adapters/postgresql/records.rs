//! Claim record store backed by the `claim_records` table

use super::client::PostgresClient;
use super::models::{ClaimRecordRow, CLAIM_RECORD_COLUMNS};
use crate::adapters::database::ClaimRecordStore;
use crate::domain::{ClaimRecord, Result};
use async_trait::async_trait;
use std::sync::Arc;

const INSERT_SQL: &str = r#"
    INSERT INTO claim_records (
        id, mode, server_claim_id, server_ids, patient_id,
        lines, total_amount, currency, payload_digest, created_at, submitted_at
    )
    VALUES ($1, $2, $3, $4, $5, $6, ($7::text)::numeric, $8, $9, $10, $11)
    ON CONFLICT (id) DO NOTHING
"#;

/// PostgreSQL implementation of [`ClaimRecordStore`]
pub struct PostgresClaimStore {
    client: Arc<PostgresClient>,
}

impl PostgresClaimStore {
    pub fn new(client: Arc<PostgresClient>) -> Self {
        Self { client }
    }

    async fn select(
        &self,
        filter: &str,
        params: &[&(dyn tokio_postgres::types::ToSql + Sync)],
    ) -> Result<Vec<ClaimRecord>> {
        let query = format!(
            "SELECT {CLAIM_RECORD_COLUMNS} FROM claim_records {filter} ORDER BY submitted_at DESC"
        );
        let rows = self.client.query(&query, params).await?;
        rows.iter()
            .map(|row| ClaimRecordRow::from_row(row)?.into_domain())
            .collect()
    }
}

#[async_trait]
impl ClaimRecordStore for PostgresClaimStore {
    async fn save(&self, record: &ClaimRecord) -> Result<()> {
        let row = ClaimRecordRow::from_domain(record)?;
        self.client
            .execute(
                INSERT_SQL,
                &[
                    &row.id,
                    &row.mode,
                    &row.server_claim_id,
                    &row.server_ids,
                    &row.patient_id,
                    &row.lines,
                    &row.total_amount,
                    &row.currency,
                    &row.payload_digest,
                    &row.created_at,
                    &row.submitted_at,
                ],
            )
            .await?;

        tracing::debug!(record_id = %record.id, "Claim record stored");
        Ok(())
    }

    async fn list(&self) -> Result<Vec<ClaimRecord>> {
        self.select("", &[]).await
    }

    async fn list_for_patient(&self, patient_id: &str) -> Result<Vec<ClaimRecord>> {
        self.select("WHERE patient_id = $1", &[&patient_id]).await
    }

    fn backend_name(&self) -> &'static str {
        "postgresql"
    }
}
