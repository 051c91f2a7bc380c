//! In-process claim record store

use super::traits::ClaimRecordStore;
use crate::domain::{ClaimRecord, Result};
use async_trait::async_trait;
use tokio::sync::RwLock;

/// Claim records held in memory; contents are lost on restart
#[derive(Debug, Default)]
pub struct InMemoryClaimStore {
    records: RwLock<Vec<ClaimRecord>>,
}

impl InMemoryClaimStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

fn newest_first(mut records: Vec<ClaimRecord>) -> Vec<ClaimRecord> {
    records.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at));
    records
}

#[async_trait]
impl ClaimRecordStore for InMemoryClaimStore {
    async fn save(&self, record: &ClaimRecord) -> Result<()> {
        let mut records = self.records.write().await;
        // Saving the same local id twice replaces the earlier copy
        records.retain(|r| r.id != record.id);
        records.push(record.clone());
        Ok(())
    }

    async fn list(&self) -> Result<Vec<ClaimRecord>> {
        let records = self.records.read().await.clone();
        Ok(newest_first(records))
    }

    async fn list_for_patient(&self, patient_id: &str) -> Result<Vec<ClaimRecord>> {
        let records = self
            .records
            .read()
            .await
            .iter()
            .filter(|r| r.patient_id.as_deref() == Some(patient_id))
            .cloned()
            .collect();
        Ok(newest_first(records))
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
