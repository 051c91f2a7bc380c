//! Storage traits for local claim records
//!
//! The document server is the system of record. Local records only mirror
//! accepted submissions so operators can list and reconcile them.

use crate::domain::{ClaimRecord, ClaimStats, Result};
use async_trait::async_trait;

/// Local claim record storage
#[async_trait]
pub trait ClaimRecordStore: Send + Sync {
    /// Persist one accepted claim
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be written. Callers treat this
    /// as a reconciliation problem, never as a submission failure.
    async fn save(&self, record: &ClaimRecord) -> Result<()>;

    /// All records, newest submission first
    async fn list(&self) -> Result<Vec<ClaimRecord>>;

    /// Records for one server patient id, newest submission first
    async fn list_for_patient(&self, patient_id: &str) -> Result<Vec<ClaimRecord>>;

    /// Aggregate statistics over every record
    ///
    /// The default implementation folds over [`list`](Self::list).
    async fn stats(&self) -> Result<ClaimStats> {
        let records = self.list().await?;
        Ok(ClaimStats::from_records(&records))
    }

    /// Name of the backend for logs and the health endpoint
    fn backend_name(&self) -> &'static str;
}
