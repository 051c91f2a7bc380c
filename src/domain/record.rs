//! Local claim records
//!
//! A record is written only after the document server accepted a submission.
//! It links the local view of the claim to the identifiers the server assigned.

use super::money::Money;
use super::outcome::ServerIds;
use super::resources::ClaimResource;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// Mode that produced a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionMode {
    Single,
    Bundle,
}

impl SubmissionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubmissionMode::Single => "single",
            SubmissionMode::Bundle => "bundle",
        }
    }
}

impl fmt::Display for SubmissionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Line item as stored locally
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordLine {
    pub sequence: u32,
    pub code: String,
    pub description: String,
    pub quantity: u32,
    pub modifiers: Vec<String>,
    pub price: Money,
}

/// Local record of an accepted claim
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimRecord {
    /// Local identifier
    pub id: Uuid,

    pub mode: SubmissionMode,

    /// Server id of the claim
    pub server_claim_id: String,

    /// Every id the server assigned, in entry order
    pub server_ids: ServerIds,

    /// Server id of the patient (existing or newly created)
    pub patient_id: Option<String>,

    pub lines: Vec<RecordLine>,
    pub total: Money,

    /// SHA-256 of the canonical submitted document
    pub payload_digest: String,

    pub created_at: DateTime<Utc>,
    pub submitted_at: DateTime<Utc>,
}

impl ClaimRecord {
    /// Builds a record from an accepted claim
    pub fn from_accepted(
        mode: SubmissionMode,
        claim: &ClaimResource,
        server_claim_id: impl Into<String>,
        server_ids: ServerIds,
        patient_id: Option<String>,
        payload_digest: String,
        submitted_at: DateTime<Utc>,
    ) -> Self {
        let lines = claim
            .items
            .iter()
            .map(|item| RecordLine {
                sequence: item.sequence,
                code: item.code.code.clone(),
                description: item.code.description.clone(),
                quantity: item.quantity,
                modifiers: item.modifiers.clone(),
                price: item.price.clone(),
            })
            .collect();

        Self {
            id: Uuid::new_v4(),
            mode,
            server_claim_id: server_claim_id.into(),
            server_ids,
            patient_id,
            lines,
            total: claim.total.clone(),
            payload_digest,
            created_at: claim.created,
            submitted_at,
        }
    }
}

/// Aggregate view over local records
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimStats {
    pub total_claims: usize,
    pub single_submissions: usize,
    pub bundle_submissions: usize,
    pub distinct_patients: usize,
    pub total_lines: usize,

    /// Billed amount per currency code
    pub billed_by_currency: BTreeMap<String, Money>,
}

impl ClaimStats {
    /// Computes statistics over a set of records
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a ClaimRecord>) -> Self {
        let mut stats = ClaimStats::default();
        let mut patients = std::collections::HashSet::new();

        for record in records {
            stats.total_claims += 1;
            match record.mode {
                SubmissionMode::Single => stats.single_submissions += 1,
                SubmissionMode::Bundle => stats.bundle_submissions += 1,
            }
            if let Some(patient) = &record.patient_id {
                patients.insert(patient.clone());
            }
            stats.total_lines += record.lines.len();

            let key = record.total.currency.as_str().to_string();
            let entry = stats
                .billed_by_currency
                .entry(key)
                .or_insert_with(|| Money::zero(record.total.currency.clone()));
            entry.amount += record.total.amount;
        }

        stats.distinct_patients = patients.len();
        stats
    }
}
