//! Row mappings for the PostgreSQL tables

use crate::domain::{
    BillingCode, ClaimRecord, ClaimwrightError, Currency, Money, RecordLine, Result, ServerIds,
    SubmissionMode,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::str::FromStr;
use tokio_postgres::Row;
use uuid::Uuid;

/// Column list shared by every `claim_records` select
pub(crate) const CLAIM_RECORD_COLUMNS: &str = "id, mode, server_claim_id, server_ids, patient_id, \
     lines, total_amount::text AS total_amount, currency, payload_digest, created_at, submitted_at";

fn column<'a, T: tokio_postgres::types::FromSql<'a>>(row: &'a Row, name: &str) -> Result<T> {
    row.try_get(name)
        .map_err(|e| ClaimwrightError::Database(format!("Failed to read column {name}: {e}")))
}

fn parse_amount(raw: &str, what: &str) -> Result<Decimal> {
    Decimal::from_str(raw)
        .map_err(|e| ClaimwrightError::Database(format!("Invalid {what} '{raw}': {e}")))
}

/// Converts a `billing_codes` row (price selected as text) to a billing code
pub(crate) fn billing_code_from_row(row: &Row) -> Result<BillingCode> {
    let code: String = column(row, "code")?;
    let description: String = column(row, "description")?;
    let unit_price: String = column(row, "unit_price")?;
    let currency: String = column(row, "currency")?;
    let category: String = column(row, "category")?;

    let currency = Currency::new(&currency).map_err(|message| {
        crate::domain::CatalogError::InvalidEntry {
            code: code.clone(),
            message,
        }
    })?;
    let amount = parse_amount(&unit_price, "unit price")?;

    Ok(BillingCode::new(
        &code,
        description,
        Money::new(amount, currency),
        category,
    ))
}

/// Column values of one `claim_records` insert
pub(crate) struct ClaimRecordRow {
    pub id: Uuid,
    pub mode: String,
    pub server_claim_id: String,
    pub server_ids: serde_json::Value,
    pub patient_id: Option<String>,
    pub lines: serde_json::Value,
    pub total_amount: String,
    pub currency: String,
    pub payload_digest: String,
    pub created_at: DateTime<Utc>,
    pub submitted_at: DateTime<Utc>,
}

impl ClaimRecordRow {
    pub fn from_domain(record: &ClaimRecord) -> Result<Self> {
        Ok(Self {
            id: record.id,
            mode: record.mode.as_str().to_string(),
            server_claim_id: record.server_claim_id.clone(),
            server_ids: serde_json::to_value(&record.server_ids)?,
            patient_id: record.patient_id.clone(),
            lines: serde_json::to_value(&record.lines)?,
            total_amount: record.total.amount.to_string(),
            currency: record.total.currency.as_str().to_string(),
            payload_digest: record.payload_digest.clone(),
            created_at: record.created_at,
            submitted_at: record.submitted_at,
        })
    }

    pub fn from_row(row: &Row) -> Result<Self> {
        Ok(Self {
            id: column(row, "id")?,
            mode: column(row, "mode")?,
            server_claim_id: column(row, "server_claim_id")?,
            server_ids: column(row, "server_ids")?,
            patient_id: column(row, "patient_id")?,
            lines: column(row, "lines")?,
            total_amount: column(row, "total_amount")?,
            currency: column(row, "currency")?,
            payload_digest: column(row, "payload_digest")?,
            created_at: column(row, "created_at")?,
            submitted_at: column(row, "submitted_at")?,
        })
    }

    pub fn into_domain(self) -> Result<ClaimRecord> {
        let mode = match self.mode.as_str() {
            "single" => SubmissionMode::Single,
            "bundle" => SubmissionMode::Bundle,
            other => {
                return Err(ClaimwrightError::Database(format!(
                    "Unknown submission mode '{other}' for record {}",
                    self.id
                )))
            }
        };
        let server_ids: ServerIds = serde_json::from_value(self.server_ids)?;
        let lines: Vec<RecordLine> = serde_json::from_value(self.lines)?;
        let currency = Currency::new(&self.currency).map_err(ClaimwrightError::Database)?;
        let amount = parse_amount(&self.total_amount, "total amount")?;

        Ok(ClaimRecord {
            id: self.id,
            mode,
            server_claim_id: self.server_claim_id,
            server_ids,
            patient_id: self.patient_id,
            lines,
            total: Money::new(amount, currency),
            payload_digest: self.payload_digest,
            created_at: self.created_at,
            submitted_at: self.submitted_at,
        })
    }
}
