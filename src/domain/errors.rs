//! Domain error types
//!
//! This module defines the error hierarchy for Claimwright. Every failure kind
//! the claim pipeline can produce has its own variant so callers can tell a
//! caller-fixable input problem from a remote rejection or a transport fault.
//! Errors are domain-specific and don't expose third-party types.

use super::outcome::{Issue, PartialApplication};
use thiserror::Error;

/// Main Claimwright error type
///
/// This is the primary error type used throughout the application.
/// It wraps specific error types and provides context for error handling.
#[derive(Debug, Error)]
pub enum ClaimwrightError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Malformed or inconsistent input (caller-fixable)
    #[error("Validation error: {0}")]
    Validation(String),

    /// One or more billing codes could not be resolved by any catalog tier
    #[error("Billing codes not found: {}", .missing.join(", "))]
    MetadataNotFound { missing: Vec<String> },

    /// Catalog store errors
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Document assembly defects (dangling or duplicate references)
    #[error("Assembly error: {0}")]
    Assembly(String),

    /// Remote submission did not end in acceptance
    #[error("Submission error: {0}")]
    Submission(#[from] SubmissionError),

    /// Database-related errors (local claim records)
    #[error("Database error: {0}")]
    Database(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// Generic errors with context
    #[error("{0}")]
    Other(String),
}

impl ClaimwrightError {
    /// Short machine-readable name of the error kind
    pub fn kind(&self) -> &'static str {
        match self {
            ClaimwrightError::Configuration(_) => "configuration",
            ClaimwrightError::Validation(_) => "validation",
            ClaimwrightError::MetadataNotFound { .. } => "metadata_not_found",
            ClaimwrightError::Catalog(_) => "catalog",
            ClaimwrightError::Assembly(_) => "assembly",
            ClaimwrightError::Submission(SubmissionError::Transport(_)) => "transport_failure",
            ClaimwrightError::Submission(SubmissionError::Rejected(_)) => "rejected",
            ClaimwrightError::Submission(SubmissionError::PartiallyApplied(_)) => {
                "partially_applied"
            }
            ClaimwrightError::Database(_) => "database",
            ClaimwrightError::Serialization(_) => "serialization",
            ClaimwrightError::Io(_) => "io",
            ClaimwrightError::Other(_) => "other",
        }
    }

    /// Whether the caller can fix the error by changing the request
    pub fn is_caller_fixable(&self) -> bool {
        matches!(
            self,
            ClaimwrightError::Validation(_)
                | ClaimwrightError::MetadataNotFound { .. }
                | ClaimwrightError::Submission(SubmissionError::Rejected(_))
        )
    }
}

/// Catalog store errors
///
/// Only "the store could not answer" is an error. A code that the store
/// does not know is reported as a miss, not through this type.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Primary store unreachable, timed out, or failed mid-query
    #[error("Catalog store unavailable: {0}")]
    Unavailable(String),

    /// Store returned a row that cannot be turned into a billing code
    #[error("Invalid catalog entry for code {code}: {message}")]
    InvalidEntry { code: String, message: String },
}

/// Submission failures surfaced to the caller
///
/// None of these are retried automatically.
#[derive(Debug, Error)]
pub enum SubmissionError {
    /// Network failure, timeout, 5xx, or a response of the wrong media type
    #[error("Transport failure: {0}")]
    Transport(String),

    /// The document server refused the document
    #[error("Rejected by document server: {}", summarize_issues(.0))]
    Rejected(Vec<Issue>),

    /// Some transaction entries were applied and some were not
    #[error("Transaction partially applied: {0}")]
    PartiallyApplied(PartialApplication),
}

fn summarize_issues(issues: &[Issue]) -> String {
    if issues.is_empty() {
        return "no issues reported".to_string();
    }
    issues
        .iter()
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

// Conversion from std::io::Error
impl From<std::io::Error> for ClaimwrightError {
    fn from(err: std::io::Error) -> Self {
        ClaimwrightError::Io(err.to_string())
    }
}

// Conversion from serde_json::Error
impl From<serde_json::Error> for ClaimwrightError {
    fn from(err: serde_json::Error) -> Self {
        ClaimwrightError::Serialization(err.to_string())
    }
}

// Conversion from toml parse errors
impl From<toml::de::Error> for ClaimwrightError {
    fn from(err: toml::de::Error) -> Self {
        ClaimwrightError::Configuration(format!("TOML parse error: {err}"))
    }
}
