//! Logging and observability
//!
//! This module provides structured logging with support for:
//! - Console output for operators
//! - JSON-formatted local file logs with daily or hourly rotation
//! - Helper macros that keep field names consistent across the pipeline
//!
//! # Example
//!
//! ```no_run
//! use claimwright::logging::init_logging;
//! use claimwright::config::LoggingConfig;
//!
//! let config = LoggingConfig::default();
//! let _guard = init_logging("info", &config).expect("Failed to initialize logging");
//!
//! tracing::info!("Application started");
//! ```

pub mod structured;

// Re-export commonly used items
pub use structured::{init_logging, LoggingGuard};

/// Log the outcome of one document server submission
///
/// # Example
///
/// ```no_run
/// use claimwright::log_submission_outcome;
/// use claimwright::domain::{ServerIds, SubmissionOutcome};
/// use std::time::Duration;
///
/// let outcome = SubmissionOutcome::Accepted(ServerIds::default());
/// log_submission_outcome!("Claim", &outcome, Duration::from_millis(120));
/// ```
#[macro_export]
macro_rules! log_submission_outcome {
    ($label:expr, $outcome:expr, $elapsed:expr) => {
        match $outcome {
            $crate::domain::SubmissionOutcome::Accepted(_) => tracing::info!(
                submission = %$label,
                outcome = $outcome.name(),
                duration_ms = $elapsed.as_millis() as u64,
                "Submission finished"
            ),
            _ => tracing::warn!(
                submission = %$label,
                outcome = $outcome.name(),
                duration_ms = $elapsed.as_millis() as u64,
                "Submission finished"
            ),
        }
    };
}

/// Log a request state transition in the orchestrator
///
/// # Example
///
/// ```no_run
/// use claimwright::log_state_transition;
///
/// let request_id = uuid::Uuid::new_v4();
/// log_state_transition!(request_id, "resolving", "building");
/// ```
#[macro_export]
macro_rules! log_state_transition {
    ($request_id:expr, $from:expr, $to:expr) => {
        tracing::debug!(
            request_id = %$request_id,
            from = %$from,
            to = %$to,
            "Request state transition"
        );
    };
}

/// Log an error with context
///
/// # Example
///
/// ```no_run
/// use claimwright::log_error_with_context;
/// use claimwright::domain::ClaimwrightError;
///
/// let error = ClaimwrightError::Configuration("Invalid config".to_string());
/// log_error_with_context!(&error, "Failed to load configuration");
/// ```
#[macro_export]
macro_rules! log_error_with_context {
    ($error:expr, $context:expr) => {
        tracing::error!(
            error = %$error,
            kind = $error.kind(),
            context = $context,
            "Error occurred"
        );
    };
}
