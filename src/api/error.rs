//! HTTP error responses
//!
//! Every [`ClaimwrightError`] kind maps to its own status code and `kind`
//! string, so callers never have to parse messages.

use crate::domain::{ClaimwrightError, Issue, SubmissionError};
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::{Deserialize, Serialize};

/// Error body returned by every endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiErrorBody {
    pub kind: String,
    pub message: String,

    /// Issues reported by the document server
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issues: Option<Vec<Issue>>,

    /// Billing codes no catalog knows
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub missing_codes: Option<Vec<String>>,
}

/// Wrapper turning domain errors into responses
#[derive(Debug)]
pub struct ApiError(pub ClaimwrightError);

impl From<ClaimwrightError> for ApiError {
    fn from(err: ClaimwrightError) -> Self {
        Self(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self(ClaimwrightError::Validation(format!(
            "Request body is not valid JSON: {}",
            rejection.body_text()
        )))
    }
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match &self.0 {
            ClaimwrightError::Validation(_) => StatusCode::BAD_REQUEST,
            ClaimwrightError::MetadataNotFound { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            ClaimwrightError::Submission(SubmissionError::Rejected(_)) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            ClaimwrightError::Submission(SubmissionError::Transport(_)) => StatusCode::BAD_GATEWAY,
            ClaimwrightError::Submission(SubmissionError::PartiallyApplied(_)) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn body(&self) -> ApiErrorBody {
        let issues = match &self.0 {
            ClaimwrightError::Submission(SubmissionError::Rejected(issues)) => {
                Some(issues.clone())
            }
            ClaimwrightError::Submission(SubmissionError::PartiallyApplied(details)) => Some(
                details
                    .failed()
                    .flat_map(|entry| entry.issues.iter().cloned())
                    .collect(),
            ),
            _ => None,
        };
        let missing_codes = match &self.0 {
            ClaimwrightError::MetadataNotFound { missing } => Some(missing.clone()),
            _ => None,
        };

        ApiErrorBody {
            kind: self.0.kind().to_string(),
            message: self.0.to_string(),
            issues,
            missing_codes,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(
                kind = self.0.kind(),
                status_code = status.as_u16(),
                error = %self.0,
                "API request failed"
            );
        } else {
            tracing::debug!(
                kind = self.0.kind(),
                status_code = status.as_u16(),
                error = %self.0,
                "API request refused"
            );
        }
        (status, Json(self.body())).into_response()
    }
}
