//! FHIR wire models read from document server responses
//!
//! Only the fields needed to classify an outcome are modelled. Everything
//! else in a response body is ignored.

use crate::domain::{AssignedId, Issue, IssueSeverity, ResourceType};
use serde::Deserialize;
use serde_json::Value;
use std::str::FromStr;

/// `OperationOutcome` resource
#[derive(Debug, Clone, Deserialize)]
pub struct OperationOutcome {
    #[serde(rename = "resourceType")]
    pub resource_type: String,

    #[serde(default)]
    pub issue: Vec<OutcomeIssue>,
}

/// One `OperationOutcome.issue`
#[derive(Debug, Clone, Deserialize)]
pub struct OutcomeIssue {
    pub severity: String,
    pub code: String,
    #[serde(default)]
    pub diagnostics: Option<String>,
    #[serde(default)]
    pub details: Option<CodeableText>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CodeableText {
    #[serde(default)]
    pub text: Option<String>,
}

impl OperationOutcome {
    /// Parses a JSON value as an OperationOutcome, `None` for any other resource
    pub fn from_value(value: &Value) -> Option<Self> {
        if value.get("resourceType").and_then(Value::as_str) != Some("OperationOutcome") {
            return None;
        }
        serde_json::from_value(value.clone()).ok()
    }

    /// Issues in server order
    pub fn into_issues(self) -> Vec<Issue> {
        self.issue.into_iter().map(OutcomeIssue::into_issue).collect()
    }
}

impl OutcomeIssue {
    fn into_issue(self) -> Issue {
        let severity = parse_severity(&self.severity);
        let diagnostics = self
            .diagnostics
            .or_else(|| self.details.and_then(|d| d.text));
        Issue {
            severity,
            code: self.code,
            diagnostics,
        }
    }
}

fn parse_severity(raw: &str) -> IssueSeverity {
    match raw {
        "fatal" => IssueSeverity::Fatal,
        "warning" => IssueSeverity::Warning,
        "information" => IssueSeverity::Information,
        _ => IssueSeverity::Error,
    }
}

/// Issue synthesized when the server gave no structured reason
pub fn synthesized_issue(status: u16, reason: &str) -> Issue {
    Issue {
        severity: IssueSeverity::Error,
        code: "processing".to_string(),
        diagnostics: Some(format!("HTTP {status}: {reason}")),
    }
}

/// Body of a created or updated single resource
#[derive(Debug, Clone, Deserialize)]
pub struct ResourceBody {
    #[serde(rename = "resourceType")]
    pub resource_type: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub meta: Option<ResourceMeta>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResourceMeta {
    #[serde(rename = "versionId", default)]
    pub version_id: Option<String>,
}

impl ResourceBody {
    /// Assigned identity when the body names a known resource type and an id
    pub fn assigned_id(&self) -> Option<AssignedId> {
        let resource_type = ResourceType::from_str(&self.resource_type).ok()?;
        let id = self.id.clone().filter(|id| !id.is_empty())?;
        Some(AssignedId {
            resource_type,
            id,
            version: self.meta.as_ref().and_then(|m| m.version_id.clone()),
        })
    }
}

/// `Bundle` of type `transaction-response`
#[derive(Debug, Clone, Deserialize)]
pub struct ResponseBundle {
    #[serde(rename = "resourceType")]
    pub resource_type: String,

    #[serde(rename = "type", default)]
    pub bundle_type: Option<String>,

    #[serde(default)]
    pub entry: Vec<ResponseEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResponseEntry {
    #[serde(default)]
    pub response: Option<EntryResponse>,

    #[serde(default)]
    pub resource: Option<Value>,
}

/// `Bundle.entry.response`
#[derive(Debug, Clone, Deserialize)]
pub struct EntryResponse {
    /// Status line such as `201 Created`
    pub status: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub outcome: Option<Value>,
}

impl ResponseBundle {
    /// Parses a transaction-response bundle, `None` for anything else
    pub fn from_value(value: &Value) -> Option<Self> {
        let bundle: ResponseBundle = serde_json::from_value(value.clone()).ok()?;
        let is_response = bundle.resource_type == "Bundle"
            && matches!(
                bundle.bundle_type.as_deref(),
                Some("transaction-response") | Some("batch-response")
            );
        is_response.then_some(bundle)
    }
}

impl EntryResponse {
    /// Leading HTTP status code of the status line
    pub fn status_code(&self) -> Option<u16> {
        self.status
            .split_whitespace()
            .next()
            .and_then(|code| code.parse().ok())
    }

    /// Issues of the inline OperationOutcome, if any
    pub fn issues(&self) -> Vec<Issue> {
        self.outcome
            .as_ref()
            .and_then(OperationOutcome::from_value)
            .map(OperationOutcome::into_issues)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_operation_outcome_issues_verbatim() {
        let body = json!({
            "resourceType": "OperationOutcome",
            "issue": [
                {"severity": "error", "code": "required", "diagnostics": "Claim.insurance: minimum required = 1"},
                {"severity": "warning", "code": "business-rule", "details": {"text": "Code 23 billed twice"}}
            ]
        });
        let issues = OperationOutcome::from_value(&body).unwrap().into_issues();
        assert_eq!(issues.len(), 2);
        assert_eq!(issues[0].code, "required");
        assert_eq!(
            issues[0].diagnostics.as_deref(),
            Some("Claim.insurance: minimum required = 1")
        );
        assert_eq!(issues[1].severity, IssueSeverity::Warning);
        assert_eq!(issues[1].diagnostics.as_deref(), Some("Code 23 billed twice"));
    }

    #[test]
    fn test_other_resource_is_not_outcome() {
        assert!(OperationOutcome::from_value(&json!({"resourceType": "Claim"})).is_none());
        assert!(OperationOutcome::from_value(&json!("text")).is_none());
    }

    #[test]
    fn test_resource_body_assigned_id() {
        let body: ResourceBody = serde_json::from_value(json!({
            "resourceType": "Claim", "id": "c-1", "meta": {"versionId": "3"}
        }))
        .unwrap();
        let id = body.assigned_id().unwrap();
        assert_eq!(id.resource_type, ResourceType::Claim);
        assert_eq!(id.id, "c-1");
        assert_eq!(id.version.as_deref(), Some("3"));
    }

    #[test]
    fn test_entry_status_code() {
        let entry = EntryResponse {
            status: "201 Created".to_string(),
            location: None,
            outcome: None,
        };
        assert_eq!(entry.status_code(), Some(201));

        let bare = EntryResponse {
            status: "422".to_string(),
            location: None,
            outcome: None,
        };
        assert_eq!(bare.status_code(), Some(422));
    }

    #[test]
    fn test_response_bundle_type_checked() {
        let ok = json!({"resourceType": "Bundle", "type": "transaction-response", "entry": []});
        assert!(ResponseBundle::from_value(&ok).is_some());
        let wrong = json!({"resourceType": "Bundle", "type": "searchset"});
        assert!(ResponseBundle::from_value(&wrong).is_none());
    }
}
