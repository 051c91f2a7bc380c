//! Submission outcomes
//!
//! The submission client never returns an error: every way a submission can
//! end is a [`SubmissionOutcome`] variant. The orchestrator turns the
//! non-accepted variants into [`SubmissionError`](super::errors::SubmissionError).

use super::ids::ResourceType;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Severity of a server-reported issue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueSeverity {
    Fatal,
    Error,
    Warning,
    Information,
}

impl fmt::Display for IssueSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            IssueSeverity::Fatal => "fatal",
            IssueSeverity::Error => "error",
            IssueSeverity::Warning => "warning",
            IssueSeverity::Information => "information",
        };
        f.write_str(s)
    }
}

/// One issue from a structured rejection, preserved verbatim
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub severity: IssueSeverity,
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnostics: Option<String>,
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.diagnostics {
            Some(d) => write!(f, "[{}/{}] {}", self.severity, self.code, d),
            None => write!(f, "[{}/{}]", self.severity, self.code),
        }
    }
}

/// Server-assigned identity of one stored resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignedId {
    pub resource_type: ResourceType,
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl AssignedId {
    /// Parses a location such as `Claim/123/_history/2` or an absolute URL
    /// ending in that form.
    ///
    /// # Examples
    ///
    /// ```
    /// use claimwright::domain::outcome::AssignedId;
    ///
    /// let id = AssignedId::from_location("https://fhir.example.org/Claim/123/_history/2").unwrap();
    /// assert_eq!(id.id, "123");
    /// assert_eq!(id.version.as_deref(), Some("2"));
    /// ```
    pub fn from_location(location: &str) -> Option<Self> {
        let segments: Vec<&str> = location
            .trim_end_matches('/')
            .split('/')
            .filter(|s| !s.is_empty())
            .collect();
        // Find the last "<Type>/<id>" pair, optionally followed by "_history/<v>"
        for i in (0..segments.len().saturating_sub(1)).rev() {
            if let Ok(resource_type) = ResourceType::from_str(segments[i]) {
                let id = segments[i + 1].to_string();
                let version = match (segments.get(i + 2), segments.get(i + 3)) {
                    (Some(&"_history"), Some(v)) => Some(v.to_string()),
                    _ => None,
                };
                return Some(Self {
                    resource_type,
                    id,
                    version,
                });
            }
        }
        None
    }
}

/// Identifiers the server assigned to accepted resources, in entry order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerIds {
    pub assigned: Vec<AssignedId>,
}

impl ServerIds {
    /// Server id of the first resource of a type
    pub fn id_for(&self, resource_type: ResourceType) -> Option<&str> {
        self.assigned
            .iter()
            .find(|a| a.resource_type == resource_type)
            .map(|a| a.id.as_str())
    }
}

/// Per-entry status in a transaction response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryResult {
    /// Index of the request entry this result answers
    pub index: usize,
    pub resource_type: Option<ResourceType>,
    /// HTTP status code parsed from the entry's status line
    pub status: u16,
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<Issue>,
}

impl EntryResult {
    /// Whether this entry took effect
    pub fn succeeded(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Details of a transaction that took effect only in part
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartialApplication {
    pub entries: Vec<EntryResult>,
}

impl PartialApplication {
    /// Entries that took effect
    pub fn applied(&self) -> impl Iterator<Item = &EntryResult> {
        self.entries.iter().filter(|e| e.succeeded())
    }

    /// Entries that did not take effect
    pub fn failed(&self) -> impl Iterator<Item = &EntryResult> {
        self.entries.iter().filter(|e| !e.succeeded())
    }
}

impl fmt::Display for PartialApplication {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} of {} entries applied; failed entries: {}",
            self.applied().count(),
            self.entries.len(),
            self.failed()
                .map(|e| format!("#{} ({})", e.index, e.status))
                .collect::<Vec<_>>()
                .join(", ")
        )
    }
}

/// Result of one submission attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "details", rename_all = "snake_case")]
pub enum SubmissionOutcome {
    Accepted(ServerIds),
    Rejected(Vec<Issue>),
    PartiallyApplied(PartialApplication),
    TransportFailure(String),
}

impl SubmissionOutcome {
    /// Short outcome name for logs
    pub fn name(&self) -> &'static str {
        match self {
            SubmissionOutcome::Accepted(_) => "accepted",
            SubmissionOutcome::Rejected(_) => "rejected",
            SubmissionOutcome::PartiallyApplied(_) => "partially_applied",
            SubmissionOutcome::TransportFailure(_) => "transport_failure",
        }
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self, SubmissionOutcome::Accepted(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_relative() {
        let id = AssignedId::from_location("Patient/abc").unwrap();
        assert_eq!(id.resource_type, ResourceType::Patient);
        assert_eq!(id.id, "abc");
        assert!(id.version.is_none());
    }

    #[test]
    fn test_location_unknown_type() {
        assert!(AssignedId::from_location("Observation/1").is_none());
        assert!(AssignedId::from_location("").is_none());
    }

    #[test]
    fn test_server_ids_lookup() {
        let ids = ServerIds {
            assigned: vec![
                AssignedId::from_location("Encounter/e1/_history/1").unwrap(),
                AssignedId::from_location("Claim/c1/_history/1").unwrap(),
            ],
        };
        assert_eq!(ids.id_for(ResourceType::Claim), Some("c1"));
        assert_eq!(ids.id_for(ResourceType::Patient), None);
    }

    #[test]
    fn test_partial_application_display() {
        let partial = PartialApplication {
            entries: vec![
                EntryResult {
                    index: 0,
                    resource_type: Some(ResourceType::Encounter),
                    status: 201,
                    location: Some("Encounter/1".to_string()),
                    issues: Vec::new(),
                },
                EntryResult {
                    index: 1,
                    resource_type: Some(ResourceType::Claim),
                    status: 422,
                    location: None,
                    issues: Vec::new(),
                },
            ],
        };
        assert_eq!(
            partial.to_string(),
            "1 of 2 entries applied; failed entries: #1 (422)"
        );
    }

    #[test]
    fn test_issue_display() {
        let issue = Issue {
            severity: IssueSeverity::Error,
            code: "required".to_string(),
            diagnostics: Some("Claim.insurance: minimum required = 1".to_string()),
        };
        assert_eq!(
            issue.to_string(),
            "[error/required] Claim.insurance: minimum required = 1"
        );
    }
}
