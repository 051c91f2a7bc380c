//! Transaction payloads and submission units
//!
//! A [`TransactionPayload`] is an ordered list of entries that the document
//! server applies atomically. Entries carry their serialized resource so the
//! payload is exactly what goes on the wire.

use super::ids::{ResourceType, SyntheticId};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// One entry of a transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BundleEntry {
    /// Placeholder id, only for resources created by this transaction
    pub synthetic_id: Option<SyntheticId>,

    /// Type of the entry's resource
    pub resource_type: ResourceType,

    /// Serialized resource document
    pub resource: Value,

    /// Request URL relative to the server base
    pub url: String,
}

impl BundleEntry {
    /// Entry creating (`POST`) a new resource under a synthetic id
    pub fn create(synthetic_id: SyntheticId, resource_type: ResourceType, resource: Value) -> Self {
        Self {
            synthetic_id: Some(synthetic_id),
            resource_type,
            resource,
            url: resource_type.as_str().to_string(),
        }
    }

    fn to_json(&self) -> Value {
        let mut entry = serde_json::Map::new();
        if let Some(id) = &self.synthetic_id {
            entry.insert("fullUrl".to_string(), Value::String(id.to_string()));
        }
        entry.insert("resource".to_string(), self.resource.clone());
        entry.insert(
            "request".to_string(),
            json!({ "method": "POST", "url": self.url }),
        );
        Value::Object(entry)
    }
}

/// Ordered, atomic multi-resource submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionPayload {
    entries: Vec<BundleEntry>,
}

impl TransactionPayload {
    pub(crate) fn from_entries(entries: Vec<BundleEntry>) -> Self {
        Self { entries }
    }

    /// Entries in application order
    pub fn entries(&self) -> &[BundleEntry] {
        &self.entries
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the payload has no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Position of the first entry of a resource type
    pub fn position_of(&self, resource_type: ResourceType) -> Option<usize> {
        self.entries
            .iter()
            .position(|e| e.resource_type == resource_type)
    }

    /// Synthetic ids declared by the payload, in entry order
    pub fn synthetic_ids(&self) -> Vec<SyntheticId> {
        self.entries.iter().filter_map(|e| e.synthetic_id).collect()
    }

    /// The transaction as a FHIR `Bundle` document
    pub fn to_bundle(&self) -> Value {
        json!({
            "resourceType": "Bundle",
            "type": "transaction",
            "entry": self.entries.iter().map(BundleEntry::to_json).collect::<Vec<_>>(),
        })
    }
}

/// What the submission client sends
#[derive(Debug, Clone, PartialEq)]
pub enum Submission {
    /// One resource POSTed to its type endpoint
    Resource {
        resource_type: ResourceType,
        document: Value,
    },
    /// A transaction POSTed to the server root
    Transaction(TransactionPayload),
}

impl Submission {
    /// Request body
    pub fn body(&self) -> Value {
        match self {
            Submission::Resource { document, .. } => document.clone(),
            Submission::Transaction(payload) => payload.to_bundle(),
        }
    }

    /// Path relative to the server base (empty for the root)
    pub fn path(&self) -> &str {
        match self {
            Submission::Resource { resource_type, .. } => resource_type.as_str(),
            Submission::Transaction(_) => "",
        }
    }

    /// Short label for logs
    pub fn label(&self) -> String {
        match self {
            Submission::Resource { resource_type, .. } => resource_type.to_string(),
            Submission::Transaction(payload) => format!("transaction({} entries)", payload.len()),
        }
    }
}

/// Collects every `reference` string in a document, depth first
pub fn collect_references(value: &Value) -> Vec<String> {
    let mut found = Vec::new();
    walk_references(value, &mut found);
    found
}

fn walk_references(value: &Value, found: &mut Vec<String>) {
    match value {
        Value::Object(map) => {
            for (key, v) in map {
                if key == "reference" {
                    if let Value::String(s) = v {
                        found.push(s.clone());
                        continue;
                    }
                }
                walk_references(v, found);
            }
        }
        Value::Array(items) => {
            for v in items {
                walk_references(v, found);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_collect_references_nested() {
        let doc = json!({
            "resourceType": "Claim",
            "patient": {"reference": "Patient/1"},
            "item": [
                {"encounter": [{"reference": "urn:uuid:00000000-0000-0000-0000-000000000001"}]}
            ]
        });
        let mut refs = collect_references(&doc);
        refs.sort();
        assert_eq!(
            refs,
            vec![
                "Patient/1".to_string(),
                "urn:uuid:00000000-0000-0000-0000-000000000001".to_string(),
            ]
        );
    }

    #[test]
    fn test_bundle_shape() {
        let id = SyntheticId::from_uuid(Uuid::nil());
        let payload = TransactionPayload::from_entries(vec![BundleEntry::create(
            id,
            ResourceType::Patient,
            json!({"resourceType": "Patient"}),
        )]);
        let bundle = payload.to_bundle();
        assert_eq!(bundle["type"], "transaction");
        assert_eq!(bundle["entry"][0]["fullUrl"], id.to_string());
        assert_eq!(bundle["entry"][0]["request"]["method"], "POST");
        assert_eq!(bundle["entry"][0]["request"]["url"], "Patient");
        assert_eq!(payload.position_of(ResourceType::Patient), Some(0));
        assert_eq!(payload.position_of(ResourceType::Claim), None);
    }

    #[test]
    fn test_submission_paths() {
        let single = Submission::Resource {
            resource_type: ResourceType::Claim,
            document: json!({}),
        };
        assert_eq!(single.path(), "Claim");
        let tx = Submission::Transaction(TransactionPayload::from_entries(Vec::new()));
        assert_eq!(tx.path(), "");
        assert_eq!(tx.label(), "transaction(0 entries)");
    }
}
