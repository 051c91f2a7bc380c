//! Resource identifiers and references
//!
//! A reference points at a resource in one of three ways:
//!
//! - **Persisted**: the resource already exists on the document server
//!   (`persisted:{id}` on input, `Patient/{id}` on the wire)
//! - **Local**: a builder-assigned key for a resource in the graph being built
//! - **Synthetic**: a transaction-local `urn:uuid:` placeholder for a resource
//!   created by the same transaction
//!
//! Assembly turns every `Local` reference into either a `Synthetic` one backed
//! by a payload entry or an error.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

const PERSISTED_PREFIX: &str = "persisted:";
const URN_UUID_PREFIX: &str = "urn:uuid:";

/// FHIR resource types produced or referenced by the claim pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ResourceType {
    Patient,
    Practitioner,
    Encounter,
    Claim,
    Coverage,
}

impl ResourceType {
    /// Returns the FHIR resource type name
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::Patient => "Patient",
            ResourceType::Practitioner => "Practitioner",
            ResourceType::Encounter => "Encounter",
            ResourceType::Claim => "Claim",
            ResourceType::Coverage => "Coverage",
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Patient" => Ok(ResourceType::Patient),
            "Practitioner" => Ok(ResourceType::Practitioner),
            "Encounter" => Ok(ResourceType::Encounter),
            "Claim" => Ok(ResourceType::Claim),
            "Coverage" => Ok(ResourceType::Coverage),
            other => Err(format!("Unsupported resource type: {other}")),
        }
    }
}

/// Transaction-local placeholder identifier (`urn:uuid:{uuid}`)
///
/// # Examples
///
/// ```
/// use claimwright::domain::ids::SyntheticId;
/// use uuid::Uuid;
///
/// let id = SyntheticId::from_uuid(Uuid::nil());
/// assert_eq!(id.to_string(), "urn:uuid:00000000-0000-0000-0000-000000000000");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SyntheticId(Uuid);

impl SyntheticId {
    /// Wraps a UUID
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl fmt::Display for SyntheticId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{URN_UUID_PREFIX}{}", self.0)
    }
}

impl FromStr for SyntheticId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s
            .strip_prefix(URN_UUID_PREFIX)
            .ok_or_else(|| format!("Synthetic identifier must start with {URN_UUID_PREFIX}: {s}"))?;
        Uuid::parse_str(raw)
            .map(Self)
            .map_err(|e| format!("Invalid synthetic identifier {s}: {e}"))
    }
}

/// Builder-assigned key of a resource inside one claim graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LocalKey {
    Patient,
    Practitioner,
    Encounter,
    Claim,
}

impl LocalKey {
    /// Resource type the key stands for
    pub fn resource_type(&self) -> ResourceType {
        match self {
            LocalKey::Patient => ResourceType::Patient,
            LocalKey::Practitioner => ResourceType::Practitioner,
            LocalKey::Encounter => ResourceType::Encounter,
            LocalKey::Claim => ResourceType::Claim,
        }
    }
}

/// A reference from one resource to another
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Reference {
    /// Resource already stored on the document server
    Persisted {
        resource_type: ResourceType,
        id: String,
    },
    /// Resource being built in the current graph, not yet assigned a wire id
    Local { key: LocalKey },
    /// Resource created inside the same transaction payload
    Synthetic {
        resource_type: ResourceType,
        id: SyntheticId,
    },
}

impl Reference {
    /// Reference to an existing server resource
    ///
    /// # Errors
    ///
    /// Returns an error for an empty id or an id containing `/`.
    pub fn persisted(resource_type: ResourceType, id: impl Into<String>) -> Result<Self, String> {
        let id = id.into();
        let id = id.trim().to_string();
        if id.is_empty() {
            return Err(format!("{resource_type} id cannot be empty"));
        }
        if id.contains('/') || id.chars().any(char::is_whitespace) {
            return Err(format!("Invalid {resource_type} id: {id}"));
        }
        Ok(Reference::Persisted { resource_type, id })
    }

    /// Reference to a resource of the graph under construction
    pub fn local(key: LocalKey) -> Self {
        Reference::Local { key }
    }

    /// Parses a party reference in either `persisted:{id}` or `urn:uuid:{uuid}`
    /// form. A bare id is treated as persisted.
    ///
    /// # Examples
    ///
    /// ```
    /// use claimwright::domain::ids::{Reference, ResourceType};
    ///
    /// let r = Reference::parse_party("persisted:123", ResourceType::Patient).unwrap();
    /// assert_eq!(r.to_string(), "Patient/123");
    /// assert!(r.is_persisted());
    /// ```
    pub fn parse_party(value: &str, resource_type: ResourceType) -> Result<Self, String> {
        let value = value.trim();
        if let Some(id) = value.strip_prefix(PERSISTED_PREFIX) {
            return Self::persisted(resource_type, id);
        }
        if value.starts_with(URN_UUID_PREFIX) {
            let id = SyntheticId::from_str(value)?;
            return Ok(Reference::Synthetic { resource_type, id });
        }
        let bare = value
            .strip_prefix(resource_type.as_str())
            .and_then(|rest| rest.strip_prefix('/'))
            .unwrap_or(value);
        Self::persisted(resource_type, bare)
    }

    /// Whether the referenced resource already exists on the server
    pub fn is_persisted(&self) -> bool {
        matches!(self, Reference::Persisted { .. })
    }

    /// Resource type of the target
    pub fn resource_type(&self) -> ResourceType {
        match self {
            Reference::Persisted { resource_type, .. } => *resource_type,
            Reference::Local { key } => key.resource_type(),
            Reference::Synthetic { resource_type, .. } => *resource_type,
        }
    }

    /// Persisted server id, if any
    pub fn persisted_id(&self) -> Option<&str> {
        match self {
            Reference::Persisted { id, .. } => Some(id),
            _ => None,
        }
    }
}

/// Wire form of the reference (`Patient/123`, `urn:uuid:...`)
///
/// Local references have no wire form; they print as `#local:{type}` so that
/// a leak into a document is obvious.
impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reference::Persisted { resource_type, id } => write!(f, "{resource_type}/{id}"),
            Reference::Synthetic { id, .. } => write!(f, "{id}"),
            Reference::Local { key } => write!(f, "#local:{}", key.resource_type()),
        }
    }
}
