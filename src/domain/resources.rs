//! Intermediate resource records
//!
//! These records are what the reference graph builder produces and the
//! document assembler consumes. They are typed, cross-referenced through
//! [`Reference`], and never mutated after construction: assembly returns new
//! records with rewritten references.

use super::billing::{BillingCode, PriceAdjustment};
use super::ids::{LocalKey, Reference, ResourceType};
use super::money::Money;
use super::note::ClinicalNote;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Demographic details for a party the transaction has to create
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartyDetails {
    /// Display name ("Given Family")
    pub name: String,

    /// Business identifier (e.g. Medicare number, provider number)
    #[serde(default)]
    pub identifier: Option<String>,

    /// Date of birth (patients only)
    #[serde(default)]
    pub birth_date: Option<NaiveDate>,

    /// Administrative gender (patients only)
    #[serde(default)]
    pub gender: Option<String>,
}

/// A patient or practitioner taking part in the claim
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Party {
    /// How other resources refer to this party
    pub reference: Reference,

    /// Present when the party must be created
    pub details: Option<PartyDetails>,
}

impl Party {
    /// A party that already exists on the document server
    pub fn existing(reference: Reference) -> Self {
        Self {
            reference,
            details: None,
        }
    }

    /// A party created by the submitting transaction
    pub fn to_create(key: LocalKey, details: PartyDetails) -> Self {
        Self {
            reference: Reference::local(key),
            details: Some(details),
        }
    }

    /// A party created by the submitting transaction under a caller-chosen
    /// `urn:uuid:` id
    pub fn to_create_as(reference: Reference, details: PartyDetails) -> Self {
        Self {
            reference,
            details: Some(details),
        }
    }

    /// Whether the party already exists on the server
    pub fn is_persisted(&self) -> bool {
        self.reference.is_persisted()
    }
}

/// Patient and practitioner for one claim
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parties {
    pub patient: Party,
    pub practitioner: Party,
}

/// Visit metadata supplied by the caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncounterContext {
    /// Encounter class code (e.g. "AMB", "VR", "HH")
    pub class: String,

    /// Free-text encounter type
    pub type_text: Option<String>,

    /// Service category
    pub service_category: Option<String>,

    /// Period start
    pub start: DateTime<Utc>,

    /// Period end
    pub end: Option<DateTime<Utc>>,
}

/// Encounter record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncounterResource {
    /// Identity of this encounter within the graph
    pub id: Reference,

    /// Encounter status (always "finished" for billed visits)
    pub status: String,

    pub class: String,
    pub type_text: Option<String>,
    pub service_category: Option<String>,
    pub period_start: DateTime<Utc>,
    pub period_end: Option<DateTime<Utc>>,

    /// Patient reference
    pub subject: Reference,

    /// Practitioner reference
    pub participant: Reference,
}

/// Claim status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClaimStatus {
    Draft,
    #[default]
    Active,
    Cancelled,
}

impl ClaimStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClaimStatus::Draft => "draft",
            ClaimStatus::Active => "active",
            ClaimStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for ClaimStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClaimStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "draft" => Ok(ClaimStatus::Draft),
            "active" => Ok(ClaimStatus::Active),
            "cancelled" => Ok(ClaimStatus::Cancelled),
            other => Err(format!(
                "Invalid claim status '{other}'. Must be one of: draft, active, cancelled"
            )),
        }
    }
}

/// Claim processing priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClaimPriority {
    Stat,
    #[default]
    Normal,
    Deferred,
}

impl ClaimPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClaimPriority::Stat => "stat",
            ClaimPriority::Normal => "normal",
            ClaimPriority::Deferred => "deferred",
        }
    }
}

impl fmt::Display for ClaimPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClaimPriority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "stat" => Ok(ClaimPriority::Stat),
            "normal" => Ok(ClaimPriority::Normal),
            "deferred" => Ok(ClaimPriority::Deferred),
            other => Err(format!(
                "Invalid claim priority '{other}'. Must be one of: stat, normal, deferred"
            )),
        }
    }
}

/// One priced line of a claim
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimLineItem {
    /// 1-based position in input order
    pub sequence: u32,

    /// Resolved billing code
    pub code: BillingCode,

    /// Units billed
    pub quantity: u32,

    /// Modifiers in application order
    pub modifiers: Vec<String>,

    /// `unit_price * quantity`, before modifier adjustments
    pub base_price: Money,

    /// Adjustments applied to reach `price`
    pub adjustments: Vec<PriceAdjustment>,

    /// Final line price
    pub price: Money,
}

/// Claim record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimResource {
    /// Identity of this claim within the graph
    pub id: Reference,

    pub status: ClaimStatus,
    pub priority: ClaimPriority,

    /// Claim type code (professional claims only)
    pub claim_type: String,

    pub patient: Reference,
    pub provider: Reference,
    pub encounter: Reference,

    /// Insurance coverage, when the caller supplied one
    pub coverage: Option<Reference>,

    pub created: DateTime<Utc>,
    pub items: Vec<ClaimLineItem>,
    pub notes: Vec<ClinicalNote>,

    /// Currency-checked sum of line prices
    pub total: Money,
}

impl ClaimResource {
    /// All outgoing references of the claim
    pub fn references(&self) -> Vec<&Reference> {
        let mut refs = vec![&self.patient, &self.provider, &self.encounter];
        if let Some(coverage) = &self.coverage {
            refs.push(coverage);
        }
        refs
    }

    /// Billing codes on the claim in line order
    pub fn codes(&self) -> Vec<&str> {
        self.items.iter().map(|i| i.code.code.as_str()).collect()
    }
}

impl EncounterResource {
    /// All outgoing references of the encounter
    pub fn references(&self) -> Vec<&Reference> {
        vec![&self.subject, &self.participant]
    }
}

/// Convenience check used when assembling: a reference must target `expected`
pub(crate) fn expect_type(reference: &Reference, expected: ResourceType) -> Result<(), String> {
    if reference.resource_type() != expected {
        return Err(format!(
            "Expected a {expected} reference, got {}",
            reference.resource_type()
        ));
    }
    Ok(())
}
