//! Loosely-typed claim requests and their conversion to domain values
//!
//! Callers send JSON shaped for convenience: codes may be strings or numbers,
//! timestamps are strings, parties are either `{id}` or demographics. All of
//! it is checked here, before any metadata is resolved.

use crate::core::builder::ClaimHeader;
use crate::domain::{
    ClaimPriority, ClaimStatus, ClaimwrightError, ClinicalNote, EncounterContext, LocalKey,
    NoteKind, Parties, Party, PartyDetails, Reference, ResourceType, Result, SelectedItem,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Encounter class used when the request names none (ambulatory)
pub const DEFAULT_ENCOUNTER_CLASS: &str = "AMB";

const GENDERS: [&str; 4] = ["male", "female", "other", "unknown"];

/// Claim request body as received
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClaimRequest {
    #[serde(default)]
    pub items: Vec<ItemInput>,

    #[serde(default)]
    pub notes: Vec<NoteInput>,

    /// Existing encounter (single submissions)
    #[serde(default)]
    pub encounter_id: Option<String>,

    #[serde(default)]
    pub encounter: Option<EncounterInput>,

    #[serde(default)]
    pub patient: Option<PartyInput>,

    #[serde(default)]
    pub practitioner: Option<PartyInput>,

    #[serde(default)]
    pub coverage_id: Option<String>,

    #[serde(default)]
    pub status: Option<String>,

    #[serde(default)]
    pub priority: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemInput {
    /// String or number
    pub code: Value,

    #[serde(default)]
    pub quantity: Option<i64>,

    #[serde(default)]
    pub modifiers: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteInput {
    pub text: String,

    #[serde(default)]
    pub kind: Option<String>,

    #[serde(default)]
    pub authored_at: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EncounterInput {
    #[serde(default)]
    pub class: Option<String>,

    #[serde(default, rename = "type")]
    pub type_text: Option<String>,

    #[serde(default)]
    pub service_category: Option<String>,

    #[serde(default)]
    pub start: Option<String>,

    #[serde(default)]
    pub end: Option<String>,
}

/// `{id}` for an existing party, demographics for one to create
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PartyInput {
    #[serde(default)]
    pub id: Option<String>,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub identifier: Option<String>,

    #[serde(default)]
    pub birth_date: Option<String>,

    #[serde(default)]
    pub gender: Option<String>,
}

/// A request after conversion
#[derive(Debug, Clone, PartialEq)]
pub struct ClaimInput {
    pub items: Vec<SelectedItem>,
    pub notes: Vec<ClinicalNote>,
    pub encounter_ref: Option<Reference>,
    pub context: EncounterContext,
    pub parties: Parties,
    pub header: ClaimHeader,
}

impl ClaimInput {
    /// Codes to resolve, in item order
    pub fn codes(&self) -> Vec<String> {
        self.items.iter().map(|i| i.code.clone()).collect()
    }

    /// Whether both parties already exist on the server
    pub fn parties_persisted(&self) -> bool {
        self.parties.patient.is_persisted() && self.parties.practitioner.is_persisted()
    }
}

impl ClaimRequest {
    /// Parses a request from arbitrary JSON
    ///
    /// # Errors
    ///
    /// Returns [`ClaimwrightError::Validation`] if the JSON does not have the
    /// request shape.
    pub fn from_value(value: Value) -> Result<Self> {
        serde_json::from_value(value)
            .map_err(|e| ClaimwrightError::Validation(format!("Malformed claim request: {e}")))
    }

    /// Converts to typed values, `now` standing in for absent timestamps
    ///
    /// # Errors
    ///
    /// Returns [`ClaimwrightError::Validation`] naming the first bad field.
    pub fn into_input(self, now: DateTime<Utc>) -> Result<ClaimInput> {
        let items = self
            .items
            .iter()
            .enumerate()
            .map(|(i, item)| convert_item(i, item))
            .collect::<Result<Vec<_>>>()?;

        let notes = self
            .notes
            .into_iter()
            .map(convert_note)
            .collect::<Result<Vec<_>>>()?;

        let encounter_ref = self
            .encounter_id
            .as_deref()
            .map(|id| existing_reference("encounter_id", id, ResourceType::Encounter))
            .transpose()?;

        let context = convert_encounter(self.encounter.unwrap_or_default(), now)?;

        let patient = convert_party(
            self.patient.as_ref(),
            ResourceType::Patient,
            LocalKey::Patient,
        )?;
        let practitioner = convert_party(
            self.practitioner.as_ref(),
            ResourceType::Practitioner,
            LocalKey::Practitioner,
        )?;
        if !patient.is_persisted()
            && patient.reference.to_string() == practitioner.reference.to_string()
        {
            return Err(invalid(
                "practitioner",
                format!("{} is already the patient's id", practitioner.reference),
            ));
        }

        let coverage = self
            .coverage_id
            .as_deref()
            .map(|id| existing_reference("coverage_id", id, ResourceType::Coverage))
            .transpose()?;

        let status = match self.status.as_deref() {
            Some(s) => s.parse::<ClaimStatus>().map_err(|e| invalid("status", e))?,
            None => ClaimStatus::default(),
        };
        let priority = match self.priority.as_deref() {
            Some(p) => p.parse::<ClaimPriority>().map_err(|e| invalid("priority", e))?,
            None => ClaimPriority::default(),
        };

        Ok(ClaimInput {
            items,
            notes,
            encounter_ref,
            context,
            parties: Parties {
                patient,
                practitioner,
            },
            header: ClaimHeader {
                status,
                priority,
                coverage,
                created: now,
            },
        })
    }
}

/// Reference to a resource the server already holds
///
/// A `urn:uuid:` id names a resource created by the same transaction, which a
/// request can only do for its parties.
fn existing_reference(field: &str, id: &str, resource_type: ResourceType) -> Result<Reference> {
    let reference = Reference::parse_party(id, resource_type).map_err(|e| invalid(field, e))?;
    if !reference.is_persisted() {
        return Err(invalid(field, format!("'{id}' must name an existing {resource_type}")));
    }
    Ok(reference)
}

fn invalid(field: &str, message: impl std::fmt::Display) -> ClaimwrightError {
    ClaimwrightError::Validation(format!("{field}: {message}"))
}

fn convert_item(index: usize, item: &ItemInput) -> Result<SelectedItem> {
    let field = format!("items[{index}]");
    let code = match &item.code {
        Value::String(s) => s.clone(),
        Value::Number(n) if n.is_u64() || n.is_i64() => n.to_string(),
        other => return Err(invalid(&field, format!("code must be a string or integer, got {other}"))),
    };
    let quantity = match item.quantity {
        None => 1,
        Some(q) => u32::try_from(q)
            .map_err(|_| invalid(&field, format!("quantity {q} is out of range")))?,
    };
    SelectedItem::new(code, quantity, item.modifiers.iter().cloned())
        .map_err(|e| invalid(&field, e))
}

fn convert_note(note: NoteInput) -> Result<ClinicalNote> {
    let kind = match note.kind.as_deref() {
        Some(k) => k.parse::<NoteKind>().map_err(|e| invalid("notes.kind", e))?,
        None => NoteKind::default(),
    };
    let authored_at = note
        .authored_at
        .as_deref()
        .map(|t| parse_timestamp("notes.authored_at", t))
        .transpose()?;
    ClinicalNote::new(note.text, kind, authored_at).map_err(|e| invalid("notes", e))
}

fn convert_encounter(input: EncounterInput, now: DateTime<Utc>) -> Result<EncounterContext> {
    let start = match input.start.as_deref() {
        Some(s) => parse_timestamp("encounter.start", s)?,
        None => now,
    };
    let end = input
        .end
        .as_deref()
        .map(|e| parse_timestamp("encounter.end", e))
        .transpose()?;

    Ok(EncounterContext {
        class: input
            .class
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_ENCOUNTER_CLASS.to_string()),
        type_text: input.type_text,
        service_category: input.service_category,
        start,
        end,
    })
}

fn convert_party(
    input: Option<&PartyInput>,
    resource_type: ResourceType,
    key: LocalKey,
) -> Result<Party> {
    let field = resource_type.as_str().to_lowercase();
    let input = input.ok_or_else(|| invalid(&field, "is required"))?;

    let reference = input
        .id
        .as_deref()
        .map(|id| Reference::parse_party(id, resource_type).map_err(|e| invalid(&field, e)))
        .transpose()?;
    if let Some(reference) = &reference {
        if reference.is_persisted() {
            return Ok(Party::existing(reference.clone()));
        }
    }

    let name = input
        .name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .ok_or_else(|| match &reference {
            Some(reference) => invalid(
                &field,
                format!("{reference} is created by this request and needs a name"),
            ),
            None => invalid(&field, "needs either an id or a name"),
        })?;

    let birth_date = input
        .birth_date
        .as_deref()
        .map(|d| {
            NaiveDate::parse_from_str(d.trim(), "%Y-%m-%d")
                .map_err(|e| invalid(&format!("{field}.birth_date"), e))
        })
        .transpose()?;

    let gender = input
        .gender
        .as_deref()
        .map(|g| {
            let g = g.trim().to_lowercase();
            if GENDERS.contains(&g.as_str()) {
                Ok(g)
            } else {
                Err(invalid(
                    &format!("{field}.gender"),
                    format!("'{g}' must be one of: {}", GENDERS.join(", ")),
                ))
            }
        })
        .transpose()?;

    let details = PartyDetails {
        name: name.to_string(),
        identifier: input.identifier.clone(),
        birth_date,
        gender,
    };
    Ok(match reference {
        Some(reference) => Party::to_create_as(reference, details),
        None => Party::to_create(key, details),
    })
}

fn parse_timestamp(field: &str, value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value.trim())
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| invalid(field, format!("'{value}' is not an RFC 3339 timestamp: {e}")))
}
