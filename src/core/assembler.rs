//! Document assembly
//!
//! Serializes built records into FHIR R4 JSON and resolves their internal
//! references. Two forms exist:
//!
//! - **single**: the encounter already exists on the server, so the claim
//!   may only point at persisted resources
//! - **transaction**: every resource not yet persisted gets a fresh
//!   `urn:uuid:` identifier and its own entry; entries are ordered patient,
//!   practitioner, encounter, claim
//!
//! No payload leaves this module with a reference that is neither persisted
//! nor declared by one of its own entries.

use crate::domain::bundle::collect_references;
use crate::domain::{
    BundleEntry, ClaimResource, ClaimwrightError, EncounterResource, LocalKey, Money, Party,
    PartyDetails, Reference, ResourceType, Result, SyntheticId, TransactionPayload,
};
use chrono::{DateTime, SecondsFormat, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::collections::{BTreeMap, HashSet};
use uuid::Uuid;

/// Code system of billing item codes
pub const BILLING_CODE_SYSTEM: &str = "urn:claimwright:billing-code";

const CLAIM_TYPE_SYSTEM: &str = "http://terminology.hl7.org/CodeSystem/claim-type";
const PRIORITY_SYSTEM: &str = "http://terminology.hl7.org/CodeSystem/processpriority";
const ACT_CODE_SYSTEM: &str = "http://terminology.hl7.org/CodeSystem/v3-ActCode";
const INFO_CATEGORY_SYSTEM: &str =
    "http://terminology.hl7.org/CodeSystem/claiminformationcategory";

/// Source of synthetic identifiers for one payload
pub trait IdGenerator: Send {
    fn next_id(&mut self) -> SyntheticId;
}

/// Random v4 identifiers
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomIdGenerator;

impl IdGenerator for RandomIdGenerator {
    fn next_id(&mut self) -> SyntheticId {
        SyntheticId::from_uuid(Uuid::new_v4())
    }
}

/// Reproducible identifiers drawn from a seeded RNG
///
/// Two generators with the same seed yield the same sequence.
#[derive(Debug, Clone)]
pub struct SeededIdGenerator {
    rng: StdRng,
}

impl SeededIdGenerator {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl IdGenerator for SeededIdGenerator {
    fn next_id(&mut self) -> SyntheticId {
        let bytes: [u8; 16] = self.rng.gen();
        SyntheticId::from_uuid(uuid::Builder::from_random_bytes(bytes).into_uuid())
    }
}

/// Points a claim at an existing encounter
///
/// The input claim is left untouched; a new value is returned.
///
/// # Errors
///
/// Returns [`ClaimwrightError::Assembly`] if `encounter_ref` is not a
/// persisted encounter or any other claim reference is not persisted.
pub fn assemble_single(claim: &ClaimResource, encounter_ref: &Reference) -> Result<ClaimResource> {
    if encounter_ref.resource_type() != ResourceType::Encounter || !encounter_ref.is_persisted() {
        return Err(ClaimwrightError::Assembly(format!(
            "Single submission needs a persisted encounter reference, got {encounter_ref}"
        )));
    }

    let mut assembled = claim.clone();
    assembled.encounter = encounter_ref.clone();

    if let Some(dangling) = assembled.references().into_iter().find(|r| !r.is_persisted()) {
        return Err(ClaimwrightError::Assembly(format!(
            "Claim references {dangling}, which is not a persisted resource"
        )));
    }

    Ok(assembled)
}

/// Builds the transaction creating every not-yet-persisted resource
///
/// # Errors
///
/// Returns [`ClaimwrightError::Assembly`] when a party to create carries no
/// details, a synthetic id repeats, or a reference would dangle.
pub fn assemble_transaction(
    patient: &Party,
    practitioner: &Party,
    encounter: &EncounterResource,
    claim: &ClaimResource,
    ids: &mut dyn IdGenerator,
) -> Result<TransactionPayload> {
    let mut synthetic: BTreeMap<LocalKey, Reference> = BTreeMap::new();
    let mut entries = Vec::with_capacity(4);

    for party in [patient, practitioner] {
        let (resource_type, id) = match &party.reference {
            Reference::Persisted { .. } => continue,
            Reference::Synthetic { resource_type, id } => (*resource_type, *id),
            Reference::Local { key } => {
                let id = ids.next_id();
                synthetic.insert(
                    *key,
                    Reference::Synthetic {
                        resource_type: key.resource_type(),
                        id,
                    },
                );
                (key.resource_type(), id)
            }
        };
        let details = party.details.as_ref().ok_or_else(|| {
            ClaimwrightError::Assembly(format!(
                "{resource_type} to create has no demographic details"
            ))
        })?;
        entries.push(BundleEntry::create(
            id,
            resource_type,
            party_document(resource_type, details),
        ));
    }

    let mut encounter = encounter.clone();
    if let Reference::Local { key } = &encounter.id {
        let id = ids.next_id();
        synthetic.insert(
            *key,
            Reference::Synthetic {
                resource_type: ResourceType::Encounter,
                id,
            },
        );
    }
    encounter.id = rewrite(&encounter.id, &synthetic);
    encounter.subject = rewrite(&encounter.subject, &synthetic);
    encounter.participant = rewrite(&encounter.participant, &synthetic);

    let mut claim = claim.clone();
    if let Reference::Local { key } = &claim.id {
        let id = ids.next_id();
        synthetic.insert(
            *key,
            Reference::Synthetic {
                resource_type: ResourceType::Claim,
                id,
            },
        );
    }
    claim.id = rewrite(&claim.id, &synthetic);
    claim.patient = rewrite(&claim.patient, &synthetic);
    claim.provider = rewrite(&claim.provider, &synthetic);
    claim.encounter = rewrite(&claim.encounter, &synthetic);
    claim.coverage = claim.coverage.as_ref().map(|c| rewrite(c, &synthetic));

    if let Reference::Synthetic { id, .. } = &encounter.id {
        entries.push(BundleEntry::create(
            *id,
            ResourceType::Encounter,
            encounter_document(&encounter)?,
        ));
    }
    match &claim.id {
        Reference::Synthetic { id, .. } => entries.push(BundleEntry::create(
            *id,
            ResourceType::Claim,
            claim_document(&claim)?,
        )),
        other => {
            return Err(ClaimwrightError::Assembly(format!(
                "Transaction claim must be new, got {other}"
            )))
        }
    }

    let payload = TransactionPayload::from_entries(entries);
    verify_payload(&payload)?;

    tracing::debug!(
        entries = payload.len(),
        synthetic_ids = payload.synthetic_ids().len(),
        "Assembled transaction"
    );

    Ok(payload)
}

fn rewrite(reference: &Reference, synthetic: &BTreeMap<LocalKey, Reference>) -> Reference {
    match reference {
        Reference::Local { key } => synthetic
            .get(key)
            .cloned()
            .unwrap_or_else(|| reference.clone()),
        other => other.clone(),
    }
}

/// Checks id uniqueness and that every reference resolves
fn verify_payload(payload: &TransactionPayload) -> Result<()> {
    let mut declared = HashSet::new();
    for id in payload.synthetic_ids() {
        if !declared.insert(id.to_string()) {
            return Err(ClaimwrightError::Assembly(format!(
                "Synthetic identifier {id} is used by more than one entry"
            )));
        }
    }

    for entry in payload.entries() {
        for reference in collect_references(&entry.resource) {
            if !declared.contains(&reference) && !is_persisted_reference(&reference) {
                return Err(ClaimwrightError::Assembly(format!(
                    "{} entry references {reference}, which the transaction does not create",
                    entry.resource_type
                )));
            }
        }
    }

    if payload.entries().last().map(|e| e.resource_type) != Some(ResourceType::Claim) {
        return Err(ClaimwrightError::Assembly(
            "Claim must be the last transaction entry".to_string(),
        ));
    }

    Ok(())
}

/// `Type/id` form of a persisted resource
fn is_persisted_reference(reference: &str) -> bool {
    match reference.split_once('/') {
        Some((resource_type, id)) => {
            resource_type.parse::<ResourceType>().is_ok() && !id.is_empty() && !id.contains('/')
        }
        None => false,
    }
}

fn reference_json(reference: &Reference) -> Result<Value> {
    match reference {
        Reference::Local { .. } => Err(ClaimwrightError::Assembly(format!(
            "Unresolved internal reference {reference}"
        ))),
        _ => Ok(json!({ "reference": reference.to_string() })),
    }
}

/// FHIR `Money`; the amount goes out as a JSON number
#[derive(Serialize)]
struct MoneyJson<'a> {
    #[serde(with = "rust_decimal::serde::float")]
    value: Decimal,
    currency: &'a str,
}

fn money_json(money: &Money) -> Result<Value> {
    Ok(serde_json::to_value(MoneyJson {
        value: money.amount,
        currency: money.currency.as_str(),
    })?)
}

fn timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// FHIR `Claim` document
///
/// The encounter is linked from every line item.
pub fn claim_document(claim: &ClaimResource) -> Result<Value> {
    let encounter = reference_json(&claim.encounter)?;

    let items = claim
        .items
        .iter()
        .map(|item| -> Result<Value> {
            let mut line = json!({
                "sequence": item.sequence,
                "productOrService": {
                    "coding": [{
                        "system": BILLING_CODE_SYSTEM,
                        "code": item.code.code,
                        "display": item.code.description,
                    }]
                },
                "quantity": { "value": item.quantity },
                "unitPrice": money_json(&item.code.unit_price)?,
                "net": money_json(&item.price)?,
                "encounter": [encounter.clone()],
            });
            if !item.modifiers.is_empty() {
                line["modifier"] = Value::Array(
                    item.modifiers
                        .iter()
                        .map(|m| json!({ "coding": [{ "code": m }] }))
                        .collect(),
                );
            }
            Ok(line)
        })
        .collect::<Result<Vec<_>>>()?;

    let mut doc = json!({
        "resourceType": "Claim",
        "status": claim.status.as_str(),
        "type": {
            "coding": [{ "system": CLAIM_TYPE_SYSTEM, "code": claim.claim_type }]
        },
        "use": "claim",
        "patient": reference_json(&claim.patient)?,
        "created": timestamp(&claim.created),
        "provider": reference_json(&claim.provider)?,
        "priority": {
            "coding": [{ "system": PRIORITY_SYSTEM, "code": claim.priority.as_str() }]
        },
        "item": items,
        "total": money_json(&claim.total)?,
    });

    if let Some(id) = claim.id.persisted_id() {
        doc["id"] = Value::String(id.to_string());
    }

    if let Some(coverage) = &claim.coverage {
        doc["insurance"] = json!([{
            "sequence": 1,
            "focal": true,
            "coverage": reference_json(coverage)?,
        }]);
    }

    if !claim.notes.is_empty() {
        doc["supportingInfo"] = Value::Array(
            claim
                .notes
                .iter()
                .enumerate()
                .map(|(i, note)| {
                    let mut info = json!({
                        "sequence": i + 1,
                        "category": {
                            "coding": [{ "system": INFO_CATEGORY_SYSTEM, "code": "info" }],
                            "text": note.kind.as_str(),
                        },
                        "valueString": note.text,
                    });
                    if let Some(at) = &note.authored_at {
                        info["timingDate"] = Value::String(at.date_naive().to_string());
                    }
                    info
                })
                .collect(),
        );
    }

    Ok(doc)
}

/// FHIR `Encounter` document
pub fn encounter_document(encounter: &EncounterResource) -> Result<Value> {
    let mut period = Map::new();
    period.insert(
        "start".to_string(),
        Value::String(timestamp(&encounter.period_start)),
    );
    if let Some(end) = &encounter.period_end {
        period.insert("end".to_string(), Value::String(timestamp(end)));
    }

    let mut doc = json!({
        "resourceType": "Encounter",
        "status": encounter.status,
        "class": { "system": ACT_CODE_SYSTEM, "code": encounter.class },
        "subject": reference_json(&encounter.subject)?,
        "participant": [{ "individual": reference_json(&encounter.participant)? }],
        "period": Value::Object(period),
    });

    if let Some(type_text) = &encounter.type_text {
        doc["type"] = json!([{ "text": type_text }]);
    }
    if let Some(category) = &encounter.service_category {
        doc["serviceType"] = json!({ "text": category });
    }
    if let Some(id) = encounter.id.persisted_id() {
        doc["id"] = Value::String(id.to_string());
    }

    Ok(doc)
}

/// FHIR `Patient` or `Practitioner` document
pub fn party_document(resource_type: ResourceType, details: &PartyDetails) -> Value {
    let mut doc = json!({
        "resourceType": resource_type.as_str(),
        "name": [{ "text": details.name }],
    });
    if let Some(identifier) = &details.identifier {
        doc["identifier"] = json!([{ "value": identifier }]);
    }
    if let Some(gender) = &details.gender {
        doc["gender"] = Value::String(gender.clone());
    }
    if let Some(birth_date) = &details.birth_date {
        doc["birthDate"] = Value::String(birth_date.to_string());
    }
    doc
}
