//! Shared fixtures for integration tests
#![allow(dead_code)]

use chrono::{TimeZone, Utc};
use claimwright::adapters::catalog::{BundledCatalog, NoPrimaryCatalog};
use claimwright::core::assembler::{assemble_transaction, SeededIdGenerator};
use claimwright::core::builder::{ClaimBuilder, ClaimHeader};
use claimwright::core::MetadataResolver;
use claimwright::domain::{
    BillingCode, ClaimPriority, ClaimResource, ClaimStatus, Currency, EncounterContext,
    EncounterResource, LocalKey, Parties, Party, PartyDetails, Reference, ResourceType,
    SelectedItem, Submission,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

pub fn aud() -> Currency {
    Currency::new("AUD").unwrap()
}

pub fn bundled() -> BundledCatalog {
    BundledCatalog::load(&aud()).unwrap()
}

/// Resolver answering from the bundled catalog only
pub fn bundled_resolver() -> Arc<MetadataResolver> {
    Arc::new(MetadataResolver::with_timeout(
        Arc::new(NoPrimaryCatalog),
        bundled(),
        Duration::from_secs(1),
        true,
    ))
}

pub fn resolved(codes: &[&str]) -> HashMap<String, BillingCode> {
    let catalog = bundled();
    codes
        .iter()
        .map(|code| (code.to_string(), catalog.get(code).unwrap().clone()))
        .collect()
}

pub fn existing_parties() -> Parties {
    Parties {
        patient: Party::existing(Reference::persisted(ResourceType::Patient, "p-1").unwrap()),
        practitioner: Party::existing(
            Reference::persisted(ResourceType::Practitioner, "d-1").unwrap(),
        ),
    }
}

pub fn new_patient_parties() -> Parties {
    Parties {
        patient: Party::to_create(
            LocalKey::Patient,
            PartyDetails {
                name: "Alex Citizen".to_string(),
                identifier: Some("2950156481".to_string()),
                birth_date: None,
                gender: Some("female".to_string()),
            },
        ),
        practitioner: Party::existing(
            Reference::persisted(ResourceType::Practitioner, "d-1").unwrap(),
        ),
    }
}

pub fn context() -> EncounterContext {
    EncounterContext {
        class: "AMB".to_string(),
        type_text: None,
        service_category: None,
        start: Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap(),
        end: Some(Utc.with_ymd_and_hms(2026, 3, 2, 9, 20, 0).unwrap()),
    }
}

pub fn header() -> ClaimHeader {
    ClaimHeader {
        status: ClaimStatus::Active,
        priority: ClaimPriority::Normal,
        coverage: None,
        created: Utc.with_ymd_and_hms(2026, 3, 2, 9, 30, 0).unwrap(),
    }
}

/// Builds encounter and claim for `items` against the bundled catalog
pub fn build(items: &[SelectedItem], parties: &Parties) -> (EncounterResource, ClaimResource) {
    let catalog = bundled();
    let codes: Vec<&str> = items.iter().map(|i| i.code.as_str()).collect();
    ClaimBuilder::new(catalog.modifiers().clone())
        .build(items, &resolved(&codes), &[], &context(), parties, &header())
        .unwrap()
}

/// Transaction submission for one standard consultation
pub fn transaction_submission(parties: &Parties) -> Submission {
    let (encounter, claim) = build(&[SelectedItem::single("23").unwrap()], parties);
    let payload = assemble_transaction(
        &parties.patient,
        &parties.practitioner,
        &encounter,
        &claim,
        &mut SeededIdGenerator::new(7),
    )
    .unwrap();
    Submission::Transaction(payload)
}
