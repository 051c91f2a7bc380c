//! Reference graph builder
//!
//! Turns resolved line items and request context into the typed encounter and
//! claim records. Everything here is synchronous and side-effect free; the
//! records still carry [`Reference::Local`] identities that the assembler
//! rewrites.

use crate::domain::{
    BillingCode, ClaimLineItem, ClaimPriority, ClaimResource, ClaimStatus, ClaimwrightError,
    ClinicalNote, EncounterContext, EncounterResource, LocalKey, Money, ModifierSchedule, Parties,
    PriceAdjustment, Reference, Result, SelectedItem,
};
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// `Claim.type` text
pub const CLAIM_TYPE: &str = "professional";

/// Claim-level fields that come straight from the request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimHeader {
    pub status: ClaimStatus,
    pub priority: ClaimPriority,
    pub coverage: Option<Reference>,
    pub created: DateTime<Utc>,
}

impl ClaimHeader {
    /// Active, normal-priority claim created now
    pub fn now() -> Self {
        Self {
            status: ClaimStatus::default(),
            priority: ClaimPriority::default(),
            coverage: None,
            created: Utc::now(),
        }
    }
}

/// Builds encounter and claim records from resolved items
#[derive(Debug, Clone)]
pub struct ClaimBuilder {
    schedule: ModifierSchedule,
}

impl ClaimBuilder {
    pub fn new(schedule: ModifierSchedule) -> Self {
        Self { schedule }
    }

    /// Builds the encounter and claim records for one request
    ///
    /// # Errors
    ///
    /// Returns [`ClaimwrightError::Validation`] when:
    /// - `items` is empty or an item has a zero quantity
    /// - an item's code is absent from `resolved`
    /// - line prices do not share one currency
    /// - the encounter period ends before it starts
    pub fn build(
        &self,
        items: &[SelectedItem],
        resolved: &HashMap<String, BillingCode>,
        notes: &[ClinicalNote],
        context: &EncounterContext,
        parties: &Parties,
        header: &ClaimHeader,
    ) -> Result<(EncounterResource, ClaimResource)> {
        if items.is_empty() {
            return Err(ClaimwrightError::Validation(
                "A claim needs at least one billing item".to_string(),
            ));
        }

        if let Some(end) = context.end {
            if end < context.start {
                return Err(ClaimwrightError::Validation(format!(
                    "Encounter period ends ({end}) before it starts ({})",
                    context.start
                )));
            }
        }

        let lines = items
            .iter()
            .enumerate()
            .map(|(index, item)| self.price_line(index as u32 + 1, item, resolved))
            .collect::<Result<Vec<_>>>()?;

        let currency = lines[0].price.currency.clone();
        let total = Money::sum(currency, lines.iter().map(|line| &line.price))
            .map_err(ClaimwrightError::Validation)?;

        let encounter = EncounterResource {
            id: Reference::local(LocalKey::Encounter),
            status: if context.end.is_some() {
                "finished".to_string()
            } else {
                "in-progress".to_string()
            },
            class: context.class.clone(),
            type_text: context.type_text.clone(),
            service_category: context.service_category.clone(),
            period_start: context.start,
            period_end: context.end,
            subject: parties.patient.reference.clone(),
            participant: parties.practitioner.reference.clone(),
        };

        let claim = ClaimResource {
            id: Reference::local(LocalKey::Claim),
            status: header.status,
            priority: header.priority,
            claim_type: CLAIM_TYPE.to_string(),
            patient: parties.patient.reference.clone(),
            provider: parties.practitioner.reference.clone(),
            encounter: encounter.id.clone(),
            coverage: header.coverage.clone(),
            created: header.created,
            items: lines,
            notes: notes.to_vec(),
            total,
        };

        tracing::debug!(
            lines = claim.items.len(),
            total = %claim.total,
            "Built claim records"
        );

        Ok((encounter, claim))
    }

    fn price_line(
        &self,
        sequence: u32,
        item: &SelectedItem,
        resolved: &HashMap<String, BillingCode>,
    ) -> Result<ClaimLineItem> {
        if item.quantity == 0 {
            return Err(ClaimwrightError::Validation(format!(
                "Quantity for code {} must be at least 1",
                item.code
            )));
        }

        let code = resolved.get(&item.code).ok_or_else(|| {
            ClaimwrightError::Validation(format!("Billing code {} was not resolved", item.code))
        })?;

        let base_price = code.unit_price.times(item.quantity).rounded();
        let mut price = base_price.clone();
        let mut adjustments = Vec::new();

        for modifier in &item.modifiers {
            let Some(rule) = self.schedule.rule_for(modifier) else {
                continue;
            };
            let after = rule.apply(&price).map_err(|e| {
                ClaimwrightError::Validation(format!(
                    "Modifier {modifier} on code {}: {e}",
                    item.code
                ))
            })?;
            adjustments.push(PriceAdjustment {
                modifier: modifier.clone(),
                rule: rule.clone(),
                before: price,
                after: after.clone(),
            });
            price = after;
        }

        Ok(ClaimLineItem {
            sequence,
            code: code.clone(),
            quantity: item.quantity,
            modifiers: item.modifiers.iter().cloned().collect(),
            base_price,
            adjustments,
            price: price.rounded(),
        })
    }
}
