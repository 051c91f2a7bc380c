//! Domain models and types for Claimwright.
//!
//! # Overview
//!
//! The domain layer provides:
//! - **Billing data** ([`BillingCode`], [`SelectedItem`], [`ModifierSchedule`])
//! - **Money** ([`Money`], [`Currency`]) with fixed-point amounts
//! - **References** ([`Reference`], [`SyntheticId`]) distinguishing persisted,
//!   local and transaction-synthetic identities
//! - **Resource records** ([`EncounterResource`], [`ClaimResource`])
//! - **Transaction payloads** ([`TransactionPayload`], [`BundleEntry`])
//! - **Outcomes and errors** ([`SubmissionOutcome`], [`ClaimwrightError`])
//!
//! # Type Safety
//!
//! References carry their target resource type, so a practitioner reference
//! cannot end up in a claim's `patient` slot:
//!
//! ```rust
//! use claimwright::domain::{Reference, ResourceType};
//!
//! let patient = Reference::parse_party("persisted:p-1", ResourceType::Patient).unwrap();
//! assert_eq!(patient.resource_type(), ResourceType::Patient);
//! assert_eq!(patient.to_string(), "Patient/p-1");
//! ```

pub mod billing;
pub mod bundle;
pub mod errors;
pub mod ids;
pub mod money;
pub mod note;
pub mod outcome;
pub mod record;
pub mod resources;
pub mod result;

// Re-export commonly used types for convenience
pub use billing::{BillingCode, ModifierRule, ModifierSchedule, PriceAdjustment, SelectedItem};
pub use bundle::{BundleEntry, Submission, TransactionPayload};
pub use errors::{CatalogError, ClaimwrightError, SubmissionError};
pub use ids::{LocalKey, Reference, ResourceType, SyntheticId};
pub use money::{Currency, Money};
pub use note::{ClinicalNote, NoteKind};
pub use outcome::{
    AssignedId, EntryResult, Issue, IssueSeverity, PartialApplication, ServerIds,
    SubmissionOutcome,
};
pub use record::{ClaimRecord, ClaimStats, RecordLine, SubmissionMode};
pub use resources::{
    ClaimLineItem, ClaimPriority, ClaimResource, ClaimStatus, EncounterContext,
    EncounterResource, Parties, Party, PartyDetails,
};
pub use result::Result;
