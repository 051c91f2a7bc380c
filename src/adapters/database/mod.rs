//! Local storage abstraction
//!
//! [`ClaimRecordStore`] is implemented in memory and on PostgreSQL; the
//! factory picks one from configuration.

pub mod factory;
pub mod memory;
pub mod traits;

pub use factory::{create_stores, Stores};
pub use memory::InMemoryClaimStore;
pub use traits::ClaimRecordStore;
