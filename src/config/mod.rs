//! Configuration management for Claimwright.
//!
//! This module provides TOML-based configuration loading, parsing, and validation.
//!
//! # Overview
//!
//! Claimwright uses TOML configuration files with support for:
//! - Environment variable substitution (`${VAR_NAME}`)
//! - `CLAIMWRIGHT_<SECTION>_<KEY>` overrides
//! - Default values for optional settings
//! - Validation of every section on load
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use claimwright::config::load_config;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("claimwright.toml")?;
//!
//! println!("Document server: {}", config.document_server.normalized_base_url());
//! println!("Listening on: {}", config.server.bind_address);
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration Structure
//!
//! - [`ApplicationConfig`] - Log level
//! - [`ServerConfig`] - Claim API listener
//! - [`DocumentServerConfig`] - FHIR server URL, timeout, redirects, media type
//! - [`CatalogConfig`] - Billing code lookup chain and cache
//! - [`StorageConfig`] - Local claim record backend
//! - [`PostgreSQLConfig`] - Database connection
//! - [`LoggingConfig`] - Logging configuration
//!
//! # Example Configuration
//!
//! ```toml
//! [application]
//! log_level = "info"
//!
//! [server]
//! bind_address = "0.0.0.0:8080"
//!
//! [document_server]
//! base_url = "https://fhir.example.org/r4"
//! timeout_seconds = 20
//! bearer_token = "${CLAIMWRIGHT_FHIR_TOKEN}"
//!
//! [catalog]
//! primary = "postgresql"
//! currency = "AUD"
//!
//! [storage]
//! backend = "postgresql"
//!
//! [postgresql]
//! connection_string = "${CLAIMWRIGHT_DATABASE_URL}"
//! ```

pub mod loader;
pub mod schema;
pub mod secret;

// Re-export commonly used types
pub use loader::{load_config, parse_config};
pub use schema::{
    ApplicationConfig, CatalogConfig, CatalogPrimary, ClaimwrightConfig, DocumentServerConfig,
    LoggingConfig, PostgreSQLConfig, ServerConfig, StorageBackend, StorageConfig,
};
pub use secret::{secret_string, SecretString, SecretValue};
