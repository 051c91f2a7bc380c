//! Validate config command implementation
//!
//! This module implements the `validate-config` command for validating
//! the Claimwright configuration file.

use crate::adapters::catalog::BundledCatalog;
use crate::config::load_config;
use crate::config::schema::{CatalogPrimary, StorageBackend};
use crate::domain::Currency;
use clap::Args;

/// Arguments for the validate-config command
#[derive(Args, Debug)]
pub struct ValidateArgs {}

impl ValidateArgs {
    /// Execute the validate-config command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(config_path = %config_path, "Validating configuration");

        println!("🔍 Validating configuration file: {config_path}");
        println!();

        // load_config validates every section
        let config = match load_config(config_path) {
            Ok(c) => {
                println!("✅ Configuration is valid");
                c
            }
            Err(e) => {
                println!("❌ Configuration is invalid");
                println!("   Error: {e}");
                return Ok(2);
            }
        };

        let bundled = Currency::new(&config.catalog.currency)
            .map_err(crate::domain::ClaimwrightError::Configuration)
            .and_then(|currency| BundledCatalog::load(&currency));
        let bundled = match bundled {
            Ok(catalog) => catalog,
            Err(e) => {
                println!("❌ Bundled catalog does not match configuration");
                println!("   Error: {e}");
                return Ok(2);
            }
        };

        println!();
        println!("Configuration Summary:");
        println!("  Log Level: {}", config.application.log_level);
        println!("  Listen Address: {}", config.server.bind_address);
        println!(
            "  Document Server: {}",
            config.document_server.normalized_base_url()
        );
        println!(
            "  Timeout: {}s, max {} redirects",
            config.document_server.timeout_seconds, config.document_server.max_redirects
        );
        println!("  Media Type: {}", config.document_server.media_type);
        println!(
            "  Bearer Token: {}",
            if config.document_server.bearer_token.is_some() {
                "set"
            } else {
                "not set"
            }
        );

        match config.catalog.primary {
            CatalogPrimary::PostgreSQL => println!("  Primary Catalog: PostgreSQL"),
            CatalogPrimary::None => println!("  Primary Catalog: none (bundled only)"),
        }
        println!(
            "  Bundled Catalog: {} codes, {} priced modifiers ({})",
            bundled.len(),
            bundled.modifiers().len(),
            bundled.currency()
        );

        match config.storage.backend {
            StorageBackend::Memory => println!("  Claim Records: in memory"),
            StorageBackend::PostgreSQL => println!("  Claim Records: PostgreSQL"),
        }
        if let Some(ref pg_config) = config.postgresql {
            use secrecy::ExposeSecret;
            println!(
                "  PostgreSQL Connection: {}",
                pg_config
                    .connection_string
                    .expose_secret()
                    .as_ref()
                    .split('@')
                    .next_back()
                    .unwrap_or("***")
            );
            println!("  Max Connections: {}", pg_config.max_connections);
        }
        println!();

        Ok(0)
    }
}
