//! Serve command implementation
//!
//! Loads configuration, wires the orchestrator and runs the claim API until
//! a shutdown signal arrives.

use crate::api::{self, AppState};
use crate::config::load_config;
use crate::core::ClaimOrchestrator;
use crate::log_error_with_context;
use clap::Args;
use std::sync::Arc;
use tokio::sync::watch;

/// Arguments for the serve command
#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Override the listen address (host:port)
    #[arg(long)]
    pub bind: Option<String>,
}

impl ServeArgs {
    /// Execute the serve command
    pub async fn execute(
        &self,
        config_path: &str,
        shutdown_signal: watch::Receiver<bool>,
    ) -> anyhow::Result<i32> {
        tracing::info!(config_path = %config_path, "Starting claim API");

        let mut config = match load_config(config_path) {
            Ok(config) => config,
            Err(e) => {
                log_error_with_context!(&e, "Failed to load configuration");
                eprintln!("Error: {e}");
                return Ok(2);
            }
        };

        if let Some(bind) = &self.bind {
            tracing::info!(bind = %bind, "Overriding bind address from CLI");
            config.server.bind_address = bind.clone();
            if let Err(e) = config.validate() {
                eprintln!("Error: Configuration validation failed: {e}");
                return Ok(2);
            }
        }

        let orchestrator = ClaimOrchestrator::from_config(&config)
            .await?
            .with_shutdown(shutdown_signal.clone());
        let state = AppState::new(Arc::new(orchestrator));

        api::serve(&config.server, state, shutdown_signal).await?;

        tracing::info!("Claim API stopped");
        Ok(0)
    }
}
