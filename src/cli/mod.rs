//! CLI interface and argument parsing
//!
//! This module provides the command-line interface for Claimwright using clap.

pub mod commands;

use clap::{Parser, Subcommand};

/// Claimwright - FHIR claim assembly and submission service
#[derive(Parser, Debug)]
#[command(name = "claimwright")]
#[command(version, about, long_about = None)]
#[command(author = "Claimwright Contributors")]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "claimwright.toml", env = "CLAIMWRIGHT_CONFIG")]
    pub config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "CLAIMWRIGHT_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the claim HTTP API
    Serve(commands::serve::ServeArgs),

    /// Validate configuration file
    ValidateConfig(commands::validate::ValidateArgs),

    /// Assemble a claim request offline and print the documents
    Preview(commands::preview::PreviewArgs),

    /// Initialize a new configuration file
    Init(commands::init::InitArgs),
}
