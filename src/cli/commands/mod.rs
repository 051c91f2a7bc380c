//! CLI command implementations
//!
//! This module contains all CLI command implementations.

pub mod init;
pub mod preview;
pub mod serve;
pub mod validate;
