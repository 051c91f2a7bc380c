//! Configuration loader with TOML parsing and environment variable overrides

use super::schema::{CatalogPrimary, ClaimwrightConfig, StorageBackend};
use super::secret::secret_string;
use crate::domain::errors::ClaimwrightError;
use crate::domain::result::Result;
use regex::Regex;
use std::fs;
use std::path::Path;
use std::sync::OnceLock;

/// Prefix of environment variable overrides
pub const ENV_PREFIX: &str = "CLAIMWRIGHT_";

/// Loads configuration from a TOML file
///
/// This function:
/// 1. Reads the TOML file
/// 2. Performs environment variable substitution (${VAR} syntax)
/// 3. Parses the TOML into ClaimwrightConfig
/// 4. Applies environment variable overrides (CLAIMWRIGHT_* prefix)
/// 5. Validates the configuration
///
/// # Errors
///
/// Returns [`ClaimwrightError::Configuration`] if the file cannot be read or
/// parsed, a referenced variable is unset, or validation fails.
///
/// # Examples
///
/// ```no_run
/// use claimwright::config::loader::load_config;
///
/// let config = load_config("claimwright.toml").expect("Failed to load config");
/// println!("{}", config.document_server.normalized_base_url());
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<ClaimwrightConfig> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(ClaimwrightError::Configuration(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        ClaimwrightError::Configuration(format!(
            "Failed to read configuration file {}: {}",
            path.display(),
            e
        ))
    })?;

    parse_config(&contents)
}

/// Parses, overrides and validates configuration from TOML text
pub fn parse_config(contents: &str) -> Result<ClaimwrightConfig> {
    let contents = substitute_env_vars(contents)?;

    let mut config: ClaimwrightConfig = toml::from_str(&contents)
        .map_err(|e| ClaimwrightError::Configuration(format!("Failed to parse TOML: {e}")))?;

    apply_env_overrides(&mut config)?;

    config.validate().map_err(|e| {
        ClaimwrightError::Configuration(format!("Configuration validation failed: {e}"))
    })?;

    Ok(config)
}

fn placeholder_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").expect("placeholder pattern is valid")
    })
}

/// Substitutes environment variables in the format ${VAR_NAME}
///
/// Comment lines are left untouched.
///
/// # Errors
///
/// Returns an error naming every referenced variable that is not set
fn substitute_env_vars(input: &str) -> Result<String> {
    let re = placeholder_regex();
    let mut lines = Vec::new();
    let mut missing_vars: Vec<String> = Vec::new();

    for line in input.lines() {
        if line.trim_start().starts_with('#') {
            lines.push(line.to_string());
            continue;
        }

        let processed = re.replace_all(line, |cap: &regex::Captures<'_>| {
            let var_name = &cap[1];
            match std::env::var(var_name) {
                Ok(value) => value,
                Err(_) => {
                    if !missing_vars.iter().any(|v| v == var_name) {
                        missing_vars.push(var_name.to_string());
                    }
                    String::new()
                }
            }
        });
        lines.push(processed.into_owned());
    }

    if !missing_vars.is_empty() {
        return Err(ClaimwrightError::Configuration(format!(
            "Missing required environment variables: {}",
            missing_vars.join(", ")
        )));
    }

    let mut result = lines.join("\n");
    if input.ends_with('\n') {
        result.push('\n');
    }
    Ok(result)
}

fn env(key: &str) -> Option<String> {
    std::env::var(format!("{ENV_PREFIX}{key}")).ok()
}

fn env_parsed<T: std::str::FromStr>(key: &str) -> Result<Option<T>> {
    match env(key) {
        None => Ok(None),
        Some(raw) => raw.trim().parse().map(Some).map_err(|_| {
            ClaimwrightError::Configuration(format!(
                "Invalid value for {ENV_PREFIX}{key}: {raw}"
            ))
        }),
    }
}

/// Applies environment variable overrides using the CLAIMWRIGHT_* prefix
///
/// Environment variables follow the pattern: CLAIMWRIGHT_<SECTION>_<KEY>
/// For example: CLAIMWRIGHT_DOCUMENT_SERVER_BASE_URL, CLAIMWRIGHT_STORAGE_BACKEND
fn apply_env_overrides(config: &mut ClaimwrightConfig) -> Result<()> {
    // Application overrides
    if let Some(val) = env("APPLICATION_LOG_LEVEL") {
        config.application.log_level = val;
    }

    // Server overrides
    if let Some(val) = env("SERVER_BIND_ADDRESS") {
        config.server.bind_address = val;
    }

    // Document server overrides
    if let Some(val) = env("DOCUMENT_SERVER_BASE_URL") {
        config.document_server.base_url = val;
    }
    if let Some(val) = env_parsed("DOCUMENT_SERVER_TIMEOUT_SECONDS")? {
        config.document_server.timeout_seconds = val;
    }
    if let Some(val) = env_parsed("DOCUMENT_SERVER_MAX_REDIRECTS")? {
        config.document_server.max_redirects = val;
    }
    if let Some(val) = env("DOCUMENT_SERVER_MEDIA_TYPE") {
        config.document_server.media_type = val;
    }
    if let Some(val) = env("DOCUMENT_SERVER_BEARER_TOKEN") {
        config.document_server.bearer_token = Some(secret_string(val));
    }
    if let Some(val) = env_parsed("DOCUMENT_SERVER_TLS_VERIFY")? {
        config.document_server.tls_verify = val;
    }

    // Catalog overrides
    if let Some(val) = env("CATALOG_PRIMARY") {
        config.catalog.primary = match val.trim().to_lowercase().as_str() {
            "postgresql" => CatalogPrimary::PostgreSQL,
            "none" => CatalogPrimary::None,
            other => {
                return Err(ClaimwrightError::Configuration(format!(
                    "Invalid {ENV_PREFIX}CATALOG_PRIMARY '{other}'. Must be one of: postgresql, none"
                )))
            }
        };
    }
    if let Some(val) = env_parsed("CATALOG_LOOKUP_TIMEOUT_SECONDS")? {
        config.catalog.lookup_timeout_seconds = val;
    }
    if let Some(val) = env_parsed("CATALOG_CACHE_ENABLED")? {
        config.catalog.cache_enabled = val;
    }
    if let Some(val) = env("CATALOG_CURRENCY") {
        config.catalog.currency = val;
    }

    // Storage overrides
    if let Some(val) = env("STORAGE_BACKEND") {
        config.storage.backend = match val.trim().to_lowercase().as_str() {
            "memory" => StorageBackend::Memory,
            "postgresql" => StorageBackend::PostgreSQL,
            other => {
                return Err(ClaimwrightError::Configuration(format!(
                    "Invalid {ENV_PREFIX}STORAGE_BACKEND '{other}'. Must be one of: memory, postgresql"
                )))
            }
        };
    }

    // PostgreSQL overrides (only if PostgreSQL is configured)
    if let Some(ref mut pg) = config.postgresql {
        if let Some(val) = env("POSTGRESQL_CONNECTION_STRING") {
            pg.connection_string = secret_string(val);
        }
        if let Some(val) = env_parsed("POSTGRESQL_MAX_CONNECTIONS")? {
            pg.max_connections = val;
        }
    }

    // Logging overrides
    if let Some(val) = env_parsed("LOGGING_LOCAL_ENABLED")? {
        config.logging.local_enabled = val;
    }
    if let Some(val) = env("LOGGING_LOCAL_PATH") {
        config.logging.local_path = val;
    }
    if let Some(val) = env("LOGGING_LOCAL_ROTATION") {
        config.logging.local_rotation = val;
    }

    Ok(())
}

/// Serializes tests that read or mutate `CLAIMWRIGHT_*` variables
#[cfg(test)]
pub(crate) static ENV_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());
