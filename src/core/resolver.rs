//! Billing code metadata resolution
//!
//! Codes are resolved through an explicit chain:
//!
//! 1. the in-process cache (primary-store answers only)
//! 2. the primary [`CatalogStore`], one batched lookup bounded by a timeout
//! 3. the [`BundledCatalog`]
//!
//! A primary store that is unavailable, slow, or not configured never makes a
//! code "missing" on its own; the bundled catalog still gets asked.

use crate::adapters::catalog::{BundledCatalog, CatalogLookup, CatalogStore};
use crate::config::CatalogConfig;
use crate::domain::billing::normalize_code;
use crate::domain::{BillingCode, ClaimwrightError, ModifierSchedule, Result};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;

/// Resolves billing codes to canonical metadata
pub struct MetadataResolver {
    primary: Arc<dyn CatalogStore>,
    fallback: BundledCatalog,
    cache: Option<papaya::HashMap<String, Arc<BillingCode>>>,
    lookup_timeout: Duration,
}

impl MetadataResolver {
    /// Create a resolver from configuration
    pub fn new(
        primary: Arc<dyn CatalogStore>,
        fallback: BundledCatalog,
        config: &CatalogConfig,
    ) -> Self {
        Self::with_timeout(
            primary,
            fallback,
            config.lookup_timeout(),
            config.cache_enabled,
        )
    }

    /// Create a resolver with an explicit primary lookup bound
    pub fn with_timeout(
        primary: Arc<dyn CatalogStore>,
        fallback: BundledCatalog,
        lookup_timeout: Duration,
        cache_enabled: bool,
    ) -> Self {
        Self {
            primary,
            fallback,
            cache: cache_enabled.then(papaya::HashMap::new),
            lookup_timeout,
        }
    }

    /// Modifier adjustment rules shipped with the bundled catalog
    pub fn modifiers(&self) -> &ModifierSchedule {
        self.fallback.modifiers()
    }

    /// Number of cached codes
    pub fn cached_len(&self) -> usize {
        self.cache.as_ref().map(|c| c.pin().len()).unwrap_or(0)
    }

    /// Resolves every code or reports all that could not be resolved
    ///
    /// The returned map is keyed by normalized code.
    ///
    /// # Errors
    ///
    /// Returns [`ClaimwrightError::MetadataNotFound`] with the sorted list of
    /// codes no tier knows.
    pub async fn resolve(&self, codes: &[String]) -> Result<HashMap<String, BillingCode>> {
        let wanted: BTreeSet<String> = codes
            .iter()
            .map(|c| normalize_code(c))
            .filter(|c| !c.is_empty())
            .collect();

        let mut resolved = HashMap::with_capacity(wanted.len());

        // Tier 1: cache. The guard must not live across the primary lookup.
        let mut misses: Vec<String> = match &self.cache {
            Some(cache) => {
                let guard = cache.pin();
                wanted
                    .iter()
                    .filter(|code| match guard.get(code.as_str()) {
                        Some(hit) => {
                            resolved.insert((*code).clone(), BillingCode::clone(hit));
                            false
                        }
                        None => true,
                    })
                    .cloned()
                    .collect()
            }
            None => wanted.iter().cloned().collect(),
        };

        if misses.is_empty() {
            tracing::debug!(codes = resolved.len(), "All codes served from cache");
            return Ok(resolved);
        }

        // Tier 2: primary store
        let from_primary = self.lookup_primary(&misses).await;
        if let Some(cache) = &self.cache {
            let guard = cache.pin();
            for (code, billing) in &from_primary {
                guard.insert(code.clone(), Arc::new(billing.clone()));
            }
        }
        misses.retain(|code| !from_primary.contains_key(code));
        resolved.extend(from_primary);

        // Tier 3: bundled catalog
        misses.retain(|code| match self.fallback.get(code) {
            Some(billing) => {
                resolved.insert(code.clone(), billing.clone());
                false
            }
            None => true,
        });

        if !misses.is_empty() {
            tracing::info!(missing = ?misses, "Billing codes not found in any catalog");
            return Err(ClaimwrightError::MetadataNotFound { missing: misses });
        }

        Ok(resolved)
    }

    /// Runs the bounded primary lookup; every failure mode yields no codes
    async fn lookup_primary(&self, codes: &[String]) -> HashMap<String, BillingCode> {
        let store = self.primary.name();
        match tokio::time::timeout(self.lookup_timeout, self.primary.lookup(codes)).await {
            Ok(Ok(CatalogLookup::Found(found))) => {
                tracing::debug!(
                    store,
                    requested = codes.len(),
                    found = found.len(),
                    "Primary catalog answered"
                );
                found
                    .into_iter()
                    .filter(|(code, _)| codes.contains(code))
                    .collect()
            }
            Ok(Ok(CatalogLookup::NotConfigured)) => {
                tracing::debug!("No primary catalog configured, using bundled catalog");
                HashMap::new()
            }
            Ok(Err(e)) => {
                tracing::warn!(
                    store,
                    error = %e,
                    "Primary catalog unavailable, falling back to bundled catalog"
                );
                HashMap::new()
            }
            Err(_) => {
                tracing::warn!(
                    store,
                    timeout_ms = self.lookup_timeout.as_millis() as u64,
                    "Primary catalog lookup timed out, falling back to bundled catalog"
                );
                HashMap::new()
            }
        }
    }
}
