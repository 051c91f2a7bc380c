//! Static billing catalog shipped with the binary
//!
//! Loaded from `data/billing_codes.json`. Besides codes it carries the
//! modifier schedule used for price adjustments.

use crate::domain::billing::normalize_code;
use crate::domain::{
    BillingCode, CatalogError, ClaimwrightError, Currency, ModifierRule, ModifierSchedule, Money,
    Result,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};

const BUNDLED_CATALOG_JSON: &str = include_str!("../../../data/billing_codes.json");

#[derive(Debug, Deserialize)]
struct CatalogFile {
    currency: String,
    codes: Vec<CatalogRow>,
    #[serde(default)]
    modifiers: BTreeMap<String, ModifierRule>,
}

#[derive(Debug, Deserialize)]
struct CatalogRow {
    code: String,
    description: String,
    unit_price: Decimal,
    #[serde(default)]
    category: String,
}

/// In-memory catalog with a fixed set of codes and modifier rules
#[derive(Debug, Clone)]
pub struct BundledCatalog {
    currency: Currency,
    codes: HashMap<String, BillingCode>,
    modifiers: ModifierSchedule,
}

impl BundledCatalog {
    /// Loads the catalog compiled into the binary
    ///
    /// # Errors
    ///
    /// Returns an error if the bundled data is malformed or its currency
    /// differs from `expected_currency`.
    pub fn load(expected_currency: &Currency) -> Result<Self> {
        let catalog = Self::from_json(BUNDLED_CATALOG_JSON)?;
        if &catalog.currency != expected_currency {
            return Err(ClaimwrightError::Configuration(format!(
                "Bundled catalog is priced in {} but catalog.currency is {expected_currency}",
                catalog.currency
            )));
        }
        Ok(catalog)
    }

    /// Parses a catalog document
    pub fn from_json(json: &str) -> Result<Self> {
        let file: CatalogFile = serde_json::from_str(json)?;
        let currency = Currency::new(&file.currency).map_err(ClaimwrightError::Configuration)?;

        let mut codes = HashMap::with_capacity(file.codes.len());
        for row in file.codes {
            if row.unit_price.is_sign_negative() {
                return Err(CatalogError::InvalidEntry {
                    code: row.code,
                    message: "unit price cannot be negative".to_string(),
                }
                .into());
            }
            let code = BillingCode::new(
                &row.code,
                row.description,
                Money::new(row.unit_price, currency.clone()).rounded(),
                row.category,
            );
            codes.insert(code.code.clone(), code);
        }

        let modifiers = file
            .modifiers
            .into_iter()
            .fold(ModifierSchedule::new(), |schedule, (name, rule)| {
                schedule.with_rule(name, rule)
            });
        modifiers
            .validate_currency(&currency)
            .map_err(ClaimwrightError::Configuration)?;

        Ok(Self {
            currency,
            codes,
            modifiers,
        })
    }

    /// Looks up one code
    pub fn get(&self, code: &str) -> Option<&BillingCode> {
        self.codes.get(&normalize_code(code))
    }

    pub fn currency(&self) -> &Currency {
        &self.currency
    }

    pub fn modifiers(&self) -> &ModifierSchedule {
        &self.modifiers
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}
