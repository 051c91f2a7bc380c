//! Billing codes, selected line items and modifier pricing rules

use super::money::{Currency, Money};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Canonical metadata for one billing code
///
/// Immutable once resolved; shared between requests through the resolver cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingCode {
    /// Canonical code string (e.g. an MBS item number)
    pub code: String,

    /// Human-readable description
    pub description: String,

    /// Price of one unit
    pub unit_price: Money,

    /// Catalog category (e.g. "A1 - General Practitioner Attendances")
    pub category: String,
}

impl BillingCode {
    /// Creates a billing code, normalizing the code string
    pub fn new(
        code: impl AsRef<str>,
        description: impl Into<String>,
        unit_price: Money,
        category: impl Into<String>,
    ) -> Self {
        Self {
            code: normalize_code(code.as_ref()),
            description: description.into(),
            unit_price,
            category: category.into(),
        }
    }
}

/// Normalizes a user-entered code: trims whitespace, uppercases letters
pub fn normalize_code(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}

/// A user-chosen billing code with quantity and modifiers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedItem {
    /// Normalized billing code
    pub code: String,

    /// Number of units (at least 1)
    pub quantity: u32,

    /// Modifiers, kept sorted so price adjustments apply in a stable order
    pub modifiers: BTreeSet<String>,
}

impl SelectedItem {
    /// Creates a selected item
    ///
    /// # Errors
    ///
    /// Returns an error for an empty code or a zero quantity.
    pub fn new(
        code: impl AsRef<str>,
        quantity: u32,
        modifiers: impl IntoIterator<Item = String>,
    ) -> Result<Self, String> {
        let code = normalize_code(code.as_ref());
        if code.is_empty() {
            return Err("Billing code cannot be empty".to_string());
        }
        if quantity == 0 {
            return Err(format!("Quantity for code {code} must be at least 1"));
        }
        let modifiers = modifiers
            .into_iter()
            .map(|m| normalize_code(&m))
            .filter(|m| !m.is_empty())
            .collect();
        Ok(Self {
            code,
            quantity,
            modifiers,
        })
    }

    /// Single unit of a code with no modifiers
    pub fn single(code: impl AsRef<str>) -> Result<Self, String> {
        Self::new(code, 1, Vec::new())
    }
}

/// Documented price adjustment carried by a modifier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ModifierRule {
    /// Line price becomes `percent`% of its current value
    Percent { percent: Decimal },

    /// Fixed amount added to the line price (negative for a reduction)
    Flat { amount: Money },
}

impl ModifierRule {
    /// Applies the rule to a line price
    ///
    /// # Errors
    ///
    /// Returns an error if a flat adjustment is in another currency.
    pub fn apply(&self, price: &Money) -> Result<Money, String> {
        match self {
            ModifierRule::Percent { percent } => Ok(Money::new(
                price.amount * *percent / Decimal::ONE_HUNDRED,
                price.currency.clone(),
            )
            .rounded()),
            ModifierRule::Flat { amount } => price.checked_add(amount).map(|m| m.rounded()),
        }
    }
}

/// Modifier code → documented adjustment rule
///
/// Modifiers absent from the schedule are price-neutral annotations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModifierSchedule {
    rules: BTreeMap<String, ModifierRule>,
}

impl ModifierSchedule {
    /// Empty schedule: every modifier is price-neutral
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a rule
    pub fn with_rule(mut self, modifier: impl AsRef<str>, rule: ModifierRule) -> Self {
        self.rules.insert(normalize_code(modifier.as_ref()), rule);
        self
    }

    /// Rule for a modifier, if it carries one
    pub fn rule_for(&self, modifier: &str) -> Option<&ModifierRule> {
        self.rules.get(modifier)
    }

    /// Number of priced modifiers
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether no modifier carries a price rule
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Checks that every flat rule is in `currency`
    pub fn validate_currency(&self, currency: &Currency) -> Result<(), String> {
        for (modifier, rule) in &self.rules {
            if let ModifierRule::Flat { amount } = rule {
                if &amount.currency != currency {
                    return Err(format!(
                        "Modifier {modifier} adjusts in {} but the catalog currency is {currency}",
                        amount.currency
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Audit entry for one applied modifier adjustment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceAdjustment {
    /// Modifier that triggered the adjustment
    pub modifier: String,

    /// The rule that was applied
    pub rule: ModifierRule,

    /// Line price before this adjustment
    pub before: Money,

    /// Line price after this adjustment
    pub after: Money,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn aud(cents: i64) -> Money {
        Money::new(Decimal::new(cents, 2), Currency::new("AUD").unwrap())
    }

    #[test]
    fn test_selected_item_normalizes() {
        let item = SelectedItem::new(" 23 ", 2, vec!["ah".to_string(), "".to_string()]).unwrap();
        assert_eq!(item.code, "23");
        assert_eq!(item.quantity, 2);
        assert_eq!(item.modifiers.iter().collect::<Vec<_>>(), vec!["AH"]);
    }

    #[test]
    fn test_selected_item_rejects_zero_quantity() {
        assert!(SelectedItem::new("23", 0, Vec::new()).is_err());
        assert!(SelectedItem::new("  ", 1, Vec::new()).is_err());
    }

    #[test]
    fn test_percent_rule() {
        let rule = ModifierRule::Percent {
            percent: Decimal::new(150, 0),
        };
        assert_eq!(rule.apply(&aud(3910)).unwrap(), aud(5865));
    }

    #[test]
    fn test_percent_rule_rounds() {
        let rule = ModifierRule::Percent {
            percent: Decimal::new(85, 0),
        };
        // 17.90 * 0.85 = 15.215
        assert_eq!(rule.apply(&aud(1790)).unwrap(), aud(1522));
    }

    #[test]
    fn test_flat_rule_currency_checked() {
        let rule = ModifierRule::Flat {
            amount: Money::new(Decimal::ONE, Currency::new("USD").unwrap()),
        };
        assert!(rule.apply(&aud(100)).is_err());
    }

    #[test]
    fn test_schedule_currency_validation() {
        let schedule = ModifierSchedule::new().with_rule(
            "ah",
            ModifierRule::Flat {
                amount: Money::new(Decimal::TEN, Currency::new("USD").unwrap()),
            },
        );
        assert!(schedule.rule_for("AH").is_some());
        assert!(schedule
            .validate_currency(&Currency::new("AUD").unwrap())
            .is_err());
    }
}
