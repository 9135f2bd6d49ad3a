//! Per-label range checks on deductions.

use lazy_static::lazy_static;
use regex::{Regex, RegexBuilder};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::ExtractionError;
use crate::models::LineItem;

lazy_static! {
    static ref DEFAULT_RULES: Vec<PlausibilityRule> = vec![
        PlausibilityRule::new("income_tax", r"\b(?:income\s+tax|i\.?\s*tax|itax)\b", Decimal::new(50, 2)).unwrap(),
        PlausibilityRule::new("education_cess", r"\b(?:edu(?:cation)?\.?\s+)?cess\b", Decimal::new(5, 2)).unwrap(),
        PlausibilityRule::new("provident_fund", r"\b(?:dsop\s*f?|gpf|afpp|pf)\b", Decimal::ONE).unwrap(),
    ];
}

/// A deduction that is out of range for the slip's credits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlausibilityWarning {
    pub rule: String,
    pub label: String,
    pub amount: Decimal,
    /// Largest plausible amount for this slip.
    pub limit: Decimal,
}

impl std::fmt::Display for PlausibilityWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} of {} exceeds plausible limit {} ({})",
            self.label, self.amount, self.limit, self.rule
        )
    }
}

/// Upper bound on a deduction as a fraction of total credits.
#[derive(Debug, Clone)]
pub struct PlausibilityRule {
    name: String,
    label: Regex,
    max_fraction_of_credits: Decimal,
}

impl PlausibilityRule {
    pub fn new(name: &str, label_pattern: &str, max_fraction_of_credits: Decimal) -> Result<Self, ExtractionError> {
        let label = RegexBuilder::new(label_pattern)
            .case_insensitive(true)
            .build()
            .map_err(|e| ExtractionError::InvalidPattern {
                id: name.to_string(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            name: name.to_string(),
            label,
            max_fraction_of_credits,
        })
    }

    /// Tax, cess and provident fund limits.
    pub fn defaults() -> Vec<PlausibilityRule> {
        DEFAULT_RULES.clone()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn applies_to(&self, label: &str) -> bool {
        self.label.is_match(label)
    }

    /// Check one debit against the slip's total credits.
    pub fn check(&self, item: &LineItem, total_credits: Decimal) -> Option<PlausibilityWarning> {
        if total_credits <= Decimal::ZERO || !self.applies_to(&item.label) {
            return None;
        }
        let limit = total_credits * self.max_fraction_of_credits;
        if item.amount > limit {
            Some(PlausibilityWarning {
                rule: self.name.clone(),
                label: item.label.clone(),
                amount: item.amount,
                limit,
            })
        } else {
            None
        }
    }

    /// Check every debit against every rule.
    pub fn check_all(rules: &[PlausibilityRule], debits: &[LineItem], total_credits: Decimal) -> Vec<PlausibilityWarning> {
        debits
            .iter()
            .flat_map(|item| rules.iter().filter_map(move |rule| rule.check(item, total_credits)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_default_rules_accept_normal_deductions() {
        let debits = vec![
            LineItem::new("Income Tax", dec("48030")),
            LineItem::new("Edu Cess", dec("1740")),
            LineItem::new("DSOPF Subn", dec("40000")),
        ];

        let warnings = PlausibilityRule::check_all(&PlausibilityRule::defaults(), &debits, dec("263260"));
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_tax_above_half_of_credits_warns() {
        let debits = vec![LineItem::new("Income Tax", dec("200000"))];

        let warnings = PlausibilityRule::check_all(&PlausibilityRule::defaults(), &debits, dec("263260"));

        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].rule, "income_tax");
        assert_eq!(warnings[0].limit, dec("131630"));
    }

    #[test]
    fn test_rules_ignore_unrelated_labels_and_zero_credits() {
        let rule = &PlausibilityRule::defaults()[1];
        assert!(rule.applies_to("Education Cess"));
        assert!(!rule.applies_to("Basic Pay"));

        let item = LineItem::new("Cess", dec("1740"));
        assert_eq!(rule.check(&item, Decimal::ZERO), None);
    }

    #[test]
    fn test_invalid_rule_pattern() {
        assert!(PlausibilityRule::new("bad", "(", Decimal::ONE).is_err());
    }
}
