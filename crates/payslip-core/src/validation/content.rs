//! Field coverage of an extraction.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::patterns::{PatternCatalog, PatternCategory};

/// Pseudo-field reported missing when no earnings were found at all.
pub const EARNINGS_FIELD: &str = "earnings";

/// Which fields were found and how much to trust the result.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ValidationResult {
    /// Every required field is present.
    pub is_valid: bool,
    /// 0.0 - 1.0
    pub confidence: f32,
    pub detected_fields: BTreeSet<String>,
    pub missing_fields: BTreeSet<String>,
}

impl ValidationResult {
    /// Scale confidence down by `factor` (clamped to 0.0 - 1.0).
    pub fn penalize(&mut self, factor: f32) {
        self.confidence = (self.confidence * factor.clamp(0.0, 1.0)).clamp(0.0, 1.0);
    }
}

/// Checks resolved fields against the required set.
#[derive(Debug, Clone)]
pub struct ContentValidator {
    required: Vec<String>,
    earnings_keys: BTreeSet<String>,
}

impl ContentValidator {
    /// Require `name`, `month`, `year` and one of `earnings_keys`.
    pub fn new(earnings_keys: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            required: ["name", "month", "year"].iter().map(|s| s.to_string()).collect(),
            earnings_keys: earnings_keys.into_iter().map(Into::into).collect(),
        }
    }

    /// Earnings keys taken from the catalog.
    pub fn for_catalog(catalog: &PatternCatalog) -> Self {
        Self::new(catalog.keys_in(PatternCategory::Earnings))
    }

    /// Replace the required metadata fields.
    pub fn with_required(mut self, required: &[&str]) -> Self {
        self.required = required.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Evaluate fields; credit line items also satisfy the earnings check.
    pub fn evaluate(&self, fields: &BTreeMap<String, String>, has_credit_items: bool) -> ValidationResult {
        let present = |key: &str| fields.get(key).is_some_and(|v| !v.trim().is_empty());

        let detected_fields: BTreeSet<String> = fields
            .iter()
            .filter(|(_, v)| !v.trim().is_empty())
            .map(|(k, _)| k.clone())
            .collect();

        let mut missing_fields: BTreeSet<String> = self
            .required
            .iter()
            .filter(|key| !present(key))
            .cloned()
            .collect();

        let has_earnings = has_credit_items || self.earnings_keys.iter().any(|k| present(k));
        if !has_earnings {
            missing_fields.insert(EARNINGS_FIELD.to_string());
        }

        let checks = self.required.len() + 1;
        let passed = checks - missing_fields.len();
        let confidence = passed as f32 / checks as f32;

        ValidationResult {
            is_valid: missing_fields.is_empty(),
            confidence,
            detected_fields,
            missing_fields,
        }
    }
}

impl Default for ContentValidator {
    fn default() -> Self {
        Self::for_catalog(&PatternCatalog::core())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn fields(entries: &[(&str, &str)]) -> BTreeMap<String, String> {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_complete_fields_are_valid() {
        let result = ContentValidator::default().evaluate(
            &fields(&[
                ("name", "JOHN A DOE"),
                ("month", "September"),
                ("year", "2023"),
                ("basicPay", "136400"),
                ("pan", "ABCDE1234F"),
            ]),
            false,
        );

        assert!(result.is_valid);
        assert_eq!(result.confidence, 1.0);
        assert!(result.missing_fields.is_empty());
        assert_eq!(result.detected_fields.len(), 5);
    }

    #[test]
    fn test_missing_fields_lower_confidence() {
        let result = ContentValidator::default().evaluate(&fields(&[("name", "JOHN A DOE"), ("year", "")]), false);

        assert!(!result.is_valid);
        assert_eq!(
            result.missing_fields,
            ["earnings", "month", "year"]
                .iter()
                .map(|s| s.to_string())
                .collect::<BTreeSet<String>>()
        );
        assert_eq!(result.confidence, 0.25);
    }

    #[test]
    fn test_credit_items_satisfy_earnings() {
        let result = ContentValidator::default().evaluate(
            &fields(&[("name", "X"), ("month", "May"), ("year", "2024")]),
            true,
        );
        assert!(result.is_valid);
    }

    #[test]
    fn test_penalize_clamps() {
        let mut result = ValidationResult {
            confidence: 0.8,
            ..ValidationResult::default()
        };
        result.penalize(0.5);
        assert!((result.confidence - 0.4).abs() < 1e-6);
        result.penalize(-1.0);
        assert_eq!(result.confidence, 0.0);
    }
}
