//! Key resolution against a compiled catalog.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::trace;

use super::catalog::{CompiledPattern, Matcher, PatternCatalog};
use super::transforms::{apply_text_transforms, apply_value_transforms};
use super::{ContextDirection, PatternCategory, PatternSource};

/// A resolved field value and the rule that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldMatch {
    pub key: String,
    pub value: String,
    pub definition_id: String,
    pub source: PatternSource,
    pub priority: i32,
}

/// Resolves field keys to single best values.
///
/// Holds no state besides the borrowed catalog, so one engine can serve any
/// number of threads and documents.
#[derive(Debug, Clone, Copy)]
pub struct PatternMatchingEngine<'a> {
    catalog: &'a PatternCatalog,
}

impl<'a> PatternMatchingEngine<'a> {
    pub fn new(catalog: &'a PatternCatalog) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &'a PatternCatalog {
        self.catalog
    }

    /// Resolve `key` to its value, or `None` when no rule matches.
    pub fn extract(&self, key: &str, text: &str) -> Option<String> {
        self.extract_match(key, text).map(|m| m.value)
    }

    /// Resolve `key` and report which rule won.
    pub fn extract_match(&self, key: &str, text: &str) -> Option<FieldMatch> {
        for def in self.catalog.definitions(key) {
            for pattern in &def.patterns {
                if let Some(value) = apply_pattern(pattern, text) {
                    trace!(
                        "{} resolved by {} (priority {}): {:?}",
                        key, def.id, pattern.spec.priority, value
                    );
                    return Some(FieldMatch {
                        key: key.to_string(),
                        value,
                        definition_id: def.id.clone(),
                        source: def.source,
                        priority: pattern.spec.priority,
                    });
                }
            }
        }
        None
    }

    /// Resolve every key of a category; missing keys are left out.
    pub fn extract_category(&self, category: PatternCategory, text: &str) -> BTreeMap<String, String> {
        self.catalog
            .keys_in(category)
            .into_iter()
            .filter_map(|key| self.extract(key, text).map(|v| (key.to_string(), v)))
            .collect()
    }

    /// Resolve every key of several categories.
    pub fn extract_categories(
        &self,
        categories: &[PatternCategory],
        text: &str,
    ) -> BTreeMap<String, String> {
        categories
            .iter()
            .flat_map(|c| self.extract_category(*c, text))
            .collect()
    }
}

fn apply_pattern(pattern: &CompiledPattern, text: &str) -> Option<String> {
    let source = apply_text_transforms(text, &pattern.spec.preprocessing);

    match &pattern.matcher {
        Matcher::Regex(regex) => regex.captures_iter(&source).find_map(|caps| {
            let captured = caps.get(1).or_else(|| caps.get(0))?;
            non_empty(apply_value_transforms(
                captured.as_str(),
                &pattern.spec.postprocessing,
            ))
        }),
        Matcher::Keyword {
            needle,
            direction,
            window,
        } => needle.find_iter(&source).find_map(|m| {
            let context = match direction {
                ContextDirection::After => after_context(&source[m.end()..], *window),
                ContextDirection::Before => before_context(&source[..m.start()], *window),
            };
            non_empty(apply_value_transforms(&context, &pattern.spec.postprocessing))
        }),
    }
}

fn non_empty(value: String) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}

/// Byte offset of the first column gap (two spaces, tab or pipe).
fn column_gap(s: &str) -> Option<usize> {
    [s.find("  "), s.find('\t'), s.find('|')]
        .into_iter()
        .flatten()
        .min()
}

fn after_context(rest: &str, window: usize) -> String {
    let line = rest.split('\n').next().unwrap_or("");
    let line = line.trim_start_matches(|c: char| c == ':' || c == '-' || c == ' ' || c == '\t');
    let cell = match column_gap(line) {
        Some(end) => &line[..end],
        None => line,
    };
    cell.chars().take(window).collect()
}

fn before_context(head: &str, window: usize) -> String {
    let line = head.rsplit('\n').next().unwrap_or("");
    let line = line.trim_end_matches(|c: char| c == ':' || c == '-' || c == ' ' || c == '\t');
    let cell = [
        line.rfind("  ").map(|i| i + 2),
        line.rfind('\t').map(|i| i + 1),
        line.rfind('|').map(|i| i + 1),
    ]
    .into_iter()
    .flatten()
    .max()
    .map_or(line, |start| &line[start..]);
    let tail: Vec<char> = cell.chars().rev().take(window).collect();
    tail.into_iter().rev().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patterns::{ExtractorPattern, PatternDefinition, ValueTransform};
    use pretty_assertions::assert_eq;

    const SLIP: &str = "STATEMENT OF ACCOUNT FOR 09/2023\n\
        Name: JOHN A DOE\n\
        Rank: MAJ   Pers No: IC-12345A\n\
        Pay slip for the month of September 2023\n\
        Basic Pay  ₹1,36,400.00\n\
        DA  69874\n\
        MSP 15600\n\
        DSOPF Subn  40000\n\
        AGIF 10000\n\
        Income Tax 48030\n\
        Education Cess 1740\n\
        A/C No: 1234 5678 9012\n\
        IFSC: sbin0001234\n\
        PAN: abcde1234f\n";

    #[test]
    fn test_core_fields_from_linear_text() {
        let catalog = PatternCatalog::core();
        let engine = PatternMatchingEngine::new(&catalog);

        assert_eq!(engine.extract("name", SLIP).as_deref(), Some("JOHN A DOE"));
        assert_eq!(engine.extract("rank", SLIP).as_deref(), Some("MAJ"));
        assert_eq!(engine.extract("serviceNumber", SLIP).as_deref(), Some("IC-12345A"));
        assert_eq!(engine.extract("month", SLIP).as_deref(), Some("September"));
        assert_eq!(engine.extract("year", SLIP).as_deref(), Some("2023"));
        assert_eq!(engine.extract("basicPay", SLIP).as_deref(), Some("136400.00"));
        assert_eq!(engine.extract("dearnessAllowance", SLIP).as_deref(), Some("69874"));
        assert_eq!(engine.extract("militaryServicePay", SLIP).as_deref(), Some("15600"));
        assert_eq!(engine.extract("dsop", SLIP).as_deref(), Some("40000"));
        assert_eq!(engine.extract("agif", SLIP).as_deref(), Some("10000"));
        assert_eq!(engine.extract("incomeTax", SLIP).as_deref(), Some("48030"));
        assert_eq!(engine.extract("educationCess", SLIP).as_deref(), Some("1740"));
        assert_eq!(engine.extract("accountNumber", SLIP).as_deref(), Some("123456789012"));
        assert_eq!(engine.extract("ifscCode", SLIP).as_deref(), Some("SBIN0001234"));
        assert_eq!(engine.extract("pan", SLIP).as_deref(), Some("ABCDE1234F"));
    }

    #[test]
    fn test_missing_field_is_none() {
        let catalog = PatternCatalog::core();
        let engine = PatternMatchingEngine::new(&catalog);

        assert_eq!(engine.extract("houseRentAllowance", SLIP), None);
        assert_eq!(engine.extract("noSuchKey", SLIP), None);
    }

    #[test]
    fn test_higher_priority_wins_regardless_of_declaration_order() {
        let def = PatternDefinition::user(
            "user.basic",
            "basicPay",
            PatternCategory::Earnings,
            vec![
                ExtractorPattern::regex(r"Basic Pay\s+(\d+)", 5),
                ExtractorPattern::regex(r"Basic Pay\s+(\d{3})", 10),
            ],
        );
        let catalog = PatternCatalog::builder()
            .without_core()
            .with_user(def)
            .build()
            .unwrap();
        let engine = PatternMatchingEngine::new(&catalog);

        let found = engine.extract_match("basicPay", "Basic Pay 136400").unwrap();
        assert_eq!(found.value, "136");
        assert_eq!(found.priority, 10);
    }

    #[test]
    fn test_empty_capture_falls_through_to_next_pattern() {
        let def = PatternDefinition::user(
            "user.rank",
            "rank",
            PatternCategory::Personal,
            vec![
                ExtractorPattern::regex(r"Rank:(\s*)", 10),
                ExtractorPattern::regex(r"Grade:\s*(\w+)", 1),
            ],
        );
        let catalog = PatternCatalog::builder().without_core().with_user(def).build().unwrap();
        let engine = PatternMatchingEngine::new(&catalog);

        assert_eq!(engine.extract("rank", "Rank:   \nGrade: COL").as_deref(), Some("COL"));
    }

    #[test]
    fn test_user_first_overrides_core_and_falls_back() {
        let def = PatternDefinition::user(
            "user.basic",
            "basicPay",
            PatternCategory::Earnings,
            vec![ExtractorPattern::regex(r"BP\s*=\s*(\d+)", 1)],
        );
        let catalog = PatternCatalog::builder().with_user(def).build().unwrap();
        let engine = PatternMatchingEngine::new(&catalog);

        let text = "BP = 99\nBasic Pay 136400";
        let found = engine.extract_match("basicPay", text).unwrap();
        assert_eq!(found.value, "99");
        assert_eq!(found.source, PatternSource::User);

        let found = engine.extract_match("basicPay", "Basic Pay 136400").unwrap();
        assert_eq!(found.value, "136400");
        assert_eq!(found.source, PatternSource::Core);
    }

    #[test]
    fn test_core_first_keeps_core_value() {
        let def = PatternDefinition::user(
            "user.basic",
            "basicPay",
            PatternCategory::Earnings,
            vec![ExtractorPattern::regex(r"BP\s*=\s*(\d+)", 1)],
        );
        let catalog = PatternCatalog::builder()
            .with_user(def)
            .with_precedence(crate::patterns::CatalogPrecedence::CoreFirst)
            .build()
            .unwrap();
        let engine = PatternMatchingEngine::new(&catalog);

        let text = "BP = 99\nBasic Pay 136400";
        assert_eq!(engine.extract("basicPay", text).as_deref(), Some("136400"));
        assert_eq!(engine.extract("basicPay", "BP = 99").as_deref(), Some("99"));
    }

    #[test]
    fn test_keyword_context_directions() {
        let after = ExtractorPattern::keyword("Licence Fee", 1).amount();
        let before = ExtractorPattern::keyword("(Fur)", 1)
            .with_direction(ContextDirection::Before)
            .with_postprocessing(ValueTransform::NormalizeCurrency);

        let catalog = PatternCatalog::builder()
            .without_core()
            .with_user(PatternDefinition::user("u.lf", "licenceFee", PatternCategory::Deductions, vec![after]))
            .with_user(PatternDefinition::user("u.fur", "furniture", PatternCategory::Deductions, vec![before]))
            .build()
            .unwrap();
        let engine = PatternMatchingEngine::new(&catalog);

        let text = "licence fee: 878  Water 12\nRs 392 (Fur)";
        assert_eq!(engine.extract("licenceFee", text).as_deref(), Some("878"));
        assert_eq!(engine.extract("furniture", text).as_deref(), Some("392"));
    }

    #[test]
    fn test_extraction_is_deterministic() {
        let catalog = PatternCatalog::core();
        let engine = PatternMatchingEngine::new(&catalog);

        let first = engine.extract_categories(&PatternCategory::ALL, SLIP);
        for _ in 0..5 {
            assert_eq!(engine.extract_categories(&PatternCategory::ALL, SLIP), first);
        }
        assert!(first.contains_key("name"));
        assert!(first.contains_key("pan"));
    }
}
