//! Core pattern providers, one per domain category.

pub mod banking;
pub mod deductions;
pub mod earnings;
pub mod personal;
pub mod tax_info;

use super::{ExtractorPattern, PatternDefinition};

/// Printed amount with an optional currency prefix.
pub(crate) const AMOUNT: &str = r"((?:Rs\.?|₹|INR)?\s*\d[\d,]*(?:\.\d{1,2})?)";

/// Regex rule reading an amount printed after `label`.
pub(crate) fn amount_after(label: &str, priority: i32) -> ExtractorPattern {
    ExtractorPattern::regex(format!(r"(?i){}[\s:\-]*{}", label, AMOUNT), priority).amount()
}

/// Every core definition, in category order.
pub fn all() -> Vec<PatternDefinition> {
    let mut defs = personal::definitions();
    defs.extend(earnings::definitions());
    defs.extend(deductions::definitions());
    defs.extend(banking::definitions());
    defs.extend(tax_info::definitions());
    defs
}
