//! Earnings (credit side) amounts.

use super::amount_after;
use crate::patterns::{ExtractorPattern, PatternCategory, PatternDefinition};

pub fn definitions() -> Vec<PatternDefinition> {
    let category = PatternCategory::Earnings;

    vec![
        PatternDefinition::core(
            "basicPay",
            "Basic Pay",
            category,
            vec![
                amount_after(r"\bbasic\s*pay", 10),
                amount_after(r"\bbpay\b", 5),
                ExtractorPattern::keyword("Basic", 1).with_window(24).amount(),
            ],
        ),
        PatternDefinition::core(
            "dearnessAllowance",
            "Dearness Allowance",
            category,
            vec![
                amount_after(r"dearness\s+allowance", 10),
                amount_after(r"(?-i:\bDA\b)", 6),
            ],
        ),
        PatternDefinition::core(
            "militaryServicePay",
            "Military Service Pay",
            category,
            vec![
                amount_after(r"military\s+service\s+pay", 10),
                amount_after(r"\bMSP\b", 6),
            ],
        ),
        PatternDefinition::core(
            "transportAllowance",
            "Transport Allowance",
            category,
            vec![
                amount_after(r"transport\s+allowance", 10),
                amount_after(r"\btptl?\b", 6),
            ],
        ),
        PatternDefinition::core(
            "houseRentAllowance",
            "House Rent Allowance",
            category,
            vec![
                amount_after(r"house\s+rent\s+allowance", 10),
                amount_after(r"\bHRA\b", 6),
            ],
        ),
        PatternDefinition::core(
            "grossPay",
            "Gross Pay",
            category,
            vec![
                amount_after(r"gross\s+(?:pay|earnings|salary)", 10),
                amount_after(r"total\s+(?:credits?|earnings)", 8),
            ],
        ),
        PatternDefinition::core(
            "netPay",
            "Net Pay",
            category,
            vec![
                amount_after(r"net\s+(?:pay|salary|amount)", 10),
                amount_after(r"amount\s+credited(?:\s+to\s+bank)?", 6),
            ],
        ),
    ]
}
