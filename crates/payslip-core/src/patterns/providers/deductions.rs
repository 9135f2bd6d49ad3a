//! Deductions (debit side) amounts.

use super::amount_after;
use crate::patterns::{PatternCategory, PatternDefinition};

pub fn definitions() -> Vec<PatternDefinition> {
    let category = PatternCategory::Deductions;

    vec![
        PatternDefinition::core(
            "dsop",
            "DSOP Fund",
            category,
            vec![
                amount_after(r"\bDSOP\s*F(?:und)?(?:\s+subn)?\b", 10),
                amount_after(r"\bDSOP\b", 8),
                amount_after(r"(?:provident\s+fund|\bGPF\b)", 5),
            ],
        ),
        PatternDefinition::core(
            "agif",
            "Army Group Insurance Fund",
            category,
            vec![
                amount_after(r"\bAGIF\b", 10),
                amount_after(r"group\s+insurance(?:\s+fund)?", 6),
            ],
        ),
        PatternDefinition::core(
            "incomeTax",
            "Income Tax",
            category,
            vec![
                amount_after(r"income\s*tax", 10),
                amount_after(r"\bI\.?\s?TAX\b", 8),
                amount_after(r"\btax\b", 3),
            ],
        ),
        PatternDefinition::core(
            "educationCess",
            "Education Cess",
            category,
            vec![
                amount_after(r"education\s+cess", 10),
                amount_after(r"\bcess\b", 6),
            ],
        ),
        PatternDefinition::core(
            "electricity",
            "Electricity Charges",
            category,
            vec![amount_after(r"\belec(?:tricity)?\b(?:\s+charges)?", 10)],
        ),
        PatternDefinition::core(
            "totalDeductions",
            "Total Deductions",
            category,
            vec![
                amount_after(r"total\s+deductions?", 10),
                amount_after(r"total\s+debits?", 8),
            ],
        ),
    ]
}
