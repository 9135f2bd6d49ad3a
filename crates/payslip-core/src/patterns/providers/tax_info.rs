//! Income tax metadata.

use super::amount_after;
use crate::patterns::{ExtractorPattern, PatternCategory, PatternDefinition, ValueTransform};

pub fn definitions() -> Vec<PatternDefinition> {
    let category = PatternCategory::TaxInfo;

    vec![
        PatternDefinition::core(
            "pan",
            "PAN",
            category,
            vec![
                ExtractorPattern::regex(
                    r"(?i)\bPAN(?:\s*(?:no\.?|number))?\s*[:\-]?\s*([A-Z]{5}\d{4}[A-Z])\b",
                    10,
                )
                .with_postprocessing(ValueTransform::Uppercase),
            ],
        ),
        PatternDefinition::core(
            "assessmentYear",
            "Assessment Year",
            category,
            vec![ExtractorPattern::regex(
                r"(?i)assessment\s+year\s*[:\-]?\s*((?:19|20)\d{2}\s*-\s*\d{2,4})",
                10,
            )],
        ),
        PatternDefinition::core(
            "taxableIncome",
            "Taxable Income",
            category,
            vec![amount_after(r"taxable\s+income", 10)],
        ),
        PatternDefinition::core(
            "taxDeductedToDate",
            "Tax Deducted To Date",
            category,
            vec![
                amount_after(r"tax\s+deducted\s+(?:till|to)\s+date", 10),
                amount_after(r"\bTDS\s+YTD\b", 6),
            ],
        ),
    ]
}
