//! Bank account details.

use crate::patterns::{ExtractorPattern, PatternCategory, PatternDefinition, ValueTransform};

pub fn definitions() -> Vec<PatternDefinition> {
    let category = PatternCategory::Banking;

    vec![
        PatternDefinition::core(
            "accountNumber",
            "Bank Account Number",
            category,
            vec![
                ExtractorPattern::regex(
                    r"(?i)(?:a/c|account)\s*(?:no\.?|number)?\s*[:\-]?\s*(\d[\d \-]{6,22}\d)",
                    10,
                )
                .with_postprocessing(ValueTransform::RemoveNonNumeric),
            ],
        ),
        PatternDefinition::core(
            "bankName",
            "Bank Name",
            category,
            vec![ExtractorPattern::regex(
                r"(?im)\bbank(?:\s+name)?\s*[:\-]\s*([A-Za-z][A-Za-z&. ]{2,40}?)\s*(?:\s{2}|\t|\||,|$)",
                10,
            )],
        ),
        PatternDefinition::core(
            "ifscCode",
            "IFSC Code",
            category,
            vec![
                ExtractorPattern::regex(
                    r"(?i)\bIFSC(?:\s*code)?\s*[:\-]?\s*([A-Z]{4}0[A-Z0-9]{6})\b",
                    10,
                )
                .with_postprocessing(ValueTransform::Uppercase),
            ],
        ),
    ]
}
