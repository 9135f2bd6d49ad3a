//! Personal details: name, rank, service number and pay period.

use crate::patterns::{ExtractorPattern, PatternCategory, PatternDefinition, ValueTransform};

const MONTH_NAMES: &str = r"jan(?:uary)?|feb(?:ruary)?|mar(?:ch)?|apr(?:il)?|may|june?|july?|aug(?:ust)?|sep(?:t(?:ember)?)?|oct(?:ober)?|nov(?:ember)?|dec(?:ember)?";

pub fn definitions() -> Vec<PatternDefinition> {
    let category = PatternCategory::Personal;

    vec![
        PatternDefinition::core(
            "name",
            "Employee Name",
            category,
            vec![
                ExtractorPattern::regex(
                    r"(?im)^\s*name\s*(?:[:\-]\s*|\s+)([A-Za-z][A-Za-z.' ]*?[A-Za-z.])\s*(?:\s{2}|\t|\||$)",
                    10,
                ),
                ExtractorPattern::regex(
                    r"(?im)(?:employee|officer)\s+name\s*[:\-]?\s*([A-Za-z][A-Za-z.' ]*?[A-Za-z.])\s*(?:\s{2}|\t|\||$)",
                    8,
                ),
                ExtractorPattern::keyword("Name:", 1).with_window(40),
            ],
        ),
        PatternDefinition::core(
            "rank",
            "Rank",
            category,
            vec![
                ExtractorPattern::regex(
                    r"(?im)\brank\s*[:\-]?\s*([A-Za-z][A-Za-z./ ]{0,20}?)\s*(?:\s{2}|\t|\||$)",
                    10,
                )
                .with_postprocessing(ValueTransform::Uppercase),
            ],
        ),
        PatternDefinition::core(
            "serviceNumber",
            "Service Number",
            category,
            vec![
                ExtractorPattern::regex(
                    r"(?i)(?:pers(?:onal)?\.?\s*no|service\s*no|army\s*no|ic\s*no)\.?\s*[:\-]?\s*([A-Z]{0,3}-?\d{4,9}[A-Z]?)\b",
                    10,
                )
                .with_postprocessing(ValueTransform::Uppercase),
            ],
        ),
        PatternDefinition::core(
            "month",
            "Pay Month",
            category,
            vec![
                ExtractorPattern::regex(
                    format!(r"(?i)month\s+of\s+({})\b", MONTH_NAMES),
                    10,
                ),
                ExtractorPattern::regex(
                    r"(?i)\bfor\s+(\d{1,2})\s*/\s*(?:19|20)\d{2}\b",
                    8,
                ),
                ExtractorPattern::regex(
                    format!(r"(?i)\b({})[\s,'\-/]+(?:19|20)\d{{2}}\b", MONTH_NAMES),
                    5,
                ),
            ],
        ),
        PatternDefinition::core(
            "year",
            "Pay Year",
            category,
            vec![
                ExtractorPattern::regex(
                    format!(r"(?i)month\s+of\s+(?:{})[\s,'\-]+((?:19|20)\d{{2}})\b", MONTH_NAMES),
                    10,
                ),
                ExtractorPattern::regex(
                    r"(?i)\bfor\s+\d{1,2}\s*/\s*((?:19|20)\d{2})\b",
                    8,
                ),
                ExtractorPattern::regex(
                    format!(r"(?i)\b(?:{})[\s,'\-/]+((?:19|20)\d{{2}})\b", MONTH_NAMES),
                    6,
                ),
                ExtractorPattern::regex(r"(?i)\byear\s*[:\-]?\s*((?:19|20)\d{2})\b", 4),
            ],
        ),
    ]
}
