//! Payslip extraction outputs.

use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::Month;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::strategy::{ExtractionParameters, ExtractionStrategy};
use crate::table::TableStructure;
use crate::validation::{FinancialValidation, ValidationResult};

/// Stages of a single extraction attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    Selecting,
    Detecting,
    Associating,
    RowProcessing,
    Validating,
    /// Table path completed.
    Accepted,
    /// Table detection failed; fields came from linear text.
    FallbackToLinearText,
}

impl PipelineState {
    /// Whether the attempt has reached a final state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineState::Accepted | PipelineState::FallbackToLinearText)
    }
}

/// A labelled amount from one side of the payslip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    /// Description as printed.
    pub label: String,

    /// Parsed amount.
    pub amount: Decimal,

    /// Amount as printed, before normalization.
    pub raw_amount: String,

    /// Lowest confidence among the contributing elements.
    pub confidence: f32,
}

impl LineItem {
    pub fn new(label: impl Into<String>, amount: Decimal) -> Self {
        let raw_amount = amount.to_string();
        Self {
            label: label.into(),
            amount,
            raw_amount,
            confidence: 1.0,
        }
    }
}

/// Pay period resolved from the `month`/`year` fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayPeriod {
    /// Month number (1 - 12).
    pub month: u32,
    pub year: i32,
}

impl PayPeriod {
    /// Parse month names, abbreviations or numbers together with a year.
    ///
    /// Two-digit years are taken as 20xx.
    pub fn parse(month: &str, year: &str) -> Option<Self> {
        let month = month.trim().trim_end_matches('.');
        let number = match month.parse::<u32>() {
            Ok(n) if (1..=12).contains(&n) => n,
            Ok(_) => return None,
            // "Sept" and similar variants fall back to the three-letter prefix
            Err(_) => Month::from_str(month)
                .ok()
                .or_else(|| month.get(..3).and_then(|m| Month::from_str(m).ok()))?
                .number_from_month(),
        };

        let year: i32 = year.trim().parse().ok()?;
        let year = match year {
            0..=99 => 2000 + year,
            1900..=2200 => year,
            _ => return None,
        };

        Some(Self {
            month: number,
            year,
        })
    }

    /// Full English month name.
    pub fn month_name(&self) -> &'static str {
        u8::try_from(self.month)
            .ok()
            .and_then(|m| Month::try_from(m).ok())
            .map(|m| m.name())
            .unwrap_or("Unknown")
    }
}

/// Everything produced by one extraction attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionOutcome {
    /// Strategy chosen for the document.
    pub strategy: ExtractionStrategy,

    /// Parameters the strategy was run with.
    pub parameters: ExtractionParameters,

    /// Terminal state reached.
    pub state: PipelineState,

    /// Resolved metadata and financial fields by key.
    pub fields: BTreeMap<String, String>,

    /// Credit (earnings) line items.
    pub credits: Vec<LineItem>,

    /// Debit (deductions) line items.
    pub debits: Vec<LineItem>,

    /// Pay period, when month and year were resolved.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pay_period: Option<PayPeriod>,

    /// Reconstructed table of the first page that yielded one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table: Option<TableStructure>,

    /// Field coverage and confidence.
    pub validation: ValidationResult,

    /// Credit/debit balance check.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub financial: Option<FinancialValidation>,

    /// Non-fatal issues found along the way.
    pub warnings: Vec<String>,

    /// Processing time in milliseconds.
    pub processing_time_ms: u64,
}

impl ExtractionOutcome {
    /// Sum of all credit amounts.
    pub fn total_credits(&self) -> Decimal {
        self.credits.iter().map(|i| i.amount).sum()
    }

    /// Sum of all debit amounts.
    pub fn total_debits(&self) -> Decimal {
        self.debits.iter().map(|i| i.amount).sum()
    }
}
