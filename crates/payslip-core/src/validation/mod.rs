//! Content and financial validation of extracted payslips.

mod content;
mod financial;
mod plausibility;

pub use content::{ContentValidator, ValidationResult};
pub use financial::{
    BalancePolicy, BalanceTotals, ErrorCategory, FinancialValidation, FinancialValidator,
    NetPayPolicy, PcdaBalancePolicy,
};
pub use plausibility::{PlausibilityRule, PlausibilityWarning};
