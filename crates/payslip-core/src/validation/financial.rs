//! Credit/debit balance checks.

use std::collections::BTreeMap;
use std::fmt::Debug;
use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::models::config::ValidationConfig;
use crate::models::LineItem;
use crate::pcda::PcdaStatement;

/// Why a balance check failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorCategory {
    /// A side is empty or a low-confidence cell likely dropped a row.
    MissingField,
    /// Values are present but off by more than the rounding epsilon.
    AmountMismatch,
    /// The row/column structure itself looked inconsistent.
    FormatViolation,
}

/// Sums a balance policy works on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BalanceTotals {
    pub credits: Decimal,
    pub debits: Decimal,
    /// Net pay printed on the slip, when extracted.
    pub net_pay: Option<Decimal>,
}

/// Financial invariant of one payslip format.
pub trait BalancePolicy: Debug + Send + Sync {
    /// Short policy name for reports.
    fn name(&self) -> &'static str;

    /// Signed difference from the invariant, `None` when it cannot be checked.
    fn difference(&self, totals: &BalanceTotals) -> Option<Decimal>;

    /// An empty credit or debit side fails the check outright.
    fn requires_both_sides(&self) -> bool {
        true
    }
}

/// PCDA statements balance: any net amount is itself a debit line.
#[derive(Debug, Clone, Copy, Default)]
pub struct PcdaBalancePolicy;

impl BalancePolicy for PcdaBalancePolicy {
    fn name(&self) -> &'static str {
        "pcda_balance"
    }

    fn difference(&self, totals: &BalanceTotals) -> Option<Decimal> {
        Some(totals.credits - totals.debits)
    }
}

/// Credits minus debits equals the printed net pay.
#[derive(Debug, Clone, Copy, Default)]
pub struct NetPayPolicy;

impl BalancePolicy for NetPayPolicy {
    fn name(&self) -> &'static str {
        "net_pay"
    }

    fn difference(&self, totals: &BalanceTotals) -> Option<Decimal> {
        totals
            .net_pay
            .map(|net| totals.credits - totals.debits - net)
    }

    fn requires_both_sides(&self) -> bool {
        false
    }
}

/// Result of a balance check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialValidation {
    /// Invariant holds within the epsilon (or could not be checked).
    pub totals_balance: bool,
    pub total_credits: Decimal,
    pub total_debits: Decimal,
    /// Absolute difference from the invariant.
    pub discrepancy: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_category: Option<ErrorCategory>,
    /// Name of the policy applied.
    pub policy: String,
    /// False when the policy lacked the inputs it needs.
    pub checked: bool,
}

impl FinancialValidation {
    pub fn is_valid(&self) -> bool {
        self.totals_balance
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Evidence {
    no_items: bool,
    empty_side: bool,
    low_confidence: bool,
    malformed_rows: usize,
}

/// Checks totals against a [`BalancePolicy`].
#[derive(Debug, Clone)]
pub struct FinancialValidator {
    epsilon: Decimal,
    low_confidence: f32,
    policy: Arc<dyn BalancePolicy>,
}

impl FinancialValidator {
    pub fn new() -> Self {
        Self::with_config(&ValidationConfig::default())
    }

    pub fn with_config(config: &ValidationConfig) -> Self {
        Self {
            epsilon: config.balance_epsilon,
            low_confidence: config.low_confidence,
            policy: Arc::new(PcdaBalancePolicy),
        }
    }

    pub fn with_policy(mut self, policy: impl BalancePolicy + 'static) -> Self {
        self.policy = Arc::new(policy);
        self
    }

    pub fn policy(&self) -> &dyn BalancePolicy {
        self.policy.as_ref()
    }

    /// Validate labelled amounts of both sides.
    pub fn validate(
        &self,
        credits: &BTreeMap<String, Decimal>,
        debits: &BTreeMap<String, Decimal>,
    ) -> FinancialValidation {
        let totals = BalanceTotals {
            credits: credits.values().copied().sum(),
            debits: debits.values().copied().sum(),
            net_pay: None,
        };
        let evidence = Evidence {
            no_items: credits.is_empty() && debits.is_empty(),
            empty_side: credits.is_empty() || debits.is_empty(),
            ..Evidence::default()
        };
        self.check(totals, evidence)
    }

    /// Validate line items, using their confidences to classify failures.
    pub fn validate_items(
        &self,
        credits: &[LineItem],
        debits: &[LineItem],
        net_pay: Option<Decimal>,
    ) -> FinancialValidation {
        self.check_items(credits, debits, net_pay, 0)
    }

    /// Validate a processed PCDA grid; unreadable rows count as a format violation.
    pub fn validate_statement(
        &self,
        statement: &PcdaStatement,
        net_pay: Option<Decimal>,
    ) -> FinancialValidation {
        self.check_items(
            &statement.credits,
            &statement.debits,
            net_pay,
            statement.skipped_rows,
        )
    }

    fn check_items(
        &self,
        credits: &[LineItem],
        debits: &[LineItem],
        net_pay: Option<Decimal>,
        malformed_rows: usize,
    ) -> FinancialValidation {
        let totals = BalanceTotals {
            credits: credits.iter().map(|i| i.amount).sum(),
            debits: debits.iter().map(|i| i.amount).sum(),
            net_pay,
        };
        let evidence = Evidence {
            no_items: credits.is_empty() && debits.is_empty(),
            empty_side: credits.is_empty() || debits.is_empty(),
            low_confidence: credits
                .iter()
                .chain(debits)
                .any(|i| i.confidence < self.low_confidence),
            malformed_rows,
        };
        self.check(totals, evidence)
    }

    fn check(&self, totals: BalanceTotals, evidence: Evidence) -> FinancialValidation {
        let difference = self.policy.difference(&totals);
        let discrepancy = difference.map(|d| d.abs()).unwrap_or(Decimal::ZERO);

        // Nothing to sum is never a balanced statement
        let error_category = if evidence.no_items {
            Some(ErrorCategory::FormatViolation)
        } else if evidence.empty_side && self.policy.requires_both_sides() {
            Some(ErrorCategory::MissingField)
        } else if discrepancy <= self.epsilon {
            None
        } else if evidence.malformed_rows > 0 {
            Some(ErrorCategory::FormatViolation)
        } else if evidence.empty_side || evidence.low_confidence {
            Some(ErrorCategory::MissingField)
        } else {
            Some(ErrorCategory::AmountMismatch)
        };
        let totals_balance = error_category.is_none();

        if let Some(category) = error_category {
            warn!(
                "Totals do not balance under {}: credits {}, debits {}, off by {} ({:?})",
                self.policy.name(),
                totals.credits,
                totals.debits,
                discrepancy,
                category
            );
        } else {
            debug!(
                "Totals balance under {}: credits {}, debits {}",
                self.policy.name(),
                totals.credits,
                totals.debits
            );
        }

        FinancialValidation {
            totals_balance,
            total_credits: totals.credits,
            total_debits: totals.debits,
            discrepancy,
            error_category,
            policy: self.policy.name().to_string(),
            checked: difference.is_some(),
        }
    }
}

impl Default for FinancialValidator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn map(entries: &[(&str, &str)]) -> BTreeMap<String, Decimal> {
        entries
            .iter()
            .map(|(label, amount)| (label.to_string(), dec(amount)))
            .collect()
    }

    fn credits() -> BTreeMap<String, Decimal> {
        map(&[
            ("Basic", "136400"),
            ("DA", "69874"),
            ("MSP", "15600"),
            ("Tpt", "5256"),
            ("ArrearsDA", "18228"),
            ("ArrearsTpt", "432"),
            ("LFee", "12167"),
            ("Fur", "5303"),
        ])
    }

    /// Printed deductions plus the net remittance line that balances them.
    fn debits() -> BTreeMap<String, Decimal> {
        map(&[
            ("DSOPF", "40000"),
            ("AGIF", "10000"),
            ("Tax", "48030"),
            ("Cess", "1740"),
            ("Elec", "839"),
            ("LFee", "878"),
            ("Fur", "392"),
            ("Barrack", "711"),
            ("NetRemittance", "160670"),
        ])
    }

    #[test]
    fn test_balanced_statement_is_valid() {
        let result = FinancialValidator::new().validate(&credits(), &debits());

        assert!(result.is_valid());
        assert_eq!(result.total_credits, dec("263260"));
        assert_eq!(result.total_debits, dec("263260"));
        assert_eq!(result.discrepancy, Decimal::ZERO);
        assert_eq!(result.error_category, None);
        assert!(result.checked);
    }

    #[test]
    fn test_perturbed_debit_is_amount_mismatch() {
        let mut debits = debits();
        *debits.get_mut("Tax").unwrap() += dec("500");

        let result = FinancialValidator::new().validate(&credits(), &debits);

        assert!(!result.is_valid());
        assert_eq!(result.discrepancy, dec("500"));
        assert_eq!(result.error_category, Some(ErrorCategory::AmountMismatch));
    }

    #[test]
    fn test_rounding_within_epsilon_balances() {
        let mut debits = debits();
        *debits.get_mut("Fur").unwrap() += dec("0.50");

        let result = FinancialValidator::new().validate(&credits(), &debits);

        assert!(result.is_valid());
        assert_eq!(result.discrepancy, dec("0.50"));
    }

    #[test]
    fn test_empty_side_is_missing_field() {
        let result = FinancialValidator::new().validate(&credits(), &BTreeMap::new());

        assert!(!result.is_valid());
        assert_eq!(result.error_category, Some(ErrorCategory::MissingField));
    }

    #[test]
    fn test_empty_statement_is_format_violation() {
        let result = FinancialValidator::new().validate(&BTreeMap::new(), &BTreeMap::new());

        assert!(!result.is_valid());
        assert_eq!(result.discrepancy, Decimal::ZERO);
        assert_eq!(result.error_category, Some(ErrorCategory::FormatViolation));
    }

    #[test]
    fn test_grid_with_only_unreadable_rows_is_format_violation() {
        let statement = PcdaStatement {
            skipped_rows: 8,
            ..PcdaStatement::default()
        };

        let result = FinancialValidator::new().validate_statement(&statement, None);

        assert!(!result.is_valid());
        assert_eq!(result.error_category, Some(ErrorCategory::FormatViolation));
    }

    #[test]
    fn test_one_empty_side_fails_even_when_zero() {
        let credits = vec![LineItem::new("Basic Pay", Decimal::ZERO)];

        let result = FinancialValidator::new().validate_items(&credits, &[], None);

        assert!(!result.is_valid());
        assert_eq!(result.discrepancy, Decimal::ZERO);
        assert_eq!(result.error_category, Some(ErrorCategory::MissingField));
    }

    #[test]
    fn test_net_pay_policy_allows_slip_without_deductions() {
        let validator = FinancialValidator::new().with_policy(NetPayPolicy);
        let credits = vec![LineItem::new("Basic Pay", dec("50000"))];

        let result = validator.validate_items(&credits, &[], Some(dec("50000")));

        assert!(result.is_valid());
        assert_eq!(result.error_category, None);
    }

    #[test]
    fn test_low_confidence_item_is_missing_field() {
        let credits = vec![LineItem::new("Basic Pay", dec("136400"))];
        let mut shaky = LineItem::new("DSOPF", dec("40000"));
        shaky.confidence = 0.3;

        let result = FinancialValidator::new().validate_items(&credits, &[shaky], None);

        assert_eq!(result.error_category, Some(ErrorCategory::MissingField));
    }

    #[test]
    fn test_skipped_rows_are_format_violation() {
        let statement = PcdaStatement {
            credits: vec![LineItem::new("Basic Pay", dec("136400"))],
            debits: vec![LineItem::new("DSOPF", dec("40000"))],
            skipped_rows: 2,
            ..PcdaStatement::default()
        };

        let result = FinancialValidator::new().validate_statement(&statement, None);

        assert_eq!(result.error_category, Some(ErrorCategory::FormatViolation));
    }

    #[test]
    fn test_net_pay_policy() {
        let validator = FinancialValidator::new().with_policy(NetPayPolicy);
        let credits = vec![LineItem::new("Gross", dec("263260"))];
        let debits = vec![LineItem::new("Deductions", dec("102590"))];

        let result = validator.validate_items(&credits, &debits, Some(dec("160670")));
        assert!(result.is_valid());
        assert_eq!(result.policy, "net_pay");

        let result = validator.validate_items(&credits, &debits, Some(dec("160000")));
        assert!(!result.is_valid());
        assert_eq!(result.discrepancy, dec("670"));

        let result = validator.validate_items(&credits, &debits, None);
        assert!(result.is_valid());
        assert!(!result.checked);
    }

    #[test]
    fn test_validation_is_deterministic() {
        let validator = FinancialValidator::new();
        let first = validator.validate(&credits(), &debits());
        for _ in 0..3 {
            assert_eq!(validator.validate(&credits(), &debits()), first);
        }
    }
}
