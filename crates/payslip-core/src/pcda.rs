//! Credit/debit line items from PCDA four-column grids.

use std::str::FromStr;

use lazy_static::lazy_static;
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::models::LineItem;
use crate::patterns::normalize_currency;
use crate::table::{is_total_label, TableRow, TableStructure};

lazy_static! {
    // Label and amount joined into one phrase, e.g. "DSOPF Subn 40000"
    static ref TRAILING_AMOUNT: Regex =
        Regex::new(r"^(.*?[^\d\s,.])\s+((?:Rs\.?\s*|₹\s*)?\d[\d,]*(?:\.\d{1,2})?)\s*(?:/-)?$").unwrap();
}

/// Label/amount column pair of one side of the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnPair {
    pub label: usize,
    pub amount: usize,
}

/// Line items and printed totals of a whole grid.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PcdaStatement {
    pub credits: Vec<LineItem>,
    pub debits: Vec<LineItem>,
    /// Credit total as printed on the slip.
    pub stated_credit_total: Option<Decimal>,
    /// Debit total as printed on the slip.
    pub stated_debit_total: Option<Decimal>,
    /// Data rows that yielded no line item.
    pub skipped_rows: usize,
}

/// Reads line items out of reconstructed PCDA rows.
///
/// Columns 0-1 hold the credit description and amount, columns 2-3 the
/// debit description and amount. Either side of a row may be missing.
#[derive(Debug, Clone)]
pub struct PcdaRowProcessor {
    credit: ColumnPair,
    debit: ColumnPair,
}

impl PcdaRowProcessor {
    pub fn new() -> Self {
        Self {
            credit: ColumnPair { label: 0, amount: 1 },
            debit: ColumnPair { label: 2, amount: 3 },
        }
    }

    /// Use a different column layout.
    pub fn with_columns(mut self, credit: ColumnPair, debit: ColumnPair) -> Self {
        self.credit = credit;
        self.debit = debit;
        self
    }

    /// Credit and debit items of one row. Header, empty and totals rows
    /// yield nothing.
    pub fn process_row(&self, row: &TableRow) -> (Vec<LineItem>, Vec<LineItem>) {
        if row.is_header || row.is_empty() {
            return (Vec::new(), Vec::new());
        }

        let credits = self
            .read_side(row, self.credit)
            .filter(|item| !is_total_label(&item.label))
            .into_iter()
            .collect();
        let debits = self
            .read_side(row, self.debit)
            .filter(|item| !is_total_label(&item.label))
            .into_iter()
            .collect();

        (credits, debits)
    }

    /// Process every row of a table.
    pub fn process_table(&self, table: &TableStructure) -> PcdaStatement {
        let mut statement = PcdaStatement::default();
        // Lines above the header belong to the slip's preamble
        let start = table.rows.iter().position(|r| r.is_header).unwrap_or(0);

        for row in table.rows[start..].iter().filter(|r| !r.is_header && !r.is_empty()) {
            let credit = self.read_side(row, self.credit);
            let debit = self.read_side(row, self.debit);
            if credit.is_none() && debit.is_none() {
                trace!("Row {:?} yielded no line item", row.text_at(self.credit.label));
                statement.skipped_rows += 1;
                continue;
            }

            match credit {
                Some(item) if is_total_label(&item.label) => {
                    statement.stated_credit_total = Some(item.amount)
                }
                Some(item) => statement.credits.push(item),
                None => {}
            }
            match debit {
                Some(item) if is_total_label(&item.label) => {
                    statement.stated_debit_total = Some(item.amount)
                }
                Some(item) => statement.debits.push(item),
                None => {}
            }
        }

        debug!(
            "PCDA grid: {} credits, {} debits, {} rows skipped",
            statement.credits.len(),
            statement.debits.len(),
            statement.skipped_rows
        );
        statement
    }

    fn read_side(&self, row: &TableRow, pair: ColumnPair) -> Option<LineItem> {
        let mut label = row.text_at(pair.label).to_string();
        let mut raw_amount = row.text_at(pair.amount).to_string();

        if raw_amount.is_empty() {
            let caps = TRAILING_AMOUNT.captures(&label)?;
            let (head, tail) = (caps[1].trim().to_string(), caps[2].to_string());
            label = head;
            raw_amount = tail;
        }

        let amount = parse_amount(&raw_amount)?;
        let confidence = [pair.label, pair.amount]
            .iter()
            .filter_map(|c| row.cell(*c))
            .filter(|c| !c.is_empty())
            .map(|c| c.confidence())
            .fold(1.0, f32::min);

        Some(LineItem {
            label,
            amount,
            raw_amount,
            confidence,
        })
    }
}

impl Default for PcdaRowProcessor {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse a printed amount into a decimal.
pub fn parse_amount(text: &str) -> Option<Decimal> {
    let normalized = normalize_currency(text);
    if normalized.is_empty() {
        return None;
    }
    Decimal::from_str(&normalized).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Rect, TextElement};
    use crate::table::TableCell;
    use pretty_assertions::assert_eq;

    fn row(texts: [&str; 4]) -> TableRow {
        let cells = texts
            .iter()
            .enumerate()
            .map(|(column, text)| {
                let elements = if text.is_empty() {
                    Vec::new()
                } else {
                    vec![TextElement::new(*text, Rect::default(), 0, 0.9)]
                };
                TableCell::from_elements(0, column, elements)
            })
            .collect();
        TableRow {
            cells,
            is_header: false,
        }
    }

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_full_row_yields_both_sides() {
        let (credits, debits) =
            PcdaRowProcessor::new().process_row(&row(["Basic Pay", "1,36,400.00", "DSOPF Subn", "40000"]));

        assert_eq!(credits.len(), 1);
        assert_eq!(credits[0].label, "Basic Pay");
        assert_eq!(credits[0].amount, dec("136400.00"));
        assert_eq!(credits[0].raw_amount, "1,36,400.00");
        assert_eq!(debits.len(), 1);
        assert_eq!(debits[0].amount, dec("40000"));
    }

    #[test]
    fn test_partial_rows_keep_the_populated_side() {
        let processor = PcdaRowProcessor::new();

        let (credits, debits) = processor.process_row(&row(["Arrears DA", "18228", "", ""]));
        assert_eq!(credits.len(), 1);
        assert!(debits.is_empty());

        let (credits, debits) = processor.process_row(&row(["", "", "Barrack Damage", "711"]));
        assert!(credits.is_empty());
        assert_eq!(debits[0].label, "Barrack Damage");
    }

    #[test]
    fn test_header_and_empty_rows_are_skipped() {
        let processor = PcdaRowProcessor::new();
        let mut header = row(["Description", "Amount", "Description", "Amount"]);
        header.is_header = true;

        assert_eq!(processor.process_row(&header), (Vec::new(), Vec::new()));
        assert_eq!(processor.process_row(&row(["", "", "", ""])), (Vec::new(), Vec::new()));
    }

    #[test]
    fn test_amount_joined_to_label_is_split() {
        let (_, debits) = PcdaRowProcessor::new().process_row(&row(["", "", "DSOPF Subn 40000", ""]));

        assert_eq!(debits.len(), 1);
        assert_eq!(debits[0].label, "DSOPF Subn");
        assert_eq!(debits[0].amount, dec("40000"));
    }

    #[test]
    fn test_unparseable_amount_yields_nothing() {
        let (credits, _) = PcdaRowProcessor::new().process_row(&row(["Basic Pay", "nil", "", ""]));
        assert!(credits.is_empty());
    }

    #[test]
    fn test_totals_row_is_captured_separately() {
        let table = TableStructure {
            rows: vec![
                row(["Basic Pay", "136400", "DSOPF Subn", "40000"]),
                row(["DA", "69874", "Net Remittance", "166274"]),
                row(["Total", "206274", "Total", "206274"]),
            ],
            column_boundaries: vec![50.0, 200.0, 300.0, 450.0],
            page: 0,
            format: crate::table::TableFormat::Pcda,
        };

        let statement = PcdaRowProcessor::new().process_table(&table);

        assert_eq!(statement.credits.len(), 2);
        assert_eq!(statement.debits.len(), 2);
        assert_eq!(statement.stated_credit_total, Some(dec("206274")));
        assert_eq!(statement.stated_debit_total, Some(dec("206274")));
        assert_eq!(statement.skipped_rows, 0);

        let (credits, debits) = PcdaRowProcessor::new().process_row(&table.rows[2]);
        assert!(credits.is_empty() && debits.is_empty());
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("₹5,256"), Some(dec("5256")));
        assert_eq!(parse_amount("432/-"), Some(dec("432")));
        assert_eq!(parse_amount("--"), None);
    }
}
