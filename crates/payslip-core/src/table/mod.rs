//! Table reconstruction from positioned text.
//!
//! The [`TableDetector`] clusters text elements into rows and columns; the
//! [`SpatialAssociator`] then folds wrapped labels and bilingual header
//! lines back into single logical cells.

mod associator;
mod detector;

pub use associator::SpatialAssociator;
pub use detector::TableDetector;

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::models::{Rect, TextElement};
use crate::patterns::normalize_currency;

lazy_static! {
    // English and Devanagari header vocabulary of military pay statements
    static ref HEADER_KEYWORDS: Regex = Regex::new(
        r"(?i)^(?:description|particulars|details|amount|amt|rupees|credits?|debits?|earnings|deductions|receipts|recoveries|विवरण|राशि|रकम|जमा|नामे|कटौती|[/(). \-])+$"
    ).unwrap();

    static ref TOTAL_LABEL: Regex = Regex::new(
        r"(?i)^\s*(?:grand\s+)?(?:total|कुल|योग)\b"
    ).unwrap();

    static ref AMOUNT_TEXT: Regex = Regex::new(
        r"^\s*(?:Rs\.?|₹|INR)?\s*-?\s*\d[\d,\s]*(?:\.\d{1,2})?\s*(?:/-)?\s*$"
    ).unwrap();
}

/// Check if a cell's text is header vocabulary only.
pub fn is_header_text(text: &str) -> bool {
    let text = text.trim();
    !text.is_empty() && HEADER_KEYWORDS.is_match(text)
}

/// Check if a label marks a totals row.
pub fn is_total_label(text: &str) -> bool {
    TOTAL_LABEL.is_match(text)
}

/// Check if a cell's text is a complete printed amount.
pub fn looks_like_amount(text: &str) -> bool {
    AMOUNT_TEXT.is_match(text) && !normalize_currency(text).is_empty()
}

/// Layout variant recognised from the column structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableFormat {
    /// Four-column credit/debit grid of military pay statements.
    Pcda,
    /// Any other grid.
    Generic,
}

/// A single cell of a reconstructed table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableCell {
    pub row_index: usize,
    pub column_index: usize,
    /// Element texts joined in reading order.
    pub text: String,
    pub bbox: Rect,
    pub elements: Vec<TextElement>,
}

impl TableCell {
    /// Empty placeholder occupying `bbox`.
    pub fn empty(row_index: usize, column_index: usize, bbox: Rect) -> Self {
        Self {
            row_index,
            column_index,
            text: String::new(),
            bbox,
            elements: Vec::new(),
        }
    }

    /// Cell built from elements already in reading order.
    pub fn from_elements(row_index: usize, column_index: usize, elements: Vec<TextElement>) -> Self {
        let mut cell = Self::empty(row_index, column_index, Rect::default());
        for element in elements {
            cell.push(element);
        }
        cell
    }

    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }

    /// Lowest element confidence, 1.0 for empty cells.
    pub fn confidence(&self) -> f32 {
        self.elements
            .iter()
            .map(|e| e.confidence)
            .fold(1.0, f32::min)
    }

    /// Append an element, extending text and bounds.
    pub fn push(&mut self, element: TextElement) {
        if self.elements.is_empty() {
            self.bbox = element.bbox;
        } else {
            self.bbox = self.bbox.union(&element.bbox);
        }
        let piece = element.text.trim();
        if !piece.is_empty() {
            if !self.text.is_empty() {
                self.text.push(' ');
            }
            self.text.push_str(piece);
        }
        self.elements.push(element);
    }

    /// Move every element of `other` into this cell.
    pub fn absorb(&mut self, other: &mut TableCell) {
        for element in other.elements.drain(..) {
            self.push(element);
        }
        other.text.clear();
    }
}

/// One row of cells, one cell per column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableRow {
    pub cells: Vec<TableCell>,
    /// Row carries header vocabulary rather than data.
    #[serde(default)]
    pub is_header: bool,
}

impl TableRow {
    pub fn cell(&self, column: usize) -> Option<&TableCell> {
        self.cells.get(column)
    }

    /// Trimmed text of a column, empty when absent.
    pub fn text_at(&self, column: usize) -> &str {
        self.cells.get(column).map_or("", |c| c.text.trim())
    }

    pub fn is_empty(&self) -> bool {
        self.cells.iter().all(TableCell::is_empty)
    }

    /// Vertical center of the populated cells.
    pub fn center_y(&self) -> Option<f32> {
        let populated: Vec<f32> = self
            .cells
            .iter()
            .filter(|c| !c.is_empty())
            .map(|c| c.bbox.center_y())
            .collect();
        if populated.is_empty() {
            None
        } else {
            Some(populated.iter().sum::<f32>() / populated.len() as f32)
        }
    }

    fn reindex(&mut self, row_index: usize) {
        for cell in &mut self.cells {
            cell.row_index = row_index;
        }
    }
}

/// A reconstructed table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableStructure {
    pub rows: Vec<TableRow>,
    /// Left edge of each column, ascending.
    pub column_boundaries: Vec<f32>,
    pub page: usize,
    pub format: TableFormat,
}

impl TableStructure {
    pub fn column_count(&self) -> usize {
        self.column_boundaries.len()
    }

    pub fn cell_at(&self, row: usize, column: usize) -> Option<&TableCell> {
        self.rows.get(row).and_then(|r| r.cell(column))
    }

    /// Rows that are neither headers nor empty.
    pub fn data_rows(&self) -> impl Iterator<Item = &TableRow> {
        self.rows.iter().filter(|r| !r.is_header && !r.is_empty())
    }

    /// First header row, if any.
    pub fn header_row(&self) -> Option<&TableRow> {
        self.rows.iter().find(|r| r.is_header)
    }

    /// Drop empty rows and renumber cells.
    pub fn compact(&mut self) {
        self.rows.retain(|r| !r.is_empty());
        for (i, row) in self.rows.iter_mut().enumerate() {
            row.reindex(i);
        }
    }

    /// Generate HTML for inspection.
    pub fn to_html(&self) -> String {
        let mut html = String::from("<table>\n");

        for row in &self.rows {
            html.push_str("  <tr>\n");
            let tag = if row.is_header { "th" } else { "td" };
            for cell in &row.cells {
                html.push_str(&format!("    <{}>{}</{}>\n", tag, escape_html(&cell.text), tag));
            }
            html.push_str("  </tr>\n");
        }

        html.push_str("</table>");
        html
    }
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
