//! Folding of wrapped cells and stacked header lines.

use tracing::{debug, trace, warn};

use super::detector::median_height;
use super::{looks_like_amount, TableCell, TableRow, TableStructure};
use crate::models::config::TableConfig;

const CONTINUATION_SUFFIXES: [char; 5] = ['-', '/', '&', ',', '('];
const CONNECTOR_WORDS: [&str; 7] = ["of", "for", "and", "to", "on", "in", "the"];

/// Merges cell fragments that belong to one logical cell.
#[derive(Debug, Clone, Default)]
pub struct SpatialAssociator {
    config: TableConfig,
}

impl SpatialAssociator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: TableConfig) -> Self {
        Self { config }
    }

    /// Fold header lines and wrapped labels, then drop emptied rows.
    ///
    /// Returns the number of merges performed.
    pub fn associate(&self, table: &mut TableStructure) -> usize {
        let merged = self.fold_headers(table) + self.merge_multiline(table);
        table.compact();
        debug!("Associated table cells: {} merges, {} rows left", merged, table.rows.len());
        merged
    }

    /// Collapse adjacent header rows (e.g. a Hindi line above an English one).
    pub fn fold_headers(&self, table: &mut TableStructure) -> usize {
        let mut merged = 0;
        for lower in (1..table.rows.len()).rev() {
            if !(table.rows[lower].is_header && table.rows[lower - 1].is_header) {
                continue;
            }
            let (head, tail) = table.rows.split_at_mut(lower);
            let upper = &mut head[lower - 1];
            for (up, down) in upper.cells.iter_mut().zip(tail[0].cells.iter_mut()) {
                if !down.is_empty() {
                    up.absorb(down);
                }
            }
            merged += 1;
        }
        merged
    }

    /// Merge vertically stacked fragments of one cell until nothing changes.
    pub fn merge_multiline(&self, table: &mut TableStructure) -> usize {
        let line_height = median_height(
            table
                .rows
                .iter()
                .flat_map(|r| r.cells.iter())
                .flat_map(|c| c.elements.iter()),
        );
        let max_gap = line_height * self.config.merge_gap_factor;

        let mut total = 0;
        for pass in 0..self.config.max_merge_iterations {
            let merged = merge_pass(&mut table.rows, max_gap);
            trace!("Merge pass {}: {} merges", pass, merged);
            if merged == 0 {
                return total;
            }
            total += merged;
        }

        if self.config.max_merge_iterations > 0 {
            warn!(
                "Cell merging stopped after {} passes",
                self.config.max_merge_iterations
            );
        }
        total
    }
}

fn merge_pass(rows: &mut [TableRow], max_gap: f32) -> usize {
    let columns = rows.iter().map(|r| r.cells.len()).max().unwrap_or(0);
    let mut merged = 0;

    for column in 0..columns {
        let mut anchor: Option<usize> = None;
        for lower in 0..rows.len() {
            let Some(cell) = rows[lower].cells.get(column) else {
                continue;
            };
            if cell.is_empty() {
                continue;
            }
            if let Some(upper) = anchor {
                if should_merge(&rows[upper], &rows[lower], column, max_gap) {
                    let kept = join_cells(rows, upper, lower, column);
                    anchor = Some(kept);
                    merged += 1;
                    continue;
                }
            }
            anchor = Some(lower);
        }
    }
    merged
}

fn should_merge(upper: &TableRow, lower: &TableRow, column: usize, max_gap: f32) -> bool {
    if upper.is_header || lower.is_header {
        return false;
    }
    let (Some(top), Some(bottom)) = (upper.cell(column), lower.cell(column)) else {
        return false;
    };

    let gap = bottom.bbox.min_y() - top.bbox.max_y();
    if gap >= max_gap || bottom.bbox.center_y() <= top.bbox.center_y() {
        return false;
    }
    if looks_like_amount(&top.text) || looks_like_amount(&bottom.text) {
        return false;
    }

    // Two labels that each carry their own amount are two line items
    let upper_paired = has_amount_beside(upper, column);
    if upper_paired && has_amount_beside(lower, column) {
        return false;
    }
    continues(top.text.trim(), bottom.text.trim(), upper_paired)
}

/// The amount column to the right of a label column is filled.
fn has_amount_beside(row: &TableRow, column: usize) -> bool {
    row.cell(column + 1).is_some_and(|c| !c.is_empty())
}

/// Check if `upper` reads as unfinished or `lower` as its continuation.
///
/// A short fragment only counts when it has no amount of its own.
fn continues(upper: &str, lower: &str, upper_paired: bool) -> bool {
    if upper.ends_with(CONTINUATION_SUFFIXES) {
        return true;
    }
    if let Some(last) = upper.split_whitespace().last() {
        if CONNECTOR_WORDS.iter().any(|w| last.eq_ignore_ascii_case(w)) {
            return true;
        }
    }
    if !upper_paired && is_fragment(upper) {
        return true;
    }
    lower
        .chars()
        .next()
        .is_some_and(|c| c == '(' || c == '&' || c.is_lowercase())
}

/// Short piece such as `A/o` that cannot be a label on its own.
fn is_fragment(text: &str) -> bool {
    text.chars().count() <= 3 && text.chars().any(char::is_lowercase)
}

/// Join two cells of a column; returns the row that now holds the text.
///
/// Text stays on whichever row carries the rest of the line, so a label
/// whose amount is printed on its second line ends up beside that amount.
fn join_cells(rows: &mut [TableRow], upper: usize, lower: usize, column: usize) -> usize {
    let keep_lower = !has_other_content(&rows[upper], column) && has_other_content(&rows[lower], column);
    let (head, tail) = rows.split_at_mut(lower);
    let top = &mut head[upper].cells[column];
    let bottom = &mut tail[0].cells[column];

    trace!("Merging {:?} with {:?}", top.text, bottom.text);
    if keep_lower {
        let mut joined = TableCell::empty(bottom.row_index, column, top.bbox);
        joined.absorb(top);
        joined.absorb(bottom);
        *bottom = joined;
        lower
    } else {
        top.absorb(bottom);
        upper
    }
}

fn has_other_content(row: &TableRow, column: usize) -> bool {
    row.cells
        .iter()
        .enumerate()
        .any(|(i, c)| i != column && !c.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Rect, TextElement};
    use crate::table::TableDetector;
    use pretty_assertions::assert_eq;

    fn word(text: &str, x: f32, y: f32) -> TextElement {
        TextElement::new(text, Rect::new(x, y, 6.0 * text.chars().count() as f32, 10.0), 0, 0.9)
    }

    fn detect(elements: &[TextElement]) -> TableStructure {
        TableDetector::new().detect(elements).unwrap()
    }

    #[test]
    fn test_hyphenated_label_merges_with_line_below() {
        let mut table = detect(&[
            word("Basic Pay", 50.0, 80.0),
            word("136400", 204.0, 80.0),
            word("A/o DA-", 50.0, 100.0),
            word("18228", 210.0, 100.0),
            word("(Sept 23)", 50.0, 112.0),
            word("MSP", 50.0, 132.0),
            word("15600", 210.0, 132.0),
        ]);
        assert_eq!(table.rows.len(), 4);

        let merged = SpatialAssociator::new().associate(&mut table);

        assert_eq!(merged, 1);
        assert_eq!(table.rows.len(), 3);
        assert_eq!(table.rows[1].text_at(0), "A/o DA- (Sept 23)");
        assert_eq!(table.rows[1].text_at(1), "18228");
        assert_eq!(table.rows[2].text_at(0), "MSP");
        assert_eq!(table.rows[2].cells[0].row_index, 2);
    }

    #[test]
    fn test_wrapped_label_joins_the_row_with_the_amount() {
        let mut table = detect(&[
            word("Basic Pay", 50.0, 80.0),
            word("136400", 204.0, 80.0),
            word("Arrears of", 50.0, 100.0),
            word("DA (Sept 23)", 50.0, 112.0),
            word("18228", 210.0, 112.0),
            word("MSP", 50.0, 132.0),
            word("15600", 210.0, 132.0),
        ]);

        SpatialAssociator::new().associate(&mut table);

        assert_eq!(table.rows.len(), 3);
        assert_eq!(table.rows[1].text_at(0), "Arrears of DA (Sept 23)");
        assert_eq!(table.rows[1].text_at(1), "18228");
    }

    #[test]
    fn test_regular_rows_are_left_alone() {
        let mut table = detect(&[
            word("Basic Pay", 50.0, 80.0),
            word("136400", 204.0, 80.0),
            word("DA", 50.0, 92.0),
            word("69874", 210.0, 92.0),
            word("MSP", 50.0, 104.0),
            word("15600", 210.0, 104.0),
        ]);

        let merged = SpatialAssociator::new().associate(&mut table);

        assert_eq!(merged, 0);
        assert_eq!(table.rows.len(), 3);
    }

    #[test]
    fn test_bilingual_header_lines_fold_into_one_row() {
        let mut table = detect(&[
            word("विवरण", 50.0, 60.0),
            word("राशि", 204.0, 60.0),
            word("Description", 50.0, 72.0),
            word("Amount", 204.0, 72.0),
            word("Basic Pay", 50.0, 100.0),
            word("136400", 204.0, 100.0),
            word("DA", 50.0, 120.0),
            word("69874", 210.0, 120.0),
        ]);

        SpatialAssociator::new().associate(&mut table);

        assert_eq!(table.rows.len(), 3);
        let header = table.header_row().unwrap();
        assert_eq!(header.text_at(0), "विवरण Description");
        assert_eq!(header.text_at(1), "राशि Amount");
        assert_eq!(table.data_rows().count(), 2);
    }

    #[test]
    fn test_zero_iterations_performs_no_merges() {
        let mut table = detect(&[
            word("Basic Pay", 50.0, 80.0),
            word("136400", 204.0, 80.0),
            word("A/o DA-", 50.0, 100.0),
            word("18228", 210.0, 100.0),
            word("(Sept 23)", 50.0, 112.0),
        ]);
        let config = TableConfig {
            max_merge_iterations: 0,
            ..TableConfig::default()
        };

        let merged = SpatialAssociator::with_config(config).merge_multiline(&mut table);

        assert_eq!(merged, 0);
        assert_eq!(table.rows[2].text_at(0), "(Sept 23)");
    }

    #[test]
    fn test_short_labels_with_own_amounts_stay_apart() {
        let mut table = detect(&[
            word("Basic Pay", 50.0, 100.0),
            word("136400", 204.0, 100.0),
            word("Fur", 300.0, 100.0),
            word("392", 462.0, 100.0),
            word("DA", 50.0, 112.0),
            word("69874", 210.0, 112.0),
            word("Barrack Damage", 300.0, 112.0),
            word("1108", 456.0, 112.0),
        ]);
        assert_eq!(table.column_count(), 4);

        let merged = SpatialAssociator::new().associate(&mut table);

        assert_eq!(merged, 0);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0].text_at(2), "Fur");
        assert_eq!(table.rows[0].text_at(3), "392");
        assert_eq!(table.rows[1].text_at(2), "Barrack Damage");
        assert_eq!(table.rows[1].text_at(3), "1108");
    }

    #[test]
    fn test_unpaired_fragment_still_merges() {
        let mut table = detect(&[
            word("Basic Pay", 50.0, 80.0),
            word("136400", 204.0, 80.0),
            word("A/o", 50.0, 100.0),
            word("DA (Sept 23)", 50.0, 112.0),
            word("18228", 210.0, 112.0),
            word("MSP", 50.0, 132.0),
            word("15600", 210.0, 132.0),
        ]);

        SpatialAssociator::new().associate(&mut table);

        assert_eq!(table.rows.len(), 3);
        assert_eq!(table.rows[1].text_at(0), "A/o DA (Sept 23)");
        assert_eq!(table.rows[1].text_at(1), "18228");
    }

    #[test]
    fn test_continuation_rules() {
        assert!(continues("A/o DA-", "(Sept 23)", true));
        assert!(continues("Arrears of", "DA", false));
        assert!(continues("Transport", "allowance", false));
        assert!(continues("Fur", "Barrack Damage", false));
        assert!(!continues("Fur", "Barrack Damage", true));
        assert!(!continues("DA", "MSP", false));
        assert!(!continues("Basic Pay", "Tpt Allce", false));
    }
}
