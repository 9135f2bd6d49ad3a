//! Row and column clustering of positioned text.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use tracing::{debug, trace};

use super::{is_header_text, TableCell, TableFormat, TableRow, TableStructure};
use crate::models::config::TableConfig;
use crate::models::{Rect, TextElement};

/// Horizontally adjacent elements of one line, e.g. the words of a label.
#[derive(Debug, Clone)]
struct Phrase {
    elements: Vec<TextElement>,
    bbox: Rect,
}

impl Phrase {
    fn new(element: TextElement) -> Self {
        Self {
            bbox: element.bbox,
            elements: vec![element],
        }
    }

    fn push(&mut self, element: TextElement) {
        self.bbox = self.bbox.union(&element.bbox);
        self.elements.push(element);
    }
}

#[derive(Debug)]
struct ColumnCluster {
    min_x: f32,
    last_x: f32,
    rows: BTreeSet<usize>,
}

/// Reconstructs a grid from the text elements of one page.
#[derive(Debug, Clone, Default)]
pub struct TableDetector {
    config: TableConfig,
}

impl TableDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: TableConfig) -> Self {
        Self { config }
    }

    /// Detect a table, or `None` when the elements do not form one.
    ///
    /// Elements are grouped into rows by vertical center, words on a row
    /// are joined into phrases, and phrase start positions are clustered
    /// into columns. The column set is accepted only when most rows fit it
    /// without two phrases landing in one column.
    pub fn detect(&self, elements: &[TextElement]) -> Option<TableStructure> {
        let usable: Vec<TextElement> = elements.iter().filter(|e| e.is_usable()).cloned().collect();
        if usable.len() < 2 {
            return None;
        }
        let page = usable[0].page;

        let line_height = median_height(&usable);
        let lines: Vec<Vec<Phrase>> = self
            .group_rows(usable, line_height)
            .into_iter()
            .map(|line| join_phrases(line, line_height))
            .collect();

        let boundaries = self.column_boundaries(&lines);
        if boundaries.len() < 2 {
            debug!(
                "No table: {} column(s) over {} rows",
                boundaries.len(),
                lines.len()
            );
            return None;
        }

        let mut rows = Vec::with_capacity(lines.len());
        let mut consistent = 0;
        for (row_index, phrases) in lines.into_iter().enumerate() {
            let mut slots: Vec<Vec<TextElement>> = vec![Vec::new(); boundaries.len()];
            let mut collided = false;
            for phrase in phrases {
                let column = column_for(&boundaries, phrase.bbox.min_x(), self.config.column_tolerance);
                collided |= !slots[column].is_empty();
                slots[column].extend(phrase.elements);
            }
            if !collided {
                consistent += 1;
            }

            let cells = slots
                .into_iter()
                .enumerate()
                .map(|(column, elements)| TableCell::from_elements(row_index, column, elements))
                .collect();
            let mut row = TableRow {
                cells,
                is_header: false,
            };
            place_empty_cells(&mut row, &boundaries);
            row.is_header = is_header_row(&row);
            rows.push(row);
        }

        if consistent * 2 <= rows.len() {
            debug!(
                "No table: only {} of {} rows fit {} columns",
                consistent,
                rows.len(),
                boundaries.len()
            );
            return None;
        }

        let data_rows = rows.iter().filter(|r| !r.is_header).count();
        if data_rows == 0 {
            debug!("No table: header rows only");
            return None;
        }

        let format = if boundaries.len() == self.config.expected_pcda_columns {
            TableFormat::Pcda
        } else {
            TableFormat::Generic
        };

        debug!(
            "Detected {:?} table on page {}: {} rows x {} columns",
            format,
            page,
            rows.len(),
            boundaries.len()
        );

        Some(TableStructure {
            rows,
            column_boundaries: boundaries,
            page,
            format,
        })
    }

    /// Page text in reading order; phrases on a line are separated by two spaces.
    pub fn linear_text(&self, elements: &[TextElement]) -> String {
        let usable: Vec<TextElement> = elements.iter().filter(|e| e.is_usable()).cloned().collect();
        let line_height = median_height(&usable);

        self.group_rows(usable, line_height)
            .into_iter()
            .map(|line| {
                join_phrases(line, line_height)
                    .iter()
                    .map(|phrase| {
                        phrase
                            .elements
                            .iter()
                            .map(|e| e.text.trim())
                            .collect::<Vec<_>>()
                            .join(" ")
                    })
                    .collect::<Vec<_>>()
                    .join("  ")
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn group_rows(&self, mut elements: Vec<TextElement>, line_height: f32) -> Vec<Vec<TextElement>> {
        elements.sort_by(|a, b| {
            a.bbox
                .center_y()
                .partial_cmp(&b.bbox.center_y())
                .unwrap_or(Ordering::Equal)
        });

        let tolerance = line_height * self.config.row_tolerance_factor;
        let mut rows: Vec<Vec<TextElement>> = Vec::new();
        let mut centroid = f32::NEG_INFINITY;

        for element in elements {
            let center = element.bbox.center_y();
            match rows.last_mut() {
                Some(row) if (center - centroid).abs() <= tolerance => {
                    row.push(element);
                    centroid = row.iter().map(|e| e.bbox.center_y()).sum::<f32>() / row.len() as f32;
                }
                _ => {
                    centroid = center;
                    rows.push(vec![element]);
                }
            }
        }

        for row in &mut rows {
            row.sort_by(|a, b| a.bbox.x.partial_cmp(&b.bbox.x).unwrap_or(Ordering::Equal));
        }
        trace!("Grouped elements into {} rows (tolerance {:.1})", rows.len(), tolerance);
        rows
    }

    /// Left edges of columns supported by enough rows.
    fn column_boundaries(&self, lines: &[Vec<Phrase>]) -> Vec<f32> {
        let mut starts: Vec<(f32, usize)> = lines
            .iter()
            .enumerate()
            .flat_map(|(row, phrases)| phrases.iter().map(move |p| (p.bbox.min_x(), row)))
            .collect();
        starts.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal));

        // Single linkage, so right-aligned amounts chain into one column
        let mut clusters: Vec<ColumnCluster> = Vec::new();
        for (x, row) in starts {
            match clusters.last_mut() {
                Some(cluster) if x - cluster.last_x <= self.config.column_tolerance => {
                    cluster.last_x = x;
                    cluster.rows.insert(row);
                }
                _ => clusters.push(ColumnCluster {
                    min_x: x,
                    last_x: x,
                    rows: BTreeSet::from([row]),
                }),
            }
        }

        let min_support = lines.len().div_ceil(4).max(2).min(lines.len());
        clusters
            .into_iter()
            .filter(|c| c.rows.len() >= min_support)
            .map(|c| c.min_x)
            .collect()
    }
}

/// Median element height, 1.0 when no element has a height.
pub(crate) fn median_height<'a>(elements: impl IntoIterator<Item = &'a TextElement>) -> f32 {
    let mut heights: Vec<f32> = elements
        .into_iter()
        .map(|e| e.bbox.height)
        .filter(|h| *h > 0.0)
        .collect();
    if heights.is_empty() {
        return 1.0;
    }
    heights.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    heights[heights.len() / 2]
}

fn join_phrases(line: Vec<TextElement>, line_height: f32) -> Vec<Phrase> {
    let mut phrases: Vec<Phrase> = Vec::new();
    for element in line {
        match phrases.last_mut() {
            Some(phrase) if element.bbox.min_x() - phrase.bbox.max_x() < line_height => {
                phrase.push(element)
            }
            _ => phrases.push(Phrase::new(element)),
        }
    }
    phrases
}

/// Column whose span contains `x`; stray starts fall into the column on their left.
fn column_for(boundaries: &[f32], x: f32, tolerance: f32) -> usize {
    boundaries
        .iter()
        .rposition(|b| *b <= x + tolerance)
        .unwrap_or(0)
}

fn place_empty_cells(row: &mut TableRow, boundaries: &[f32]) {
    let Some(span) = row
        .cells
        .iter()
        .filter(|c| !c.elements.is_empty())
        .map(|c| c.bbox)
        .reduce(|a, b| a.union(&b))
    else {
        return;
    };

    for (column, cell) in row.cells.iter_mut().enumerate() {
        if cell.elements.is_empty() {
            let left = boundaries[column];
            let right = boundaries.get(column + 1).copied().unwrap_or(left);
            cell.bbox = Rect::new(left, span.y, right - left, span.height);
        }
    }
}

fn is_header_row(row: &TableRow) -> bool {
    let mut populated = row.cells.iter().filter(|c| !c.is_empty()).peekable();
    populated.peek().is_some() && populated.all(|c| is_header_text(&c.text))
}
