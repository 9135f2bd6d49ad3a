//! PDF document analysis.

mod analyzer;

pub use analyzer::{column_gaps, layout_complexity, PdfAnalyzer};

use crate::error::PdfError;
use crate::models::DocumentAnalysis;

/// Result type for PDF operations.
pub type Result<T> = std::result::Result<T, PdfError>;

/// Summarizes a document before extraction.
pub trait DocumentAnalyzer {
    /// Compute the analysis that drives strategy selection.
    fn analyze(&self) -> Result<DocumentAnalysis>;
}
