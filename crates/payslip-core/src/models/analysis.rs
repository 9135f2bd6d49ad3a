//! Document summary consumed by strategy selection.

use serde::{Deserialize, Serialize};

use crate::error::ExtractionError;

/// Physical characteristics of a document, computed once before extraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentAnalysis {
    /// Number of pages.
    pub page_count: usize,

    /// Document is large enough to warrant memory-aware processing.
    pub is_large_document: bool,

    /// Estimated peak memory for full processing, in bytes.
    pub estimated_memory_requirement: u64,

    /// At least one page is a scanned image.
    pub contains_scanned_content: bool,

    /// Pages carry dense text.
    pub is_text_heavy: bool,

    /// Layout has multi-column structure.
    pub has_complex_layout: bool,

    /// Document contains images or vector graphics.
    pub contains_graphics: bool,
}

impl DocumentAnalysis {
    /// Analysis of a small single-page text document.
    pub fn simple_text(page_count: usize) -> Self {
        Self {
            page_count,
            is_large_document: false,
            estimated_memory_requirement: page_count as u64 * 2 * 1024 * 1024,
            contains_scanned_content: false,
            is_text_heavy: true,
            has_complex_layout: false,
            contains_graphics: false,
        }
    }

    /// Reject analyses that cannot drive extraction.
    pub fn validate(&self) -> Result<(), ExtractionError> {
        if self.page_count == 0 {
            return Err(ExtractionError::InvalidAnalysis(
                "document has zero pages".to_string(),
            ));
        }
        Ok(())
    }

    /// Estimated memory per page, never dividing by zero.
    pub fn memory_per_page(&self) -> u64 {
        self.estimated_memory_requirement / (self.page_count.max(1) as u64)
    }
}

/// Why the document is being processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Purpose {
    /// Extract every field and validate totals.
    #[default]
    FullExtraction,
    /// Cheap first-page rendering for display.
    Preview,
    /// Personal/tax/banking metadata only.
    MetadataOnly,
}
