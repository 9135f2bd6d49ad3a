//! Error types for the payslip-core library.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for the payslip library.
#[derive(Error, Debug)]
pub enum PayslipError {
    /// Field extraction or pipeline error.
    #[error("extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    /// PDF processing error.
    #[error("PDF error: {0}")]
    Pdf(#[from] PdfError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Errors raised while running an extraction attempt.
///
/// Missing fields, undetected tables and unbalanced totals are reported as
/// values on the outcome, never through this type.
#[derive(Error, Debug)]
pub enum ExtractionError {
    /// The document analysis cannot drive strategy selection.
    #[error("invalid document analysis: {0}")]
    InvalidAnalysis(String),

    /// No selected page produced usable text elements; `page` is the first
    /// page that was tried.
    #[error("no usable text in the document (first page tried: {page})")]
    NoUsableText { page: usize },

    /// A pattern definition could not be compiled.
    #[error("invalid pattern {id}: {reason}")]
    InvalidPattern { id: String, reason: String },

    /// The caller cancelled processing between page batches.
    #[error("extraction cancelled")]
    Cancelled,
}

/// Reasons a payslip PDF could not be analyzed.
#[derive(Error, Debug)]
pub enum PdfError {
    /// The payslip file could not be read from disk.
    #[error("cannot open payslip {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The bytes are not a PDF lopdf can load.
    #[error("payslip is not a readable PDF: {0}")]
    Unreadable(String),

    /// The payslip needs a password beyond the empty one.
    #[error("payslip PDF is password protected")]
    PasswordProtected,

    /// The document has no pages to take a payslip from.
    #[error("payslip PDF has no pages")]
    NoPages,

    /// The text layer could not be decoded.
    #[error("cannot read the payslip text layer: {0}")]
    NoTextLayer(String),
}

/// Result type for the payslip library.
pub type Result<T> = std::result::Result<T, PayslipError>;
