//! Core library for payslip field extraction.
//!
//! This crate provides:
//! - Strategy selection from a document summary
//! - Prioritized pattern matching over core and user field definitions
//! - Table reconstruction from positioned text, including wrapped cells
//! - PCDA credit/debit row processing
//! - Financial and content validation of the result
//! - PDF document analysis (feature `pdf`)

pub mod error;
pub mod models;
pub mod patterns;
pub mod pcda;
#[cfg(feature = "pdf")]
pub mod pdf;
pub mod pipeline;
pub mod strategy;
pub mod table;
pub mod validation;

pub use error::{ExtractionError, PayslipError, PdfError, Result};
pub use models::{
    DocumentAnalysis, ExtractionOutcome, LineItem, PayPeriod, PayslipConfig, PipelineState,
    Purpose, Rect, TextElement,
};
pub use patterns::{CatalogPrecedence, PatternCatalog, PatternMatchingEngine};
pub use pcda::{PcdaRowProcessor, PcdaStatement};
#[cfg(feature = "pdf")]
pub use pdf::{DocumentAnalyzer, PdfAnalyzer};
pub use pipeline::{CancellationSignal, ExtractionPipeline, ExtractionRequest, NeverCancel};
pub use strategy::{ExtractionParameters, ExtractionStrategy, StrategySelector};
pub use table::{SpatialAssociator, TableDetector, TableStructure};
pub use validation::{FinancialValidation, FinancialValidator, ValidationResult};
