//! Data models shared across the extraction pipeline.

pub mod analysis;
pub mod config;
pub mod element;
pub mod payslip;

pub use analysis::{DocumentAnalysis, Purpose};
pub use config::PayslipConfig;
pub use element::{Rect, TextElement};
pub use payslip::{ExtractionOutcome, LineItem, PayPeriod, PipelineState};
