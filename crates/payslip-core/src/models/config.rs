//! Configuration structures for the extraction pipeline.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::patterns::CatalogPrecedence;

/// Main configuration for the payslip pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PayslipConfig {
    /// Strategy selection configuration.
    pub strategy: StrategyConfig,

    /// Table detection and cell merging configuration.
    pub table: TableConfig,

    /// Financial validation configuration.
    pub validation: ValidationConfig,

    /// Pattern catalog configuration.
    pub patterns: PatternConfig,
}

/// Strategy selector thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyConfig {
    /// Memory estimate (bytes) above which large documents are streamed.
    pub memory_threshold: u64,

    /// Upper bound for the streaming batch size.
    pub max_batch_size: usize,

    /// Documents with fewer pages get upgraded quality.
    pub small_document_pages: usize,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            memory_threshold: 100 * 1024 * 1024,
            max_batch_size: 20,
            small_document_pages: 10,
        }
    }
}

/// Table reconstruction tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TableConfig {
    /// Fraction of the median line height within which centers share a row.
    pub row_tolerance_factor: f32,

    /// Maximum distance (points) between x-starts clustered into one column.
    pub column_tolerance: f32,

    /// Fraction of the median line height below which stacked cells merge.
    pub merge_gap_factor: f32,

    /// Cap on fixed-point merge passes.
    pub max_merge_iterations: usize,

    /// Column count of the PCDA grid.
    pub expected_pcda_columns: usize,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            row_tolerance_factor: 0.5,
            column_tolerance: 12.0,
            merge_gap_factor: 0.6,
            max_merge_iterations: 16,
            expected_pcda_columns: 4,
        }
    }
}

/// Financial validation tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Largest credit/debit difference absorbed as rounding.
    pub balance_epsilon: Decimal,

    /// Cell confidence below which a dropped row is suspected.
    pub low_confidence: f32,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            balance_epsilon: Decimal::ONE,
            low_confidence: 0.6,
        }
    }
}

/// Pattern catalog sources.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternConfig {
    /// JSON file holding user pattern definitions.
    pub user_patterns: Option<PathBuf>,

    /// Which source wins when user and core patterns share a key.
    pub precedence: CatalogPrecedence,
}

impl PayslipConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })?;
        std::fs::write(path, content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: PayslipConfig =
            serde_json::from_str(r#"{"strategy":{"memory_threshold":1024}}"#).unwrap();

        assert_eq!(config.strategy.memory_threshold, 1024);
        assert_eq!(config.strategy.max_batch_size, 20);
        assert_eq!(config.table.expected_pcda_columns, 4);
        assert_eq!(config.patterns.precedence, CatalogPrecedence::UserFirst);
    }
}
