//! Extraction strategy selection.
//!
//! Maps a [`DocumentAnalysis`] and [`Purpose`] to one of six processing
//! pipelines and tunes the parameters the extractors run with. Selection is
//! pure: the same inputs always produce the same strategy and parameters.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ExtractionError;
use crate::models::config::StrategyConfig;
use crate::models::{DocumentAnalysis, Purpose};

/// Processing pipeline chosen for a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionStrategy {
    /// Use the embedded text layer.
    NativeText,
    /// Recognize text from page images.
    Ocr,
    /// Embedded text plus OCR for scanned pages.
    Hybrid,
    /// Table reconstruction from positioned text.
    Table,
    /// Memory-bounded batches of pages.
    Streaming,
    /// First page at reduced fidelity.
    Preview,
}

impl ExtractionStrategy {
    /// Whether the strategy reconstructs tables before pattern matching.
    pub fn reconstructs_tables(&self) -> bool {
        !matches!(self, ExtractionStrategy::Preview)
    }
}

/// Rendering/recognition quality tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Quality {
    Low,
    Medium,
    High,
    Maximum,
}

impl Quality {
    /// The next tier up, saturating at `Maximum`.
    pub fn upgraded(self) -> Self {
        match self {
            Quality::Low => Quality::Medium,
            Quality::Medium => Quality::High,
            Quality::High | Quality::Maximum => Quality::Maximum,
        }
    }
}

/// Settings consumed read-only by extractors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionParameters {
    pub quality: Quality,
    pub extract_images: bool,
    pub extract_text: bool,
    pub extract_tables: bool,
    pub use_ocr: bool,
    pub use_streaming: bool,
    /// Pages per batch when streaming.
    pub batch_size: usize,
    /// Zero-based page indices to process; `None` means every page.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pages_to_process: Option<Vec<usize>>,
    /// Render scale applied to page images (1.0 = native).
    pub downscale_factor: f32,
    /// Image compression quality (0.0 - 1.0).
    pub image_quality: f32,
}

impl Default for ExtractionParameters {
    fn default() -> Self {
        Self {
            quality: Quality::Medium,
            extract_images: false,
            extract_text: true,
            extract_tables: false,
            use_ocr: false,
            use_streaming: false,
            batch_size: 1,
            pages_to_process: None,
            downscale_factor: 1.0,
            image_quality: 0.8,
        }
    }
}

/// Chooses a strategy and its parameters for a document.
#[derive(Debug, Clone, Default)]
pub struct StrategySelector {
    config: StrategyConfig,
}

impl StrategySelector {
    /// Create a selector with default thresholds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a selector with explicit thresholds.
    pub fn with_config(config: StrategyConfig) -> Self {
        Self { config }
    }

    /// Memory threshold in bytes.
    pub fn memory_threshold(&self) -> u64 {
        self.config.memory_threshold
    }

    /// Validate the analysis, then pick a strategy and tune its parameters.
    pub fn select(
        &self,
        analysis: &DocumentAnalysis,
        purpose: Purpose,
    ) -> Result<(ExtractionStrategy, ExtractionParameters), ExtractionError> {
        analysis.validate()?;
        let strategy = self.determine_strategy(analysis, purpose);
        let parameters = self.extraction_parameters(strategy, analysis);
        Ok((strategy, parameters))
    }

    /// Pick the processing strategy. Rules apply in priority order.
    pub fn determine_strategy(
        &self,
        analysis: &DocumentAnalysis,
        purpose: Purpose,
    ) -> ExtractionStrategy {
        let strategy = if purpose == Purpose::Preview {
            ExtractionStrategy::Preview
        } else if analysis.is_large_document
            && analysis.estimated_memory_requirement > self.config.memory_threshold
        {
            ExtractionStrategy::Streaming
        } else if analysis.contains_scanned_content {
            if analysis.is_text_heavy {
                ExtractionStrategy::Hybrid
            } else {
                ExtractionStrategy::Ocr
            }
        } else if analysis.has_complex_layout && analysis.is_text_heavy {
            ExtractionStrategy::Table
        } else {
            ExtractionStrategy::NativeText
        };

        debug!(
            "Selected {:?} for {} pages ({} bytes estimated, purpose {:?})",
            strategy, analysis.page_count, analysis.estimated_memory_requirement, purpose
        );
        strategy
    }

    /// Streaming batch size bounded by the memory threshold.
    pub fn batch_size(&self, analysis: &DocumentAnalysis) -> usize {
        let per_page = analysis.memory_per_page().max(1);
        let pages = self.config.memory_threshold / per_page;
        let max = self.config.max_batch_size.max(1);
        usize::try_from(pages).unwrap_or(max).clamp(1, max)
    }

    /// Build the parameters for a strategy, then tune them for the document.
    pub fn extraction_parameters(
        &self,
        strategy: ExtractionStrategy,
        analysis: &DocumentAnalysis,
    ) -> ExtractionParameters {
        let mut params = match strategy {
            ExtractionStrategy::NativeText => ExtractionParameters {
                quality: Quality::Medium,
                extract_text: true,
                ..Default::default()
            },
            ExtractionStrategy::Ocr => ExtractionParameters {
                quality: Quality::High,
                extract_images: true,
                extract_text: false,
                use_ocr: true,
                image_quality: 0.9,
                ..Default::default()
            },
            ExtractionStrategy::Hybrid => ExtractionParameters {
                quality: Quality::High,
                extract_images: true,
                extract_text: true,
                use_ocr: true,
                image_quality: 0.9,
                ..Default::default()
            },
            ExtractionStrategy::Table => ExtractionParameters {
                quality: Quality::High,
                extract_text: true,
                extract_tables: true,
                ..Default::default()
            },
            ExtractionStrategy::Streaming => ExtractionParameters {
                quality: Quality::Low,
                extract_text: true,
                extract_tables: true,
                use_streaming: true,
                batch_size: self.batch_size(analysis),
                downscale_factor: 0.75,
                image_quality: 0.6,
                ..Default::default()
            },
            ExtractionStrategy::Preview => ExtractionParameters {
                quality: Quality::Low,
                extract_text: true,
                pages_to_process: Some(vec![0]),
                downscale_factor: 0.5,
                image_quality: 0.5,
                ..Default::default()
            },
        };

        if strategy == ExtractionStrategy::Preview {
            return params;
        }

        if analysis.contains_graphics {
            params.extract_images = true;
            params.image_quality = params.image_quality.max(0.85);
        }

        if analysis.is_text_heavy {
            params.extract_text = true;
            // Dense text needs full resolution for small glyphs
            if !params.use_streaming {
                params.downscale_factor = 1.0;
            }
        }

        if analysis.page_count < self.config.small_document_pages {
            params.quality = params.quality.upgraded();
        }

        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analysis() -> DocumentAnalysis {
        DocumentAnalysis {
            page_count: 2,
            is_large_document: false,
            estimated_memory_requirement: 4 * 1024 * 1024,
            contains_scanned_content: false,
            is_text_heavy: false,
            has_complex_layout: false,
            contains_graphics: false,
        }
    }

    #[test]
    fn test_preview_always_wins() {
        let selector = StrategySelector::new();
        let mut doc = analysis();
        doc.is_large_document = true;
        doc.estimated_memory_requirement = u64::MAX;
        doc.contains_scanned_content = true;

        assert_eq!(
            selector.determine_strategy(&doc, Purpose::Preview),
            ExtractionStrategy::Preview
        );
    }

    #[test]
    fn test_memory_threshold_boundary() {
        let selector = StrategySelector::new();
        let mut doc = analysis();
        doc.is_large_document = true;
        doc.estimated_memory_requirement = selector.memory_threshold();

        assert_eq!(
            selector.determine_strategy(&doc, Purpose::FullExtraction),
            ExtractionStrategy::NativeText
        );

        doc.estimated_memory_requirement = selector.memory_threshold() + 1;
        assert_eq!(
            selector.determine_strategy(&doc, Purpose::FullExtraction),
            ExtractionStrategy::Streaming
        );
    }

    #[test]
    fn test_large_memory_without_large_flag_is_not_streamed() {
        let selector = StrategySelector::new();
        let mut doc = analysis();
        doc.estimated_memory_requirement = selector.memory_threshold() * 4;

        assert_eq!(
            selector.determine_strategy(&doc, Purpose::FullExtraction),
            ExtractionStrategy::NativeText
        );
    }

    #[test]
    fn test_scanned_content() {
        let selector = StrategySelector::new();
        let mut doc = analysis();
        doc.contains_scanned_content = true;

        assert_eq!(
            selector.determine_strategy(&doc, Purpose::FullExtraction),
            ExtractionStrategy::Ocr
        );

        doc.is_text_heavy = true;
        assert_eq!(
            selector.determine_strategy(&doc, Purpose::MetadataOnly),
            ExtractionStrategy::Hybrid
        );
    }

    #[test]
    fn test_complex_text_heavy_layout_selects_table() {
        let selector = StrategySelector::new();
        let mut doc = analysis();
        doc.has_complex_layout = true;
        assert_eq!(
            selector.determine_strategy(&doc, Purpose::FullExtraction),
            ExtractionStrategy::NativeText
        );

        doc.is_text_heavy = true;
        assert_eq!(
            selector.determine_strategy(&doc, Purpose::FullExtraction),
            ExtractionStrategy::Table
        );
    }

    #[test]
    fn test_batch_size_is_clamped() {
        let selector = StrategySelector::with_config(StrategyConfig {
            memory_threshold: 1000,
            ..Default::default()
        });

        let mut doc = analysis();
        doc.page_count = 10;
        doc.estimated_memory_requirement = 1_000_000;
        assert_eq!(selector.batch_size(&doc), 1);

        doc.estimated_memory_requirement = 10;
        assert_eq!(selector.batch_size(&doc), 20);

        doc.estimated_memory_requirement = 2500;
        assert_eq!(selector.batch_size(&doc), 4);
    }

    #[test]
    fn test_small_document_quality_upgrade() {
        let selector = StrategySelector::new();
        let mut doc = analysis();
        let params = selector.extraction_parameters(ExtractionStrategy::NativeText, &doc);
        assert_eq!(params.quality, Quality::High);

        doc.page_count = 40;
        let params = selector.extraction_parameters(ExtractionStrategy::NativeText, &doc);
        assert_eq!(params.quality, Quality::Medium);
    }

    #[test]
    fn test_graphics_enable_images() {
        let selector = StrategySelector::new();
        let mut doc = analysis();
        doc.contains_graphics = true;

        let params = selector.extraction_parameters(ExtractionStrategy::Table, &doc);
        assert!(params.extract_images);
        assert!(params.image_quality >= 0.85);
    }

    #[test]
    fn test_preview_parameters_untouched_by_tuning() {
        let selector = StrategySelector::new();
        let mut doc = analysis();
        doc.contains_graphics = true;

        let params = selector.extraction_parameters(ExtractionStrategy::Preview, &doc);
        assert_eq!(params.quality, Quality::Low);
        assert_eq!(params.pages_to_process, Some(vec![0]));
        assert!(!params.extract_images);
    }

    #[test]
    fn test_select_rejects_zero_pages() {
        let selector = StrategySelector::new();
        let mut doc = analysis();
        doc.page_count = 0;

        assert!(selector.select(&doc, Purpose::FullExtraction).is_err());
    }
}
