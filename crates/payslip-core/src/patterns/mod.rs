//! Prioritized pattern matching for payslip fields.
//!
//! A [`PatternDefinition`] groups the rules for one semantic key. Rules are
//! either regexes with a capture group or keywords with a directional
//! context window. The [`PatternCatalog`] compiles core and user
//! definitions once; the [`PatternMatchingEngine`] resolves keys against it.

mod catalog;
pub mod providers;
mod engine;
pub mod transforms;

pub use catalog::{CatalogPrecedence, PatternCatalog, PatternCatalogBuilder};
pub use engine::{FieldMatch, PatternMatchingEngine};
pub use transforms::{normalize_currency, TextTransform, ValueTransform};

use serde::{Deserialize, Serialize};

/// Domain category a field belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PatternCategory {
    Personal,
    Earnings,
    Deductions,
    Banking,
    TaxInfo,
}

impl PatternCategory {
    /// Every category, in catalog order.
    pub const ALL: [PatternCategory; 5] = [
        PatternCategory::Personal,
        PatternCategory::Earnings,
        PatternCategory::Deductions,
        PatternCategory::Banking,
        PatternCategory::TaxInfo,
    ];

    /// Categories worth resolving when only metadata is requested.
    pub fn is_metadata(&self) -> bool {
        matches!(
            self,
            PatternCategory::Personal | PatternCategory::Banking | PatternCategory::TaxInfo
        )
    }
}

/// Where a definition came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternSource {
    /// Shipped with the library.
    Core,
    /// Supplied by the user.
    #[default]
    User,
}

/// Side of a keyword the value is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextDirection {
    /// Text following the keyword on the same line.
    #[default]
    After,
    /// Text preceding the keyword on the same line.
    Before,
}

/// How a single rule finds its value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PatternKind {
    /// Regular expression; capture group 1 is the value (whole match if absent).
    Regex { pattern: String },
    /// Case-insensitive keyword; value is read from the context window.
    Keyword {
        keyword: String,
        #[serde(default)]
        direction: ContextDirection,
        /// Maximum characters of context taken.
        #[serde(default = "default_window")]
        window: usize,
    },
}

fn default_window() -> usize {
    40
}

/// A matching rule plus its transforms and priority.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractorPattern {
    #[serde(flatten)]
    pub kind: PatternKind,

    /// Applied to the source text before matching.
    #[serde(default)]
    pub preprocessing: Vec<TextTransform>,

    /// Applied to the captured value, in order.
    #[serde(default)]
    pub postprocessing: Vec<ValueTransform>,

    /// Higher priorities are tried first.
    #[serde(default)]
    pub priority: i32,
}

impl ExtractorPattern {
    /// Regex rule with trimming postprocessing.
    pub fn regex(pattern: impl Into<String>, priority: i32) -> Self {
        Self {
            kind: PatternKind::Regex {
                pattern: pattern.into(),
            },
            preprocessing: vec![TextTransform::NormalizeNewlines],
            postprocessing: vec![ValueTransform::Trim],
            priority,
        }
    }

    /// Keyword rule reading the text after the keyword.
    pub fn keyword(keyword: impl Into<String>, priority: i32) -> Self {
        Self {
            kind: PatternKind::Keyword {
                keyword: keyword.into(),
                direction: ContextDirection::After,
                window: default_window(),
            },
            preprocessing: vec![TextTransform::NormalizeNewlines],
            postprocessing: vec![ValueTransform::Trim],
            priority,
        }
    }

    pub fn with_direction(mut self, direction: ContextDirection) -> Self {
        if let PatternKind::Keyword { direction: d, .. } = &mut self.kind {
            *d = direction;
        }
        self
    }

    pub fn with_window(mut self, window: usize) -> Self {
        if let PatternKind::Keyword { window: w, .. } = &mut self.kind {
            *w = window;
        }
        self
    }

    pub fn with_preprocessing(mut self, transform: TextTransform) -> Self {
        self.preprocessing.push(transform);
        self
    }

    pub fn with_postprocessing(mut self, transform: ValueTransform) -> Self {
        self.postprocessing.push(transform);
        self
    }

    /// Shorthand for amount rules: trim, then currency normalization.
    pub fn amount(mut self) -> Self {
        self.postprocessing.push(ValueTransform::NormalizeCurrency);
        self
    }
}

/// All rules for one semantic key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternDefinition {
    pub id: String,
    pub name: String,
    /// Field key the rules resolve, e.g. `basicPay`.
    pub key: String,
    pub category: PatternCategory,
    pub patterns: Vec<ExtractorPattern>,
    #[serde(default)]
    pub source: PatternSource,
}

impl PatternDefinition {
    /// Core definition; the id is derived from the key.
    pub fn core(
        key: &str,
        name: &str,
        category: PatternCategory,
        patterns: Vec<ExtractorPattern>,
    ) -> Self {
        Self {
            id: format!("core.{}", key),
            name: name.to_string(),
            key: key.to_string(),
            category,
            patterns,
            source: PatternSource::Core,
        }
    }

    /// User definition.
    pub fn user(
        id: &str,
        key: &str,
        category: PatternCategory,
        patterns: Vec<ExtractorPattern>,
    ) -> Self {
        Self {
            id: id.to_string(),
            name: key.to_string(),
            key: key.to_string(),
            category,
            patterns,
            source: PatternSource::User,
        }
    }
}
