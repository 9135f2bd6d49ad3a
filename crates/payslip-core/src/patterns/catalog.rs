//! Compiled pattern catalog with explicit source precedence.

use std::collections::BTreeMap;
use std::path::Path;

use lazy_static::lazy_static;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::providers;
use super::{
    ContextDirection, ExtractorPattern, PatternCategory, PatternDefinition, PatternKind,
    PatternSource,
};
use crate::error::{ExtractionError, PayslipError};

lazy_static! {
    static ref CORE_CATALOG: PatternCatalog = PatternCatalogBuilder::new()
        .with_precedence(CatalogPrecedence::CoreOnly)
        .build()
        .unwrap();
}

/// Order in which user and core definitions of the same key are tried.
///
/// Within one definition, rules always run by descending priority. Across
/// definitions the precedence decides: the first definition whose rules
/// produce a non-empty value wins, and later ones act as fallbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CatalogPrecedence {
    /// User definitions override core ones, core is the fallback.
    #[default]
    UserFirst,
    /// Core definitions run first; user definitions only fill gaps.
    CoreFirst,
    /// User definitions are ignored.
    CoreOnly,
}

#[derive(Debug, Clone)]
pub(crate) enum Matcher {
    Regex(Regex),
    Keyword {
        needle: Regex,
        direction: ContextDirection,
        window: usize,
    },
}

#[derive(Debug, Clone)]
pub(crate) struct CompiledPattern {
    pub(crate) matcher: Matcher,
    pub(crate) spec: ExtractorPattern,
}

#[derive(Debug, Clone)]
pub(crate) struct CompiledDefinition {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) source: PatternSource,
    pub(crate) category: PatternCategory,
    /// Sorted by descending priority, ties keep declaration order.
    pub(crate) patterns: Vec<CompiledPattern>,
}

impl CompiledDefinition {
    fn compile(def: &PatternDefinition) -> Result<Self, ExtractionError> {
        let mut patterns = def
            .patterns
            .iter()
            .map(|p| compile_pattern(&def.id, p))
            .collect::<Result<Vec<_>, _>>()?;

        // sort_by is stable
        patterns.sort_by(|a, b| b.spec.priority.cmp(&a.spec.priority));

        Ok(Self {
            id: def.id.clone(),
            name: def.name.clone(),
            source: def.source,
            category: def.category,
            patterns,
        })
    }
}

fn compile_pattern(id: &str, pattern: &ExtractorPattern) -> Result<CompiledPattern, ExtractionError> {
    let invalid = |reason: String| ExtractionError::InvalidPattern {
        id: id.to_string(),
        reason,
    };

    let matcher = match &pattern.kind {
        PatternKind::Regex { pattern } => {
            let regex = Regex::new(pattern).map_err(|e| invalid(e.to_string()))?;
            if regex.captures_len() < 2 {
                debug!("Pattern {} has no capture group, whole match is used", id);
            }
            Matcher::Regex(regex)
        }
        PatternKind::Keyword {
            keyword,
            direction,
            window,
        } => {
            if keyword.trim().is_empty() {
                return Err(invalid("empty keyword".to_string()));
            }
            let needle = RegexBuilder::new(&regex::escape(keyword.trim()))
                .case_insensitive(true)
                .build()
                .map_err(|e| invalid(e.to_string()))?;
            Matcher::Keyword {
                needle,
                direction: *direction,
                window: *window,
            }
        }
    };

    Ok(CompiledPattern {
        matcher,
        spec: pattern.clone(),
    })
}

/// Immutable, compiled set of pattern definitions keyed by field.
#[derive(Debug, Clone)]
pub struct PatternCatalog {
    entries: BTreeMap<String, Vec<CompiledDefinition>>,
    precedence: CatalogPrecedence,
}

impl PatternCatalog {
    /// Catalog of the core providers only.
    pub fn core() -> Self {
        CORE_CATALOG.clone()
    }

    /// Start building a catalog from the core providers.
    pub fn builder() -> PatternCatalogBuilder {
        PatternCatalogBuilder::new()
    }

    /// Read user definitions from a JSON array file.
    pub fn load_user_patterns(path: &Path) -> Result<Vec<PatternDefinition>, PayslipError> {
        let content = std::fs::read_to_string(path)?;
        let mut defs: Vec<PatternDefinition> = serde_json::from_str(&content)?;
        for def in &mut defs {
            def.source = PatternSource::User;
        }
        Ok(defs)
    }

    pub fn precedence(&self) -> CatalogPrecedence {
        self.precedence
    }

    /// Every key in the catalog, sorted.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Keys whose first definition belongs to `category`.
    pub fn keys_in(&self, category: PatternCategory) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|(_, defs)| defs.first().is_some_and(|d| d.category == category))
            .map(|(key, _)| key.as_str())
            .collect()
    }

    /// Category of a key, if known.
    pub fn category_of(&self, key: &str) -> Option<PatternCategory> {
        self.entries
            .get(key)
            .and_then(|defs| defs.first())
            .map(|d| d.category)
    }

    /// Human-readable name of a key, taken from its winning definition.
    pub fn display_name(&self, key: &str) -> Option<&str> {
        self.entries
            .get(key)
            .and_then(|defs| defs.first())
            .map(|d| d.name.as_str())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Definition ids tried for a key, in resolution order.
    pub fn resolution_order(&self, key: &str) -> Vec<&str> {
        self.entries
            .get(key)
            .map(|defs| defs.iter().map(|d| d.id.as_str()).collect())
            .unwrap_or_default()
    }

    pub(crate) fn definitions(&self, key: &str) -> &[CompiledDefinition] {
        self.entries.get(key).map(Vec::as_slice).unwrap_or(&[])
    }
}

impl Default for PatternCatalog {
    fn default() -> Self {
        Self::core()
    }
}

/// Collects core and user definitions and merges them once.
#[derive(Debug, Clone)]
pub struct PatternCatalogBuilder {
    core: Vec<PatternDefinition>,
    user: Vec<PatternDefinition>,
    precedence: CatalogPrecedence,
}

impl PatternCatalogBuilder {
    pub fn new() -> Self {
        Self {
            core: providers::all(),
            user: Vec::new(),
            precedence: CatalogPrecedence::default(),
        }
    }

    /// Drop the core providers (user-only catalogs).
    pub fn without_core(mut self) -> Self {
        self.core.clear();
        self
    }

    /// Add a core-level definition, e.g. for a format variant.
    pub fn with_core(mut self, def: PatternDefinition) -> Self {
        self.core.push(PatternDefinition {
            source: PatternSource::Core,
            ..def
        });
        self
    }

    /// Add a user definition.
    pub fn with_user(mut self, def: PatternDefinition) -> Self {
        self.user.push(PatternDefinition {
            source: PatternSource::User,
            ..def
        });
        self
    }

    /// Add several user definitions.
    pub fn with_user_patterns(mut self, defs: impl IntoIterator<Item = PatternDefinition>) -> Self {
        for def in defs {
            self = self.with_user(def);
        }
        self
    }

    pub fn with_precedence(mut self, precedence: CatalogPrecedence) -> Self {
        self.precedence = precedence;
        self
    }

    /// Compile every definition and order them per key.
    pub fn build(self) -> Result<PatternCatalog, ExtractionError> {
        let (first, second) = match self.precedence {
            CatalogPrecedence::UserFirst => (self.user, self.core),
            CatalogPrecedence::CoreFirst => (self.core, self.user),
            CatalogPrecedence::CoreOnly => {
                if !self.user.is_empty() {
                    warn!(
                        "Ignoring {} user pattern definitions (core_only precedence)",
                        self.user.len()
                    );
                }
                (self.core, Vec::new())
            }
        };

        let mut entries: BTreeMap<String, Vec<CompiledDefinition>> = BTreeMap::new();
        for def in first.iter().chain(second.iter()) {
            let compiled = CompiledDefinition::compile(def)?;
            entries.entry(def.key.clone()).or_default().push(compiled);
        }

        debug!(
            "Built pattern catalog with {} keys ({:?})",
            entries.len(),
            self.precedence
        );

        Ok(PatternCatalog {
            entries,
            precedence: self.precedence,
        })
    }
}

impl Default for PatternCatalogBuilder {
    fn default() -> Self {
        Self::new()
    }
}
