//! End-to-end extraction of one payslip.
//!
//! An attempt walks `Selecting -> Detecting -> Associating -> RowProcessing
//! -> Validating` and ends in `Accepted` when a PCDA grid was read, or in
//! `FallbackToLinearText` when fields had to come from plain text.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{ExtractionError, Result};
use crate::models::{
    DocumentAnalysis, ExtractionOutcome, LineItem, PayPeriod, PayslipConfig, PipelineState,
    Purpose, TextElement,
};
use crate::patterns::{PatternCatalog, PatternCategory, PatternMatchingEngine};
use crate::pcda::{parse_amount, PcdaRowProcessor, PcdaStatement};
use crate::strategy::StrategySelector;
use crate::table::{SpatialAssociator, TableDetector, TableFormat, TableStructure};
use crate::validation::{
    BalancePolicy, ContentValidator, FinancialValidation, FinancialValidator, NetPayPolicy,
    PlausibilityRule,
};

/// Totals and net figures that are not line items of their own.
const AGGREGATE_KEYS: [&str; 3] = ["grossPay", "netPay", "totalDeductions"];

const FINANCIAL_FAILURE_PENALTY: f32 = 0.5;
const PLAUSIBILITY_PENALTY: f32 = 0.9;

/// Checked between page batches; a `true` discards the attempt.
pub trait CancellationSignal {
    fn is_cancelled(&self) -> bool;
}

impl CancellationSignal for AtomicBool {
    fn is_cancelled(&self) -> bool {
        self.load(Ordering::SeqCst)
    }
}

impl<T: CancellationSignal + ?Sized> CancellationSignal for Arc<T> {
    fn is_cancelled(&self) -> bool {
        (**self).is_cancelled()
    }
}

/// Signal that never fires.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverCancel;

impl CancellationSignal for NeverCancel {
    fn is_cancelled(&self) -> bool {
        false
    }
}

/// Everything the pipeline needs about one document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionRequest {
    pub analysis: DocumentAnalysis,
    #[serde(default)]
    pub purpose: Purpose,
    /// Positioned text per page, in page order.
    #[serde(default)]
    pub pages: Vec<Vec<TextElement>>,
    /// Plain text of the whole document, used instead of text rebuilt from
    /// the elements when present.
    #[serde(default, alias = "rawText", skip_serializing_if = "Option::is_none")]
    pub raw_text: Option<String>,
}

impl ExtractionRequest {
    pub fn new(analysis: DocumentAnalysis, pages: Vec<Vec<TextElement>>) -> Self {
        Self {
            analysis,
            purpose: Purpose::default(),
            pages,
            raw_text: None,
        }
    }

    pub fn with_purpose(mut self, purpose: Purpose) -> Self {
        self.purpose = purpose;
        self
    }

    pub fn with_raw_text(mut self, text: impl Into<String>) -> Self {
        self.raw_text = Some(text.into());
        self
    }
}

#[derive(Debug, Default)]
struct PageResult {
    text: String,
    table: Option<TableStructure>,
    statement: Option<PcdaStatement>,
}

/// Runs extraction attempts with one configuration and catalog.
#[derive(Debug, Clone)]
pub struct ExtractionPipeline {
    config: PayslipConfig,
    catalog: PatternCatalog,
    selector: StrategySelector,
    detector: TableDetector,
    associator: SpatialAssociator,
    row_processor: PcdaRowProcessor,
    validator: FinancialValidator,
    content: ContentValidator,
    plausibility: Vec<PlausibilityRule>,
}

impl ExtractionPipeline {
    /// Build a pipeline, loading user patterns named by the config.
    pub fn new(config: PayslipConfig) -> Result<Self> {
        let mut builder = PatternCatalog::builder().with_precedence(config.patterns.precedence);
        if let Some(path) = &config.patterns.user_patterns {
            let defs = PatternCatalog::load_user_patterns(path)?;
            info!("Loaded {} user pattern definitions from {}", defs.len(), path.display());
            builder = builder.with_user_patterns(defs);
        }
        let catalog = builder.build()?;
        Ok(Self::with_catalog(config, catalog))
    }

    /// Build a pipeline around an existing catalog.
    pub fn with_catalog(config: PayslipConfig, catalog: PatternCatalog) -> Self {
        Self {
            selector: StrategySelector::with_config(config.strategy.clone()),
            detector: TableDetector::with_config(config.table.clone()),
            associator: SpatialAssociator::with_config(config.table.clone()),
            row_processor: PcdaRowProcessor::new(),
            validator: FinancialValidator::with_config(&config.validation),
            content: ContentValidator::for_catalog(&catalog),
            plausibility: PlausibilityRule::defaults(),
            config,
            catalog,
        }
    }

    /// Replace the balance invariant used for PCDA grids.
    pub fn with_balance_policy(mut self, policy: impl BalancePolicy + 'static) -> Self {
        self.validator = self.validator.with_policy(policy);
        self
    }

    pub fn with_plausibility_rules(mut self, rules: Vec<PlausibilityRule>) -> Self {
        self.plausibility = rules;
        self
    }

    pub fn config(&self) -> &PayslipConfig {
        &self.config
    }

    pub fn catalog(&self) -> &PatternCatalog {
        &self.catalog
    }

    /// Run one extraction attempt to completion.
    pub fn extract(&self, request: &ExtractionRequest) -> Result<ExtractionOutcome> {
        self.extract_with_cancel(request, &NeverCancel)
    }

    /// Run one attempt, checking `cancel` before every page batch.
    pub fn extract_with_cancel<C>(&self, request: &ExtractionRequest, cancel: &C) -> Result<ExtractionOutcome>
    where
        C: CancellationSignal + ?Sized,
    {
        let start = Instant::now();
        let mut state = PipelineState::Selecting;
        let mut warnings = Vec::new();

        let (strategy, parameters) = self.selector.select(&request.analysis, request.purpose)?;
        info!("Selected {:?} strategy for {} pages", strategy, request.analysis.page_count);

        let detect_tables = strategy.reconstructs_tables() && request.purpose != Purpose::MetadataOnly;
        let selected: Vec<usize> = match &parameters.pages_to_process {
            Some(pages) => pages
                .iter()
                .copied()
                .filter(|p| *p < request.pages.len())
                .collect(),
            None => (0..request.pages.len()).collect(),
        };
        if selected.is_empty() && request.raw_text.is_none() {
            return Err(ExtractionError::NoUsableText { page: 0 }.into());
        }

        let batch_size = if parameters.use_streaming {
            parameters.batch_size.max(1)
        } else {
            selected.len().max(1)
        };

        let mut texts = Vec::with_capacity(selected.len());
        let mut table = None;
        let mut statement: Option<PcdaStatement> = None;

        for (batch_index, batch) in selected.chunks(batch_size).enumerate() {
            if cancel.is_cancelled() {
                warn!("Extraction cancelled before batch {}", batch_index);
                return Err(ExtractionError::Cancelled.into());
            }
            debug!("Processing batch {} ({} pages)", batch_index, batch.len());

            for &page in batch {
                let elements = &request.pages[page];
                if !elements.iter().any(TextElement::is_usable) {
                    warn!("Page {} has no usable text elements, skipping", page);
                    warnings.push(format!("Page {}: no usable text, skipped", page));
                    continue;
                }
                let result = self.process_page(page, elements, detect_tables, &mut state, &mut warnings);
                texts.push(result.text);
                if let Some(page_statement) = result.statement {
                    statement = Some(match statement.take() {
                        Some(acc) => merge_statements(acc, page_statement),
                        None => page_statement,
                    });
                }
                if table.is_none() {
                    table = result.table;
                }
            }
        }

        let text = match &request.raw_text {
            Some(raw) => raw.clone(),
            None if texts.is_empty() => {
                let page = selected.first().copied().unwrap_or(0);
                return Err(ExtractionError::NoUsableText { page }.into());
            }
            None => texts.join("\n"),
        };

        let categories: Vec<PatternCategory> = if request.purpose == Purpose::MetadataOnly {
            PatternCategory::ALL
                .iter()
                .copied()
                .filter(PatternCategory::is_metadata)
                .collect()
        } else {
            PatternCategory::ALL.to_vec()
        };
        let engine = PatternMatchingEngine::new(&self.catalog);
        let fields = engine.extract_categories(&categories, &text);
        debug!("Resolved {} fields from {} chars of text", fields.len(), text.len());

        let net_pay = fields.get("netPay").and_then(|v| parse_amount(v));
        let pay_period = match (fields.get("month"), fields.get("year")) {
            (Some(month), Some(year)) => PayPeriod::parse(month, year),
            _ => None,
        };

        advance(&mut state, PipelineState::Validating);
        let (credits, debits, financial, terminal) = match statement {
            Some(statement) => {
                if statement.credits.is_empty() && statement.debits.is_empty() {
                    warn!("PCDA grid yielded no line items ({} rows unreadable)", statement.skipped_rows);
                    warnings.push(format!(
                        "PCDA grid yielded no line items; {} rows could not be read",
                        statement.skipped_rows
                    ));
                }
                self.check_stated_totals(&statement, &mut warnings);
                let financial = self.validator.validate_statement(&statement, net_pay);
                (statement.credits, statement.debits, Some(financial), PipelineState::Accepted)
            }
            None if request.purpose == Purpose::MetadataOnly => {
                (Vec::new(), Vec::new(), None, PipelineState::FallbackToLinearText)
            }
            None => {
                let credits = self.items_from_fields(&fields, PatternCategory::Earnings);
                let debits = self.items_from_fields(&fields, PatternCategory::Deductions);
                let financial = self.fallback_financial(&credits, &debits, net_pay, &mut warnings);
                (credits, debits, financial, PipelineState::FallbackToLinearText)
            }
        };

        let mut validation = self.content.evaluate(&fields, !credits.is_empty());
        if financial.as_ref().is_some_and(|f| !f.is_valid()) {
            validation.penalize(FINANCIAL_FAILURE_PENALTY);
        }

        let total_credits: Decimal = credits.iter().map(|i| i.amount).sum();
        for warning in PlausibilityRule::check_all(&self.plausibility, &debits, total_credits) {
            warn!("{}", warning);
            warnings.push(warning.to_string());
            validation.penalize(PLAUSIBILITY_PENALTY);
        }

        advance(&mut state, terminal);
        let processing_time_ms = start.elapsed().as_millis() as u64;
        info!(
            "Extraction finished in {:?} ({} fields, {} credits, {} debits, {}ms)",
            state,
            fields.len(),
            credits.len(),
            debits.len(),
            processing_time_ms
        );

        Ok(ExtractionOutcome {
            strategy,
            parameters,
            state,
            fields,
            credits,
            debits,
            pay_period,
            table,
            validation,
            financial,
            warnings,
            processing_time_ms,
        })
    }

    fn process_page(
        &self,
        page: usize,
        elements: &[TextElement],
        detect_tables: bool,
        state: &mut PipelineState,
        warnings: &mut Vec<String>,
    ) -> PageResult {
        let mut result = PageResult {
            text: self.detector.linear_text(elements),
            ..PageResult::default()
        };
        if !detect_tables {
            return result;
        }

        advance(state, PipelineState::Detecting);
        let Some(mut table) = self.detector.detect(elements) else {
            debug!("Page {}: no table, falling back to linear text", page);
            return result;
        };

        advance(state, PipelineState::Associating);
        self.associator.associate(&mut table);

        if table.format == TableFormat::Pcda {
            advance(state, PipelineState::RowProcessing);
            result.statement = Some(self.row_processor.process_table(&table));
        } else {
            warnings.push(format!(
                "Page {}: {}-column table is not a PCDA grid; line items taken from text",
                page,
                table.column_count()
            ));
        }
        result.table = Some(table);
        result
    }

    fn items_from_fields(&self, fields: &BTreeMap<String, String>, category: PatternCategory) -> Vec<LineItem> {
        self.catalog
            .keys_in(category)
            .into_iter()
            .filter(|key| !AGGREGATE_KEYS.contains(key))
            .filter_map(|key| {
                let raw = fields.get(key)?;
                let amount = parse_amount(raw)?;
                Some(LineItem {
                    label: self.catalog.display_name(key).unwrap_or(key).to_string(),
                    amount,
                    raw_amount: raw.clone(),
                    confidence: 1.0,
                })
            })
            .collect()
    }

    /// Linear text rarely carries every line item, so only a printed net
    /// pay can be checked.
    fn fallback_financial(
        &self,
        credits: &[LineItem],
        debits: &[LineItem],
        net_pay: Option<Decimal>,
        warnings: &mut Vec<String>,
    ) -> Option<FinancialValidation> {
        if net_pay.is_none() || credits.is_empty() {
            warnings.push("No table detected; totals were not balance-checked".to_string());
            return None;
        }
        let validator = FinancialValidator::with_config(&self.config.validation).with_policy(NetPayPolicy);
        Some(validator.validate_items(credits, debits, net_pay))
    }

    fn check_stated_totals(&self, statement: &PcdaStatement, warnings: &mut Vec<String>) {
        let sides = [
            ("credit", statement.stated_credit_total, &statement.credits),
            ("debit", statement.stated_debit_total, &statement.debits),
        ];
        for (side, stated, items) in sides {
            let Some(stated) = stated else { continue };
            let computed: Decimal = items.iter().map(|i| i.amount).sum();
            if (stated - computed).abs() > self.config.validation.balance_epsilon {
                warnings.push(format!(
                    "Printed {} total {} differs from the sum of line items {}",
                    side, stated, computed
                ));
            }
        }
    }
}

fn advance(state: &mut PipelineState, next: PipelineState) {
    if *state != next {
        info!("{:?} -> {:?}", state, next);
        *state = next;
    }
}

fn merge_statements(mut acc: PcdaStatement, page: PcdaStatement) -> PcdaStatement {
    acc.credits.extend(page.credits);
    acc.debits.extend(page.debits);
    acc.skipped_rows += page.skipped_rows;
    acc.stated_credit_total = page.stated_credit_total.or(acc.stated_credit_total);
    acc.stated_debit_total = page.stated_debit_total.or(acc.stated_debit_total);
    acc
}
