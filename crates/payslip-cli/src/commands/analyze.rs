//! Analyze command - summarize a PDF and show the chosen strategy.

use std::path::PathBuf;

use clap::Args;
use console::style;
use serde::Serialize;
use tracing::info;

use payslip_core::{
    DocumentAnalysis, DocumentAnalyzer, ExtractionParameters, ExtractionStrategy, PdfAnalyzer,
    StrategySelector,
};

use super::PurposeArg;

/// Arguments for the analyze command.
#[derive(Args)]
pub struct AnalyzeArgs {
    /// Input PDF file
    #[arg(required = true)]
    input: PathBuf,

    /// Purpose to select a strategy for
    #[arg(short, long, value_enum, default_value = "full")]
    purpose: PurposeArg,

    /// Print JSON instead of a summary
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct AnalyzeReport {
    analysis: DocumentAnalysis,
    strategy: ExtractionStrategy,
    parameters: ExtractionParameters,
}

pub async fn run(args: AnalyzeArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = super::config::load(config_path)?;

    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    info!("Analyzing file: {}", args.input.display());
    let analyzer = PdfAnalyzer::open(&args.input)?;
    let analysis = analyzer.analyze()?;

    let selector = StrategySelector::with_config(config.strategy);
    let (strategy, parameters) = selector.select(&analysis, args.purpose.into())?;

    if args.json {
        let report = AnalyzeReport {
            analysis,
            strategy,
            parameters,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let flag = |on: bool| if on { style("yes").green() } else { style("no").dim() };

    println!("{}", style(args.input.display()).bold());
    println!("  Pages:            {}", analysis.page_count);
    println!("  Large document:   {}", flag(analysis.is_large_document));
    println!(
        "  Estimated memory: {:.1} MiB",
        analysis.estimated_memory_requirement as f64 / (1024.0 * 1024.0)
    );
    println!("  Scanned content:  {}", flag(analysis.contains_scanned_content));
    println!("  Text heavy:       {}", flag(analysis.is_text_heavy));
    println!("  Complex layout:   {}", flag(analysis.has_complex_layout));
    println!("  Graphics:         {}", flag(analysis.contains_graphics));
    println!();
    println!("{} Strategy: {:?}", style("ℹ").blue(), strategy);
    println!(
        "  quality={:?} ocr={} tables={} streaming={} batch={}",
        parameters.quality,
        parameters.use_ocr,
        parameters.extract_tables,
        parameters.use_streaming,
        parameters.batch_size
    );
    if let Some(pages) = &parameters.pages_to_process {
        println!("  pages={:?}", pages);
    }

    Ok(())
}
