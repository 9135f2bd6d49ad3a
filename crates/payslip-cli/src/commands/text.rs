//! Text command - pattern matching over plain text only.

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use clap::Args;
use console::style;
use tracing::info;

use payslip_core::patterns::PatternCategory;
use payslip_core::{ExtractionPipeline, PatternMatchingEngine, PdfAnalyzer};

/// Arguments for the text command.
#[derive(Args)]
pub struct TextArgs {
    /// Input file (.txt or .pdf)
    #[arg(required = true)]
    input: PathBuf,

    /// Print JSON instead of `key: value` lines
    #[arg(long)]
    json: bool,
}

pub async fn run(args: TextArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = super::config::load(config_path)?;

    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    let extension = args
        .input
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    info!("Reading text from {}", args.input.display());
    let text = match extension.as_str() {
        "pdf" => PdfAnalyzer::open(&args.input)?.text()?,
        _ => fs::read_to_string(&args.input)?,
    };

    if text.trim().is_empty() {
        anyhow::bail!("No text found in {}", args.input.display());
    }

    let pipeline = ExtractionPipeline::new(config)?;
    let fields = extract_fields(&pipeline, &text);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&fields)?);
    } else if fields.is_empty() {
        println!("{} No fields matched.", style("ℹ").blue());
    } else {
        for (key, value) in &fields {
            println!("{}: {}", key, value);
        }
    }

    Ok(())
}

fn extract_fields(pipeline: &ExtractionPipeline, text: &str) -> BTreeMap<String, String> {
    PatternMatchingEngine::new(pipeline.catalog()).extract_categories(&PatternCategory::ALL, text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_fields_from_plain_text() {
        let pipeline = ExtractionPipeline::new(Default::default()).unwrap();
        let fields = extract_fields(&pipeline, "Name: JOHN A DOE\nPay slip for the month of September 2023\n");

        assert_eq!(fields.get("name").map(String::as_str), Some("JOHN A DOE"));
        assert_eq!(fields.get("month").map(String::as_str), Some("September"));
        assert_eq!(fields.get("year").map(String::as_str), Some("2023"));
    }
}
