//! Process command - extract one payslip from positioned text elements.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

use payslip_core::{ExtractionOutcome, ExtractionPipeline, ExtractionRequest};

use super::PurposeArg;

/// Arguments for the process command.
#[derive(Args)]
pub struct ProcessArgs {
    /// Input file: JSON with `analysis`, `purpose`, `pages` and optional `raw_text`
    #[arg(required = true)]
    input: PathBuf,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Override the purpose given in the input file
    #[arg(short, long, value_enum)]
    purpose: Option<PurposeArg>,

    /// Show extraction confidence scores
    #[arg(long)]
    show_confidence: bool,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// CSV of credit and debit lines
    Csv,
    /// Plain text summary
    Text,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Csv => "csv",
            OutputFormat::Text => "txt",
        }
    }
}

pub async fn run(args: ProcessArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = super::config::load(config_path)?;

    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    info!("Processing file: {}", args.input.display());

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")?,
    );
    pb.enable_steady_tick(Duration::from_millis(100));

    pb.set_message("Reading elements...");
    let mut request = read_request(&args.input)?;
    if let Some(purpose) = args.purpose {
        request.purpose = purpose.into();
    }

    pb.set_message("Extracting fields...");
    let pipeline = ExtractionPipeline::new(config)?;
    let outcome = pipeline.extract(&request)?;

    pb.finish_and_clear();

    for warning in &outcome.warnings {
        eprintln!("{} {}", style("⚠").yellow(), warning);
    }

    let output = format_outcome(&outcome, args.format)?;

    if let Some(output_path) = &args.output {
        fs::write(output_path, &output)?;
        println!(
            "{} Output written to {}",
            style("✓").green(),
            output_path.display()
        );
    } else {
        println!("{}", output);
    }

    if args.show_confidence {
        println!();
        println!(
            "{} Extraction confidence: {:.1}%",
            style("ℹ").blue(),
            outcome.validation.confidence * 100.0
        );
        println!(
            "{} Processing time: {}ms",
            style("ℹ").blue(),
            outcome.processing_time_ms
        );
    }

    debug!("Total processing time: {:?}", start.elapsed());

    Ok(())
}

/// Read an extraction request from a JSON file.
pub fn read_request(path: &Path) -> anyhow::Result<ExtractionRequest> {
    let content = fs::read_to_string(path)?;
    serde_json::from_str(&content)
        .map_err(|e| anyhow::anyhow!("Invalid element file {}: {}", path.display(), e))
}

pub fn format_outcome(outcome: &ExtractionOutcome, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(outcome)?),
        OutputFormat::Csv => format_csv(outcome),
        OutputFormat::Text => Ok(format_text(outcome)),
    }
}

fn format_csv(outcome: &ExtractionOutcome) -> anyhow::Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record(["side", "label", "amount", "raw_amount", "confidence"])?;

    let sides = [("credit", &outcome.credits), ("debit", &outcome.debits)];
    for (side, items) in sides {
        for item in items {
            wtr.write_record([
                side,
                &item.label,
                &item.amount.to_string(),
                &item.raw_amount,
                &format!("{:.2}", item.confidence),
            ])?;
        }
    }

    let data = String::from_utf8(wtr.into_inner()?)?;
    Ok(data)
}

fn format_text(outcome: &ExtractionOutcome) -> String {
    let mut output = String::new();
    let field = |key: &str| outcome.fields.get(key).map(String::as_str).unwrap_or("-");

    output.push_str(&format!("Name:   {}\n", field("name")));
    match &outcome.pay_period {
        Some(period) => output.push_str(&format!("Period: {} {}\n", period.month_name(), period.year)),
        None => output.push_str(&format!("Period: {} {}\n", field("month"), field("year"))),
    }
    output.push_str(&format!("State:  {:?} ({:?})\n", outcome.state, outcome.strategy));
    output.push('\n');

    let sides = [("Credits", &outcome.credits), ("Debits", &outcome.debits)];
    for (title, items) in sides {
        output.push_str(&format!("{}:\n", title));
        for item in items {
            output.push_str(&format!("  {:<24} {:>12}\n", item.label, item.amount));
        }
    }
    output.push('\n');

    output.push_str(&format!("Total credits: {}\n", outcome.total_credits()));
    output.push_str(&format!("Total debits:  {}\n", outcome.total_debits()));
    match &outcome.financial {
        Some(f) if f.is_valid() => output.push_str(&format!("Balance: OK ({})\n", f.policy)),
        Some(f) => output.push_str(&format!(
            "Balance: off by {} ({:?})\n",
            f.discrepancy,
            f.error_category
        )),
        None => output.push_str("Balance: not checked\n"),
    }

    if !outcome.validation.missing_fields.is_empty() {
        let missing: Vec<&str> = outcome.validation.missing_fields.iter().map(String::as_str).collect();
        output.push_str(&format!("Missing: {}\n", missing.join(", ")));
    }

    let other: Vec<(&String, &String)> = outcome
        .fields
        .iter()
        .filter(|(k, _)| !matches!(k.as_str(), "name" | "month" | "year"))
        .collect();
    if !other.is_empty() {
        output.push_str("\nFields:\n");
        for (key, value) in other {
            output.push_str(&format!("  {}: {}\n", key, value));
        }
    }

    output
}
