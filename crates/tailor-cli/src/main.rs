use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use tailor_client::{CatalogParser, CsvSink, ReqwestFetcher, SheetsConfig, SheetsSink};
use tailor_core::traits::Sink;
use tailor_core::{
    BatchCollector, CollectorConfig, EtlPipeline, NormalizeConfig, Normalizer, RunSummary,
    TracingReporter, repair, validate,
};
use tailor_db::{DatabaseConfig, PostgresSink};

#[derive(Parser)]
#[command(name = "tailor", version, about = "Fashion catalog ETL pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Harvest the catalog, normalize it and load every configured sink
    Run(RunArgs),

    /// Normalize a raw dump written by a previous run into a clean CSV
    Normalize {
        /// Raw CSV dump to read
        #[arg(short, long)]
        input: PathBuf,

        /// Normalized CSV to write
        #[arg(short, long, default_value = "products.csv")]
        output: PathBuf,

        /// Multiplier applied to source prices
        #[arg(long, default_value_t = 16000.0)]
        conversion_rate: f64,
    },
}

#[derive(Args)]
struct RunArgs {
    /// Catalog listing URL; pages are requested as `<base-url>?page=<n>`
    #[arg(
        long,
        env = "TAILOR_BASE_URL",
        default_value = "https://fashion-studio.dicoding.dev"
    )]
    base_url: String,

    /// First page to harvest
    #[arg(long, default_value_t = 1)]
    start_page: u32,

    /// Last page to harvest (inclusive)
    #[arg(long, default_value_t = 50)]
    end_page: u32,

    /// Pause between page requests, in milliseconds
    #[arg(long, default_value_t = 1000)]
    page_delay_ms: u64,

    /// Per-request timeout, in seconds
    #[arg(long, default_value_t = 10)]
    timeout_secs: u64,

    /// Multiplier applied to source prices
    #[arg(long, default_value_t = 16000.0)]
    conversion_rate: f64,

    /// Normalized CSV output
    #[arg(short, long, default_value = "products.csv")]
    output: PathBuf,

    /// Raw harvest dump, written before normalization
    #[arg(long, default_value = "raw_products.csv")]
    raw_output: PathBuf,

    /// Google Sheets spreadsheet id (sink skipped when absent)
    #[arg(long, env = "TAILOR_SHEET_ID")]
    sheet_id: Option<String>,

    /// Worksheet to replace inside the spreadsheet
    #[arg(long, default_value = "Products")]
    worksheet: String,

    /// Service-account key file for Google Sheets
    #[arg(long, default_value = "google-sheets-api.json")]
    credentials: PathBuf,

    /// PostgreSQL connection string (sink skipped when absent)
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    /// PostgreSQL table to replace (overrides TAILOR_DB_TABLE)
    #[arg(long)]
    table: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Setup tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("tailor=info".parse()?))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run(args) => cmd_run(args).await?,
        Commands::Normalize {
            input,
            output,
            conversion_rate,
        } => cmd_normalize(&input, &output, conversion_rate).await?,
    }

    Ok(())
}

async fn cmd_run(args: RunArgs) -> Result<()> {
    let fetcher = ReqwestFetcher::with_timeout(Duration::from_secs(args.timeout_secs))
        .context("Failed to create HTTP client")?;
    let collector = BatchCollector::new(
        fetcher,
        CatalogParser::new(),
        CollectorConfig::new(&args.base_url, args.start_page, args.end_page)
            .with_page_delay(Duration::from_millis(args.page_delay_ms)),
    );
    let normalizer = Normalizer::new(NormalizeConfig::new(args.conversion_rate));

    let sheets = match args.sheet_id {
        Some(id) => Some(
            SheetsSink::new(
                SheetsConfig::new(id)
                    .with_worksheet(&args.worksheet)
                    .with_credentials(&args.credentials),
            )
            .context("Failed to create Google Sheets client")?,
        ),
        None => {
            tracing::info!("No spreadsheet id given, skipping Google Sheets");
            None
        }
    };
    let postgres = match args.database_url {
        Some(url) => {
            let mut config = DatabaseConfig::new(url)
                .with_env_overrides()
                .context("Invalid PostgreSQL settings")?;
            if let Some(table) = args.table {
                config = config.with_table(table);
            }
            Some(PostgresSink::new(config))
        }
        None => {
            tracing::info!("No database URL given, skipping PostgreSQL");
            None
        }
    };

    let pipeline = EtlPipeline::new(collector, normalizer, CsvSink::new(&args.output))
        .with_optional_sinks(sheets, postgres);

    tracing::info!(
        "Harvesting {} pages {}..={}",
        args.base_url,
        args.start_page,
        args.end_page
    );
    let raw = pipeline
        .harvest(&TracingReporter)
        .await
        .context("Harvest failed")?;

    // The raw dump is a debugging aid; losing it does not stop the run.
    match tailor_client::write_raw(&args.raw_output, &raw) {
        Ok(rows) => tracing::info!("Raw data ({rows} rows) saved to {}", args.raw_output.display()),
        Err(e) => tracing::warn!(error = %e, "Could not save raw data"),
    }

    let summary = pipeline
        .process(&raw, &TracingReporter)
        .await
        .context("Pipeline failed")?;

    print_summary(&summary);
    Ok(())
}

async fn cmd_normalize(input: &Path, output: &Path, conversion_rate: f64) -> Result<()> {
    let raw = tailor_client::read_raw(input)
        .with_context(|| format!("Failed to read raw dump: {}", input.display()))?;
    tracing::info!("Loaded {} raw listings from {}", raw.len(), input.display());

    let table = Normalizer::new(NormalizeConfig::new(conversion_rate))
        .normalize(&raw, &TracingReporter)
        .context("Normalization failed")?;

    let table = if validate(&table, &TracingReporter).is_valid() {
        table
    } else {
        repair(table)
    };

    let receipt = CsvSink::new(output)
        .write(&table)
        .await
        .with_context(|| format!("Failed to write {}", output.display()))?;

    println!(
        "{} of {} listings written to {}",
        receipt.rows,
        raw.len(),
        receipt.destination
    );
    Ok(())
}

fn print_summary(summary: &RunSummary) {
    println!("Run {}", summary.run_id);
    println!("  normalized listings: {}", summary.normalized_rows);
    println!(
        "  validation: {}{}",
        if summary.validation.is_valid() { "passed" } else { "FAILED" },
        if summary.repaired { " (after repair)" } else { "" }
    );
    println!(
        "  csv: {} rows -> {}",
        summary.file.rows, summary.file.destination
    );

    if !summary.validation.is_valid() {
        println!("  remaining sinks skipped: data still invalid after repair");
        return;
    }

    for outcome in &summary.sinks {
        match &outcome.result {
            Ok(receipt) => println!(
                "  {}: {} rows -> {}",
                outcome.sink, receipt.rows, receipt.destination
            ),
            Err(e) => println!("  {}: failed ({e})", outcome.sink),
        }
    }
}
