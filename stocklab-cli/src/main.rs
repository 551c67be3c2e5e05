//! Stocklab CLI: run the stock data pipeline and inspect saved files.
//!
//! Commands:
//! - `run`: fetch daily prices from Yahoo Finance, optionally add indicators, save as CSV
//! - `show`: print the first rows of a previously saved file

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use stocklab_core::{
    CsvTable, Persister, Pipeline, PipelineMode, PipelineOutput, PipelineRequest, StocklabConfig,
    TracingReporter, Transformer, YahooProvider,
};

#[derive(Parser)]
#[command(
    name = "stocklab",
    about = "Stocklab CLI: fetch, enrich and save daily stock prices"
)]
struct Cli {
    /// Log at debug level instead of info.
    #[arg(long, short, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch a ticker's recent history and save it as CSV.
    Run {
        /// Ticker symbol. Defaults to AAPL (or the config file's value).
        #[arg(long)]
        ticker: Option<String>,

        /// Calendar days to look back from today. Defaults to 18.
        #[arg(long)]
        days_back: Option<u32>,

        /// Destination directory. Defaults to ./stock_data.
        #[arg(long)]
        data_dir: Option<PathBuf>,

        /// Compute MA5, MA20, daily return and volatility before saving.
        #[arg(long, default_value_t = false)]
        enriched: bool,

        /// Path to a TOML config file.
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Print the first rows of a saved ticker file.
    Show {
        /// Ticker symbol of the saved file.
        ticker: String,

        /// Directory holding saved files. Defaults to ./stock_data.
        #[arg(long, default_value = "stock_data")]
        data_dir: PathBuf,

        /// Number of rows to print.
        #[arg(long, default_value_t = 5)]
        rows: usize,

        /// Compute indicators on the loaded prices before printing.
        #[arg(long, default_value_t = false)]
        enriched: bool,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let outcome = match cli.command {
        Commands::Run {
            ticker,
            days_back,
            data_dir,
            enriched,
            config,
        } => run_pipeline(ticker, days_back, data_dir, enriched, config.as_deref()),
        Commands::Show {
            ticker,
            data_dir,
            rows,
            enriched,
        } => run_show(&ticker, &data_dir, rows, enriched),
    };

    if let Err(e) = outcome {
        eprintln!("An error occurred: {e:#}");
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .init();
}

fn run_pipeline(
    ticker: Option<String>,
    days_back: Option<u32>,
    data_dir: Option<PathBuf>,
    enriched: bool,
    config_path: Option<&Path>,
) -> Result<()> {
    let mut config = match config_path {
        Some(path) => StocklabConfig::from_file(path)?,
        None => StocklabConfig::default(),
    };

    // Flags override file values.
    if let Some(ticker) = ticker {
        config.pipeline.ticker = ticker;
    }
    if let Some(days_back) = days_back {
        config.pipeline.days_back = days_back;
    }
    if let Some(data_dir) = data_dir {
        config.pipeline.data_dir = data_dir;
    }
    if enriched {
        config.pipeline.mode = PipelineMode::Enriched;
    }
    config.validate()?;
    tracing::debug!(?config, "resolved configuration");

    let provider =
        YahooProvider::new(&config.provider).context("failed to set up Yahoo Finance client")?;
    let reporter = TracingReporter;
    let pipeline = Pipeline::new(&provider, &reporter, &config.pipeline.data_dir);
    let request = PipelineRequest::from(&config.pipeline);

    let output = pipeline.execute(&request)?;

    println!("Successfully processed data for {}", request.ticker);
    print_summary(&output);
    println!();
    print_head(output.table(), 5);
    Ok(())
}

fn run_show(ticker: &str, data_dir: &Path, rows: usize, enriched: bool) -> Result<()> {
    let reporter = TracingReporter;
    let persister = Persister::new(data_dir, &reporter);
    let series = persister
        .load(ticker)
        .with_context(|| format!("failed to load saved data for {ticker}"))?;

    let output = if enriched {
        PipelineOutput::Enriched(Transformer::new().transform(&series)?)
    } else {
        PipelineOutput::Raw(series)
    };

    println!("File: {}", persister.path_for(ticker).display());
    print_summary(&output);
    println!();
    print_head(output.table(), rows);
    Ok(())
}

fn print_summary(output: &PipelineOutput) {
    let range = match output {
        PipelineOutput::Raw(s) => s.first_date().zip(s.last_date()),
        PipelineOutput::Enriched(s) => s.first_date().zip(s.last_date()),
    };
    match range {
        Some((first, last)) => println!(
            "{}: {} rows, {first} to {last}",
            output.ticker(),
            output.len()
        ),
        None => println!("{}: no rows", output.ticker()),
    }
}

/// Print the header and the first `rows` records as aligned columns.
fn print_head(table: &dyn CsvTable, rows: usize) {
    let header = table.header();
    let records: Vec<Vec<String>> = table.records().into_iter().take(rows).collect();

    let widths: Vec<usize> = header
        .iter()
        .enumerate()
        .map(|(i, h)| {
            records
                .iter()
                .filter_map(|r| r.get(i))
                .map(|cell| cell.len())
                .max()
                .unwrap_or(0)
                .max(h.len())
        })
        .collect();

    let line = |cells: Vec<&str>| {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, &w)| format!("{cell:>w$}"))
            .collect::<Vec<_>>()
            .join("  ")
    };

    let rule = widths.iter().sum::<usize>() + 2 * widths.len().saturating_sub(1);
    println!("{}", line(header));
    println!("{}", "-".repeat(rule));
    for record in &records {
        println!("{}", line(record.iter().map(String::as_str).collect()));
    }
}
