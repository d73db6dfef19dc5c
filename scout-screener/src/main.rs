//! Coin Scout - one-shot crypto trend candidate screener.
//!
//! Loads configuration, runs a single scan, prints the ranked table and
//! optionally exports CSV / JSON.

use anyhow::{Context, Result};
use clap::Parser;
use scout_common::config::{config_dir, expand_path, Config};
use scout_common::config_loader::load_modular_config;
use scout_common::logging::init_logging_with_exclusions;
use scout_common::validation::Validate;
use std::path::PathBuf;
use tracing::{info, warn};

use scout_screener::data::Interval;
use scout_screener::screener::{
    default_csv_path, ReportFormat, ScreenerConfig, ScreenerReport, DEFAULT_TABLE_ROWS,
};
use scout_screener::ScoutService;

/// Screen exchange-listed coins for early trend candidates.
#[derive(Parser, Debug)]
#[command(name = "coin-scout")]
#[command(version)]
#[command(about = "Rank crypto trend candidates by rule gate and composite score.", long_about = None)]
struct Cli {
    /// Configuration directory (default: ~/.coinscout)
    #[arg(long, env = "SCOUT_CONFIG_DIR")]
    config_dir: Option<String>,

    /// Bar interval: 4h or 1d
    #[arg(long)]
    interval: Option<Interval>,

    /// Maximum market-cap pages to scan
    #[arg(long)]
    max_pages: Option<u32>,

    /// Whole-run timeout in seconds
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Use the stricter liquidity thresholds
    #[arg(long)]
    tight: bool,

    /// Export candidates to CSV (default name when PATH is omitted)
    #[arg(long, value_name = "PATH", num_args = 0..=1)]
    export_csv: Option<Option<PathBuf>>,

    /// Export the full scan report as JSON
    #[arg(long, value_name = "PATH")]
    export_json: Option<PathBuf>,

    /// Rows shown in the console table
    #[arg(long, default_value_t = DEFAULT_TABLE_ROWS)]
    top: usize,
}

fn load_config(cli: &Cli) -> Result<(Config, ScreenerConfig)> {
    let dir = cli
        .config_dir
        .as_deref()
        .map(expand_path)
        .unwrap_or_else(config_dir);
    let merged = load_modular_config(Some(dir.clone()))
        .with_context(|| format!("Failed to load configuration from {}", dir.display()))?;

    let mut config = Config::from_value(&merged)?;
    config.apply_env_overrides();

    let mut screener = ScreenerConfig::from_value(&merged)?;
    screener.apply_env_overrides();

    if cli.tight {
        screener.apply_tight_regime();
    }
    if let Some(interval) = cli.interval {
        screener.interval = interval;
    }
    if let Some(pages) = cli.max_pages {
        screener.pipeline.max_pages = pages;
    }
    if let Some(secs) = cli.timeout_secs {
        screener.pipeline.run_timeout_secs = secs;
    }

    config.validate().context("Invalid shared configuration")?;
    screener.validate().context("Invalid screener configuration")?;
    Ok((config, screener))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let (config, screener) = load_config(&cli)?;

    init_logging_with_exclusions(
        &config.observability.log_level,
        &config.observability.log_format,
        &config.observability.excluded_targets,
    );

    info!(
        interval = %screener.interval,
        tight = cli.tight,
        "Coin Scout v{}",
        env!("CARGO_PKG_VERSION")
    );

    let service = ScoutService::new(&config, screener);
    let (budget, abort) = service.budget();

    let fetcher = service.fetcher();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received; cancelling run");
            abort.abort();
            fetcher.close();
        }
    });

    let report = ScreenerReport::new(service.run(&budget).await);
    print!("{}", report.to_table(cli.top));

    if let Some(path) = cli.export_csv {
        let path = path.unwrap_or_else(default_csv_path);
        let written = report.save_to_file(&path, ReportFormat::Csv)?;
        info!(path = %written.display(), "CSV exported");
    }
    if let Some(path) = cli.export_json {
        let written = report.save_to_file(&path, ReportFormat::Json)?;
        info!(path = %written.display(), "JSON exported");
    }

    Ok(())
}
