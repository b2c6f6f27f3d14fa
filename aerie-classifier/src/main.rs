//! aerie-classifier - batch classification of captured records
//!
//! Examples:
//!   aerie-classifier                               # classify everything pending
//!   aerie-classifier --prompt-file my_filter.txt   # custom filter prompt
//!   aerie-classifier --dry-run --verbose           # judge without saving
//!   aerie-classifier --max 20 --model claude-3-haiku-20240307

use aerie_classifier::prompt::load_prompt;
use aerie_classifier::{AnthropicJudge, ClassificationDriver, RunOptions};
use aerie_common::config::{RootFolderInitializer, RootFolderResolver, TomlConfig};
use aerie_common::models::StoreStats;
use aerie_common::Store;
use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::{error, info};

/// Command-line arguments for aerie-classifier
#[derive(Parser, Debug)]
#[command(name = "aerie-classifier")]
#[command(about = "Classify pending records with an LLM filter prompt")]
#[command(version)]
struct Args {
    /// Custom filter prompt file
    #[arg(short, long)]
    prompt_file: Option<PathBuf>,

    /// Maximum number of records to classify (default: all pending)
    #[arg(short, long = "max")]
    max: Option<u32>,

    /// Model to use (default: [classifier] model)
    #[arg(long)]
    model: Option<String>,

    /// Root folder holding tweets.db
    #[arg(short, long)]
    root_folder: Option<PathBuf>,

    /// Config file (default: AERIE_CONFIG, then ~/.config/aerie/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Judge without saving results
    #[arg(short = 'n', long)]
    dry_run: bool,

    /// Log every record and decision
    #[arg(short, long)]
    verbose: bool,

    /// Anthropic API key
    #[arg(long, env = "ANTHROPIC_API_KEY", hide_env_values = true)]
    api_key: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_result = TomlConfig::load(args.config.as_deref());
    let config = config_result.as_ref().cloned().unwrap_or_default();

    let level = config
        .logging
        .level
        .parse::<tracing::Level>()
        .unwrap_or(tracing::Level::INFO);
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .init();

    info!(
        "Starting Aerie Classifier (aerie-classifier) v{}",
        env!("CARGO_PKG_VERSION")
    );

    if let Err(e) = config_result {
        error!("Config file rejected, using built-in defaults: {}", e);
    }

    let Some(api_key) = args.api_key.filter(|key| !key.is_empty()) else {
        error!("ANTHROPIC_API_KEY environment variable not set");
        error!("Get your API key from https://console.anthropic.com/");
        anyhow::bail!("Missing Anthropic API key");
    };

    let root_folder = RootFolderResolver::new("aerie-classifier")
        .with_cli_arg(args.root_folder)
        .with_config(&config)
        .resolve();
    let initializer = RootFolderInitializer::new(root_folder);
    initializer
        .ensure_directory_exists()
        .context("Failed to initialize root folder")?;

    let db_path = initializer.database_path();
    info!("Database: {}", db_path.display());
    let store = Store::open(&db_path)
        .await
        .context("Failed to open database")?;

    let stats = store.stats().await.context("Failed to read store stats")?;
    log_stats("Database", &stats);
    if stats.pending == 0 {
        info!("No pending records to classify");
        return Ok(());
    }

    let pending = u32::try_from(stats.pending).unwrap_or(u32::MAX);
    let max_count = args.max.map_or(pending, |max| max.min(pending));
    let model = args.model.unwrap_or_else(|| config.classifier.model.clone());
    let prompt_file = args.prompt_file.or_else(|| config.classifier.prompt_file.clone());
    let prompt = load_prompt(prompt_file.as_deref());

    info!(max_count, model = %model, "Processing up to {} records", max_count);
    if args.dry_run {
        info!("Dry run: no changes will be saved");
    }

    let judge = AnthropicJudge::new(api_key, &config.classifier)
        .context("Failed to build HTTP client")?;
    let driver = ClassificationDriver::new(store.clone(), judge);

    let options = RunOptions {
        max_count,
        model,
        dry_run: args.dry_run,
        verbose: args.verbose,
    };
    let summary = driver.run(&prompt, &options).await?;

    info!("Classification complete");
    info!("  Processed: {}", summary.considered);
    info!("  Approved:  {}", summary.approved);
    info!("  Filtered:  {}", summary.filtered);
    if summary.skipped > 0 {
        info!("  Skipped:   {}", summary.skipped);
    }
    if summary.rejected > 0 {
        info!("  Already classified: {}", summary.rejected);
    }
    if summary.stopped_early {
        info!("Run stopped early on a provider error; remaining records stay pending");
    }

    if !args.dry_run {
        let stats = store.stats().await.context("Failed to read store stats")?;
        log_stats("New totals", &stats);
    }

    Ok(())
}

fn log_stats(label: &str, stats: &StoreStats) {
    info!(
        "{}: {} total, {} pending, {} approved, {} filtered",
        label, stats.total, stats.pending, stats.approved, stats.filtered
    );
}
