//! Catalog Sync CLI
//!
//! Local execution entry point backed by `LocalStorage`.

use std::path::PathBuf;
use std::process::ExitCode;

use catalog_sync::{
    config::{default_config_path, load_config},
    error::Result,
    models::Config,
    rebuild_search_index, repair_zero_price, run_full_sync,
    storage::{CatalogStore, LocalStorage},
};
use clap::{Parser, Subcommand};
use serde::Serialize;

/// Catalog Sync - keeps the product catalog in step with the source
#[derive(Parser, Debug)]
#[command(
    name = "catalog-sync",
    version,
    about = "Catalog synchronization engine"
)]
struct Cli {
    /// Path to storage directory holding the catalog and system documents
    #[arg(short, long, default_value = "storage")]
    storage_dir: PathBuf,

    /// Path to config file (default: {storage_dir}/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the full sync over every target
    Sync,

    /// Refetch prices for active products stored at zero
    Repair,

    /// Rebuild the chunked search index
    Index,

    /// Show the last published sync progress
    Status,

    /// Validate the configuration
    Validate,
}

/// Initialize logging based on verbosity flag and configured level.
fn init_logging(verbose: bool, config: Option<&Config>) {
    let level = if verbose {
        "debug"
    } else {
        config.map_or("info", |c| c.logging.level.as_str())
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn exit_code(success: bool) -> ExitCode {
    if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let explicit = cli.config.is_some();
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| default_config_path(&cli.storage_dir));
    let loaded = load_config(&config_path, explicit);
    init_logging(cli.verbose, loaded.as_ref().ok());

    let config = match loaded {
        Ok(config) => config,
        Err(e) => {
            log::error!("Config validation failed: {}", e);
            return Err(e);
        }
    };
    log::info!(
        "Using storage at {} (config: {})",
        cli.storage_dir.display(),
        if config_path.exists() {
            config_path.display().to_string()
        } else {
            "defaults".to_string()
        }
    );

    let storage = LocalStorage::new(&cli.storage_dir);

    let code = match cli.command {
        Command::Sync => {
            let result = run_full_sync(&config, &storage).await;
            print_json(&result)?;
            exit_code(result.success)
        }

        Command::Repair => {
            let result = repair_zero_price(&config, &storage).await;
            print_json(&result)?;
            exit_code(result.success)
        }

        Command::Index => {
            let result = rebuild_search_index(&config, &storage).await;
            print_json(&result)?;
            exit_code(result.success)
        }

        Command::Status => match storage.load_progress().await? {
            Some(progress) => {
                print_json(&progress)?;
                ExitCode::SUCCESS
            }
            None => {
                log::info!("No sync progress recorded yet.");
                ExitCode::SUCCESS
            }
        },

        Command::Validate => {
            log::info!("✓ Config OK");
            print_json(&config)?;
            ExitCode::SUCCESS
        }
    };

    Ok(code)
}
