//! Harvester CLI
//!
//! Local execution entry point. Crawls a paginated board listing through a
//! headless browser and appends harvested posts to local storage.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::Ordering;

use clap::{Parser, Subcommand};
use harvester::{
    error::{AppError, Result},
    models::{Config, PageRange},
    pipeline::Orchestrator,
    render::chromium::{ChromiumConfig, ChromiumRenderer},
    storage::LocalStorage,
};

/// Harvester - Paginated Board Post Harvester
#[derive(Parser, Debug)]
#[command(
    name = "harvester",
    version,
    about = "Harvests posts from paginated community boards"
)]
struct Cli {
    /// Path to storage directory containing config files
    #[arg(short, long, default_value = "storage")]
    storage_dir: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Crawl a range of listing pages
    Crawl {
        /// First listing page, 1-based
        #[arg(long, default_value_t = 1)]
        start: u32,

        /// Last listing page, inclusive
        #[arg(long, conflicts_with = "unbounded")]
        end: Option<u32>,

        /// Crawl until cancelled instead of stopping at an end page
        #[arg(long)]
        unbounded: bool,
    },

    /// Validate configuration files
    Validate,

    /// Show current storage info
    Info,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    log::info!("Harvester starting...");

    // Load configuration
    let config_path = cli.storage_dir.join("config.toml");
    let config = Config::load_or_default(&config_path);

    log::info!("Loaded configuration from {}", cli.storage_dir.display());

    let config = Arc::new(config);
    let storage = LocalStorage::new(&cli.storage_dir);

    match cli.command {
        Command::Crawl {
            start,
            end,
            unbounded,
        } => {
            config.validate()?;

            let range = if unbounded {
                PageRange::unbounded(start)
            } else {
                match end {
                    Some(end) => PageRange::bounded(start, end),
                    None => {
                        log::error!("Specify --end <page> or opt into --unbounded.");
                        return Err(AppError::config("No end page given"));
                    }
                }
            };

            let renderer = Arc::new(ChromiumRenderer::new(ChromiumConfig::default()));
            let orchestrator = Orchestrator::new(config, renderer, Arc::new(storage));

            // Ctrl-C requests cancellation at the next page or post
            // boundary; the in-flight operation finishes naturally.
            let stop = orchestrator.stop_handle();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    log::warn!("Cancellation requested, finishing current operation...");
                    stop.store(true, Ordering::Relaxed);
                }
            });

            let stats = orchestrator.run(range).await?;
            log::info!(
                "Harvested {} posts ({} failed)",
                stats.total_posts,
                stats.failed_posts
            );
        }

        Command::Validate => {
            log::info!("Validating configuration...");

            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            log::info!("✓ Config OK (crawler, selectors, and time markers)");

            log::info!("All validations passed!");
        }

        Command::Info => {
            log::info!("Storage directory: {}", cli.storage_dir.display());

            let posts = storage.load_posts().await?;
            log::info!("Persisted posts: {}", posts.len());

            if let Some(latest) = posts.last() {
                log::info!("Latest post: {} ({})", latest.title, latest.link);
            }

            match storage.load_stats().await? {
                Some(stats) => log::info!("Last run stats: {}", stats),
                None => log::info!("No run stats found yet."),
            }
        }
    }

    log::info!("Done!");

    Ok(())
}
