//! Sumi-Harvest main entry point
//!
//! This is the command-line interface for the Sumi-Harvest archiver.

use anyhow::Context;
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;
use sumi_harvest::config::{load_config_with_hash, validate, Config};
use sumi_harvest::harvester::{run_harvest, HarvestRequest, Harvester};
use sumi_harvest::output::{load_statistics, print_statistics};
use sumi_harvest::storage::open_storage;
use sumi_harvest::RescrapeMode;
use tracing_subscriber::EnvFilter;

/// Sumi-Harvest: an incremental archiver for API-less social front-ends
///
/// Sumi-Harvest collects posts, reply threads, profile cards and media from
/// a rendered front-end. Repeated runs only store what is new.
#[derive(Parser, Debug)]
#[command(name = "sumi-harvest")]
#[command(version)]
#[command(about = "An incremental archiver for API-less social front-ends", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Profile username to harvest (a leading '@' is ignored)
    #[arg(short, long, required_unless_present = "stats")]
    profile: Option<String>,

    /// Id of a single post to harvest together with its replies
    #[arg(short = 't', long = "post", value_name = "ID")]
    post: Option<String>,

    /// Maximum number of new comments per thread
    #[arg(long)]
    max_comments: Option<usize>,

    /// Maximum number of new posts from the profile timeline
    #[arg(long)]
    max_posts: Option<usize>,

    /// Fetch and store media attachments (yes/no)
    #[arg(long, value_parser = parse_bool, value_name = "BOOL")]
    attachments: Option<bool>,

    /// Skip profile posts younger than this many days
    #[arg(long)]
    min_age_days: Option<u32>,

    /// Ignore the archive for: none, tweets, comments or both
    #[arg(short, long, value_name = "MODE")]
    force: Option<RescrapeMode>,

    /// Also harvest replies of replies, up to the configured max depth
    #[arg(long)]
    deep: bool,

    /// Show statistics from the database and exit
    #[arg(long)]
    stats: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.stats {
        return handle_stats(&config);
    }

    apply_overrides(&mut config, &cli);
    validate(&config).context("Invalid command-line override")?;

    let request = HarvestRequest {
        profile: cli.profile.clone().unwrap_or_default(),
        post: cli.post.clone(),
    };
    handle_harvest(config, request).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("sumi_harvest=info,warn"),
            1 => EnvFilter::new("sumi_harvest=debug,info"),
            2 => EnvFilter::new("sumi_harvest=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Accepts yes/no style booleans
fn parse_bool(value: &str) -> Result<bool, String> {
    match value.to_lowercase().as_str() {
        "true" | "yes" | "y" | "1" => Ok(true),
        "false" | "no" | "n" | "0" => Ok(false),
        other => Err(format!("Boolean value expected, got '{}'", other)),
    }
}

/// Applies command-line flags on top of the configuration file
fn apply_overrides(config: &mut Config, cli: &Cli) {
    let harvester = &mut config.harvester;

    if let Some(max_comments) = cli.max_comments {
        harvester.max_comments = max_comments;
    }
    if let Some(max_posts) = cli.max_posts {
        harvester.max_posts = max_posts;
    }
    if let Some(attachments) = cli.attachments {
        harvester.attachments = attachments;
    }
    if let Some(min_age_days) = cli.min_age_days {
        harvester.min_age_days = min_age_days;
    }
    if let Some(force) = cli.force {
        harvester.force = force;
    }
    if cli.deep {
        harvester.deep = true;
    }
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    println!("Database: {}\n", config.output.database_path);

    let storage = open_storage(
        Path::new(&config.output.database_path),
        config.output.max_document_bytes,
    )
    .context("Failed to open database")?;

    let stats = load_statistics(&storage)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the main harvest operation
async fn handle_harvest(config: Config, request: HarvestRequest) -> anyhow::Result<()> {
    let storage = match open_storage(
        Path::new(&config.output.database_path),
        config.output.max_document_bytes,
    ) {
        Ok(storage) => storage,
        Err(e) => {
            tracing::error!("Database connection failed: {}", e);
            std::process::exit(1);
        }
    };

    tracing::info!(
        "Max posts: {}, max comments: {}, force: {}, deep: {}",
        config.harvester.max_posts,
        config.harvester.max_comments,
        config.harvester.force,
        config.harvester.deep
    );

    let mut harvester =
        Harvester::with_http(config, storage).context("Failed to set up the harvester")?;

    // Stop at the next page boundary on Ctrl-C
    let cancel = harvester.cancel_flag();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, finishing the current page");
            cancel.store(true, Ordering::Relaxed);
        }
    });

    let summary = run_harvest(&mut harvester, &request).await;

    if summary.target_unreachable {
        tracing::warn!("The requested feed could not be harvested");
    }
    if summary.cancelled {
        tracing::warn!("Harvest was interrupted; partial results were kept");
    }
    tracing::info!("Harvesting completed.");

    Ok(())
}
