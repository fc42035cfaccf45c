//! Sumi-Mirror main entry point
//!
//! This is the command-line interface for the Sumi-Mirror site mirroring crawler.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use sumi_mirror::config::{load_config, validate, Config};
use sumi_mirror::mirror;
use sumi_mirror::output::print_statistics;
use tracing_subscriber::EnvFilter;

/// Sumi-Mirror: a recursive site mirroring crawler
///
/// Sumi-Mirror downloads a seed page and everything it links to through `href` and `src`
/// attributes, across hosts, and rewrites the pages so the local copy browses offline.
#[derive(Parser, Debug)]
#[command(name = "sumi-mirror")]
#[command(version)]
#[command(about = "A recursive site mirroring crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// URL to start mirroring from (overrides the config file)
    #[arg(short, long, value_name = "URL")]
    seed: Option<String>,

    /// Directory to mirror into (overrides the config file)
    #[arg(short, long, value_name = "DIR")]
    output: Option<String>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate the configuration and print it without crawling
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            load_config(path)
                .with_context(|| format!("Failed to load configuration from {}", path.display()))?
        }
        None => Config::default(),
    };

    if let Some(seed) = cli.seed {
        config.crawl.seed_url = Some(seed);
    }
    if let Some(output) = cli.output {
        config.crawl.base_directory = output;
    }
    validate(&config).context("Invalid configuration")?;

    if config.crawl.seed_url.is_none() {
        anyhow::bail!("No seed URL given; pass --seed or set crawl.seed-url");
    }

    if cli.dry_run {
        handle_dry_run(&config)?;
        return Ok(());
    }

    let summary = mirror(config).await.context("Crawl failed")?;
    print_statistics(&summary);

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("sumi_mirror=info,warn"),
            1 => EnvFilter::new("sumi_mirror=debug,info"),
            2 => EnvFilter::new("sumi_mirror=trace,debug"),
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

/// Handles the --dry-run mode: prints the effective configuration
fn handle_dry_run(config: &Config) -> anyhow::Result<()> {
    println!("=== Sumi-Mirror Dry Run ===\n");
    println!("{}", toml::to_string_pretty(config)?);
    println!("Configuration is valid.");
    Ok(())
}
