//! Ripple-Crawl main entry point
//!
//! This is the command-line interface for the Ripple-Crawl web crawler.

use anyhow::Context;
use clap::Parser;
use ripple_crawl::config::{load_config_with_hash, validate_seeds, Config};
use ripple_crawl::crawler::crawl;
use ripple_crawl::output::{generate_markdown_summary, print_statistics};
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Ripple-Crawl: a polite, depth-bounded web crawler
///
/// Ripple-Crawl fans out from a set of seed URLs, visiting every URL at most
/// once, spacing requests to each domain and retrying transient failures with
/// exponential backoff.
#[derive(Parser, Debug)]
#[command(name = "ripple-crawl")]
#[command(version)]
#[command(about = "A polite, depth-bounded web crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Seed URL to crawl instead of the configured seeds (repeatable)
    #[arg(long = "url", value_name = "URL")]
    urls: Vec<String>,

    /// Number of agents to split the seeds across
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u32).range(1..=64))]
    agents: Option<u32>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if !cli.urls.is_empty() {
        validate_seeds(&cli.urls).context("invalid --url")?;
        config.seeds = cli.urls;
    }
    if let Some(agents) = cli.agents {
        config.crawler.agents = agents;
    }

    if cli.dry_run {
        handle_dry_run(&config);
        return Ok(());
    }

    handle_crawl(config, config_hash).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("ripple_crawl=info,warn"),
            1 => EnvFilter::new("ripple_crawl=debug,info"),
            2 => EnvFilter::new("ripple_crawl=trace,debug"),
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

/// Handles the --dry-run mode: shows the effective configuration
fn handle_dry_run(config: &Config) {
    let crawler = &config.crawler;

    println!("=== Ripple-Crawl Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Max depth: {}", crawler.max_depth);
    println!("  Max concurrent pages: {}", crawler.max_concurrent_pages_open);
    println!("  Min domain interval: {}ms", crawler.min_domain_interval);
    println!(
        "  Retries: {} (base {}, unit {}ms, cap {}ms)",
        crawler.max_retries, crawler.backoff_base, crawler.backoff_unit, crawler.max_backoff
    );
    println!("  Fetch timeout: {}ms", crawler.fetch_timeout);
    println!("  Agents: {}", crawler.agents);

    println!("\nUser Agent:");
    println!("  {}", config.user_agent.header_value());

    println!("\nPolicies:");
    println!("  Robots.txt: {}", if config.robots.enabled { "respected" } else { "ignored" });
    println!("  Same domain only: {}", config.links.same_domain_only);
    println!("  CAPTCHA mode: {:?}", config.captcha.mode);

    println!("\nOutput:");
    println!("  Pages: {} ({:?})", config.output.path, config.output.format);
    if let Some(summary) = &config.output.summary_path {
        println!("  Summary: {}", summary);
    }

    println!("\nSeeds ({}):", config.seeds.len());
    for seed in &config.seeds {
        println!("  - {}", seed);
    }

    println!("\n✓ Configuration is valid");
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config, config_hash: String) -> anyhow::Result<()> {
    tracing::info!(
        "Seeds: {}, agents: {}, max depth: {}",
        config.seeds.len(),
        config.crawler.agents,
        config.crawler.max_depth
    );

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, finishing in-flight pages");
            on_signal.cancel();
        }
    });

    let mut report = crawl(&config, cancel).await.context("crawl failed")?;
    report.config_hash = Some(config_hash);

    print_statistics(&report);

    if let Some(summary_path) = &config.output.summary_path {
        generate_markdown_summary(&report, Path::new(summary_path))
            .with_context(|| format!("failed to write summary to {}", summary_path))?;
        println!("✓ Summary written to: {}", summary_path);
    }

    Ok(())
}
