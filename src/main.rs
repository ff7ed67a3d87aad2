//! Sayfa main entry point
//!
//! This is the command-line interface for the Sayfa registry crawler.

use anyhow::Context;
use clap::Parser;
use sayfa::config::{load_config_with_hash, Config, TargetConfig};
use sayfa::engine::{build_http_client, CrawlEngine, DocumentFetcher, RetryPolicy};
use sayfa::sites::build_site;
use sayfa::store::open_store;
use sayfa::SayfaError;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use url::Url;

/// Sayfa: a resumable crawler for paginated document registries
///
/// Sayfa walks every result page of the configured registries, fetches each
/// referenced document, and persists it exactly once. Re-running a crawl
/// skips unchanged documents and refreshes changed ones, so interrupted runs
/// can simply be restarted.
#[derive(Parser, Debug)]
#[command(name = "sayfa")]
#[command(version = "1.0.0")]
#[command(about = "A resumable registry crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Crawl only the named target instead of every configured one
    #[arg(long, value_name = "NAME")]
    target: Option<String>,

    /// Validate config and show what would be crawled without crawling
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.dry_run {
        handle_dry_run(&config);
        return Ok(());
    }

    handle_crawl(config, cli.target.as_deref()).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("sayfa=info,warn"),
            1 => EnvFilter::new("sayfa=debug,info"),
            2 => EnvFilter::new("sayfa=trace,debug"),
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

/// Handles the --dry-run mode: validates config and shows what would be crawled
fn handle_dry_run(config: &Config) {
    println!("=== Sayfa Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Mode: {:?}", config.crawler.mode);
    println!("  Page size: {}", config.crawler.page_size);
    println!("  Start page: {}", config.crawler.start_page);
    println!("  Concurrency: {}", config.crawler.concurrency);
    match config.crawler.early_stop_threshold {
        Some(threshold) => println!("  Early stop after: {} unchanged documents", threshold),
        None => println!("  Early stop: disabled (full crawl)"),
    }

    println!("\nRetry:");
    println!(
        "  Document backoff base: {}ms (jitter up to {}ms, {} attempts max)",
        config.retry.initial_error_wait_ms, config.retry.jitter_cap_ms, config.retry.max_attempts
    );
    println!("  Page retry wait: {}ms", config.retry.page_retry_wait_ms);

    println!("\nOutput:");
    println!("  Root directory: {}", config.output.root_dir);

    println!("\nTargets ({}):", config.targets.len());
    for target in &config.targets {
        println!(
            "  - {} ({:?}) -> {}",
            target.name, target.site, target.base_url
        );
    }

    println!("\n✓ Configuration is valid");
}

/// Handles the main crawl operation over the configured targets
async fn handle_crawl(config: Config, only_target: Option<&str>) -> anyhow::Result<()> {
    let targets: Vec<&TargetConfig> = match only_target {
        Some(name) => {
            let target = config
                .targets
                .iter()
                .find(|t| t.name == name)
                .ok_or_else(|| SayfaError::UnknownTarget(name.to_string()))?;
            vec![target]
        }
        None => config.targets.iter().collect(),
    };

    let client = build_http_client(&config.http).context("failed to build HTTP client")?;

    for target in targets {
        tracing::info!("[{}] starting crawl of {}", target.name, target.base_url);

        let base_url = Url::parse(&target.base_url)
            .with_context(|| format!("invalid base-url for '{}'", target.name))?;

        let (source, strategy) = build_site(
            target.site,
            client.clone(),
            base_url.clone(),
            config.crawler.page_size,
        );

        let output_dir = Path::new(&config.output.root_dir).join(&target.name);
        let store = open_store(&output_dir)
            .with_context(|| format!("cannot prepare output directory {}", output_dir.display()))?;

        let fetcher = DocumentFetcher::new(
            client.clone(),
            base_url,
            RetryPolicy::bounded(&config.retry),
        );

        let engine = CrawlEngine::new(
            &target.name,
            source,
            strategy,
            Arc::new(store),
            fetcher,
            config.crawler.clone(),
            &config.retry,
        );

        let report = engine.run().await?;
        tracing::info!("[{}] {}", target.name, report);
    }

    Ok(())
}
