//! Slutpris main entry point
//!
//! This is the command-line interface for the Slutpris sold-listings harvester.

use chrono::{Local, NaiveDate};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use slutpris::config::{load_config_with_hash, validate_crawler_count, Config};
use slutpris::crawler::{
    list_cached_runs, CrawlCoordinator, CrawlProgress, CrawlRequest, DateRange,
};
use slutpris::output::{
    generate_markdown_summary, print_statistics, ListingStatistics, ListingTable,
};
use slutpris::storage::{default_cache_path, open_cache, CacheStore};
use slutpris::url::City;
use slutpris::ListingRecord;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Slutpris: an incremental harvester of sold real-estate listings
///
/// Slutpris crawls the sold-listings index of a city with a pool of worker
/// threads, honoring the site's rate limits, and keeps every listing in a
/// per-city cache so later runs only fetch dates they have not seen.
#[derive(Parser, Debug)]
#[command(name = "slutpris")]
#[command(version)]
#[command(about = "Incremental harvester of sold real-estate listings", long_about = None)]
struct Cli {
    /// City to crawl (stockholm, linkoping)
    #[arg(long)]
    city: City,

    /// First sold date to include (YYYY-MM-DD)
    #[arg(long, required_unless_present = "stats")]
    from: Option<NaiveDate>,

    /// Last sold date to include (YYYY-MM-DD), today when omitted
    #[arg(long)]
    to: Option<NaiveDate>,

    /// Crawl only these pages of every fetched date range (comma separated)
    #[arg(long, value_delimiter = ',')]
    pages: Option<Vec<u32>>,

    /// Number of worker threads, overriding the config file
    #[arg(long)]
    crawlers: Option<usize>,

    /// Neither read nor update the cache
    #[arg(long)]
    no_cache: bool,

    /// Cache file, overriding the default per-city location
    #[arg(long, value_name = "PATH")]
    cache_path: Option<PathBuf>,

    /// Path to TOML configuration file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Show a progress bar on stderr
    #[arg(long)]
    progress: bool,

    /// Write a markdown summary of the result to this file
    #[arg(long, value_name = "FILE")]
    summary: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Show which date ranges would be fetched without crawling
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show statistics and the run log of the cached dataset and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            match load_config_with_hash(path) {
                Ok((cfg, hash)) => {
                    tracing::info!("Configuration loaded successfully (hash: {})", hash);
                    cfg
                }
                Err(e) => {
                    tracing::error!("Failed to load configuration: {}", e);
                    return Err(e.into());
                }
            }
        }
        None => Config::default(),
    };

    let cache_path = cli
        .cache_path
        .clone()
        .unwrap_or_else(|| default_cache_path(cli.city, config.cache.directory.as_deref()));

    if cli.stats {
        return handle_stats(&cli, cache_path);
    }

    let request = build_request(&cli, &config, cache_path)?;

    if cli.dry_run {
        handle_dry_run(&config, &request)
    } else {
        handle_crawl(&cli, &config, &request)
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
///
/// Logs go to stderr; stdout carries the crawl result.
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("slutpris=info,warn"),
            1 => EnvFilter::new("slutpris=debug,info"),
            2 => EnvFilter::new("slutpris=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .with_thread_names(verbose > 0)
        .with_file(false)
        .init();
}

fn build_request(
    cli: &Cli,
    config: &Config,
    cache_path: PathBuf,
) -> Result<CrawlRequest, Box<dyn std::error::Error>> {
    let from = cli.from.ok_or("--from is required")?;
    let to = cli.to.unwrap_or_else(|| Local::now().date_naive());
    let range = DateRange::new(from, to)?;

    let concurrency = cli.crawlers.unwrap_or(config.crawler.n_crawlers);
    validate_crawler_count(concurrency)?;

    Ok(CrawlRequest {
        city: cli.city,
        range,
        explicit_pages: cli.pages.clone(),
        use_cache: config.cache.enabled && !cli.no_cache,
        cache_path,
        concurrency,
    })
}

/// Handles the --dry-run mode: shows what a crawl would fetch
fn handle_dry_run(
    config: &Config,
    request: &CrawlRequest,
) -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Slutpris Dry Run ===\n");

    println!("Request:");
    println!("  City: {} (area {})", request.city, request.city.area_id());
    println!("  Sold dates: {} to {}", request.range.from, request.range.to);
    match &request.explicit_pages {
        Some(pages) => println!("  Pages: {:?}", pages),
        None => println!("  Pages: all"),
    }
    println!("  Crawlers: {}", request.concurrency);

    println!("\nCrawler Configuration:");
    println!("  Site: {}", config.site.base_url);
    println!("  Poll interval: {}ms", config.crawler.poll_interval);
    println!("  Backoff factor: {}", config.crawler.backoff_factor);
    println!("  Request timeout: {}s", config.crawler.request_timeout);
    println!("  User agent: {}", config.user_agent.header_value());

    println!("\nCache:");
    if !request.use_cache {
        println!("  Disabled");
    } else {
        println!("  File: {}", request.cache_path.display());
    }

    let plan = CrawlCoordinator::from_config(config)?.plan(request)?;
    if let Some(cached) = plan.cached {
        println!("  Holds {} records sold {}", plan.cached_records, cached);
    }

    println!("\nRanges to fetch ({}):", plan.ranges.len());
    for range in &plan.ranges {
        println!("  - {} ({} days)", range, range.num_days());
    }
    if plan.ranges.is_empty() {
        println!("\n✓ Request is fully served by the cache");
    }

    Ok(())
}

/// Handles the --stats mode: shows statistics of the cached dataset
fn handle_stats(cli: &Cli, cache_path: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    if !cache_path.exists() {
        return Err(format!("No cache for {} at {}", cli.city, cache_path.display()).into());
    }

    println!("Cache: {}\n", cache_path.display());

    let cache = open_cache(&cache_path, cli.city)?;
    let mut table = ListingTable::from_records(cache.load_records()?, Default::default());
    if let (Some(from), Some(to)) = (cli.from, cli.to) {
        table = table.filter_range(DateRange::new(from, to)?);
    }

    print_statistics(&ListingStatistics::from_table(&table));

    let runs = list_cached_runs(&cache_path, cli.city)?;
    println!("\nRuns ({}):", runs.len());
    for run in runs.iter().take(10) {
        println!(
            "  #{} {} [{}, {}] {} pages, {} records, {}",
            run.id,
            run.started_at,
            run.range_from,
            run.range_to,
            run.pages_fetched,
            run.records_fetched,
            run.status.to_db_string()
        );
    }

    Ok(())
}

/// Handles the main crawl operation
fn handle_crawl(
    cli: &Cli,
    config: &Config,
    request: &CrawlRequest,
) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!(
        "Crawling {} sold {} to {} with {} workers (cache: {})",
        request.city,
        request.range.from,
        request.range.to,
        request.concurrency,
        if request.use_cache { "on" } else { "off" }
    );

    let mut coordinator = CrawlCoordinator::from_config(config)?;
    let bar = if cli.progress {
        let bar = progress_bar()?;
        let events = bar.clone();
        coordinator = coordinator.with_progress(Arc::new(move |event: &CrawlProgress| {
            match event {
                CrawlProgress::RangeStarted { range, pages } => {
                    events.inc_length(*pages as u64);
                    events.set_message(range.to_string());
                }
                CrawlProgress::PageDone { .. } => events.inc(1),
            }
        }));
        Some(bar)
    } else {
        None
    };

    let result = coordinator.run(request);
    if let Some(bar) = bar {
        bar.finish_and_clear();
    }

    let table = match result {
        Ok(table) => table,
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            return Err(e.into());
        }
    };
    tracing::info!("Crawl completed: {} listings", table.len());

    if let Some(path) = cli.summary.as_ref().or(config.output.summary_path.as_ref()) {
        generate_markdown_summary(request.city, Some(request.range), &table, path)?;
        tracing::info!("Summary written to: {}", path.display());
    }

    write_json_lines(table.rows())?;
    Ok(())
}

fn progress_bar() -> Result<ProgressBar, Box<dyn std::error::Error>> {
    let bar = ProgressBar::new(0);
    bar.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} pages ({eta}) {msg}",
            )?
            .progress_chars("#>-"),
    );
    Ok(bar)
}

fn write_json_lines(
    rows: impl Iterator<Item = ListingRecord>,
) -> Result<(), Box<dyn std::error::Error>> {
    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    for row in rows {
        serde_json::to_writer(&mut out, &row)?;
        out.write_all(b"\n")?;
    }
    out.flush()?;
    Ok(())
}
