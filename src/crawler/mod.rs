//! Crawler module for the sold-listings index
//!
//! This module contains the core crawling logic, including:
//! - Page count probing and the page work queue
//! - HTTP fetching with rate-limit backoff
//! - The worker pool and the shared result sink
//! - Incremental date-range planning against the cache
//! - Overall crawl coordination

mod coordinator;
mod fetcher;
mod probe;
mod queue;
mod ranges;
mod sink;
mod worker;

pub use coordinator::{list_cached_runs, CrawlCoordinator, CrawlPlan, CrawlRequest, CrawlSettings};
pub use fetcher::{
    parse_retry_after, BackoffPolicy, FetchClient, HttpTransport, PageResponse, RawResponse,
    SleepFn, Transport,
};
pub use probe::{parse_page_count, resolve_pages, PageSource};
pub use queue::{QueueError, WorkQueue};
pub use ranges::{plan_fetch_ranges, DateRange};
pub use sink::ResultSink;
pub use worker::{CrawlProgress, CrawlWorker, ProgressFn, WorkerContext, WorkerReport};

use crate::config::Config;
use crate::output::ListingTable;
use crate::SlutprisError;

/// Runs a complete crawl against the live site
///
/// This is the main entry point for a crawl. It will:
/// 1. Build the HTTP client and the record extractor from `config`
/// 2. Load the city's cache and plan the missing date ranges
/// 3. Probe, queue and fetch every page of those ranges
/// 4. Merge, persist and return the resulting table
///
/// # Arguments
///
/// * `config` - The crawler configuration
/// * `request` - What to crawl
///
/// # Returns
///
/// * `Ok(ListingTable)` - Crawl completed successfully
/// * `Err(SlutprisError)` - Crawl failed
pub fn crawl(config: &Config, request: &CrawlRequest) -> Result<ListingTable, SlutprisError> {
    CrawlCoordinator::from_config(config)?.run(request)
}
