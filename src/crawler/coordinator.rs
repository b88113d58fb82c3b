//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the run loop that ties every crawl component
//! together:
//! - Loading the city's cache and planning which date ranges to fetch
//! - Probing the page count of each range and filling the work queue
//! - Starting the worker pool, waiting for the queue to drain, stopping it
//! - Merging fresh records into the cache and producing the final table

use crate::config::{validate_crawler_count, Config};
use crate::crawler::fetcher::{BackoffPolicy, FetchClient, HttpTransport, Transport};
use crate::crawler::probe::PageSource;
use crate::crawler::queue::WorkQueue;
use crate::crawler::ranges::{plan_fetch_ranges, DateRange};
use crate::crawler::sink::ResultSink;
use crate::crawler::worker::{CrawlProgress, CrawlWorker, ProgressFn, WorkerContext};
use crate::listing::{NextDataExtractor, RecordExtractor};
use crate::output::{ListingTable, TableOrder};
use crate::storage::{open_cache, CacheStore, RunRecord, RunStatus, SqliteCache};
use crate::url::{City, PageUrl, SoldListingsUrl};
use crate::SlutprisError;
use chrono::Utc;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Timing and site settings of the coordinator
#[derive(Debug, Clone, PartialEq)]
pub struct CrawlSettings {
    /// Scheme and host every page URL is built on
    pub base_url: String,
    /// Interval between queue-drained checks
    pub poll_interval: Duration,
    /// Sleep of a worker that found the queue empty
    pub idle_sleep: Duration,
}

impl Default for CrawlSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl CrawlSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            base_url: config.site.base_url.clone(),
            poll_interval: Duration::from_millis(config.crawler.poll_interval),
            idle_sleep: Duration::from_millis(config.crawler.idle_sleep),
        }
    }
}

/// Parameters of one crawl run
#[derive(Debug, Clone, PartialEq)]
pub struct CrawlRequest {
    pub city: City,
    /// Sold dates to return
    pub range: DateRange,
    /// Crawl only these pages of every fetched range
    pub explicit_pages: Option<Vec<u32>>,
    /// Reuse and update the cache at `cache_path`
    pub use_cache: bool,
    pub cache_path: PathBuf,
    /// Number of worker threads
    pub concurrency: usize,
}

/// What a run would do, computed without touching the network
#[derive(Debug, Clone, PartialEq)]
pub struct CrawlPlan {
    /// Date span already in the cache
    pub cached: Option<DateRange>,
    /// Records already in the cache
    pub cached_records: usize,
    /// Ranges that would be fetched
    pub ranges: Vec<DateRange>,
}

/// Runs crawls with a fixed transport, extractor and settings
pub struct CrawlCoordinator<T: Transport + 'static> {
    client: Arc<FetchClient<T>>,
    extractor: Arc<dyn RecordExtractor>,
    settings: CrawlSettings,
    progress: Option<ProgressFn>,
}

impl CrawlCoordinator<HttpTransport> {
    /// Builds a coordinator that talks to the real site
    ///
    /// # Arguments
    ///
    /// * `config` - The crawler configuration
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlCoordinator)` - Ready to run
    /// * `Err(SlutprisError)` - The HTTP client or the extractor could not be built
    pub fn from_config(config: &Config) -> Result<Self, SlutprisError> {
        let transport = HttpTransport::new(
            &config.user_agent,
            Duration::from_secs(config.crawler.request_timeout),
        )?;
        let client = FetchClient::new(transport, BackoffPolicy::from_config(&config.crawler));
        let extractor = NextDataExtractor::new(&config.site.base_url)?;

        Ok(Self::new(
            client,
            Arc::new(extractor),
            CrawlSettings::from_config(config),
        ))
    }
}

impl<T: Transport + 'static> CrawlCoordinator<T> {
    pub fn new(
        client: FetchClient<T>,
        extractor: Arc<dyn RecordExtractor>,
        settings: CrawlSettings,
    ) -> Self {
        Self {
            client: Arc::new(client),
            extractor,
            settings,
            progress: None,
        }
    }

    /// Installs a progress callback
    pub fn with_progress(mut self, progress: ProgressFn) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Computes the ranges a run would fetch
    ///
    /// Reads the cache if it exists but never creates one.
    pub fn plan(&self, request: &CrawlRequest) -> Result<CrawlPlan, SlutprisError> {
        let baseline = if request.use_cache && request.cache_path.exists() {
            let cache = open_cache(&request.cache_path, request.city)?;
            ResultSink::from_records(cache.load_records()?)
        } else {
            ResultSink::new()
        };

        let cached = baseline.date_span();
        Ok(CrawlPlan {
            cached,
            cached_records: baseline.len(),
            ranges: plan_fetch_ranges(request.range, cached),
        })
    }

    /// Runs one crawl
    ///
    /// With the cache enabled the cache is loaded, only the missing date
    /// ranges are fetched, the merged records are written back and the
    /// result is limited to exactly `request.range` (undated rows dropped).
    /// Without the cache the whole range is fetched and returned unfiltered.
    ///
    /// # Errors
    ///
    /// * `InvalidDateRange`, `Config` - Bad request
    /// * `Storage` - The cache cannot be opened, read or written
    /// * `HttpStatus`, `Http`, `ProbeMarkerMissing` - A probe failed
    /// * `PagesNotUnique`, `PagesExceedsMax` - Bad explicit page list
    /// * `WorkerFailed` - A worker hit a fatal error; its page was not fetched
    /// * `WorkersExhausted` - Every worker died with pages still queued
    ///
    /// On error nothing is written to the cache except a failed entry in the
    /// run log.
    pub fn run(&self, request: &CrawlRequest) -> Result<ListingTable, SlutprisError> {
        DateRange::new(request.range.from, request.range.to)?;
        validate_crawler_count(request.concurrency)?;

        let span = tracing::info_span!("crawl", city = %request.city);
        let _entered = span.enter();
        let started_at = Utc::now();
        let start_time = Instant::now();

        let mut cache = if request.use_cache {
            Some(open_cache(&request.cache_path, request.city)?)
        } else {
            None
        };
        let baseline = match &cache {
            Some(cache) => ResultSink::from_records(cache.load_records()?),
            None => ResultSink::new(),
        };

        let cached = baseline.date_span();
        let ranges = plan_fetch_ranges(request.range, cached);
        match cached {
            Some(cached) => tracing::info!(
                "Cache holds {} records sold {}; fetching {} ranges",
                baseline.len(),
                cached,
                ranges.len()
            ),
            None => tracing::info!("No cached records; fetching {}", request.range),
        }

        let fresh = Arc::new(ResultSink::new());
        let mut pages_fetched = 0;
        for range in &ranges {
            if let Err(e) = self.crawl_range(request, *range, &fresh, &span, &mut pages_fetched) {
                if let Some(cache) = cache.as_mut() {
                    let status = RunStatus::Failed;
                    let run = run_record(request, started_at, pages_fetched, fresh.len(), status);
                    if let Err(log_err) = cache.record_run(&run) {
                        tracing::warn!("Could not log failed run: {}", log_err);
                    }
                }
                return Err(e);
            }
        }

        let fresh = Arc::try_unwrap(fresh)
            .unwrap_or_else(|shared| ResultSink::from_records(shared.snapshot()));
        let records_fetched = fresh.len();
        let added = baseline.merge(fresh);

        tracing::info!(
            "Fetched {} records from {} pages ({} new) in {:?}",
            records_fetched,
            pages_fetched,
            added,
            start_time.elapsed()
        );

        let table = baseline.to_table(TableOrder::default());

        match cache.as_mut() {
            Some(cache) => {
                cache.store_records(&baseline.into_records())?;
                let status = if ranges.is_empty() {
                    RunStatus::CacheHit
                } else {
                    RunStatus::Completed
                };
                let run = run_record(request, started_at, pages_fetched, records_fetched, status);
                cache.record_run(&run)?;
                Ok(table.filter_range(request.range))
            }
            None => Ok(table),
        }
    }

    /// Probes one date range and crawls its pages with a fresh worker pool
    ///
    /// Adds the pages the workers completed to `pages_fetched`, also when
    /// the range fails.
    fn crawl_range(
        &self,
        request: &CrawlRequest,
        range: DateRange,
        sink: &Arc<ResultSink>,
        span: &tracing::Span,
        pages_fetched: &mut u64,
    ) -> Result<(), SlutprisError> {
        let urls: Arc<dyn PageUrl> = Arc::new(SoldListingsUrl::new(
            &self.settings.base_url,
            request.city,
            Some(range),
        )?);

        let source = PageSource::new(&self.client, urls.as_ref());
        let (total, pages) = source.pages(request.explicit_pages.as_deref())?;
        let queue = Arc::new(WorkQueue::new(pages, total)?);

        tracing::info!("Range {}: {} of {} pages queued", range, queue.total(), total);
        if let Some(progress) = &self.progress {
            progress(&CrawlProgress::RangeStarted {
                range,
                pages: queue.total(),
            });
        }

        if queue.is_empty() {
            return Ok(());
        }

        let ctx = WorkerContext {
            queue: Arc::clone(&queue),
            client: Arc::clone(&self.client),
            extractor: Arc::clone(&self.extractor),
            sink: Arc::clone(sink),
            urls,
            progress: self.progress.clone(),
            idle_sleep: self.settings.idle_sleep,
            span: span.clone(),
        };

        let mut workers = Vec::with_capacity(request.concurrency);
        for id in 0..request.concurrency {
            match CrawlWorker::start(id, ctx.clone()) {
                Ok(worker) => workers.push(worker),
                Err(e) => {
                    *pages_fetched += stop_all(workers).pages;
                    return Err(e);
                }
            }
        }

        // Surviving workers keep draining after one fails.
        let exhausted = loop {
            if queue.is_empty() {
                break false;
            }
            if workers.iter().all(CrawlWorker::is_finished) {
                break true;
            }
            thread::sleep(self.settings.poll_interval);
        };

        let remaining = queue.len();
        let outcome = stop_all(workers);
        *pages_fetched += outcome.pages;

        if exhausted {
            return Err(SlutprisError::WorkersExhausted { remaining });
        }
        match outcome.failures.into_iter().next() {
            Some(failure) => Err(failure),
            None => Ok(()),
        }
    }
}

/// What a stopped worker pool did
struct PoolOutcome {
    /// Pages completed, by clean and failed workers alike
    pages: u64,
    failures: Vec<SlutprisError>,
}

/// Stops and joins every worker, logging the ones that failed
fn stop_all(workers: Vec<CrawlWorker>) -> PoolOutcome {
    let mut outcome = PoolOutcome {
        pages: 0,
        failures: Vec::new(),
    };

    for worker in workers {
        let id = worker.id();
        match worker.stop() {
            Ok(report) => outcome.pages += report.pages,
            Err(e) => {
                tracing::warn!("Crawl worker {} failed: {}", id, e);
                if let SlutprisError::WorkerFailed { pages, .. } = &e {
                    outcome.pages += pages;
                }
                outcome.failures.push(e);
            }
        }
    }

    outcome
}

fn run_record(
    request: &CrawlRequest,
    started_at: chrono::DateTime<Utc>,
    pages_fetched: u64,
    records_fetched: usize,
    status: RunStatus,
) -> RunRecord {
    RunRecord {
        id: 0,
        started_at: started_at.to_rfc3339(),
        finished_at: Some(Utc::now().to_rfc3339()),
        range_from: request.range.from,
        range_to: request.range.to,
        pages_fetched,
        records_fetched: records_fetched as u64,
        status,
    }
}

/// Opens the cache of `city` and returns its run log, newest first
pub fn list_cached_runs(
    path: &std::path::Path,
    city: City,
) -> Result<Vec<RunRecord>, SlutprisError> {
    let cache: SqliteCache = open_cache(path, city)?;
    Ok(cache.list_runs()?)
}
