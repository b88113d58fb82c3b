//! Crawl worker: one OS thread draining the page queue
//!
//! Each worker loops over
//! - dequeue a page (sleep briefly when the queue is empty)
//! - fetch it, retrying rate limits inside the fetch client
//! - extract its records
//! - append them to the shared sink and report progress
//!
//! until the stop flag is raised. Any other failure ends that worker only;
//! the coordinator collects the error when it joins the thread. The page the
//! worker held at that moment is lost, so the run as a whole fails.

use crate::crawler::fetcher::{FetchClient, Transport};
use crate::crawler::queue::WorkQueue;
use crate::crawler::sink::ResultSink;
use crate::crawler::DateRange;
use crate::listing::RecordExtractor;
use crate::state::WorkerState;
use crate::url::PageUrl;
use crate::SlutprisError;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Progress notifications emitted during a crawl
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CrawlProgress {
    /// The coordinator queued `pages` pages of `range`
    RangeStarted { range: DateRange, pages: usize },
    /// A worker appended the records of one page
    PageDone {
        worker: usize,
        page: u32,
        records: usize,
    },
}

/// Progress callback, called from the coordinator and worker threads
pub type ProgressFn = Arc<dyn Fn(&CrawlProgress) + Send + Sync>;

/// Everything a worker shares with the rest of the run
pub struct WorkerContext<T: Transport> {
    pub queue: Arc<WorkQueue>,
    pub client: Arc<FetchClient<T>>,
    pub extractor: Arc<dyn RecordExtractor>,
    pub sink: Arc<ResultSink>,
    pub urls: Arc<dyn PageUrl>,
    pub progress: Option<ProgressFn>,
    pub idle_sleep: Duration,
    pub span: tracing::Span,
}

impl<T: Transport> Clone for WorkerContext<T> {
    fn clone(&self) -> Self {
        Self {
            queue: Arc::clone(&self.queue),
            client: Arc::clone(&self.client),
            extractor: Arc::clone(&self.extractor),
            sink: Arc::clone(&self.sink),
            urls: Arc::clone(&self.urls),
            progress: self.progress.clone(),
            idle_sleep: self.idle_sleep,
            span: self.span.clone(),
        }
    }
}

/// What a worker did before it stopped cleanly
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WorkerReport {
    pub id: usize,
    pub pages: u64,
    pub records: u64,
}

/// Handle to a running worker thread
pub struct CrawlWorker {
    id: usize,
    stop: Arc<AtomicBool>,
    state: Arc<AtomicU8>,
    handle: JoinHandle<Result<WorkerReport, SlutprisError>>,
}

impl CrawlWorker {
    /// Spawns the worker thread `crawl-worker-<id>`
    pub fn start<T>(id: usize, ctx: WorkerContext<T>) -> Result<Self, SlutprisError>
    where
        T: Transport + 'static,
    {
        let stop = Arc::new(AtomicBool::new(false));
        let state = Arc::new(AtomicU8::new(WorkerState::Idle.to_u8()));

        let handle = {
            let stop = Arc::clone(&stop);
            let state = Arc::clone(&state);
            thread::Builder::new()
                .name(format!("crawl-worker-{}", id))
                .spawn(move || run(id, ctx, stop, state))?
        };

        Ok(Self {
            id,
            stop,
            state,
            handle,
        })
    }

    pub fn id(&self) -> usize {
        self.id
    }

    /// Current state of the worker's state machine
    pub fn state(&self) -> WorkerState {
        WorkerState::from_u8(self.state.load(Ordering::Acquire)).unwrap_or(WorkerState::Failed)
    }

    /// Returns true once the thread has exited, cleanly or not
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Raises the stop flag without waiting
    pub fn request_stop(&self) {
        self.stop.store(true, Ordering::Release);
    }

    /// Raises the stop flag and joins the thread
    ///
    /// A page that is being fetched when the flag goes up is finished first.
    /// A worker that hit a fatal error yields `WorkerFailed`.
    pub fn stop(self) -> Result<WorkerReport, SlutprisError> {
        self.request_stop();
        self.handle
            .join()
            .map_err(|_| SlutprisError::WorkerPanicked { id: self.id })?
    }
}

fn run<T: Transport>(
    id: usize,
    ctx: WorkerContext<T>,
    stop: Arc<AtomicBool>,
    state: Arc<AtomicU8>,
) -> Result<WorkerReport, SlutprisError> {
    let _entered = ctx.span.enter();
    let set = |next: WorkerState| {
        let previous = WorkerState::from_u8(state.swap(next.to_u8(), Ordering::AcqRel));
        debug_assert!(
            previous.is_some_and(|p| p.can_transition_to(next)),
            "worker {} moved from {:?} to {}",
            id,
            previous,
            next
        );
    };
    let mut report = WorkerReport {
        id,
        ..WorkerReport::default()
    };

    tracing::debug!("Worker {} started", id);

    while !stop.load(Ordering::Acquire) {
        let page = match ctx.queue.try_dequeue() {
            Some(page) => page,
            None => {
                set(WorkerState::Sleeping);
                thread::sleep(ctx.idle_sleep);
                set(WorkerState::Idle);
                continue;
            }
        };

        match process_page(&ctx, page, &set) {
            Ok(records) => {
                report.pages += 1;
                report.records += records as u64;
                if let Some(progress) = &ctx.progress {
                    progress(&CrawlProgress::PageDone {
                        worker: id,
                        page,
                        records,
                    });
                }
                set(WorkerState::Idle);
            }
            Err(e) => {
                set(WorkerState::Failed);
                tracing::debug!("Worker {} failed on page {}: {}", id, page, e);
                return Err(SlutprisError::WorkerFailed {
                    id,
                    page,
                    pages: report.pages,
                    source: Box::new(e),
                });
            }
        }
    }

    set(WorkerState::Stopped);
    tracing::debug!(
        "Worker {} stopped after {} pages ({} records)",
        id,
        report.pages,
        report.records
    );
    Ok(report)
}

fn process_page<T: Transport>(
    ctx: &WorkerContext<T>,
    page: u32,
    set: &impl Fn(WorkerState),
) -> Result<usize, SlutprisError> {
    set(WorkerState::Fetching);
    let url = ctx.urls.page_url(page);
    let response = ctx.client.fetch(&url)?;
    if !response.is_success() {
        return Err(SlutprisError::HttpStatus {
            url,
            status: response.status,
        });
    }

    set(WorkerState::Extracting);
    let records = ctx.extractor.extract(&response.body)?;
    let count = records.len();

    set(WorkerState::Appending);
    ctx.sink.extend(records);
    tracing::debug!("Page {} yielded {} records", page, count);

    Ok(count)
}
