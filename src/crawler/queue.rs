//! Page work queue shared by the crawl workers
//!
//! The queue is filled once, up front, with every page of a sub-range and is
//! then drained by the workers. Pages are never put back: a page that hits a
//! rate limit is retried inside the fetcher, not requeued.

use std::collections::{HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use thiserror::Error;

/// Errors raised while building a work queue
#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueueError {
    #[error("Page {page} appears more than once")]
    NonUniqueInput { page: u32 },

    #[error("Page {page} is outside 1..={max}")]
    RangeExceeded { page: u32, max: u32 },
}

/// Pre-populated FIFO of page numbers with non-blocking dequeue
#[derive(Debug)]
pub struct WorkQueue {
    pages: Mutex<VecDeque<u32>>,
    total: usize,
}

impl WorkQueue {
    /// Builds a queue holding `pages` in the given order
    ///
    /// # Arguments
    ///
    /// * `pages` - Page numbers to crawl, each at most once
    /// * `max_page` - Number of pages the index reported
    ///
    /// # Returns
    ///
    /// * `Ok(WorkQueue)` - Queue holding every page
    /// * `Err(QueueError)` - A page is duplicated or outside `1..=max_page`
    pub fn new<I>(pages: I, max_page: u32) -> Result<Self, QueueError>
    where
        I: IntoIterator<Item = u32>,
    {
        let mut seen = HashSet::new();
        let mut queue = VecDeque::new();

        for page in pages {
            if page == 0 || page > max_page {
                return Err(QueueError::RangeExceeded { page, max: max_page });
            }
            if !seen.insert(page) {
                return Err(QueueError::NonUniqueInput { page });
            }
            queue.push_back(page);
        }

        Ok(Self {
            total: queue.len(),
            pages: Mutex::new(queue),
        })
    }

    /// Builds a queue of every page `1..=page_count`
    pub fn all_pages(page_count: u32) -> Self {
        Self {
            total: page_count as usize,
            pages: Mutex::new((1..=page_count).collect()),
        }
    }

    /// Removes and returns the next page, or `None` if the queue is drained
    ///
    /// Never blocks beyond the short critical section.
    pub fn try_dequeue(&self) -> Option<u32> {
        self.lock().pop_front()
    }

    /// Returns true once every page has been handed out
    ///
    /// The answer may be stale by the time the caller acts on it; it is meant
    /// for polling, not for accounting.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Pages still waiting to be handed out
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Pages the queue was built with
    pub fn total(&self) -> usize {
        self.total
    }

    // A panicking worker cannot leave the deque half-updated, so a poisoned
    // lock is still safe to use.
    fn lock(&self) -> MutexGuard<'_, VecDeque<u32>> {
        self.pages.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
