//! Slutpris: an incremental harvester of sold real-estate listings
//!
//! This crate crawls the paginated "sold listings" index of a listings site
//! with a pool of worker threads, extracts typed records from every page and
//! keeps them in a per-city cache so that later runs only fetch the date
//! ranges they have not seen yet.

pub mod config;
pub mod crawler;
pub mod listing;
pub mod output;
pub mod state;
pub mod storage;
pub mod url;

use chrono::NaiveDate;
use thiserror::Error;

/// Main error type for Slutpris operations
#[derive(Debug, Error)]
pub enum SlutprisError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP error for {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("HTTP {status} for {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("No listing count marker found in response from {url}")]
    ProbeMarkerMissing { url: String },

    #[error("Explicit page {page} was given more than once")]
    PagesNotUnique { page: u32 },

    #[error("Explicit page {page} is outside the {max} available pages")]
    PagesExceedsMax { page: u32, max: u32 },

    #[error("Invalid date range: {from} is after {to}")]
    InvalidDateRange { from: NaiveDate, to: NaiveDate },

    #[error("All crawl workers stopped with {remaining} pages still queued")]
    WorkersExhausted { remaining: usize },

    #[error("Crawl worker {id} failed on page {page}: {source}")]
    WorkerFailed {
        id: usize,
        page: u32,
        /// Pages the worker completed before the failure
        pages: u64,
        source: Box<SlutprisError>,
    },

    #[error("Crawl worker {id} panicked")]
    WorkerPanicked { id: usize },

    #[error("Queue error: {0}")]
    Queue(#[from] crawler::QueueError),

    #[error("Extraction error: {0}")]
    Extract(#[from] listing::ExtractError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),

    #[error("URL error: {0}")]
    Url(#[from] UrlError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Unknown city: {0}")]
    UnknownCity(String),
}

/// Result type alias for Slutpris operations
pub type Result<T> = std::result::Result<T, SlutprisError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{CrawlCoordinator, CrawlRequest, DateRange};
pub use listing::{ListingRecord, PropertyType};
pub use output::{ListingTable, TableOrder};
pub use state::WorkerState;
pub use url::City;
