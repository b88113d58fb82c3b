//! Cache store trait and error types
//!
//! This module defines the trait interface for cache backends and
//! associated error types.

use crate::listing::ListingRecord;
use crate::storage::RunRecord;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during cache operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("{path} is not a listing cache: {reason}")]
    NotACache { path: PathBuf, reason: String },

    #[error("Cache belongs to city '{found}', not '{expected}'")]
    CityMismatch { expected: String, found: String },

    #[error("Unsupported cache schema version {found} (expected {expected})")]
    UnsupportedSchema { expected: u32, found: String },

    #[error("Corrupt cache row: {0}")]
    Corrupt(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for cache backend implementations
///
/// A cache holds the listings of exactly one city plus a log of the runs
/// that produced them.
pub trait CacheStore {
    // ===== Listings =====

    /// Loads every cached listing, in the order it was stored
    ///
    /// A row that cannot be decoded fails the whole load with `Corrupt`.
    fn load_records(&self) -> StorageResult<Vec<ListingRecord>>;

    /// Replaces the cached listings with `records`
    ///
    /// URLs must be unique; callers dedup first (see `ResultSink::merge`).
    /// Either every record is written or, on error (a repeated URL
    /// included), the previous contents are kept.
    fn store_records(&mut self, records: &[ListingRecord]) -> StorageResult<()>;

    /// Number of cached listings
    fn count_records(&self) -> StorageResult<u64>;

    // ===== Run Log =====

    /// Appends a run to the run log and returns its id
    ///
    /// The `id` field of `run` is ignored.
    fn record_run(&mut self, run: &RunRecord) -> StorageResult<i64>;

    /// Lists logged runs, newest first
    fn list_runs(&self) -> StorageResult<Vec<RunRecord>>;
}
