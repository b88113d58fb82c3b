//! Storage module for the per-city listing cache
//!
//! This module handles all cache file operations, including:
//! - SQLite cache initialization and schema management
//! - Loading and replacing cached listings
//! - The crawl run log
//! - Locating the default cache file of a city

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteCache;
pub use traits::{CacheStore, StorageError, StorageResult};

use crate::url::City;
use chrono::NaiveDate;
use std::path::{Path, PathBuf};

/// Opens or creates the cache of `city` at `path`
///
/// # Arguments
///
/// * `path` - Path to the SQLite cache file
/// * `city` - City the cache must belong to
///
/// # Returns
///
/// * `Ok(SqliteCache)` - Successfully opened cache
/// * `Err(StorageError)` - The file is not a cache of `city`
pub fn open_cache(path: &Path, city: City) -> StorageResult<SqliteCache> {
    SqliteCache::open(path, city)
}

/// Default location of the cache file of `city`
///
/// `<directory>/<slug>.sqlite` when a directory is configured, otherwise
/// `<user cache dir>/slutpris/<slug>.sqlite`. Falls back to the working
/// directory on platforms without a user cache dir.
pub fn default_cache_path(city: City, directory: Option<&Path>) -> PathBuf {
    let file_name = format!("{}.sqlite", city.slug());

    match directory {
        Some(directory) => directory.join(file_name),
        None => dirs::cache_dir()
            .map(|dir| dir.join("slutpris"))
            .unwrap_or_default()
            .join(file_name),
    }
}

/// One entry of the crawl run log
#[derive(Debug, Clone, PartialEq)]
pub struct RunRecord {
    pub id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub range_from: NaiveDate,
    pub range_to: NaiveDate,
    pub pages_fetched: u64,
    pub records_fetched: u64,
    pub status: RunStatus,
}

/// Status of a crawl run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// Every planned page was fetched and the cache was updated
    Completed,
    /// Nothing had to be fetched; the request was served from the cache
    CacheHit,
    Failed,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::CacheHit => "cache_hit",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "completed" => Some(Self::Completed),
            "cache_hit" => Some(Self::CacheHit),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}
