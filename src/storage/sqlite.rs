//! SQLite cache implementation
//!
//! This module provides a SQLite-based implementation of the CacheStore trait.
//! Each cache file belongs to one city; the city is written into the `meta`
//! table when the file is created and checked on every open.

use crate::listing::{ListingRecord, PropertyType};
use crate::storage::schema::{get_schema_version, initialize_schema, META_CITY, META_SCHEMA_VERSION};
use crate::storage::traits::{CacheStore, StorageError, StorageResult};
use crate::storage::{RunRecord, RunStatus};
use crate::url::City;
use chrono::NaiveDate;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::fs;
use std::path::Path;
use thiserror::Error;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// SQLite cache backend
pub struct SqliteCache {
    conn: Connection,
    city: City,
}

impl SqliteCache {
    /// Opens the cache file at `path`, creating it if it does not exist
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite cache file
    /// * `city` - City the cache must belong to
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteCache)` - Successfully opened/created cache
    /// * `Err(StorageError)` - The file is not a cache, was written by another
    ///   schema version, or belongs to another city
    pub fn open(path: &Path, city: City) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        Self::init(conn, city).map_err(|e| match e {
            StorageError::Sqlite(err) => StorageError::NotACache {
                path: path.to_path_buf(),
                reason: err.to_string(),
            },
            other => other,
        })
    }

    /// Creates an in-memory cache (for testing)
    #[cfg(test)]
    pub fn new_in_memory(city: City) -> StorageResult<Self> {
        Self::init(Connection::open_in_memory()?, city)
    }

    fn init(conn: Connection, city: City) -> StorageResult<Self> {
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        let tables: i64 =
            conn.query_row("SELECT COUNT(*) FROM sqlite_master WHERE type = 'table'", [], |row| {
                row.get(0)
            })?;

        if tables == 0 {
            initialize_schema(&conn)?;
            conn.execute(
                "INSERT INTO meta (key, value) VALUES (?1, ?2), (?3, ?4)",
                params![
                    META_SCHEMA_VERSION,
                    get_schema_version().to_string(),
                    META_CITY,
                    city.slug()
                ],
            )?;
            tracing::debug!("Created new {} cache", city);
        } else {
            Self::check_meta(&conn, city)?;
        }

        Ok(Self { conn, city })
    }

    fn check_meta(conn: &Connection, city: City) -> StorageResult<()> {
        let meta = |key: &str| -> StorageResult<Option<String>> {
            Ok(conn
                .query_row("SELECT value FROM meta WHERE key = ?1", [key], |row| row.get(0))
                .optional()?)
        };

        let version = meta(META_SCHEMA_VERSION)?.unwrap_or_default();
        if version != get_schema_version().to_string() {
            return Err(StorageError::UnsupportedSchema {
                expected: get_schema_version(),
                found: version,
            });
        }

        let found = meta(META_CITY)?.unwrap_or_default();
        if found != city.slug() {
            return Err(StorageError::CityMismatch {
                expected: city.slug().to_string(),
                found,
            });
        }

        Ok(())
    }

    /// City this cache belongs to
    pub fn city(&self) -> City {
        self.city
    }
}

/// A stored enum value this build does not know
#[derive(Debug, Error)]
#[error("unknown {kind} '{value}'")]
struct UnknownValue {
    kind: &'static str,
    value: String,
}

fn conversion_error<E>(column: usize, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(column, Type::Text, Box::new(err))
}

fn parse_date(column: usize, value: Option<String>) -> rusqlite::Result<Option<NaiveDate>> {
    value
        .map(|s| {
            NaiveDate::parse_from_str(&s, DATE_FORMAT).map_err(|e| conversion_error(column, e))
        })
        .transpose()
}

fn parse_required_date(column: usize, value: String) -> rusqlite::Result<NaiveDate> {
    NaiveDate::parse_from_str(&value, DATE_FORMAT).map_err(|e| conversion_error(column, e))
}

/// Rows that fail to decode make the whole cache unusable
fn decode_error(err: rusqlite::Error) -> StorageError {
    match err {
        rusqlite::Error::FromSqlConversionFailure(..) => StorageError::Corrupt(err.to_string()),
        other => StorageError::Sqlite(other),
    }
}

fn row_to_record(row: &Row<'_>) -> rusqlite::Result<ListingRecord> {
    let property_type: String = row.get(1)?;

    Ok(ListingRecord {
        price_sek: row.get(0)?,
        property_type: PropertyType::from_db_string(&property_type).ok_or_else(|| {
            conversion_error(
                1,
                UnknownValue {
                    kind: "property type",
                    value: property_type.clone(),
                },
            )
        })?,
        rooms: row.get(2)?,
        area_m2: row.get(3)?,
        street: row.get(4)?,
        district: row.get(5)?,
        date_sold: parse_date(6, row.get(6)?)?,
        url: row.get(7)?,
    })
}

fn row_to_run(row: &Row<'_>) -> rusqlite::Result<RunRecord> {
    let status: String = row.get(7)?;

    Ok(RunRecord {
        id: row.get(0)?,
        started_at: row.get(1)?,
        finished_at: row.get(2)?,
        range_from: parse_required_date(3, row.get(3)?)?,
        range_to: parse_required_date(4, row.get(4)?)?,
        pages_fetched: row.get(5)?,
        records_fetched: row.get(6)?,
        status: RunStatus::from_db_string(&status).ok_or_else(|| {
            conversion_error(
                7,
                UnknownValue {
                    kind: "run status",
                    value: status.clone(),
                },
            )
        })?,
    })
}

impl CacheStore for SqliteCache {
    // ===== Listings =====

    fn load_records(&self) -> StorageResult<Vec<ListingRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT price_sek, property_type, rooms, area_m2, street, district, date_sold, url
             FROM listings ORDER BY id",
        )?;

        let records = stmt
            .query_map([], row_to_record)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(decode_error)?;

        Ok(records)
    }

    fn store_records(&mut self, records: &[ListingRecord]) -> StorageResult<()> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM listings", [])?;

        {
            let mut stmt = tx.prepare(
                "INSERT INTO listings
                    (price_sek, property_type, rooms, area_m2, street, district, date_sold, url)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            )?;

            for record in records {
                stmt.execute(params![
                    record.price_sek,
                    record.property_type.to_db_string(),
                    record.rooms,
                    record.area_m2,
                    record.street,
                    record.district,
                    record.date_sold.map(|d| d.format(DATE_FORMAT).to_string()),
                    record.url,
                ])?;
            }
        }

        tx.commit()?;
        tracing::debug!("Stored {} records in {} cache", records.len(), self.city);
        Ok(())
    }

    fn count_records(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM listings", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    // ===== Run Log =====

    fn record_run(&mut self, run: &RunRecord) -> StorageResult<i64> {
        self.conn.execute(
            "INSERT INTO runs
                (started_at, finished_at, range_from, range_to, pages_fetched, records_fetched, status)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                run.started_at,
                run.finished_at,
                run.range_from.format(DATE_FORMAT).to_string(),
                run.range_to.format(DATE_FORMAT).to_string(),
                run.pages_fetched,
                run.records_fetched,
                run.status.to_db_string(),
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn list_runs(&self) -> StorageResult<Vec<RunRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, started_at, finished_at, range_from, range_to,
                    pages_fetched, records_fetched, status
             FROM runs ORDER BY id DESC",
        )?;

        let runs = stmt
            .query_map([], row_to_run)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(decode_error)?;

        Ok(runs)
    }
}
