//! Cache schema definitions
//!
//! This module contains all SQL schema definitions for the listing cache.

/// SQL schema for a cache file
pub const SCHEMA_SQL: &str = r#"
-- Cache identity: schema version and city
CREATE TABLE IF NOT EXISTS meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);

-- One row per cached listing, in append order
CREATE TABLE IF NOT EXISTS listings (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    price_sek INTEGER,
    property_type TEXT NOT NULL,
    rooms INTEGER,
    area_m2 REAL,
    street TEXT,
    district TEXT,
    date_sold TEXT,
    url TEXT NOT NULL UNIQUE
);

CREATE INDEX IF NOT EXISTS idx_listings_date_sold ON listings(date_sold);

-- Crawl run log
CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    range_from TEXT NOT NULL,
    range_to TEXT NOT NULL,
    pages_fetched INTEGER NOT NULL DEFAULT 0,
    records_fetched INTEGER NOT NULL DEFAULT 0,
    status TEXT NOT NULL
);
"#;

/// Meta key holding the schema version
pub const META_SCHEMA_VERSION: &str = "schema_version";

/// Meta key holding the city slug
pub const META_CITY: &str = "city";

/// Initializes the cache schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}

/// Gets the current schema version
///
/// Cache files written with another version are rejected.
pub fn get_schema_version() -> u32 {
    1
}
