//! Output module for the finished listing table
//!
//! This module handles:
//! - The columnar `ListingTable` a crawl produces
//! - Statistics over a table
//! - Markdown summaries of a table

mod markdown;
pub mod stats;
mod table;

pub use markdown::{format_markdown_summary, generate_markdown_summary};
pub use stats::{print_statistics, ListingStatistics};
pub use table::{ListingTable, TableOrder, COLUMN_NAMES};

use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;
