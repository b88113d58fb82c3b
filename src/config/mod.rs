//! Configuration module for Slutpris
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! Every section is optional, so `Config::default()` is a complete configuration.
//!
//! # Example
//!
//! ```no_run
//! use slutpris::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("slutpris.toml")).unwrap();
//! println!("Crawling with {} workers", config.crawler.n_crawlers);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{CacheConfig, Config, CrawlerConfig, OutputConfig, SiteConfig, UserAgentConfig};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
pub use validation::{validate, validate_crawler_count};
