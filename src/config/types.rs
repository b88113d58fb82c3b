use serde::Deserialize;
use std::path::PathBuf;

/// Main configuration structure for Slutpris
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent", default)]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub site: SiteConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Number of worker threads fetching pages
    #[serde(rename = "n-crawlers")]
    pub n_crawlers: usize,

    /// How often the coordinator checks whether the page queue drained (milliseconds)
    #[serde(rename = "poll-interval")]
    pub poll_interval: u64,

    /// How long an idle worker sleeps before polling the queue again (milliseconds)
    #[serde(rename = "idle-sleep")]
    pub idle_sleep: u64,

    /// Multiplier applied per retry attempt to the server's Retry-After delay
    #[serde(rename = "backoff-factor")]
    pub backoff_factor: f64,

    /// Delay used when a 429 response carries no usable Retry-After header (seconds)
    #[serde(rename = "default-retry-after")]
    pub default_retry_after: u64,

    /// Per-request timeout (seconds)
    #[serde(rename = "request-timeout")]
    pub request_timeout: u64,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            n_crawlers: 4,
            poll_interval: 1000,
            idle_sleep: 1,
            backoff_factor: 1.3,
            default_retry_after: 5,
            request_timeout: 30,
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            crawler_name: "slutpris".to_string(),
            crawler_version: env!("CARGO_PKG_VERSION").to_string(),
            contact_url: "https://github.com/slutpris/slutpris".to_string(),
            contact_email: "slutpris@example.com".to_string(),
        }
    }
}

impl UserAgentConfig {
    /// Formats the User-Agent header value: `Name/Version (+ContactURL; ContactEmail)`
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{}; {})",
            self.crawler_name, self.crawler_version, self.contact_url, self.contact_email
        )
    }
}

/// Target site configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Scheme and host every page URL is built on
    #[serde(rename = "base-url")]
    pub base_url: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.booli.se".to_string(),
        }
    }
}

/// Listing cache configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Whether runs reuse and update the per-city cache
    pub enabled: bool,

    /// Directory holding one cache file per city; the user cache dir when unset
    pub directory: Option<PathBuf>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            directory: None,
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OutputConfig {
    /// Path to the markdown summary file
    #[serde(rename = "summary-path")]
    pub summary_path: Option<PathBuf>,
}
