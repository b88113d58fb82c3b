//! HTTP fetcher implementation
//!
//! This module handles every page request of a crawl:
//! - Building the blocking HTTP client with a proper user agent string
//! - Retrying rate-limited (429) responses after the server's `Retry-After`
//!   delay, stretched by an exponential backoff factor
//! - Handing any other response back to the caller untouched
//!
//! The network and the clock are both injected so the retry schedule can be
//! tested without a server or wall-clock waits.

use crate::config::{CrawlerConfig, UserAgentConfig};
use crate::SlutprisError;
use reqwest::blocking::Client;
use reqwest::header::RETRY_AFTER;
use reqwest::StatusCode;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// One response as seen by the transport layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    /// HTTP status code
    pub status: u16,
    /// Raw `Retry-After` header value, if any
    pub retry_after: Option<String>,
    /// Response body
    pub body: Vec<u8>,
}

/// A single blocking GET
///
/// Transport failures (DNS, connect, timeout, body read) are errors; every
/// HTTP status, including 429, is a successful `RawResponse`.
pub trait Transport: Send + Sync {
    fn get(&self, url: &str) -> Result<RawResponse, SlutprisError>;
}

/// `Transport` over a `reqwest::blocking::Client`
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Builds the transport with the crawler's user agent and request timeout
    ///
    /// # Arguments
    ///
    /// * `user_agent` - Identification sent with every request
    /// * `timeout` - Upper bound for one request, body included
    ///
    /// # Returns
    ///
    /// * `Ok(HttpTransport)` - Ready to use
    /// * `Err(SlutprisError)` - The TLS backend could not be initialized
    pub fn new(user_agent: &UserAgentConfig, timeout: Duration) -> Result<Self, SlutprisError> {
        let client = Client::builder()
            .user_agent(user_agent.header_value())
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .gzip(true)
            .brotli(true)
            .build()?;

        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    fn get(&self, url: &str) -> Result<RawResponse, SlutprisError> {
        let http_err = |source| SlutprisError::Http {
            url: url.to_string(),
            source,
        };

        let response = self.client.get(url).send().map_err(http_err)?;
        let status = response.status().as_u16();
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.bytes().map_err(http_err)?.to_vec();

        Ok(RawResponse {
            status,
            retry_after,
            body,
        })
    }
}

/// Delay schedule for rate-limited requests
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackoffPolicy {
    /// Multiplier applied once per previous attempt
    pub factor: f64,
    /// Delay used when `Retry-After` is missing or unparsable
    pub default_retry_after: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            factor: 1.3,
            default_retry_after: Duration::from_secs(5),
        }
    }
}

impl BackoffPolicy {
    /// Builds the policy from crawler configuration
    pub fn from_config(config: &CrawlerConfig) -> Self {
        Self {
            factor: config.backoff_factor,
            default_retry_after: Duration::from_secs(config.default_retry_after),
        }
    }

    /// Returns `retry_after * factor^attempt`, with `attempt` counting from 0
    pub fn delay(&self, retry_after: Duration, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let secs = retry_after.as_secs_f64() * self.factor.powi(exponent);
        Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
    }
}

/// Parses a `Retry-After` value given as integer seconds
///
/// The HTTP-date form is not used by the listings site and yields `None`.
pub fn parse_retry_after(value: &str) -> Option<Duration> {
    value.trim().parse::<u64>().ok().map(Duration::from_secs)
}

/// A non-rate-limited response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl PageResponse {
    /// Returns true for 2xx statuses
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Sleep function used between retries
pub type SleepFn = Arc<dyn Fn(Duration) + Send + Sync>;

/// Rate-limit aware page fetcher shared by every worker
pub struct FetchClient<T: Transport> {
    transport: T,
    backoff: BackoffPolicy,
    sleep: SleepFn,
}

impl<T: Transport> FetchClient<T> {
    /// Creates a client that sleeps on the calling thread between retries
    pub fn new(transport: T, backoff: BackoffPolicy) -> Self {
        Self {
            transport,
            backoff,
            sleep: Arc::new(thread::sleep),
        }
    }

    /// Replaces the sleep function
    pub fn with_sleep(mut self, sleep: SleepFn) -> Self {
        self.sleep = sleep;
        self
    }

    /// Returns the underlying transport
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Fetches `url`, retrying 429 responses until something else arrives
    ///
    /// # Retry Logic
    ///
    /// | Condition | Action |
    /// |-----------|--------|
    /// | HTTP 429 with `Retry-After: n` | Sleep `n * factor^attempt`, retry |
    /// | HTTP 429 without usable header | Sleep `default * factor^attempt`, retry |
    /// | Any other status | Return it |
    /// | Transport failure | Return the error |
    ///
    /// Retries are unbounded; a server that never stops answering 429 keeps
    /// the caller in this loop.
    pub fn fetch(&self, url: &str) -> Result<PageResponse, SlutprisError> {
        let mut attempt: u32 = 0;

        loop {
            let response = self.transport.get(url)?;

            if response.status != StatusCode::TOO_MANY_REQUESTS.as_u16() {
                return Ok(PageResponse {
                    status: response.status,
                    body: response.body,
                });
            }

            let retry_after = match response.retry_after.as_deref().and_then(parse_retry_after) {
                Some(delay) => delay,
                None => {
                    tracing::warn!(
                        "429 from {} without usable Retry-After, waiting {:?}",
                        url,
                        self.backoff.default_retry_after
                    );
                    self.backoff.default_retry_after
                }
            };

            let delay = self.backoff.delay(retry_after, attempt);
            tracing::debug!(
                "Rate limited on {} (attempt {}), retrying in {:.2}s",
                url,
                attempt,
                delay.as_secs_f64()
            );
            (self.sleep)(delay);
            attempt = attempt.saturating_add(1);
        }
    }
}
