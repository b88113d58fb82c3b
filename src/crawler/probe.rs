//! Page count probe
//!
//! The first index page of a query reports how many listings match and how
//! many fit on one page (`Visar 35 av 27 545`). One probe request per date
//! range turns that into the number of pages to crawl.

use crate::crawler::fetcher::{FetchClient, Transport};
use crate::url::PageUrl;
use crate::SlutprisError;
use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

fn count_marker() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"Visar (?:sida )?<!-- -->(\d(?:[\d \u{a0}]*\d)?)<!-- --> av <!-- -->(\d(?:[\d \u{a0}]*\d)?)",
        )
        .expect("valid count marker pattern")
    })
}

fn parse_count(digits: &str) -> Option<u64> {
    let digits: String = digits.chars().filter(char::is_ascii_digit).collect();
    digits.parse().ok()
}

/// Reads the page count from the "X of Y" marker in an index page
///
/// Returns `ceil(Y / X)`, `0` when `X` is 0, or `None` if no marker is
/// present.
pub fn parse_page_count(body: &str) -> Option<u32> {
    let captures = count_marker().captures(body)?;
    let per_page = parse_count(captures.get(1)?.as_str())?;
    let total = parse_count(captures.get(2)?.as_str())?;

    if per_page == 0 {
        return Some(0);
    }

    u32::try_from(total.div_ceil(per_page)).ok()
}

/// Checks a caller-supplied page list against the probed page count
///
/// Without an explicit list every page `1..=total` is returned.
///
/// # Errors
///
/// * `PagesNotUnique` - A page is listed twice
/// * `PagesExceedsMax` - A page is 0 or larger than `total`
pub fn resolve_pages(total: u32, explicit: Option<&[u32]>) -> Result<Vec<u32>, SlutprisError> {
    let explicit = match explicit {
        Some(pages) => pages,
        None => return Ok((1..=total).collect()),
    };

    let mut seen = HashSet::with_capacity(explicit.len());
    for &page in explicit {
        if !seen.insert(page) {
            return Err(SlutprisError::PagesNotUnique { page });
        }
    }

    if let Some(&page) = explicit.iter().find(|&&p| p == 0 || p > total) {
        return Err(SlutprisError::PagesExceedsMax { page, max: total });
    }

    Ok(explicit.to_vec())
}

/// Resolves how many pages an index query spans
pub struct PageSource<'a, T: Transport> {
    client: &'a FetchClient<T>,
    urls: &'a dyn PageUrl,
}

impl<'a, T: Transport> PageSource<'a, T> {
    pub fn new(client: &'a FetchClient<T>, urls: &'a dyn PageUrl) -> Self {
        Self { client, urls }
    }

    /// Fetches page 1 and returns the total page count
    ///
    /// # Errors
    ///
    /// * `HttpStatus` - The probe returned a non-success status
    /// * `ProbeMarkerMissing` - The response carries no count marker
    pub fn probe(&self) -> Result<u32, SlutprisError> {
        let url = self.urls.page_url(1);
        let response = self.client.fetch(&url)?;

        if !response.is_success() {
            return Err(SlutprisError::HttpStatus {
                url,
                status: response.status,
            });
        }

        let body = String::from_utf8_lossy(&response.body);
        let pages = parse_page_count(&body)
            .ok_or_else(|| SlutprisError::ProbeMarkerMissing { url: url.clone() })?;

        tracing::debug!("Probe of {} reports {} pages", url, pages);
        Ok(pages)
    }

    /// Probes the page count and resolves the pages to crawl
    pub fn pages(&self, explicit: Option<&[u32]>) -> Result<(u32, Vec<u32>), SlutprisError> {
        let total = self.probe()?;
        let pages = resolve_pages(total, explicit)?;
        Ok((total, pages))
    }
}
