use crate::crawler::DateRange;
use crate::url::City;
use crate::UrlError;
use url::Url;

/// Strategy mapping a page number to the URL of that index page
///
/// Injected into the page source and the crawl workers. Any
/// `Fn(u32) -> String` closure is a `PageUrl`, which keeps tests short.
pub trait PageUrl: Send + Sync {
    /// Returns the absolute URL of the given 1-based page
    fn page_url(&self, page: u32) -> String;
}

impl<F> PageUrl for F
where
    F: Fn(u32) -> String + Send + Sync,
{
    fn page_url(&self, page: u32) -> String {
        self(page)
    }
}

/// URLs of the sold-listings index of one city, optionally filtered by sold date
///
/// Format: `{base}/slutpriser/{slug}/{area_id}?page=N[&minSoldDate=..&maxSoldDate=..]`
#[derive(Debug, Clone)]
pub struct SoldListingsUrl {
    index: Url,
    range: Option<DateRange>,
}

impl SoldListingsUrl {
    /// Builds the index URL template for `city` on the site at `base_url`
    ///
    /// # Example
    ///
    /// ```
    /// use slutpris::url::{City, PageUrl, SoldListingsUrl};
    ///
    /// let urls = SoldListingsUrl::new("https://www.booli.se", City::Linkoping, None).unwrap();
    /// assert_eq!(
    ///     urls.page_url(2),
    ///     "https://www.booli.se/slutpriser/linkoping/393?page=2"
    /// );
    /// ```
    pub fn new(base_url: &str, city: City, range: Option<DateRange>) -> Result<Self, UrlError> {
        let base = Url::parse(base_url).map_err(|e| UrlError::Parse(e.to_string()))?;

        if base.scheme() != "http" && base.scheme() != "https" {
            return Err(UrlError::InvalidScheme(base.scheme().to_string()));
        }

        let index = base
            .join(&format!("/slutpriser/{}/{}", city.slug(), city.area_id()))
            .map_err(|e| UrlError::Parse(e.to_string()))?;

        Ok(Self { index, range })
    }

    /// The sold-date filter applied to every page, if any
    pub fn range(&self) -> Option<DateRange> {
        self.range
    }
}

impl PageUrl for SoldListingsUrl {
    fn page_url(&self, page: u32) -> String {
        let mut url = self.index.clone();
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("page", &page.to_string());
            if let Some(range) = &self.range {
                query.append_pair("minSoldDate", &range.from.format("%Y-%m-%d").to_string());
                query.append_pair("maxSoldDate", &range.to.format("%Y-%m-%d").to_string());
            }
        }
        url.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_page_url_without_range() {
        let urls = SoldListingsUrl::new("https://www.booli.se", City::Stockholm, None).unwrap();
        assert_eq!(
            urls.page_url(1),
            "https://www.booli.se/slutpriser/stockholm/1?page=1"
        );
    }

    #[test]
    fn test_page_url_with_range() {
        let range = DateRange::new(date("2023-06-15"), date("2023-06-30")).unwrap();
        let urls =
            SoldListingsUrl::new("https://www.booli.se/", City::Linkoping, Some(range)).unwrap();

        assert_eq!(
            urls.page_url(7),
            "https://www.booli.se/slutpriser/linkoping/393?page=7&minSoldDate=2023-06-15&maxSoldDate=2023-06-30"
        );
    }

    #[test]
    fn test_base_with_port() {
        let urls = SoldListingsUrl::new("http://127.0.0.1:4040", City::Linkoping, None).unwrap();
        assert_eq!(
            urls.page_url(3),
            "http://127.0.0.1:4040/slutpriser/linkoping/393?page=3"
        );
    }

    #[test]
    fn test_invalid_base() {
        assert!(matches!(
            SoldListingsUrl::new("ftp://booli.se", City::Stockholm, None),
            Err(UrlError::InvalidScheme(_))
        ));
        assert!(matches!(
            SoldListingsUrl::new("booli", City::Stockholm, None),
            Err(UrlError::Parse(_))
        ));
    }

    #[test]
    fn test_closure_is_page_url() {
        let urls = |page: u32| format!("http://mock/page/{}", page);
        assert_eq!(urls.page_url(4), "http://mock/page/4");
    }
}
