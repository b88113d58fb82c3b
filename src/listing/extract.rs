//! Record extraction from listing index pages
//!
//! The index pages embed their data as a JSON document in
//! `<script id="__NEXT_DATA__">`. Every sold listing is an object stored
//! under a key of the form `SoldProperty:<id>` somewhere in that document.

use crate::listing::fields::{
    parse_area_m2, parse_date_sold, parse_district, parse_price_sek, parse_property_type,
    parse_rooms, parse_street,
};
use crate::listing::ListingRecord;
use crate::url::canonical_listing_url;
use crate::UrlError;
use regex::Regex;
use scraper::{Html, Selector};
use serde_json::Value;
use std::sync::OnceLock;
use thiserror::Error;
use url::Url;

/// Errors that make a whole page unusable
///
/// A single malformed listing never produces one of these; its fields are
/// set to `None` instead.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Page has no __NEXT_DATA__ payload")]
    MissingPageData,

    #[error("Page payload is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Invalid selector: {0}")]
    Selector(String),
}

/// Maps a raw page payload to the listing records it contains
///
/// Implementations are pure and shared between worker threads.
pub trait RecordExtractor: Send + Sync {
    /// Extracts every listing on the page, in the order found
    fn extract(&self, body: &[u8]) -> Result<Vec<ListingRecord>, ExtractError>;
}

fn sold_property_key() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"SoldProperty:(\d+)").expect("valid key pattern"))
}

/// Extractor for the `__NEXT_DATA__` JSON payload of the sold-listings index
#[derive(Debug, Clone)]
pub struct NextDataExtractor {
    base_url: Url,
}

impl NextDataExtractor {
    /// Creates an extractor resolving listing links against `base_url`
    pub fn new(base_url: &str) -> Result<Self, UrlError> {
        let base_url = Url::parse(base_url).map_err(|e| UrlError::Parse(e.to_string()))?;
        Ok(Self { base_url })
    }

    /// Finds the page-data script and parses it
    fn page_data(&self, html: &str) -> Result<Value, ExtractError> {
        let document = Html::parse_document(html);
        let selector = Selector::parse("script#__NEXT_DATA__")
            .map_err(|e| ExtractError::Selector(e.to_string()))?;

        let script = document
            .select(&selector)
            .next()
            .ok_or(ExtractError::MissingPageData)?;
        let json: String = script.text().collect();

        Ok(serde_json::from_str(&json)?)
    }

    /// Maps one `SoldProperty` object to a record
    fn to_record(&self, id: &str, listing: &Value) -> ListingRecord {
        let url = formatted(listing, "url")
            .and_then(|href| canonical_listing_url(&self.base_url, href).ok())
            .or_else(|| canonical_listing_url(&self.base_url, &format!("/bostad/{}", id)).ok())
            .unwrap_or_else(|| format!("{}bostad/{}", self.base_url, id));

        ListingRecord {
            price_sek: parse_price_sek(formatted(listing, "soldPrice")),
            property_type: parse_property_type(formatted(listing, "objectType")),
            rooms: parse_rooms(formatted(listing, "rooms")),
            area_m2: parse_area_m2(formatted(listing, "livingArea")),
            street: parse_street(formatted(listing, "streetAddress")),
            district: parse_district(formatted(listing, "descriptiveAreaName")),
            date_sold: parse_date_sold(formatted(listing, "soldDate")),
            url,
        }
    }
}

impl RecordExtractor for NextDataExtractor {
    fn extract(&self, body: &[u8]) -> Result<Vec<ListingRecord>, ExtractError> {
        let html = String::from_utf8_lossy(body);
        let data = self.page_data(&html)?;

        Ok(find_sold_properties(&data)
            .into_iter()
            .map(|(id, listing)| self.to_record(id, listing))
            .collect())
    }
}

/// Reads a value that is either a plain string or `{"formatted": "..."}`
fn formatted<'a>(listing: &'a Value, key: &str) -> Option<&'a str> {
    match listing.get(key)? {
        Value::String(s) => Some(s),
        Value::Object(object) => object.get("formatted").and_then(Value::as_str),
        _ => None,
    }
}

/// Collects every object stored under a `SoldProperty:<id>` key
///
/// Walks the document with an explicit stack so arbitrarily deep payloads
/// cannot overflow the call stack. Siblings are visited in map order.
fn find_sold_properties(data: &Value) -> Vec<(&str, &Value)> {
    let mut found = Vec::new();
    let mut stack = vec![data];

    while let Some(value) = stack.pop() {
        match value {
            Value::Object(object) => {
                let mut children = Vec::new();
                for (key, child) in object {
                    let id = sold_property_key()
                        .captures(key)
                        .and_then(|captures| captures.get(1));
                    match id {
                        Some(id) if child.is_object() => found.push((id.as_str(), child)),
                        _ => children.push(child),
                    }
                }
                stack.extend(children.into_iter().rev());
            }
            Value::Array(items) => stack.extend(items.iter().rev()),
            _ => {}
        }
    }

    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listing::PropertyType;
    use chrono::NaiveDate;

    fn page(json: &str) -> Vec<u8> {
        format!(
            r#"<html><head></head><body><div id="__next"></div>
            <script id="__NEXT_DATA__" type="application/json">{}</script>
            </body></html>"#,
            json
        )
        .into_bytes()
    }

    fn extractor() -> NextDataExtractor {
        NextDataExtractor::new("https://www.booli.se").unwrap()
    }

    #[test]
    fn test_extracts_listing_fields() {
        let body = page(
            r#"{"props":{"pageProps":{"__APOLLO_STATE__":{
                "SoldProperty:4711":{
                    "soldPrice":{"formatted":"1 670 000 kr","raw":1670000},
                    "objectType":"Lägenhet",
                    "rooms":{"formatted":"3 rum"},
                    "livingArea":{"formatted":"80½ m²"},
                    "streetAddress":"Ågatan 1",
                    "descriptiveAreaName":"Linköpings Innerstad",
                    "soldDate":"2022-04-23",
                    "url":"/bostad/4711"
                },
                "ROOT_QUERY":{"search":{"__ref":"SoldProperty:4711"}}
            }}}}"#,
        );

        let records = extractor().extract(&body).unwrap();

        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.price_sek, Some(1_670_000));
        assert_eq!(record.property_type, PropertyType::Apartment);
        assert_eq!(record.rooms, Some(3));
        assert_eq!(record.area_m2, Some(80.5));
        assert_eq!(record.street.as_deref(), Some("Ågatan 1"));
        assert_eq!(record.district.as_deref(), Some("Linköpings Innerstad"));
        assert_eq!(record.date_sold, NaiveDate::from_ymd_opt(2022, 4, 23));
        assert_eq!(record.url, "https://www.booli.se/bostad/4711");
    }

    #[test]
    fn test_bad_record_is_kept_with_null_fields() {
        let body = page(
            r#"{"props":{"SoldProperty:1":{"soldPrice":42,"rooms":"many","soldDate":"yesterday"},
                         "SoldProperty:2":{"soldPrice":"2 000 000 kr","url":"/bostad/2"}}}"#,
        );

        let mut records = extractor().extract(&body).unwrap();
        records.sort_by(|a, b| a.url.cmp(&b.url));

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].url, "https://www.booli.se/bostad/1");
        assert_eq!(records[0].price_sek, None);
        assert_eq!(records[0].rooms, None);
        assert_eq!(records[0].date_sold, None);
        assert_eq!(records[0].property_type, PropertyType::Unknown);
        assert_eq!(records[1].price_sek, Some(2_000_000));
    }

    #[test]
    fn test_nested_and_array_payloads() {
        let body = page(
            r#"{"a":[{"b":{"SoldProperty:10":{"url":"/bostad/10"}}},
                     {"SoldProperty:11":{"url":"/bostad/11"}}],
                "SoldProperty:12":"not an object"}"#,
        );

        let records = extractor().extract(&body).unwrap();
        let urls: Vec<&str> = records.iter().map(|r| r.url.as_str()).collect();

        assert_eq!(
            urls,
            vec![
                "https://www.booli.se/bostad/10",
                "https://www.booli.se/bostad/11"
            ]
        );
    }

    #[test]
    fn test_page_without_listings() {
        let body = page(r#"{"props":{"pageProps":{}}}"#);
        assert!(extractor().extract(&body).unwrap().is_empty());
    }

    #[test]
    fn test_missing_page_data() {
        let body = b"<html><body>Too many requests</body></html>";
        assert!(matches!(
            extractor().extract(body),
            Err(ExtractError::MissingPageData)
        ));
    }

    #[test]
    fn test_invalid_json() {
        let body = page("{not json");
        assert!(matches!(
            extractor().extract(&body),
            Err(ExtractError::InvalidJson(_))
        ));
    }
}
