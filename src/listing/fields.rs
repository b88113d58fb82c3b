//! Field parsers for the site's formatted listing values
//!
//! Every parser takes the raw (possibly missing) text and returns `None`
//! instead of failing. Unparseable input is expected noise, so nothing here
//! logs.

use crate::listing::PropertyType;
use chrono::NaiveDate;
use regex::Regex;
use std::sync::OnceLock;

fn rooms_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(\d+)(?:[.,]\d+)? rum").expect("valid rooms pattern"))
}

fn area_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(\d+(?:[.,]\d+)?) m²").expect("valid area pattern"))
}

/// Replaces the half glyph so `80½` reads as `80.5`
fn expand_half(content: &str) -> String {
    content.replace('½', ".5")
}

/// Parses a price such as `1 670 000 kr`
///
/// All digit runs are concatenated, so thousands separators of any kind
/// are ignored.
pub fn parse_price_sek(content: Option<&str>) -> Option<i64> {
    let digits: String = content?.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    digits.parse().ok()
}

/// Parses a property type from `Lägenhet` or `Lägenhet, Linköpings Innerstad`
pub fn parse_property_type(content: Option<&str>) -> PropertyType {
    match content {
        Some(text) => {
            let label = text.split(", ").next().unwrap_or(text);
            PropertyType::from_label(label)
        }
        None => PropertyType::Unknown,
    }
}

/// Parses the room count from `3 rum, 80½ m²`
///
/// A half room (`2½ rum`) is truncated to the whole rooms.
pub fn parse_rooms(content: Option<&str>) -> Option<i32> {
    let expanded = expand_half(content?);
    let captures = rooms_pattern().captures(&expanded)?;
    captures.get(1)?.as_str().parse().ok()
}

/// Parses the living area from `3 rum, 80½ m²` or `125 m²`
pub fn parse_area_m2(content: Option<&str>) -> Option<f64> {
    let expanded = expand_half(content?);
    let captures = area_pattern().captures(&expanded)?;
    captures.get(1)?.as_str().replace(',', ".").parse().ok()
}

/// Street address, kept verbatim
pub fn parse_street(content: Option<&str>) -> Option<String> {
    content.map(str::to_string)
}

/// Parses the district from `Lägenhet, Linköpings Innerstad` or a bare area name
pub fn parse_district(content: Option<&str>) -> Option<String> {
    let text = content?;
    let district = match text.split_once(", ") {
        Some((_, rest)) => rest.trim(),
        None => text.trim(),
    };

    if district.is_empty() {
        None
    } else {
        Some(district.to_string())
    }
}

/// Parses a sold date such as `2022-04-23` (a trailing time part is ignored)
pub fn parse_date_sold(content: Option<&str>) -> Option<NaiveDate> {
    let text = content?.trim();
    let day = text.get(..10).unwrap_or(text);
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_price_sek() {
        let cases = [
            (Some("1 670 000 kr"), Some(1_670_000)),
            (Some("2\u{a0}395\u{a0}000 kr"), Some(2_395_000)),
            (Some("not valid"), None),
            (None, None),
        ];
        for (content, expected) in cases {
            assert_eq!(parse_price_sek(content), expected, "content: {:?}", content);
        }
    }

    #[test]
    fn test_parse_property_type() {
        let cases = [
            (Some("Lägenhet, Linköpings Innerstad"), PropertyType::Apartment),
            (Some("Radhus"), PropertyType::TownHouse),
            (Some("Lägenhet"), PropertyType::Apartment),
            (Some("not valid"), PropertyType::Unknown),
            (None, PropertyType::Unknown),
        ];
        for (content, expected) in cases {
            assert_eq!(parse_property_type(content), expected, "content: {:?}", content);
        }
    }

    #[test]
    fn test_parse_district() {
        let cases = [
            (Some("Lägenhet, Linköpings Innerstad"), Some("Linköpings Innerstad")),
            (Some("Something, This is valid"), Some("This is valid")),
            (Some("Vasastan"), Some("Vasastan")),
            (Some("  "), None),
            (None, None),
        ];
        for (content, expected) in cases {
            assert_eq!(
                parse_district(content).as_deref(),
                expected,
                "content: {:?}",
                content
            );
        }
    }

    #[test]
    fn test_parse_rooms() {
        let cases = [
            (Some("3 rum, 80½ m²"), Some(3)),
            (Some("44 rum, 9 m²"), Some(44)),
            (Some("2½ rum"), Some(2)),
            (Some("125 m²"), None),
            (None, None),
        ];
        for (content, expected) in cases {
            assert_eq!(parse_rooms(content), expected, "content: {:?}", content);
        }
    }

    #[test]
    fn test_parse_area_m2() {
        let cases = [
            (Some("3 rum, 80½ m²"), Some(80.5)),
            (Some("125 m²"), Some(125.0)),
            (Some("44 rum, 9 m²"), Some(9.0)),
            (Some("62,5 m²"), Some(62.5)),
            (Some("pi m²"), None),
            (None, None),
        ];
        for (content, expected) in cases {
            assert_eq!(parse_area_m2(content), expected, "content: {:?}", content);
        }
    }

    #[test]
    fn test_parse_date_sold() {
        assert_eq!(
            parse_date_sold(Some("2022-04-23")),
            NaiveDate::from_ymd_opt(2022, 4, 23)
        );
        assert_eq!(
            parse_date_sold(Some("2022-04-23T00:00:00")),
            NaiveDate::from_ymd_opt(2022, 4, 23)
        );
        assert_eq!(parse_date_sold(Some("not a valid date")), None);
        assert_eq!(parse_date_sold(Some("2022-4")), None);
        assert_eq!(parse_date_sold(None), None);
    }

    #[test]
    fn test_parse_street() {
        assert_eq!(
            parse_street(Some("This is a street")).as_deref(),
            Some("This is a street")
        );
        assert_eq!(parse_street(Some("")).as_deref(), Some(""));
        assert_eq!(parse_street(None), None);
    }
}
