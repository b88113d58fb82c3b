//! Listing model and record extraction
//!
//! This module defines the typed sold-listing record, the field parsers that
//! turn the site's formatted strings into typed values, and the extractor
//! that finds every listing in a page payload.

mod extract;
pub mod fields;

pub use extract::{ExtractError, NextDataExtractor, RecordExtractor};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Category of a sold property
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PropertyType {
    Villa,
    Apartment,
    TownHouse,
    SemiDetachedHouse,
    HolidayCottage,
    Ranch,
    Land,
    Unknown,
}

impl PropertyType {
    /// Every variant, in declaration order
    pub const ALL: [PropertyType; 8] = [
        Self::Villa,
        Self::Apartment,
        Self::TownHouse,
        Self::SemiDetachedHouse,
        Self::HolidayCottage,
        Self::Ranch,
        Self::Land,
        Self::Unknown,
    ];

    /// Maps the site's Swedish object type label to a category
    ///
    /// Unrecognized labels map to `Unknown`.
    pub fn from_label(label: &str) -> Self {
        match label.trim() {
            "Villa" | "Hus" => Self::Villa,
            "Lägenhet" => Self::Apartment,
            "Radhus" | "Kedjehus" => Self::TownHouse,
            "Parhus" => Self::SemiDetachedHouse,
            "Fritidshus" => Self::HolidayCottage,
            "Gård" => Self::Ranch,
            "Tomt/Mark" => Self::Land,
            _ => Self::Unknown,
        }
    }

    /// Converts the property type to its cache string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Villa => "villa",
            Self::Apartment => "apartment",
            Self::TownHouse => "town_house",
            Self::SemiDetachedHouse => "semi_detached_house",
            Self::HolidayCottage => "holiday_cottage",
            Self::Ranch => "ranch",
            Self::Land => "land",
            Self::Unknown => "unknown",
        }
    }

    /// Parses a property type from its cache string representation
    pub fn from_db_string(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.to_db_string() == s)
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Villa => "Villa",
            Self::Apartment => "Apartment",
            Self::TownHouse => "Town house",
            Self::SemiDetachedHouse => "Semi-detached house",
            Self::HolidayCottage => "Holiday cottage",
            Self::Ranch => "Ranch",
            Self::Land => "Land",
            Self::Unknown => "Unknown",
        };
        write!(f, "{}", name)
    }
}

/// One sold listing
///
/// Everything except the canonical URL is optional: the site omits data
/// inconsistently and a field that cannot be parsed is stored as `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingRecord {
    /// Final price in SEK
    pub price_sek: Option<i64>,

    pub property_type: PropertyType,

    /// Number of rooms (half rooms are truncated)
    pub rooms: Option<i32>,

    /// Living area in square meters
    pub area_m2: Option<f64>,

    pub street: Option<String>,

    pub district: Option<String>,

    pub date_sold: Option<NaiveDate>,

    /// Canonical absolute URL of the listing; identifies the record
    pub url: String,
}

impl ListingRecord {
    /// Price per square meter, when both price and area are known
    pub fn price_per_m2(&self) -> Option<f64> {
        match (self.price_sek, self.area_m2) {
            (Some(price), Some(area)) if area > 0.0 => Some(price as f64 / area),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_property_type_from_label() {
        assert_eq!(PropertyType::from_label("Radhus"), PropertyType::TownHouse);
        assert_eq!(PropertyType::from_label("Kedjehus"), PropertyType::TownHouse);
        assert_eq!(PropertyType::from_label("Lägenhet"), PropertyType::Apartment);
        assert_eq!(PropertyType::from_label("Hus"), PropertyType::Villa);
        assert_eq!(PropertyType::from_label("Tomt/Mark"), PropertyType::Land);
        assert_eq!(PropertyType::from_label("not valid"), PropertyType::Unknown);
    }

    #[test]
    fn test_property_type_db_roundtrip() {
        for property_type in PropertyType::ALL {
            let db_str = property_type.to_db_string();
            assert_eq!(PropertyType::from_db_string(db_str), Some(property_type));
        }
        assert_eq!(PropertyType::from_db_string("castle"), None);
    }

    #[test]
    fn test_price_per_m2() {
        let mut record = ListingRecord {
            price_sek: Some(3_000_000),
            property_type: PropertyType::Apartment,
            rooms: Some(2),
            area_m2: Some(60.0),
            street: None,
            district: None,
            date_sold: None,
            url: "https://www.booli.se/bostad/1".to_string(),
        };
        assert_eq!(record.price_per_m2(), Some(50_000.0));

        record.area_m2 = Some(0.0);
        assert_eq!(record.price_per_m2(), None);

        record.area_m2 = None;
        assert_eq!(record.price_per_m2(), None);
    }
}
