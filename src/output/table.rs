//! Columnar listing table
//!
//! The final product of a crawl: one column per record field, all columns of
//! equal length.

use crate::crawler::DateRange;
use crate::listing::{ListingRecord, PropertyType};
use chrono::NaiveDate;
use std::cmp::Ordering;

/// Column names, in table order
pub const COLUMN_NAMES: [&str; 8] = [
    "price_sek",
    "property_type",
    "rooms",
    "area_m2",
    "street",
    "district",
    "date_sold",
    "url",
];

/// Row order of a finalized table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TableOrder {
    /// Records in the order they were appended
    Appended,
    /// Newest sales first, undated rows last
    #[default]
    DateSoldDescending,
}

/// Sold listings stored column by column
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListingTable {
    pub price_sek: Vec<Option<i64>>,
    pub property_type: Vec<PropertyType>,
    pub rooms: Vec<Option<i32>>,
    pub area_m2: Vec<Option<f64>>,
    pub street: Vec<Option<String>>,
    pub district: Vec<Option<String>>,
    pub date_sold: Vec<Option<NaiveDate>>,
    pub url: Vec<String>,
}

impl ListingTable {
    /// Builds a table from records, ordered as requested
    ///
    /// The descending sort is stable, so rows sold on the same day keep
    /// their append order.
    pub fn from_records(mut records: Vec<ListingRecord>, order: TableOrder) -> Self {
        if order == TableOrder::DateSoldDescending {
            records.sort_by(|a, b| newest_first(a.date_sold, b.date_sold));
        }

        let mut table = Self::with_capacity(records.len());
        for record in records {
            table.push(record);
        }
        table
    }

    fn with_capacity(n: usize) -> Self {
        Self {
            price_sek: Vec::with_capacity(n),
            property_type: Vec::with_capacity(n),
            rooms: Vec::with_capacity(n),
            area_m2: Vec::with_capacity(n),
            street: Vec::with_capacity(n),
            district: Vec::with_capacity(n),
            date_sold: Vec::with_capacity(n),
            url: Vec::with_capacity(n),
        }
    }

    fn push(&mut self, record: ListingRecord) {
        self.price_sek.push(record.price_sek);
        self.property_type.push(record.property_type);
        self.rooms.push(record.rooms);
        self.area_m2.push(record.area_m2);
        self.street.push(record.street);
        self.district.push(record.district);
        self.date_sold.push(record.date_sold);
        self.url.push(record.url);
    }

    /// Column names, in table order
    pub fn column_names(&self) -> &'static [&'static str] {
        &COLUMN_NAMES
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.url.len()
    }

    pub fn is_empty(&self) -> bool {
        self.url.is_empty()
    }

    /// Reassembles row `i` as a record
    pub fn row(&self, i: usize) -> Option<ListingRecord> {
        if i >= self.len() {
            return None;
        }

        Some(ListingRecord {
            price_sek: self.price_sek[i],
            property_type: self.property_type[i],
            rooms: self.rooms[i],
            area_m2: self.area_m2[i],
            street: self.street[i].clone(),
            district: self.district[i].clone(),
            date_sold: self.date_sold[i],
            url: self.url[i].clone(),
        })
    }

    /// Iterates over the rows as records
    pub fn rows(&self) -> impl Iterator<Item = ListingRecord> + '_ {
        (0..self.len()).filter_map(move |i| self.row(i))
    }

    /// Keeps only rows sold within `range`; undated rows are dropped
    pub fn filter_range(&self, range: DateRange) -> Self {
        let mut table = Self::default();
        for row in self.rows() {
            if row.date_sold.is_some_and(|d| range.contains(d)) {
                table.push(row);
            }
        }
        table
    }

    /// Earliest and latest sold date in the table
    pub fn date_span(&self) -> Option<(NaiveDate, NaiveDate)> {
        let mut dates = self.date_sold.iter().flatten();
        let first = *dates.next()?;
        Some(dates.fold((first, first), |(lo, hi), &d| (lo.min(d), hi.max(d))))
    }
}

fn newest_first(a: Option<NaiveDate>, b: Option<NaiveDate>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => b.cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(url: &str, date: Option<&str>) -> ListingRecord {
        ListingRecord {
            price_sek: Some(1_000_000),
            property_type: PropertyType::Apartment,
            rooms: Some(2),
            area_m2: Some(50.0),
            street: Some("Storgatan 1".to_string()),
            district: None,
            date_sold: date.map(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").unwrap()),
            url: url.to_string(),
        }
    }

    #[test]
    fn test_columns() {
        let table = ListingTable::from_records(vec![record("a", None)], TableOrder::Appended);

        assert_eq!(table.column_names().len(), 8);
        assert_eq!(table.column_names()[0], "price_sek");
        assert_eq!(table.column_names()[7], "url");
        assert_eq!(table.len(), 1);
        assert_eq!(table.row(0), Some(record("a", None)));
        assert_eq!(table.row(1), None);
    }

    #[test]
    fn test_descending_order_puts_undated_last() {
        let records = vec![
            record("a", Some("2023-01-05")),
            record("b", None),
            record("c", Some("2023-03-01")),
            record("d", Some("2023-01-05")),
        ];

        let table = ListingTable::from_records(records.clone(), TableOrder::DateSoldDescending);
        assert_eq!(table.url, vec!["c", "a", "d", "b"]);

        let table = ListingTable::from_records(records, TableOrder::Appended);
        assert_eq!(table.url, vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_filter_range_is_inclusive_and_drops_undated() {
        let table = ListingTable::from_records(
            vec![
                record("a", Some("2023-06-19")),
                record("b", Some("2023-06-20")),
                record("c", Some("2023-06-25")),
                record("d", Some("2023-06-27")),
                record("e", Some("2023-06-28")),
                record("f", None),
            ],
            TableOrder::Appended,
        );
        let range = DateRange::new(
            NaiveDate::from_ymd_opt(2023, 6, 20).unwrap(),
            NaiveDate::from_ymd_opt(2023, 6, 27).unwrap(),
        )
        .unwrap();

        let filtered = table.filter_range(range);
        assert_eq!(filtered.url, vec!["b", "c", "d"]);
    }

    #[test]
    fn test_date_span() {
        let table = ListingTable::from_records(
            vec![
                record("a", Some("2023-06-21")),
                record("b", None),
                record("c", Some("2023-06-19")),
            ],
            TableOrder::Appended,
        );
        assert_eq!(
            table.date_span(),
            Some((
                NaiveDate::from_ymd_opt(2023, 6, 19).unwrap(),
                NaiveDate::from_ymd_opt(2023, 6, 21).unwrap()
            ))
        );
        assert_eq!(ListingTable::default().date_span(), None);
    }
}
