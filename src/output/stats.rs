//! Statistics over a listing table
//!
//! This module computes a small summary of a finished table and prints it
//! to stdout for the `--stats` command.

use crate::listing::PropertyType;
use crate::output::ListingTable;
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// Summary statistics of a listing table
#[derive(Debug, Clone, PartialEq)]
pub struct ListingStatistics {
    /// Total number of rows
    pub total_listings: usize,

    /// Row count per property type
    pub by_property_type: BTreeMap<PropertyType, usize>,

    /// Earliest and latest sold date
    pub date_span: Option<(NaiveDate, NaiveDate)>,

    /// Median final price over rows with a price
    pub median_price_sek: Option<i64>,

    /// Mean of the per-row price per square meter
    pub mean_price_per_m2: Option<f64>,

    /// Number of `None` values per column
    pub null_counts: BTreeMap<&'static str, usize>,
}

impl ListingStatistics {
    /// Computes statistics for `table`
    pub fn from_table(table: &ListingTable) -> Self {
        let mut by_property_type = BTreeMap::new();
        for property_type in &table.property_type {
            *by_property_type.entry(*property_type).or_insert(0) += 1;
        }

        let mut prices: Vec<i64> = table.price_sek.iter().flatten().copied().collect();
        prices.sort_unstable();
        let median_price_sek = median(&prices);

        let per_m2: Vec<f64> = table.rows().filter_map(|r| r.price_per_m2()).collect();
        let mean_price_per_m2 = if per_m2.is_empty() {
            None
        } else {
            Some(per_m2.iter().sum::<f64>() / per_m2.len() as f64)
        };

        let mut null_counts = BTreeMap::new();
        null_counts.insert("price_sek", count_none(&table.price_sek));
        null_counts.insert("rooms", count_none(&table.rooms));
        null_counts.insert("area_m2", count_none(&table.area_m2));
        null_counts.insert("street", count_none(&table.street));
        null_counts.insert("district", count_none(&table.district));
        null_counts.insert("date_sold", count_none(&table.date_sold));

        Self {
            total_listings: table.len(),
            by_property_type,
            date_span: table.date_span(),
            median_price_sek,
            mean_price_per_m2,
            null_counts,
        }
    }
}

fn count_none<T>(column: &[Option<T>]) -> usize {
    column.iter().filter(|v| v.is_none()).count()
}

fn median(sorted: &[i64]) -> Option<i64> {
    if sorted.is_empty() {
        return None;
    }
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2)
    } else {
        Some(sorted[mid])
    }
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &ListingStatistics) {
    println!("=== Listing Statistics ===\n");

    println!("Overview:");
    println!("  Total listings: {}", stats.total_listings);
    match stats.date_span {
        Some((from, to)) => println!("  Sold between: {} and {}", from, to),
        None => println!("  Sold between: -"),
    }
    if let Some(price) = stats.median_price_sek {
        println!("  Median price: {} kr", price);
    }
    if let Some(per_m2) = stats.mean_price_per_m2 {
        println!("  Mean price per m²: {:.0} kr", per_m2);
    }
    println!();

    println!("Listings by Property Type:");
    let mut counts: Vec<_> = stats.by_property_type.iter().collect();
    counts.sort_by(|a, b| b.1.cmp(a.1));
    for (property_type, count) in counts {
        let percentage = if stats.total_listings > 0 {
            (*count as f64 / stats.total_listings as f64) * 100.0
        } else {
            0.0
        };
        println!("  {}: {} ({:.1}%)", property_type, count, percentage);
    }
    println!();

    let missing: Vec<_> = stats.null_counts.iter().filter(|(_, n)| **n > 0).collect();
    if !missing.is_empty() {
        println!("Missing Values:");
        for (column, count) in missing {
            println!("  {}: {}", column, count);
        }
    }
}
