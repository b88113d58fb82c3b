//! Markdown summary generation
//!
//! This module generates a human-readable markdown report of a listing
//! table: the query, its statistics and the most recent sales.

use crate::crawler::DateRange;
use crate::output::stats::ListingStatistics;
use crate::output::{ListingTable, OutputResult};
use crate::url::City;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Number of rows listed under "Latest Sales"
pub const LATEST_SALES_ROWS: usize = 20;

/// Writes a markdown summary of `table` to `output_path`
///
/// # Arguments
///
/// * `city` - City the table was crawled for
/// * `range` - Sold-date range that was requested, if any
/// * `table` - The listing table, newest first
/// * `output_path` - Path where the markdown file should be written
///
/// # Returns
///
/// * `Ok(())` - Successfully wrote markdown summary
/// * `Err(OutputError)` - Failed to write summary
pub fn generate_markdown_summary(
    city: City,
    range: Option<DateRange>,
    table: &ListingTable,
    output_path: &Path,
) -> OutputResult<()> {
    let markdown = format_markdown_summary(city, range, table);

    let mut file = File::create(output_path)?;
    file.write_all(markdown.as_bytes())?;

    Ok(())
}

/// Formats a listing table summary as markdown
pub fn format_markdown_summary(
    city: City,
    range: Option<DateRange>,
    table: &ListingTable,
) -> String {
    let stats = ListingStatistics::from_table(table);
    let mut md = String::new();

    md.push_str(&format!("# Sold Listings: {}\n\n", city.display_name()));

    md.push_str("## Query\n\n");
    md.push_str(&format!("- **City**: {} (area {})\n", city.display_name(), city.area_id()));
    match range {
        Some(range) => {
            md.push_str(&format!("- **Sold Dates**: {} to {}\n\n", range.from, range.to))
        }
        None => md.push_str("- **Sold Dates**: all\n\n"),
    }

    md.push_str("## Statistics\n\n");
    md.push_str(&format!("- **Listings**: {}\n", stats.total_listings));
    if let Some((from, to)) = stats.date_span {
        md.push_str(&format!("- **Date Span**: {} to {}\n", from, to));
    }
    if let Some(price) = stats.median_price_sek {
        md.push_str(&format!("- **Median Price**: {} kr\n", price));
    }
    if let Some(per_m2) = stats.mean_price_per_m2 {
        md.push_str(&format!("- **Mean Price per m²**: {:.0} kr\n", per_m2));
    }
    md.push('\n');

    if !stats.by_property_type.is_empty() {
        md.push_str("## Property Types\n\n");
        md.push_str("| Type | Count |\n");
        md.push_str("|------|-------|\n");
        for (property_type, count) in &stats.by_property_type {
            md.push_str(&format!("| {} | {} |\n", property_type, count));
        }
        md.push('\n');
    }

    if !table.is_empty() {
        md.push_str("## Latest Sales\n\n");
        md.push_str("| Date | Price | Type | Rooms | m² | Street | District |\n");
        md.push_str("|------|-------|------|-------|----|--------|----------|\n");
        for row in table.rows().take(LATEST_SALES_ROWS) {
            md.push_str(&format!(
                "| {} | {} | {} | {} | {} | [{}]({}) | {} |\n",
                cell(row.date_sold),
                cell(row.price_sek),
                row.property_type,
                cell(row.rooms),
                cell(row.area_m2),
                row.street.as_deref().unwrap_or("-"),
                row.url,
                row.district.as_deref().unwrap_or("-"),
            ));
        }
        md.push('\n');
    }

    md
}

fn cell<T: std::fmt::Display>(value: Option<T>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}
