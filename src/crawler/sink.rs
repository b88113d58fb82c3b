//! Thread-safe accumulator of extracted records

use crate::crawler::DateRange;
use crate::listing::ListingRecord;
use crate::output::{ListingTable, TableOrder};
use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Append-only collection of records shared by every worker of a run
#[derive(Debug, Default)]
pub struct ResultSink {
    records: Mutex<Vec<ListingRecord>>,
}

impl ResultSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps records loaded from elsewhere, typically the cache
    pub fn from_records(records: Vec<ListingRecord>) -> Self {
        Self {
            records: Mutex::new(records),
        }
    }

    pub fn append(&self, record: ListingRecord) {
        self.lock().push(record);
    }

    /// Appends a page worth of records under one lock
    pub fn extend(&self, records: Vec<ListingRecord>) {
        self.lock().extend(records);
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Copy of the current contents, in append order
    pub fn snapshot(&self) -> Vec<ListingRecord> {
        self.lock().clone()
    }

    pub fn into_records(self) -> Vec<ListingRecord> {
        self.records
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Absorbs `other`, skipping records whose URL is already present
    ///
    /// Returns the number of records added. Duplicates within `other` are
    /// collapsed too; the first occurrence wins.
    pub fn merge(&self, other: ResultSink) -> usize {
        let incoming = other.into_records();
        let mut records = self.lock();

        let mut seen: HashSet<String> = records.iter().map(|r| r.url.clone()).collect();
        let before = records.len();
        for record in incoming {
            if seen.insert(record.url.clone()) {
                records.push(record);
            }
        }

        records.len() - before
    }

    /// Earliest and latest sold date among the records
    ///
    /// `None` when no record carries a date.
    pub fn date_span(&self) -> Option<DateRange> {
        let records = self.lock();
        let mut dates = records.iter().filter_map(|r| r.date_sold);
        let first = dates.next()?;
        let (from, to) = dates.fold((first, first), |(lo, hi), d| (lo.min(d), hi.max(d)));
        Some(DateRange { from, to })
    }

    /// Finalizes the current contents into a columnar table
    pub fn to_table(&self, order: TableOrder) -> ListingTable {
        ListingTable::from_records(self.snapshot(), order)
    }

    fn lock(&self) -> MutexGuard<'_, Vec<ListingRecord>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
