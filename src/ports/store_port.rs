//! Repository store port: persisted series keyed by (ticker, resolution).

use crate::domain::error::BarkeepError;
use crate::domain::resolution::Resolution;
use crate::domain::series::Series;

/// One row of the repository index. `(ticker, resolution)` is unique across
/// the repository; the metadata here is fixed at first import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    pub ticker: String,
    pub resolution: Resolution,
    pub currency: String,
    pub source: String,
    pub filename: String,
}

/// Outcome of an index lookup. More than one match means the uniqueness
/// invariant was violated outside this system; it is surfaced, never
/// repaired by picking an entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexLookup<'a> {
    Found(&'a IndexEntry),
    NotFound,
    Corrupt { matches: usize },
}

pub trait StorePort {
    /// Persist `series`, merging into any stored series for the same
    /// `(ticker, resolution)`. The existing index entry is left untouched
    /// by a merge.
    fn add_series(&mut self, series: Series) -> Result<(), BarkeepError>;

    /// Exact-match load.
    fn get_series(&self, ticker: &str, resolution: Resolution) -> Result<Series, BarkeepError>;

    /// All index entries, sorted by ticker.
    fn list_series(&self) -> Vec<IndexEntry>;
}
