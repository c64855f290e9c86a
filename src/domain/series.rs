//! Multi-field time series of one security, and the merge engine.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDateTime;

use super::error::BarkeepError;
use super::record::{Field, Record};
use super::resolution::Resolution;

/// Ordered sequence of [`Record`]s plus identity metadata.
///
/// Invariant: `records` is strictly increasing in `time` and every record's
/// present fields are a subset of `fields`. Loaders and [`Series::merge`]
/// uphold this; `records` is public for read access and slicing.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub ticker: String,
    pub resolution: Resolution,
    pub currency: String,
    pub source: String,
    pub fields: BTreeSet<Field>,
    pub records: Vec<Record>,
}

impl Series {
    pub fn new(
        ticker: impl Into<String>,
        resolution: Resolution,
        currency: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        Series {
            ticker: ticker.into(),
            resolution,
            currency: currency.into(),
            source: source.into(),
            fields: BTreeSet::new(),
            records: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn first_time(&self) -> Option<NaiveDateTime> {
        self.records.first().map(|r| r.time)
    }

    pub fn last_time(&self) -> Option<NaiveDateTime> {
        self.records.last().map(|r| r.time)
    }

    /// A copy of this series carrying `records` in place of the originals.
    pub fn with_records(&self, records: Vec<Record>) -> Series {
        Series {
            ticker: self.ticker.clone(),
            resolution: self.resolution,
            currency: self.currency.clone(),
            source: self.source.clone(),
            fields: self.fields.clone(),
            records,
        }
    }

    /// Bucket records by rounded timestamp. Within one input, a later record
    /// in the same bucket replaces an earlier one.
    fn bucketed(&self) -> BTreeMap<NaiveDateTime, &Record> {
        self.records
            .iter()
            .map(|r| (self.resolution.round_down(r.time), r))
            .collect()
    }

    /// Merge `incoming` into this series, producing a new canonical series.
    ///
    /// Both series must describe the same security: equal `resolution` and
    /// `currency` are checked, equal `ticker` is a caller precondition.
    /// Records are matched by rounded timestamp; where both inputs cover a
    /// bucket, the incoming record's fields win field-by-field and fields it
    /// does not carry are preserved. Buckets covered by neither input are
    /// skipped, not gap-filled.
    pub fn merge(&self, incoming: &Series) -> Result<Series, BarkeepError> {
        if self.resolution != incoming.resolution {
            return Err(BarkeepError::ResolutionMismatch {
                existing: self.resolution.to_string(),
                incoming: incoming.resolution.to_string(),
            });
        }
        if self.currency != incoming.currency {
            return Err(BarkeepError::CurrencyMismatch {
                existing: self.currency.clone(),
                incoming: incoming.currency.clone(),
            });
        }

        let existing_by_bucket = self.bucketed();
        let incoming_by_bucket = incoming.bucketed();

        let resolution = self.resolution;
        let start = [self.first_time(), incoming.first_time()]
            .into_iter()
            .flatten()
            .min()
            .map(|t| resolution.round_down(t));
        let end = [self.last_time(), incoming.last_time()]
            .into_iter()
            .flatten()
            .max()
            .map(|t| resolution.round_up(t));

        let mut records = Vec::new();
        if let (Some(start), Some(end)) = (start, end) {
            let mut bucket = start;
            while bucket <= end {
                match (
                    existing_by_bucket.get(&bucket),
                    incoming_by_bucket.get(&bucket),
                ) {
                    (Some(a), Some(b)) => records.push(a.overlaid(b)),
                    (Some(a), None) => records.push((*a).clone()),
                    (None, Some(b)) => records.push((*b).clone()),
                    (None, None) => {}
                }
                bucket += resolution.step();
            }
        }

        let mut merged = self.with_records(records);
        merged.fields = self.fields.union(&incoming.fields).copied().collect();
        Ok(merged)
    }
}
