//! Flat-file repository: an `index.csv` side-table plus one CSV data file
//! per stored `(ticker, resolution)`.

use std::fs::{self, File};
use std::path::PathBuf;

use log::info;

use crate::adapters::convert;
use crate::domain::error::BarkeepError;
use crate::domain::record::{malformed, Field, Record};
use crate::domain::resolution::Resolution;
use crate::domain::series::Series;
use crate::ports::store_port::{IndexEntry, IndexLookup, StorePort};

const INDEX_FILE: &str = "index.csv";
const INDEX_HEADER: [&str; 5] = ["ticker", "resolution", "currency", "source", "filename"];

pub struct CsvRepository {
    path: PathBuf,
    index: Vec<IndexEntry>,
}

impl CsvRepository {
    /// Open the repository at `path`, initializing an empty one if the
    /// index does not exist yet.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, BarkeepError> {
        let path = path.into();
        let index_path = path.join(INDEX_FILE);

        if !index_path.exists() {
            fs::create_dir_all(&path)?;
            let repo = CsvRepository {
                path,
                index: Vec::new(),
            };
            repo.save_index()?;
            return Ok(repo);
        }

        let mut index = Vec::new();
        let mut reader = csv::Reader::from_reader(File::open(&index_path)?);
        for row in reader.records() {
            let row = row?;
            let context = index_path.display().to_string();
            let field = |i: usize, name: &str| -> Result<String, BarkeepError> {
                row.get(i)
                    .map(str::to_string)
                    .ok_or_else(|| malformed(&context, name, ""))
            };
            index.push(IndexEntry {
                ticker: field(0, "ticker")?,
                resolution: field(1, "resolution")?.parse()?,
                currency: field(2, "currency")?,
                source: field(3, "source")?,
                filename: field(4, "filename")?,
            });
        }

        Ok(CsvRepository { path, index })
    }

    /// Look up the unique index entry for `(ticker, resolution)`.
    pub fn lookup(&self, ticker: &str, resolution: Resolution) -> IndexLookup<'_> {
        let mut matches = self
            .index
            .iter()
            .filter(|e| e.ticker == ticker && e.resolution == resolution);
        match (matches.next(), matches.count()) {
            (None, _) => IndexLookup::NotFound,
            (Some(entry), 0) => IndexLookup::Found(entry),
            (Some(_), rest) => IndexLookup::Corrupt { matches: rest + 1 },
        }
    }

    fn save_index(&self) -> Result<(), BarkeepError> {
        let mut writer = csv::Writer::from_writer(File::create(self.path.join(INDEX_FILE))?);
        writer.write_record(INDEX_HEADER)?;
        for entry in &self.index {
            writer.write_record([
                entry.ticker.as_str(),
                &entry.resolution.to_string(),
                &entry.currency,
                &entry.source,
                &entry.filename,
            ])?;
        }
        writer.flush()?;
        Ok(())
    }

    fn series_filename(series: &Series) -> String {
        format!(
            "{}_{}.csv",
            series.ticker.replace(':', "_"),
            series.resolution
        )
    }

    fn load_data(&self, entry: &IndexEntry) -> Result<Series, BarkeepError> {
        let data_path = self.path.join(&entry.filename);
        let context = data_path.display().to_string();

        let mut reader = csv::Reader::from_reader(File::open(&data_path)?);
        let headers = reader.headers()?.clone();

        let mut columns = headers.iter();
        if columns.next() != Some("time") {
            return Err(malformed(&context, "header", headers.as_slice()));
        }
        let fields = columns
            .map(|name| {
                Field::from_name(name).ok_or_else(|| malformed(&context, "header", name))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut series = Series::new(
            entry.ticker.clone(),
            entry.resolution,
            entry.currency.clone(),
            entry.source.clone(),
        );
        series.fields = fields.iter().copied().collect();

        for (i, row) in reader.records().enumerate() {
            let row = row?;
            let row_context = format!("{} row {}", context, i + 1);
            let time_text = row.get(0).unwrap_or_default();
            let mut record = Record::new(convert::parse_time(time_text, &row_context)?);
            for (j, &field) in fields.iter().enumerate() {
                let text = row.get(j + 1).unwrap_or_default();
                convert::text_to_field(&mut record, field, text, &row_context)?;
            }
            series.records.push(record);
        }

        Ok(series)
    }

    fn save_data(&self, entry: &IndexEntry, series: &Series) -> Result<(), BarkeepError> {
        let data_path = self.path.join(&entry.filename);
        let mut writer = csv::Writer::from_writer(File::create(&data_path)?);

        let fields: Vec<Field> = series.fields.iter().copied().collect();
        let mut header = vec!["time".to_string()];
        header.extend(fields.iter().map(|f| f.name().to_string()));
        writer.write_record(&header)?;

        for record in &series.records {
            let mut row = vec![convert::time_to_epoch(record.time).to_string()];
            row.extend(fields.iter().map(|&f| convert::field_to_text(record, f)));
            writer.write_record(&row)?;
        }

        writer.flush()?;
        Ok(())
    }
}

impl StorePort for CsvRepository {
    fn add_series(&mut self, series: Series) -> Result<(), BarkeepError> {
        let existing_entry = match self.lookup(&series.ticker, series.resolution) {
            IndexLookup::Found(entry) => Some(entry.clone()),
            IndexLookup::NotFound => None,
            IndexLookup::Corrupt { matches } => {
                return Err(BarkeepError::CorruptIndex {
                    ticker: series.ticker.clone(),
                    resolution: series.resolution.to_string(),
                    matches,
                });
            }
        };

        match existing_entry {
            None => {
                let entry = IndexEntry {
                    ticker: series.ticker.clone(),
                    resolution: series.resolution,
                    currency: series.currency.clone(),
                    source: series.source.clone(),
                    filename: Self::series_filename(&series),
                };
                self.save_data(&entry, &series)?;
                self.index.push(entry);
                self.save_index()?;
                info!(
                    "stored {} new records for {}@{}",
                    series.len(),
                    series.ticker,
                    series.resolution
                );
            }
            Some(entry) => {
                let existing = self.load_data(&entry)?;
                let merged = existing.merge(&series)?;
                self.save_data(&entry, &merged)?;
                info!(
                    "merged {} records into {} existing for {}@{}, now {}",
                    series.len(),
                    existing.len(),
                    series.ticker,
                    series.resolution,
                    merged.len()
                );
            }
        }
        Ok(())
    }

    fn get_series(&self, ticker: &str, resolution: Resolution) -> Result<Series, BarkeepError> {
        match self.lookup(ticker, resolution) {
            IndexLookup::Found(entry) => self.load_data(entry),
            IndexLookup::NotFound => Err(BarkeepError::NotFound {
                ticker: ticker.to_string(),
                resolution: resolution.to_string(),
            }),
            IndexLookup::Corrupt { matches } => Err(BarkeepError::CorruptIndex {
                ticker: ticker.to_string(),
                resolution: resolution.to_string(),
                matches,
            }),
        }
    }

    fn list_series(&self) -> Vec<IndexEntry> {
        let mut entries = self.index.clone();
        entries.sort_by(|a, b| {
            a.ticker
                .cmp(&b.ticker)
                .then_with(|| a.resolution.to_string().cmp(&b.resolution.to_string()))
        });
        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::record::Split;
    use chrono::{Duration, NaiveDate, NaiveDateTime};
    use std::collections::BTreeSet;
    use tempfile::TempDir;

    fn time(d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2002, 9, d)
            .unwrap()
            .and_hms_opt(13, 30, 0)
            .unwrap()
    }

    fn sample_series() -> Series {
        let mut series = Series::new("BATS:SPY", Resolution::Day, "USD", "tradingview");
        series.fields = [
            Field::Open,
            Field::High,
            Field::Low,
            Field::Close,
            Field::Volume,
            Field::Dividend,
            Field::Split,
        ]
        .into_iter()
        .collect::<BTreeSet<_>>();
        for (i, d) in [16u32, 17, 18].into_iter().enumerate() {
            let open = 5.54452519 + i as f64;
            series.records.push(Record {
                open: Some(open),
                high: Some(open + 0.1),
                low: Some(open - 0.2),
                close: Some(open + 0.05),
                volume: Some(4272182 + i as i64),
                dividend: if i == 1 { Some(4.0) } else { None },
                split: if i == 2 {
                    Some(Split {
                        numerator: 5,
                        denominator: 7,
                    })
                } else {
                    None
                },
                ..Record::new(time(d))
            });
        }
        series
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let mut repo = CsvRepository::open(dir.path().join("repo")).unwrap();
        let series = sample_series();
        repo.add_series(series.clone()).unwrap();

        let loaded = repo.get_series("BATS:SPY", Resolution::Day).unwrap();
        assert_eq!(loaded, series);
    }

    #[test]
    fn round_trip_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let repo_path = dir.path().join("repo");
        let series = sample_series();
        {
            let mut repo = CsvRepository::open(&repo_path).unwrap();
            repo.add_series(series.clone()).unwrap();
        }

        let repo = CsvRepository::open(&repo_path).unwrap();
        let loaded = repo.get_series("BATS:SPY", Resolution::Day).unwrap();
        assert_eq!(loaded, series);
    }

    #[test]
    fn get_missing_is_not_found() {
        let dir = TempDir::new().unwrap();
        let repo = CsvRepository::open(dir.path().join("repo")).unwrap();
        let err = repo.get_series("BATS:MISSING", Resolution::Day).unwrap_err();
        assert!(matches!(err, BarkeepError::NotFound { .. }));
    }

    #[test]
    fn add_merges_into_existing() {
        let dir = TempDir::new().unwrap();
        let mut repo = CsvRepository::open(dir.path().join("repo")).unwrap();
        let series = sample_series();
        repo.add_series(series.clone()).unwrap();

        let mut shifted = series.clone();
        for record in &mut shifted.records {
            record.time += Duration::days(14);
        }
        repo.add_series(shifted).unwrap();

        let merged = repo.get_series("BATS:SPY", Resolution::Day).unwrap();
        assert_eq!(merged.len(), 6);
        assert_eq!(merged.records[3].open, series.records[0].open);
        assert_eq!(
            merged.records[3].time - merged.records[0].time,
            Duration::days(14)
        );
    }

    #[test]
    fn merge_does_not_duplicate_index_entries() {
        let dir = TempDir::new().unwrap();
        let mut repo = CsvRepository::open(dir.path().join("repo")).unwrap();
        repo.add_series(sample_series()).unwrap();
        repo.add_series(sample_series()).unwrap();
        assert_eq!(repo.list_series().len(), 1);
    }

    #[test]
    fn corrupt_index_is_fatal() {
        let dir = TempDir::new().unwrap();
        let repo_path = dir.path().join("repo");
        {
            let mut repo = CsvRepository::open(&repo_path).unwrap();
            repo.add_series(sample_series()).unwrap();
        }
        // Duplicate the index row behind the repository's back.
        let index_path = repo_path.join(INDEX_FILE);
        let mut content = fs::read_to_string(&index_path).unwrap();
        let row = content.lines().nth(1).unwrap().to_string();
        content.push_str(&row);
        content.push('\n');
        fs::write(&index_path, content).unwrap();

        let mut repo = CsvRepository::open(&repo_path).unwrap();
        assert!(matches!(
            repo.lookup("BATS:SPY", Resolution::Day),
            IndexLookup::Corrupt { matches: 2 }
        ));
        let err = repo.get_series("BATS:SPY", Resolution::Day).unwrap_err();
        assert!(matches!(err, BarkeepError::CorruptIndex { matches: 2, .. }));
        let err = repo.add_series(sample_series()).unwrap_err();
        assert!(matches!(err, BarkeepError::CorruptIndex { .. }));
    }

    #[test]
    fn list_sorted_by_ticker() {
        let dir = TempDir::new().unwrap();
        let mut repo = CsvRepository::open(dir.path().join("repo")).unwrap();

        let mut alv = sample_series();
        alv.ticker = "FWB:ALV".into();
        alv.currency = "EUR".into();
        let mut zzz = sample_series();
        zzz.ticker = "XETR:DAX".into();

        repo.add_series(zzz).unwrap();
        repo.add_series(alv).unwrap();
        repo.add_series(sample_series()).unwrap();

        let tickers: Vec<_> = repo.list_series().into_iter().map(|e| e.ticker).collect();
        assert_eq!(tickers, vec!["BATS:SPY", "FWB:ALV", "XETR:DAX"]);
    }

    #[test]
    fn distinct_resolutions_are_distinct_entries() {
        let dir = TempDir::new().unwrap();
        let mut repo = CsvRepository::open(dir.path().join("repo")).unwrap();

        let daily = sample_series();
        let mut weekly = sample_series();
        weekly.resolution = Resolution::Week;

        repo.add_series(daily).unwrap();
        repo.add_series(weekly).unwrap();

        assert_eq!(repo.list_series().len(), 2);
        assert!(repo.get_series("BATS:SPY", Resolution::Week).is_ok());
    }
}
