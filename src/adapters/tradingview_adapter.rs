//! Loader for TradingView CSV exports.

use std::collections::BTreeSet;
use std::fs::File;
use std::path::Path;

use log::info;

use crate::adapters::convert;
use crate::domain::error::BarkeepError;
use crate::domain::record::{malformed, Field, Record, Split};
use crate::domain::series::Series;
use crate::ports::loader_port::{LoadOverrides, LoaderPort};

/// TradingView CSV column → canonical field.
const FIELD_MAP: [(&str, Field); 12] = [
    ("open", Field::Open),
    ("high", Field::High),
    ("low", Field::Low),
    ("close", Field::Close),
    ("Volume", Field::Volume),
    ("Earnings period", Field::EarningsPeriod),
    ("Earnings reported", Field::Earnings),
    ("Earnings confirmed", Field::Earnings),
    ("Earnings estimated", Field::EarningsEstimate),
    ("Split numerator", Field::Split),
    ("Split denominator", Field::Split),
    ("Dividends amount", Field::Dividend),
];

fn default_currency(exchange: &str) -> &'static str {
    match exchange {
        "XETR" | "FWB" | "SWB" => "EUR",
        _ => "USD",
    }
}

/// Metadata recovered from a TradingView export file name,
/// e.g. `BATS_SPY, 1D.csv` or `XETR_DLY_ALV, 1W(2).csv`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilenameMeta {
    pub ticker: String,
    pub resolution: String,
    pub currency: String,
}

pub fn parse_filename(path: &Path) -> Result<FilenameMeta, BarkeepError> {
    let err = || BarkeepError::Filename {
        name: path.display().to_string(),
    };

    let stem = path.file_stem().and_then(|s| s.to_str()).ok_or_else(err)?;
    // Browsers add (1), (2), ... to copies of the same download.
    let base = stem.split('(').next().unwrap_or_default();
    let (symbol, resolution) = base.split_once(',').ok_or_else(err)?;

    let mut symbol = symbol.replace(' ', "_");
    // Delayed quotes, but we don't care about that.
    symbol = symbol.replace("_DLY_", "_");
    let (exchange, ticker) = symbol.split_once('_').ok_or_else(err)?;
    if exchange.is_empty() || ticker.is_empty() {
        return Err(err());
    }

    Ok(FilenameMeta {
        ticker: format!("{}:{}", exchange, ticker),
        resolution: resolution.trim().to_lowercase(),
        currency: default_currency(exchange).to_string(),
    })
}

/// Value of the named column in `row`, if the header carries it.
fn col<'r>(headers: &csv::StringRecord, row: &'r csv::StringRecord, name: &str) -> Option<&'r str> {
    headers
        .iter()
        .position(|h| h == name)
        .and_then(|i| row.get(i))
}

pub struct TradingViewLoader;

impl TradingViewLoader {
    fn convert_row(
        headers: &csv::StringRecord,
        row: &csv::StringRecord,
        context: &str,
    ) -> Result<Record, BarkeepError> {
        let get = |name: &str| col(headers, row, name);

        let time_text = get("time").ok_or_else(|| malformed(context, "time", ""))?;
        let time = convert::parse_time(time_text, context)?;
        let mut record = Record::new(time);

        for (column, field) in [
            ("open", Field::Open),
            ("high", Field::High),
            ("low", Field::Low),
            ("close", Field::Close),
        ] {
            if let Some(text) = get(column) {
                let value = convert::parse_float(text, true)
                    .map_err(|_| malformed(context, field.name(), text))?;
                match field {
                    Field::Open => record.open = value,
                    Field::High => record.high = value,
                    Field::Low => record.low = value,
                    Field::Close => record.close = value,
                    _ => unreachable!(),
                }
            }
        }

        if let Some(text) = get("Volume") {
            record.volume = if text.is_empty() || text.eq_ignore_ascii_case("nan") {
                None
            } else {
                Some(
                    text.parse()
                        .map_err(|_| malformed(context, "volume", text))?,
                )
            };
        }

        Self::extract_earnings(headers, row, &mut record, context)?;

        if let Some(text) = get("Dividends amount") {
            // A dividend of 0 means no dividend was paid.
            record.dividend = convert::parse_float(text, false)
                .map_err(|_| malformed(context, "dividend", text))?;
        }

        if let (Some(n), Some(d)) = (get("Split numerator"), get("Split denominator")) {
            record.split = match (n.parse::<u32>(), d.parse::<u32>()) {
                (Ok(n), Ok(d)) if n != 0 && d != 0 => Some(Split {
                    numerator: n,
                    denominator: d,
                }),
                _ => None,
            };
        }

        Ok(record)
    }

    fn extract_earnings(
        headers: &csv::StringRecord,
        row: &csv::StringRecord,
        record: &mut Record,
        context: &str,
    ) -> Result<(), BarkeepError> {
        let get = |name: &str| col(headers, row, name);
        if let Some(text) = get("Earnings period") {
            let period: i64 = text
                .parse()
                .map_err(|_| malformed(context, "earnings-period", text))?;
            if period == 0 {
                // Present but zero means no earnings in this row.
                return Ok(());
            }
            record.earnings_period = convert::epoch_to_time(period);
        }

        // Confirmed figures override reported ones when both are present.
        for column in ["Earnings reported", "Earnings confirmed"] {
            if let Some(text) = get(column) {
                if let Some(value) = convert::parse_float(text, true)
                    .map_err(|_| malformed(context, "earnings", text))?
                {
                    record.earnings = Some(value);
                }
            }
        }

        if let Some(text) = get("Earnings estimated") {
            record.earnings_estimate = convert::parse_float(text, true)
                .map_err(|_| malformed(context, "earnings-estimate", text))?;
        }

        Ok(())
    }
}

impl LoaderPort for TradingViewLoader {
    fn load_series(
        &self,
        path: &Path,
        overrides: &LoadOverrides,
    ) -> Result<Series, BarkeepError> {
        let needs_autodetect = overrides.ticker.is_none()
            || overrides.resolution.is_none()
            || overrides.currency.is_none();
        let meta = if needs_autodetect {
            Some(parse_filename(path)?)
        } else {
            None
        };
        let from_meta = |pick: fn(&FilenameMeta) -> &String| {
            meta.as_ref().map(pick).cloned().unwrap_or_default()
        };

        let ticker = overrides
            .ticker
            .clone()
            .unwrap_or_else(|| from_meta(|m| &m.ticker));
        let resolution = overrides
            .resolution
            .clone()
            .unwrap_or_else(|| from_meta(|m| &m.resolution))
            .parse()?;
        let currency = overrides
            .currency
            .as_deref()
            .map(str::to_uppercase)
            .unwrap_or_else(|| from_meta(|m| &m.currency));

        let mut series = Series::new(ticker, resolution, currency, "tradingview");

        let file = File::open(path)?;
        let mut reader = csv::Reader::from_reader(file);
        let headers = reader.headers()?.clone();

        series.fields = headers
            .iter()
            .flat_map(|h| {
                FIELD_MAP
                    .iter()
                    .filter(move |(name, _)| *name == h)
                    .map(|&(_, field)| field)
            })
            .collect::<BTreeSet<_>>();

        for (i, row) in reader.records().enumerate() {
            let row = row?;
            let context = format!("{} row {}", path.display(), i + 1);
            series
                .records
                .push(Self::convert_row(&headers, &row, &context)?);
        }

        info!(
            "loaded {} records from {} ({} fields: {:?})",
            series.len(),
            path.display(),
            series.resolution,
            series.fields.iter().map(|f| f.name()).collect::<Vec<_>>(),
        );

        Ok(series)
    }
}
