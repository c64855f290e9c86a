//! Text ⇄ typed field conversion for CSV round-tripping.
//!
//! Timestamps serialize as integer epoch seconds, numerics as their
//! shortest round-tripping decimal form with blank for absent, splits as
//! `numerator/denominator`.

use chrono::{DateTime, NaiveDateTime};

use crate::domain::error::BarkeepError;
use crate::domain::record::{malformed, Field, Record};

/// Parse an optional float. Blank and `nan` mean absent; with
/// `allow_zero` false a parsed `0` is normalized to absent as well.
pub fn parse_float(text: &str, allow_zero: bool) -> Result<Option<f64>, ()> {
    if text.is_empty() || text.eq_ignore_ascii_case("nan") {
        return Ok(None);
    }
    let value: f64 = text.parse().map_err(|_| ())?;
    if value == 0.0 && !allow_zero {
        return Ok(None);
    }
    Ok(Some(value))
}

pub fn epoch_to_time(secs: i64) -> Option<NaiveDateTime> {
    DateTime::from_timestamp(secs, 0).map(|dt| dt.naive_utc())
}

pub fn time_to_epoch(time: NaiveDateTime) -> i64 {
    time.and_utc().timestamp()
}

/// Parse an epoch-seconds timestamp column.
pub fn parse_time(text: &str, context: &str) -> Result<NaiveDateTime, BarkeepError> {
    text.parse::<i64>()
        .ok()
        .and_then(epoch_to_time)
        .ok_or_else(|| malformed(context, "time", text))
}

fn float_text(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Serialize one field of a record for a repository data file.
pub fn field_to_text(record: &Record, field: Field) -> String {
    match field {
        Field::Open => float_text(record.open),
        Field::High => float_text(record.high),
        Field::Low => float_text(record.low),
        Field::Close => float_text(record.close),
        Field::Volume => record.volume.map(|v| v.to_string()).unwrap_or_default(),
        Field::Dividend => float_text(record.dividend),
        Field::Split => record.split.map(|s| s.to_string()).unwrap_or_default(),
        Field::Earnings => float_text(record.earnings),
        Field::EarningsPeriod => record
            .earnings_period
            .map(|t| time_to_epoch(t).to_string())
            .unwrap_or_default(),
        Field::EarningsEstimate => float_text(record.earnings_estimate),
    }
}

/// Parse one field of a repository data file row into `record`.
pub fn text_to_field(
    record: &mut Record,
    field: Field,
    text: &str,
    context: &str,
) -> Result<(), BarkeepError> {
    let err = || malformed(context, field.name(), text);
    match field {
        Field::Open => record.open = parse_float(text, true).map_err(|_| err())?,
        Field::High => record.high = parse_float(text, true).map_err(|_| err())?,
        Field::Low => record.low = parse_float(text, true).map_err(|_| err())?,
        Field::Close => record.close = parse_float(text, true).map_err(|_| err())?,
        Field::Volume => {
            record.volume = if text.is_empty() {
                None
            } else {
                Some(text.parse().map_err(|_| err())?)
            }
        }
        Field::Dividend => record.dividend = parse_float(text, true).map_err(|_| err())?,
        Field::Split => {
            record.split = if text.is_empty() {
                None
            } else {
                Some(text.parse().map_err(|_| err())?)
            }
        }
        Field::Earnings => record.earnings = parse_float(text, true).map_err(|_| err())?,
        Field::EarningsPeriod => {
            record.earnings_period = if text.is_empty() {
                None
            } else {
                Some(parse_time(text, context)?)
            }
        }
        Field::EarningsEstimate => {
            record.earnings_estimate = parse_float(text, true).map_err(|_| err())?
        }
    }
    Ok(())
}
