//! One time-stamped observation with sparse optional fields.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;

use super::error::BarkeepError;

/// Optional fields a record may carry. `time` is implicit and always present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    Open,
    High,
    Low,
    Close,
    Volume,
    Dividend,
    Split,
    Earnings,
    EarningsPeriod,
    EarningsEstimate,
}

impl Field {
    pub const ALL: [Field; 10] = [
        Field::Open,
        Field::High,
        Field::Low,
        Field::Close,
        Field::Volume,
        Field::Dividend,
        Field::Split,
        Field::Earnings,
        Field::EarningsPeriod,
        Field::EarningsEstimate,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Field::Open => "open",
            Field::High => "high",
            Field::Low => "low",
            Field::Close => "close",
            Field::Volume => "volume",
            Field::Dividend => "dividend",
            Field::Split => "split",
            Field::Earnings => "earnings",
            Field::EarningsPeriod => "earnings-period",
            Field::EarningsEstimate => "earnings-estimate",
        }
    }

    pub fn from_name(name: &str) -> Option<Field> {
        Field::ALL.iter().copied().find(|f| f.name() == name)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Share split ratio, e.g. `5/7`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Split {
    pub numerator: u32,
    pub denominator: u32,
}

impl fmt::Display for Split {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.numerator, self.denominator)
    }
}

impl FromStr for Split {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (n, d) = s.split_once('/').ok_or(())?;
        let numerator = n.parse().map_err(|_| ())?;
        let denominator = d.parse().map_err(|_| ())?;
        if numerator == 0 || denominator == 0 {
            return Err(());
        }
        Ok(Split {
            numerator,
            denominator,
        })
    }
}

/// One observation. A `None` field is known-absent, not unknown: once a
/// record is normalized, every field of its series' field set is explicit.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub time: NaiveDateTime,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    pub volume: Option<i64>,
    pub dividend: Option<f64>,
    pub split: Option<Split>,
    pub earnings: Option<f64>,
    pub earnings_period: Option<NaiveDateTime>,
    pub earnings_estimate: Option<f64>,
}

impl Record {
    /// A record with all fields absent.
    pub fn new(time: NaiveDateTime) -> Self {
        Record {
            time,
            open: None,
            high: None,
            low: None,
            close: None,
            volume: None,
            dividend: None,
            split: None,
            earnings: None,
            earnings_period: None,
            earnings_estimate: None,
        }
    }

    /// Whether the record carries a value for `field`.
    pub fn has(&self, field: Field) -> bool {
        match field {
            Field::Open => self.open.is_some(),
            Field::High => self.high.is_some(),
            Field::Low => self.low.is_some(),
            Field::Close => self.close.is_some(),
            Field::Volume => self.volume.is_some(),
            Field::Dividend => self.dividend.is_some(),
            Field::Split => self.split.is_some(),
            Field::Earnings => self.earnings.is_some(),
            Field::EarningsPeriod => self.earnings_period.is_some(),
            Field::EarningsEstimate => self.earnings_estimate.is_some(),
        }
    }

    /// Combine this record with `incoming` describing the same bucket.
    ///
    /// Every field the incoming record carries wins; fields it does not
    /// carry are preserved from `self`. `time` is taken from `incoming`.
    pub fn overlaid(&self, incoming: &Record) -> Record {
        Record {
            time: incoming.time,
            open: incoming.open.or(self.open),
            high: incoming.high.or(self.high),
            low: incoming.low.or(self.low),
            close: incoming.close.or(self.close),
            volume: incoming.volume.or(self.volume),
            dividend: incoming.dividend.or(self.dividend),
            split: incoming.split.or(self.split),
            earnings: incoming.earnings.or(self.earnings),
            earnings_period: incoming.earnings_period.or(self.earnings_period),
            earnings_estimate: incoming.earnings_estimate.or(self.earnings_estimate),
        }
    }
}

/// Malformed-input error for a field value, for loader and store use.
pub fn malformed(context: &str, field: &str, value: &str) -> BarkeepError {
    BarkeepError::Malformed {
        context: context.to_string(),
        field: field.to_string(),
        value: value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn time(d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2002, 9, d)
            .unwrap()
            .and_hms_opt(13, 30, 0)
            .unwrap()
    }

    fn ohlc_record(d: u32, open: f64) -> Record {
        Record {
            open: Some(open),
            high: Some(open + 0.1),
            low: Some(open - 0.1),
            close: Some(open + 0.05),
            ..Record::new(time(d))
        }
    }

    #[test]
    fn field_names_round_trip() {
        for field in Field::ALL {
            assert_eq!(Field::from_name(field.name()), Some(field));
        }
        assert_eq!(Field::from_name("bogus"), None);
    }

    #[test]
    fn split_parse_and_display() {
        let split: Split = "5/7".parse().unwrap();
        assert_eq!(split.numerator, 5);
        assert_eq!(split.denominator, 7);
        assert_eq!(split.to_string(), "5/7");

        assert!("5".parse::<Split>().is_err());
        assert!("0/7".parse::<Split>().is_err());
        assert!("5/0".parse::<Split>().is_err());
        assert!("a/b".parse::<Split>().is_err());
    }

    #[test]
    fn overlay_incoming_wins() {
        let existing = ohlc_record(16, 5.0);
        let incoming = ohlc_record(16, 6.0);

        let merged = existing.overlaid(&incoming);
        assert_eq!(merged.open, Some(6.0));
        assert_eq!(merged.close, Some(6.05));
    }

    #[test]
    fn overlay_preserves_existing_annotations() {
        let existing = Record {
            dividend: Some(4.0),
            earnings: Some(4.38),
            ..ohlc_record(16, 5.0)
        };
        // OHLC-only re-import: no dividend/earnings carried.
        let incoming = ohlc_record(16, 6.0);

        let merged = existing.overlaid(&incoming);
        assert_eq!(merged.open, Some(6.0));
        assert_eq!(merged.dividend, Some(4.0));
        assert_eq!(merged.earnings, Some(4.38));
    }

    #[test]
    fn overlay_takes_incoming_time() {
        let existing = ohlc_record(16, 5.0);
        let incoming = Record {
            time: NaiveDate::from_ymd_opt(2002, 9, 16)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
            ..ohlc_record(16, 6.0)
        };

        let merged = existing.overlaid(&incoming);
        assert_eq!(merged.time, incoming.time);
    }

    #[test]
    fn has_reports_presence() {
        let rec = Record {
            split: Some(Split {
                numerator: 5,
                denominator: 7,
            }),
            ..ohlc_record(16, 5.0)
        };
        assert!(rec.has(Field::Open));
        assert!(rec.has(Field::Split));
        assert!(!rec.has(Field::Volume));
        assert!(!rec.has(Field::Dividend));
    }
}
