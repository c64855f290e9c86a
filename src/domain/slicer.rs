//! Sliding-window slicing of a series into backtest windows.

use chrono::Duration;

use super::series::Series;

/// Contiguous sub-series spanning `window` of calendar time from the record
/// at `offset`. Empty when `offset` is past the end.
pub fn slice_window(series: &Series, offset: usize, window: Duration) -> Series {
    let records = match series.records.get(offset) {
        Some(first) => {
            let end = first.time + window;
            series.records[offset..]
                .iter()
                .take_while(|r| r.time <= end)
                .cloned()
                .collect()
        }
        None => Vec::new(),
    };
    series.with_records(records)
}

/// Lazy sequence of all backtest windows of `window` length, starting at
/// every `step`-th record. Ends with the first window that reaches the
/// series' last record; no partial trailing windows follow it.
pub fn sequential_slices(series: &Series, window: Duration, step: usize) -> SequentialSlices<'_> {
    SequentialSlices {
        series,
        window,
        step: step.max(1),
        offset: 0,
        done: series.is_empty(),
    }
}

pub struct SequentialSlices<'a> {
    series: &'a Series,
    window: Duration,
    step: usize,
    offset: usize,
    done: bool,
}

impl Iterator for SequentialSlices<'_> {
    type Item = Series;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.offset >= self.series.len() {
            return None;
        }
        let slice = slice_window(self.series, self.offset, self.window);
        if slice.last_time() == self.series.last_time() {
            self.done = true;
        }
        self.offset += self.step;
        Some(slice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::record::Record;
    use crate::domain::resolution::Resolution;
    use chrono::NaiveDate;

    fn daily_series(days: u32) -> Series {
        let mut series = Series::new("BATS:SPY", Resolution::Day, "USD", "tradingview");
        series.records = (0..days)
            .map(|d| {
                Record::new(
                    NaiveDate::from_ymd_opt(2002, 9, 1).unwrap().and_hms_opt(0, 0, 0).unwrap()
                        + Duration::days(d as i64),
                )
            })
            .collect();
        series
    }

    #[test]
    fn window_spans_calendar_time() {
        let series = daily_series(10);
        let slice = slice_window(&series, 0, Duration::days(3));
        // Start day plus three calendar days, inclusive.
        assert_eq!(slice.len(), 4);
        assert_eq!(slice.first_time(), series.first_time());
    }

    #[test]
    fn window_past_end_is_empty() {
        let series = daily_series(3);
        assert!(slice_window(&series, 5, Duration::days(3)).is_empty());
    }

    #[test]
    fn window_keeps_metadata() {
        let series = daily_series(5);
        let slice = slice_window(&series, 1, Duration::days(2));
        assert_eq!(slice.ticker, series.ticker);
        assert_eq!(slice.resolution, series.resolution);
    }

    #[test]
    fn slices_step_through_offsets() {
        let series = daily_series(10);
        let slices: Vec<_> = sequential_slices(&series, Duration::days(2), 3).collect();
        // Offsets 0, 3, 6, 9; only the offset-9 window reaches the end.
        assert_eq!(slices.len(), 4);
        assert_eq!(slices[0].first_time(), series.first_time());
        assert_eq!(slices[0].len(), 3);
        assert_eq!(slices[1].first_time(), Some(series.records[3].time));
        assert_eq!(slices[3].last_time(), series.last_time());
        assert_eq!(slices[3].len(), 1);
    }

    #[test]
    fn stops_at_slice_reaching_last_record() {
        let series = daily_series(10);
        let slices: Vec<_> = sequential_slices(&series, Duration::days(30), 1).collect();
        // The very first window already spans the whole series.
        assert_eq!(slices.len(), 1);
        assert_eq!(slices[0].len(), 10);
    }

    #[test]
    fn restartable() {
        let series = daily_series(10);
        let first: Vec<_> = sequential_slices(&series, Duration::days(2), 3).collect();
        let second: Vec<_> = sequential_slices(&series, Duration::days(2), 3).collect();
        assert_eq!(first.len(), second.len());
    }

    #[test]
    fn empty_series_yields_nothing() {
        let series = daily_series(0);
        assert_eq!(sequential_slices(&series, Duration::days(2), 1).count(), 0);
    }
}
