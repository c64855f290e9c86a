//! Order matching against daily bars with cash and share bookkeeping.

use super::error::BarkeepError;
use super::record::{Field, Record};
use super::series::Series;
use super::strategy::Strategy;

/// One pending order: positive quantity buys, negative sells. A `None`
/// limit executes at the day's open.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Order {
    pub quantity: f64,
    pub limit: Option<f64>,
}

impl Order {
    pub fn at_open(quantity: f64) -> Self {
        Order {
            quantity,
            limit: None,
        }
    }

    pub fn limit(quantity: f64, price: f64) -> Self {
        Order {
            quantity,
            limit: Some(price),
        }
    }
}

/// Cash, share count, and pending orders of one backtest run.
#[derive(Debug, Clone, PartialEq)]
pub struct Portfolio {
    pub cash: f64,
    pub shares: f64,
    pub orders: Vec<Order>,
}

impl Portfolio {
    pub fn new(cash: f64) -> Self {
        Portfolio {
            cash,
            shares: 0.0,
            orders: Vec::new(),
        }
    }
}

/// Outcome of one backtest run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunResult {
    pub state: Portfolio,
    /// All cash ever contributed: starting capital plus monthly injections.
    pub total_in: f64,
    /// Liquidation value at the last bar's close.
    pub total_out: f64,
}

impl RunResult {
    /// Relative gain of the run, `total_out / total_in - 1`.
    pub fn gain(&self) -> f64 {
        self.total_out / self.total_in - 1.0
    }
}

fn required(record: &Record, field: Field) -> Result<f64, BarkeepError> {
    let value = match field {
        Field::Open => record.open,
        Field::High => record.high,
        Field::Low => record.low,
        Field::Close => record.close,
        _ => None,
    };
    value.ok_or_else(|| BarkeepError::Malformed {
        context: format!("bar at {}", record.time),
        field: field.name().to_string(),
        value: String::new(),
    })
}

/// Match pending orders against one day's bar.
///
/// Solvency is checked before matching: selling more shares than held or
/// buying beyond available cash at the execution price is fatal: it
/// signals a strategy bug, never a condition to clamp. A buy fills when its
/// price is reachable from above (`price >= low`), a sell when reachable
/// from below (`price <= high`). Unfilled orders carry to the next day.
pub fn process_orders(state: &mut Portfolio, day: &Record) -> Result<(), BarkeepError> {
    let open = required(day, Field::Open)?;
    let high = required(day, Field::High)?;
    let low = required(day, Field::Low)?;

    let mut remaining = Vec::new();

    for order in std::mem::take(&mut state.orders) {
        let price = order.limit.unwrap_or(open);

        if order.quantity < -state.shares {
            return Err(BarkeepError::OversoldShares {
                requested: -order.quantity,
                held: state.shares,
            });
        }
        if order.quantity > state.cash / price {
            return Err(BarkeepError::OverspentCash {
                quantity: order.quantity,
                price,
                cash: state.cash,
            });
        }

        let fills = (order.quantity > 0.0 && price >= low)
            || (order.quantity < 0.0 && price <= high);

        if fills {
            state.shares += order.quantity;
            state.cash -= order.quantity * price;
        } else {
            remaining.push(order);
        }
    }

    state.orders = remaining;
    Ok(())
}

/// Replay `strategy` over `series` one bar at a time.
///
/// Per day: inject `monthly_cash` on the first calendar day of a month,
/// let the strategy rewrite the pending orders from the day's open, match
/// orders, then credit any dividend per share held after the day's trades.
pub fn run_strategy(
    strategy: &mut dyn Strategy,
    series: &Series,
    starting_cash: f64,
    monthly_cash: f64,
) -> Result<RunResult, BarkeepError> {
    use chrono::Datelike;

    if series.is_empty() {
        return Err(BarkeepError::EmptySeries);
    }

    let mut state = Portfolio::new(starting_cash);
    let mut total_in = starting_cash;

    for day in &series.records {
        if day.time.day() == 1 {
            state.cash += monthly_cash;
            total_in += monthly_cash;
        }

        strategy.decide(&mut state, required(day, Field::Open)?);
        process_orders(&mut state, day)?;

        if let Some(dividend) = day.dividend {
            state.cash += state.shares * dividend;
        }
    }

    let last = series.records.last().ok_or(BarkeepError::EmptySeries)?;
    let total_out = state.shares * required(last, Field::Close)?;

    Ok(RunResult {
        state,
        total_in,
        total_out,
    })
}
