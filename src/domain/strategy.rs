//! Periodic-investment strategies: policy functions over portfolio state.

use super::execution::{Order, Portfolio};

/// Cash left untouched by all-in buys, to keep the solvency check clear of
/// float rounding.
const CASH_RESERVE: f64 = 1.0;

/// A strategy inspects the portfolio and the day's opening price and may
/// rewrite the pending order set. Implementations can carry run-local
/// memory (e.g. a tracked all-time-high) across days; construct one
/// instance per backtest run.
pub trait Strategy {
    fn decide(&mut self, state: &mut Portfolio, open_price: f64);
}

/// Buy with all available cash whenever there is any.
#[derive(Debug, Default)]
pub struct Averaging;

impl Strategy for Averaging {
    fn decide(&mut self, state: &mut Portfolio, open_price: f64) {
        if state.cash > CASH_RESERVE {
            let quantity = (state.cash - CASH_RESERVE) / open_price;
            state.orders = vec![Order::limit(quantity, open_price)];
        }
    }
}

/// Buy when the price drops a given fraction below the tracked all-time-high.
///
/// The first call invests all cash and seeds the high. After a dip triggers,
/// the high resets to the current price so the same drawdown is not bought
/// twice.
#[derive(Debug)]
pub struct BuyDip {
    dip_fraction: f64,
    invest_fraction: f64,
    high: Option<f64>,
}

impl BuyDip {
    pub fn new(dip_pct: f64, invest_pct: f64) -> Self {
        BuyDip {
            dip_fraction: dip_pct / 100.0,
            invest_fraction: invest_pct / 100.0,
            high: None,
        }
    }
}

impl Strategy for BuyDip {
    fn decide(&mut self, state: &mut Portfolio, open_price: f64) {
        match self.high {
            None => {
                let quantity = (state.cash - CASH_RESERVE) / open_price;
                state.orders = vec![Order::limit(quantity, open_price)];
                self.high = Some(open_price);
            }
            Some(high) if open_price > high => {
                self.high = Some(open_price);
            }
            _ => {}
        }

        if let Some(high) = self.high {
            if open_price < high * (1.0 - self.dip_fraction) {
                self.high = Some(open_price);
                let to_invest = state.cash * self.invest_fraction;
                state.orders = vec![Order::limit(to_invest / open_price, open_price)];
            }
        }
    }
}
