//! Shared fixtures: a TradingView-style daily export of 19 trading days,
//! 2002-09-16 through 2002-10-10, with weekend gaps.

use std::fs;
use std::path::{Path, PathBuf};

/// Session timestamps (13:30 UTC) of the fixture's trading days.
pub const SPY_EPOCHS: [i64; 19] = [
    1032183000, 1032269400, 1032355800, 1032442200, 1032528600, 1032787800, 1032874200,
    1032960600, 1033047000, 1033133400, 1033392600, 1033479000, 1033565400, 1033651800,
    1033738200, 1033997400, 1034083800, 1034170200, 1034256600,
];

/// The export's CSV content, with every timestamp shifted by `shift_secs`.
pub fn spy_csv(shift_secs: i64) -> String {
    let mut out = String::from("time,open,high,low,close,Volume\n");
    for (i, epoch) in SPY_EPOCHS.iter().enumerate() {
        if i == 0 {
            out.push_str(&format!(
                "{},5.54452519,5.6036668,5.35231499,5.41145659,4272182\n",
                epoch + shift_secs
            ));
        } else {
            let open = 5.5 + 0.01 * i as f64;
            out.push_str(&format!(
                "{},{},{},{},{},{}\n",
                epoch + shift_secs,
                open,
                open + 0.06,
                open - 0.2,
                open - 0.13,
                4272182 - 1000 * i as i64,
            ));
        }
    }
    out
}

pub fn write_fixture(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path
}
