//! CLI definition and dispatch.

use std::path::PathBuf;
use std::process::ExitCode;

use chrono::Duration;
use clap::{ArgAction, Parser, Subcommand, ValueEnum};

use crate::adapters::csv_repository::CsvRepository;
use crate::adapters::display::{render_histogram, render_table};
use crate::adapters::tradingview_adapter::TradingViewLoader;
use crate::domain::error::BarkeepError;
use crate::domain::execution::run_strategy;
use crate::domain::resolution::Resolution;
use crate::domain::slicer::sequential_slices;
use crate::domain::strategy::{Averaging, BuyDip, Strategy};
use crate::ports::loader_port::{LoadOverrides, LoaderPort};
use crate::ports::store_port::StorePort;

#[derive(Parser, Debug)]
#[command(name = "barkeep", about = "Security time series repository and backtester")]
pub struct Cli {
    /// Repository directory, defaults to ~/.barkeep
    #[arg(short = 'y', long, env = "BARKEEP_REPOSITORY", global = true)]
    pub repository: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Import a CSV export into the repository
    Import {
        source: PathBuf,
        #[arg(long, default_value = "tradingview")]
        format: String,
        /// Override the ticker detected from the file name
        #[arg(long)]
        ticker: Option<String>,
        /// Override the resolution detected from the file name
        #[arg(long)]
        resolution: Option<String>,
        /// Override the currency detected from the file name
        #[arg(long)]
        currency: Option<String>,
    },
    /// List stored series
    List,
    /// Replay an investment strategy over rolling windows of a stored series
    Backtest {
        ticker: String,
        #[arg(long, default_value = "1d")]
        resolution: String,
        #[arg(long, value_enum, default_value_t = StrategyKind::Averaging)]
        strategy: StrategyKind,
        #[arg(long, default_value_t = 80_000.0)]
        starting_cash: f64,
        #[arg(long, default_value_t = 3_000.0)]
        monthly_cash: f64,
        /// Length of each backtest window in years
        #[arg(long, default_value_t = 10)]
        years: i64,
        /// Records between consecutive window starts
        #[arg(long, default_value_t = 27)]
        step: usize,
        /// Records to drop from the start of the series
        #[arg(long, default_value_t = 0)]
        skip: usize,
        /// Drawdown from the tracked high that triggers a dip buy, percent
        #[arg(long, default_value_t = 3.0)]
        dip_pct: f64,
        /// Share of cash invested on a dip, percent
        #[arg(long, default_value_t = 99.0)]
        invest_pct: f64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StrategyKind {
    Averaging,
    Dips,
}

pub fn run(cli: Cli) -> ExitCode {
    let level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        _ => log::LevelFilter::Debug,
    };
    let _ = env_logger::Builder::new().filter_level(level).try_init();

    let repository = repository_path(cli.repository);

    match cli.command {
        Command::Import {
            source,
            format,
            ticker,
            resolution,
            currency,
        } => {
            let overrides = LoadOverrides {
                ticker,
                resolution,
                currency,
            };
            run_import(&repository, &source, &format, &overrides)
        }
        Command::List => run_list(&repository),
        Command::Backtest {
            ticker,
            resolution,
            strategy,
            starting_cash,
            monthly_cash,
            years,
            step,
            skip,
            dip_pct,
            invest_pct,
        } => run_backtest(
            &repository,
            &ticker,
            &resolution,
            strategy,
            starting_cash,
            monthly_cash,
            years,
            step,
            skip,
            dip_pct,
            invest_pct,
        ),
    }
}

fn repository_path(arg: Option<PathBuf>) -> PathBuf {
    arg.unwrap_or_else(|| {
        std::env::var_os("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".barkeep")
    })
}

fn open_repository(path: &PathBuf) -> Result<CsvRepository, ExitCode> {
    CsvRepository::open(path).map_err(|e| {
        eprintln!("error: cannot open repository {}: {e}", path.display());
        (&e).into()
    })
}

fn run_import(
    repository: &PathBuf,
    source: &PathBuf,
    format: &str,
    overrides: &LoadOverrides,
) -> ExitCode {
    let loader: Box<dyn LoaderPort> = match format {
        "tradingview" => Box::new(TradingViewLoader),
        other => {
            let e = BarkeepError::UnknownFormat {
                value: other.to_string(),
            };
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    let series = match loader.load_series(source, overrides) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    let ticker = series.ticker.clone();
    let resolution = series.resolution;
    let count = series.len();

    let mut repo = match open_repository(repository) {
        Ok(r) => r,
        Err(code) => return code,
    };
    if let Err(e) = repo.add_series(series) {
        eprintln!("error: {e}");
        return (&e).into();
    }

    eprintln!("imported {count} records for {ticker}@{resolution}");
    ExitCode::SUCCESS
}

fn run_list(repository: &PathBuf) -> ExitCode {
    let repo = match open_repository(repository) {
        Ok(r) => r,
        Err(code) => return code,
    };

    let entries = repo.list_series();
    if entries.is_empty() {
        println!("-- no data --");
        return ExitCode::SUCCESS;
    }

    let rows: Vec<Vec<String>> = entries
        .iter()
        .map(|e| {
            vec![
                e.ticker.clone(),
                e.resolution.to_string(),
                e.currency.clone(),
                e.source.clone(),
                e.filename.clone(),
            ]
        })
        .collect();
    print!(
        "{}",
        render_table(
            &["ticker", "resolution", "currency", "source", "filename"],
            &rows,
        )
    );
    ExitCode::SUCCESS
}

#[allow(clippy::too_many_arguments)]
fn run_backtest(
    repository: &PathBuf,
    ticker: &str,
    resolution: &str,
    strategy: StrategyKind,
    starting_cash: f64,
    monthly_cash: f64,
    years: i64,
    step: usize,
    skip: usize,
    dip_pct: f64,
    invest_pct: f64,
) -> ExitCode {
    let resolution: Resolution = match resolution.parse() {
        Ok(r) => r,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    let repo = match open_repository(repository) {
        Ok(r) => r,
        Err(code) => return code,
    };
    let series = match repo.get_series(ticker, resolution) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    let series = series.with_records(series.records.iter().skip(skip).cloned().collect());

    let window = Duration::days(365 * years);
    let mut gains = Vec::new();

    for slice in sequential_slices(&series, window, step) {
        let mut strategy: Box<dyn Strategy> = match strategy {
            StrategyKind::Averaging => Box::new(Averaging),
            StrategyKind::Dips => Box::new(BuyDip::new(dip_pct, invest_pct)),
        };

        let result = match run_strategy(strategy.as_mut(), &slice, starting_cash, monthly_cash) {
            Ok(r) => r,
            Err(e) => {
                eprintln!("error: {e}");
                return (&e).into();
            }
        };

        let gain_pct = result.gain() * 100.0;
        println!(
            "{}  in {:>12.2}  out {:>12.2}  gain {:>8.2}%",
            slice.first_time().map(|t| t.date().to_string()).unwrap_or_default(),
            result.total_in,
            result.total_out,
            gain_pct,
        );
        gains.push(gain_pct);
    }

    if gains.is_empty() {
        let e = BarkeepError::EmptySeries;
        eprintln!("error: {e}");
        return (&e).into();
    }

    println!();
    print!("{}", render_histogram(&gains));
    println!();

    let annualized =
        |gain_pct: f64| ((1.0 + gain_pct / 100.0).powf(1.0 / years as f64) - 1.0) * 100.0;
    let n = gains.len() as f64;
    let mean = gains.iter().sum::<f64>() / n;
    let geometric = (gains.iter().map(|g| 1.0 + g / 100.0).product::<f64>().powf(1.0 / n) - 1.0)
        * 100.0;
    println!("windows:        {}", gains.len());
    println!("mean gain:      {mean:.2}% ({:.2}% p.a.)", annualized(mean));
    println!(
        "geometric mean: {geometric:.2}% ({:.2}% p.a.)",
        annualized(geometric)
    );

    ExitCode::SUCCESS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn import_parses_overrides() {
        let cli = Cli::try_parse_from([
            "barkeep",
            "-y",
            "/tmp/repo",
            "import",
            "data.csv",
            "--ticker",
            "BATS:SPY",
            "--currency",
            "usd",
        ])
        .unwrap();

        assert_eq!(cli.repository, Some(PathBuf::from("/tmp/repo")));
        match cli.command {
            Command::Import {
                source,
                format,
                ticker,
                resolution,
                currency,
            } => {
                assert_eq!(source, PathBuf::from("data.csv"));
                assert_eq!(format, "tradingview");
                assert_eq!(ticker.as_deref(), Some("BATS:SPY"));
                assert_eq!(resolution, None);
                assert_eq!(currency.as_deref(), Some("usd"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn backtest_defaults() {
        let cli = Cli::try_parse_from(["barkeep", "backtest", "BATS:SPY"]).unwrap();
        match cli.command {
            Command::Backtest {
                ticker,
                resolution,
                strategy,
                starting_cash,
                monthly_cash,
                years,
                step,
                skip,
                ..
            } => {
                assert_eq!(ticker, "BATS:SPY");
                assert_eq!(resolution, "1d");
                assert_eq!(strategy, StrategyKind::Averaging);
                assert_eq!(starting_cash, 80_000.0);
                assert_eq!(monthly_cash, 3_000.0);
                assert_eq!(years, 10);
                assert_eq!(step, 27);
                assert_eq!(skip, 0);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn repository_defaults_under_home() {
        let path = repository_path(None);
        assert!(path.ends_with(".barkeep"));
        assert_eq!(repository_path(Some("/x".into())), PathBuf::from("/x"));
    }

    #[test]
    fn missing_subcommand_is_an_error() {
        assert!(Cli::try_parse_from(["barkeep"]).is_err());
    }

    #[test]
    fn backtest_with_unknown_resolution_fails_fast() {
        let dir = tempfile::TempDir::new().unwrap();
        let cli = Cli::try_parse_from([
            "barkeep",
            "-y",
            dir.path().to_str().unwrap(),
            "backtest",
            "BATS:SPY",
            "--resolution",
            "5m",
        ])
        .unwrap();

        let code = run(cli);
        // Unknown resolution is a parse-class failure, exit code 2.
        assert_eq!(
            format!("{code:?}"),
            format!("{:?}", ExitCode::from(2))
        );
    }
}
