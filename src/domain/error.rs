//! Domain error types.

/// Top-level error type for barkeep.
#[derive(Debug, thiserror::Error)]
pub enum BarkeepError {
    #[error("no series for {ticker}@{resolution}")]
    NotFound { ticker: String, resolution: String },

    #[error("{matches} index entries for {ticker}@{resolution} - repository corrupt")]
    CorruptIndex {
        ticker: String,
        resolution: String,
        matches: usize,
    },

    #[error("cannot merge {incoming} series into {existing} series")]
    ResolutionMismatch { existing: String, incoming: String },

    #[error("cannot merge series in {incoming} into series in {existing}")]
    CurrencyMismatch { existing: String, incoming: String },

    #[error("unknown resolution: {value}")]
    UnknownResolution { value: String },

    #[error("unknown input format: {value}")]
    UnknownFormat { value: String },

    #[error("cannot derive series metadata from file name: {name}")]
    Filename { name: String },

    #[error("invalid {field} value {value:?} in {context}")]
    Malformed {
        context: String,
        field: String,
        value: String,
    },

    #[error("cannot sell {requested} shares, only have {held}")]
    OversoldShares { requested: f64, held: f64 },

    #[error("cannot buy {quantity} shares at {price}, only have {cash} in cash")]
    OverspentCash {
        quantity: f64,
        price: f64,
        cash: f64,
    },

    #[error("cannot run a backtest over an empty series")]
    EmptySeries,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl From<&BarkeepError> for std::process::ExitCode {
    fn from(err: &BarkeepError) -> Self {
        let code: u8 = match err {
            BarkeepError::Io(_) | BarkeepError::Csv(_) => 1,
            BarkeepError::UnknownResolution { .. }
            | BarkeepError::UnknownFormat { .. }
            | BarkeepError::Filename { .. }
            | BarkeepError::Malformed { .. } => 2,
            BarkeepError::CorruptIndex { .. } => 3,
            BarkeepError::ResolutionMismatch { .. } | BarkeepError::CurrencyMismatch { .. } => 4,
            BarkeepError::NotFound { .. } | BarkeepError::EmptySeries => 5,
            BarkeepError::OversoldShares { .. } | BarkeepError::OverspentCash { .. } => 6,
        };
        std::process::ExitCode::from(code)
    }
}
