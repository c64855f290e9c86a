//! Loader port: external file format → canonical series.

use std::path::Path;

use crate::domain::error::BarkeepError;
use crate::domain::series::Series;

/// Metadata overrides for a load; `None` means autodetect from the source.
#[derive(Debug, Clone, Default)]
pub struct LoadOverrides {
    pub ticker: Option<String>,
    pub resolution: Option<String>,
    pub currency: Option<String>,
}

pub trait LoaderPort {
    /// Load a series from `path`. A row either parses fully or the whole
    /// load fails; there is no partial-record recovery.
    fn load_series(&self, path: &Path, overrides: &LoadOverrides)
        -> Result<Series, BarkeepError>;
}
