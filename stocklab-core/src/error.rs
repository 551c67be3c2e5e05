//! Pipeline error taxonomy.
//!
//! Each stage surfaces its own variant. The stage that detects a failure
//! reports it, then returns it unchanged to the caller.

use crate::data::provider::ProviderError;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Errors produced by the fetch → transform → save pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The primary history request failed. Fatal.
    #[error("data source error for {ticker}: {source}")]
    DataSource {
        ticker: String,
        #[source]
        source: ProviderError,
    },

    /// The analyst-target lookup failed. Recovered by the fetcher, which
    /// reports it as a warning and omits the field.
    #[error("analyst target unavailable for {ticker}: {source}")]
    AnalystTargetUnavailable {
        ticker: String,
        #[source]
        source: ProviderError,
    },

    /// Malformed or incomplete input to the indicator computation.
    #[error("processing error: {0}")]
    Processing(String),

    /// Filesystem failure while writing or reading a data file.
    #[error("persistence error at {}: {source}", path.display())]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PipelineError {
    pub fn data_source(ticker: impl Into<String>, source: ProviderError) -> Self {
        Self::DataSource {
            ticker: ticker.into(),
            source,
        }
    }

    pub fn persistence(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Persistence {
            path: path.into(),
            source,
        }
    }

    /// Pipeline stage this error belongs to.
    pub fn stage(&self) -> Stage {
        match self {
            Self::DataSource { .. } | Self::AnalystTargetUnavailable { .. } => Stage::Fetch,
            Self::Processing(_) => Stage::Transform,
            Self::Persistence { .. } => Stage::Save,
        }
    }
}

/// Pipeline stages, used as logging context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Fetch,
    Transform,
    Save,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Fetch => "fetch",
            Stage::Transform => "transform",
            Stage::Save => "save",
        };
        f.write_str(name)
    }
}
