//! Pipeline orchestrator: fetch → (transform) → save for one ticker.
//!
//! Stages run strictly in order. The first failure aborts the run; it is
//! reported with the ticker and stage and returned unchanged. Nothing is
//! retried. Stages after the failing one never run, so a fetch or transform
//! failure writes nothing.

use crate::config::{PipelineMode, PipelineSection};
use crate::data::{Fetcher, MarketDataProvider};
use crate::domain::{EnrichedSeries, PriceSeries};
use crate::error::PipelineError;
use crate::persist::{CsvTable, Persister};
use crate::report::Reporter;
use crate::transform::Transformer;
use chrono::NaiveDate;
use std::path::PathBuf;

/// One ticker/lookback request.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineRequest {
    pub ticker: String,
    pub days_back: u32,
    pub mode: PipelineMode,
}

impl PipelineRequest {
    pub fn new(ticker: impl Into<String>, days_back: u32) -> Self {
        Self {
            ticker: ticker.into(),
            days_back,
            mode: PipelineMode::Raw,
        }
    }

    pub fn with_mode(mut self, mode: PipelineMode) -> Self {
        self.mode = mode;
        self
    }
}

impl From<&PipelineSection> for PipelineRequest {
    fn from(section: &PipelineSection) -> Self {
        Self {
            ticker: section.ticker.clone(),
            days_back: section.days_back,
            mode: section.mode,
        }
    }
}

/// What a run produced.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineOutput {
    Raw(PriceSeries),
    Enriched(EnrichedSeries),
}

impl PipelineOutput {
    pub fn ticker(&self) -> &str {
        match self {
            Self::Raw(s) => &s.ticker,
            Self::Enriched(s) => &s.ticker,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Raw(s) => s.len(),
            Self::Enriched(s) => s.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The output viewed as the table that was written to disk.
    pub fn table(&self) -> &dyn CsvTable {
        match self {
            Self::Raw(s) => s as &dyn CsvTable,
            Self::Enriched(s) => s,
        }
    }
}

/// Runs the stages for one request against a provider and a destination directory.
pub struct Pipeline<'a> {
    provider: &'a dyn MarketDataProvider,
    reporter: &'a dyn Reporter,
    data_dir: PathBuf,
    transformer: Transformer,
    today: Option<NaiveDate>,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        provider: &'a dyn MarketDataProvider,
        reporter: &'a dyn Reporter,
        data_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            provider,
            reporter,
            data_dir: data_dir.into(),
            transformer: Transformer::new(),
            today: None,
        }
    }

    /// Pin the fetch end date instead of reading the local clock.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    /// Fetch and save the raw series. Indicators are not computed.
    pub fn run(&self, ticker: &str, days_back: u32) -> Result<PriceSeries, PipelineError> {
        self.guard(ticker, || {
            let series = self.fetcher().fetch(ticker, days_back)?;
            self.persister().save(&series, ticker)?;
            Ok(series)
        })
    }

    /// Fetch, compute indicators, and save the enriched series.
    pub fn run_enriched(
        &self,
        ticker: &str,
        days_back: u32,
    ) -> Result<EnrichedSeries, PipelineError> {
        self.guard(ticker, || {
            let series = self.fetcher().fetch(ticker, days_back)?;
            let enriched = self.transformer.transform(&series).map_err(|e| {
                self.reporter.error(&format!("Error processing data: {e}"));
                e
            })?;
            self.persister().save(&enriched, ticker)?;
            Ok(enriched)
        })
    }

    /// Run the variant selected by `request.mode`.
    pub fn execute(&self, request: &PipelineRequest) -> Result<PipelineOutput, PipelineError> {
        match request.mode {
            PipelineMode::Raw => self
                .run(&request.ticker, request.days_back)
                .map(PipelineOutput::Raw),
            PipelineMode::Enriched => self
                .run_enriched(&request.ticker, request.days_back)
                .map(PipelineOutput::Enriched),
        }
    }

    fn fetcher(&self) -> Fetcher<'_> {
        let fetcher = Fetcher::new(self.provider, self.reporter);
        match self.today {
            Some(today) => fetcher.with_today(today),
            None => fetcher,
        }
    }

    fn persister(&self) -> Persister<'_> {
        Persister::new(&self.data_dir, self.reporter)
    }

    fn guard<T>(
        &self,
        ticker: &str,
        stages: impl FnOnce() -> Result<T, PipelineError>,
    ) -> Result<T, PipelineError> {
        stages().map_err(|e| {
            self.reporter.error(&format!(
                "Pipeline failed for {ticker} at {} stage: {e}",
                e.stage()
            ));
            e
        })
    }
}
