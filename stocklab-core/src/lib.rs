//! Stocklab Core: fetch daily equity prices, derive rolling indicators, persist as CSV.
//!
//! This crate contains the whole pipeline:
//! - Domain types (price bars, raw and enriched series)
//! - Market data provider trait and the Yahoo Finance implementation
//! - Fetcher with inclusive date bounds and an optional analyst target
//! - Indicators (moving averages, daily return, rolling volatility) and the transformer
//! - CSV persister with atomic writes and a reader for saved files
//! - Pipeline orchestrator with raw and enriched variants
//! - Reporter capability for logging, configuration, error taxonomy

pub mod config;
pub mod data;
pub mod domain;
pub mod error;
pub mod indicators;
pub mod persist;
pub mod pipeline;
pub mod report;
pub mod transform;

pub use config::{ConfigError, PipelineMode, StocklabConfig};
pub use data::{Fetcher, MarketDataProvider, ProviderError, YahooProvider};
pub use domain::{EnrichedBar, EnrichedSeries, PriceBar, PriceSeries};
pub use error::{PipelineError, Stage};
pub use persist::{read_series, CsvTable, Persister};
pub use pipeline::{Pipeline, PipelineOutput, PipelineRequest};
pub use report::{Level, MemoryReporter, Reporter, TracingReporter};
pub use transform::Transformer;
