//! Market data ingestion

pub mod fetch;
pub mod provider;
pub mod yahoo;

pub use fetch::Fetcher;
pub use provider::{MarketDataProvider, ProviderError};
pub use yahoo::YahooProvider;
