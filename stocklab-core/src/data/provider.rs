//! Market data provider trait and structured error types.
//!
//! The MarketDataProvider trait abstracts over the remote source so the
//! fetcher can be exercised against a stub in tests.

use crate::domain::PriceBar;
use chrono::NaiveDate;
use thiserror::Error;

/// Structured error types for provider calls.
///
/// These are displayable in CLI output and log lines.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("HTTP {status} from provider")]
    Http { status: u16 },

    #[error("rate limited by provider")]
    RateLimited,

    #[error("authentication required: {0}")]
    AuthenticationRequired(String),

    #[error("symbol not found: {symbol}")]
    SymbolNotFound { symbol: String },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

/// Remote source of daily price history and analyst metadata.
pub trait MarketDataProvider: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// Daily OHLCV bars for `symbol` with both `start` and `end` inclusive.
    ///
    /// An empty vector means the provider has no data for the period.
    fn history(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PriceBar>, ProviderError>;

    /// Current mean analyst target price, if the provider publishes one.
    fn analyst_target(&self, symbol: &str) -> Result<Option<f64>, ProviderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_messages_are_readable() {
        assert_eq!(
            ProviderError::Http { status: 502 }.to_string(),
            "HTTP 502 from provider"
        );
        assert_eq!(
            ProviderError::SymbolNotFound {
                symbol: "ZZZZ".into()
            }
            .to_string(),
            "symbol not found: ZZZZ"
        );
        assert!(ProviderError::RateLimited.to_string().contains("rate limited"));
    }
}
