//! Fetcher: date-bounded history for one ticker, plus the analyst target.

use super::provider::{MarketDataProvider, ProviderError};
use crate::domain::{PriceBar, PriceSeries};
use crate::error::PipelineError;
use crate::report::Reporter;
use chrono::{Duration, NaiveDate};

/// Requests `[today - days_back, today]` from a provider, both ends inclusive.
pub struct Fetcher<'a> {
    provider: &'a dyn MarketDataProvider,
    reporter: &'a dyn Reporter,
    today: Option<NaiveDate>,
}

impl<'a> Fetcher<'a> {
    pub fn new(provider: &'a dyn MarketDataProvider, reporter: &'a dyn Reporter) -> Self {
        Self {
            provider,
            reporter,
            today: None,
        }
    }

    /// Pin "today" instead of reading the local clock.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    pub fn today(&self) -> NaiveDate {
        self.today
            .unwrap_or_else(|| chrono::Local::now().date_naive())
    }

    /// The inclusive date range covered by a `days_back` lookback.
    pub fn date_range(&self, days_back: u32) -> (NaiveDate, NaiveDate) {
        let end = self.today();
        let start = end
            .checked_sub_signed(Duration::days(i64::from(days_back)))
            .unwrap_or(NaiveDate::MIN);
        (start, end)
    }

    /// Fetch history for `ticker`.
    ///
    /// A failed history request is fatal. A failed analyst-target lookup is
    /// reported as a warning and the field is left unset.
    pub fn fetch(&self, ticker: &str, days_back: u32) -> Result<PriceSeries, PipelineError> {
        let (start, end) = self.date_range(days_back);
        self.reporter
            .info(&format!("Fetching data for {ticker} from {start} to {end}"));

        let bars = match self.history(ticker, start, end) {
            Ok(bars) => bars,
            Err(e) => {
                self.reporter
                    .error(&format!("Error fetching data for {ticker}: {e}"));
                return Err(PipelineError::data_source(ticker, e));
            }
        };

        let target = match self.provider.analyst_target(ticker) {
            Ok(target) => target,
            Err(source) => {
                let soft = PipelineError::AnalystTargetUnavailable {
                    ticker: ticker.to_string(),
                    source,
                };
                self.reporter
                    .warning(&format!("Could not fetch analyst targets: {soft}"));
                None
            }
        };

        Ok(PriceSeries::new(ticker, bars).with_analyst_target(target))
    }

    /// Provider history, clipped to `[start, end]`, sorted and de-duplicated by date.
    fn history(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PriceBar>, ProviderError> {
        if ticker.trim().is_empty() {
            return Err(ProviderError::InvalidRequest("ticker must not be empty".into()));
        }

        let mut bars: Vec<PriceBar> = self
            .provider
            .history(ticker, start, end)?
            .into_iter()
            .filter(|b| b.date >= start && b.date <= end)
            .collect();
        // Stable sort keeps the provider's first row for a repeated date.
        bars.sort_by_key(|b| b.date);
        bars.dedup_by_key(|b| b.date);
        Ok(bars)
    }
}
