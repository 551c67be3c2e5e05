//! Ordered series of bars for one ticker.

use super::bar::{EnrichedBar, PriceBar};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Daily OHLCV history for a single ticker, ordered by date ascending.
///
/// `analyst_target_price` is one current point estimate from the provider,
/// not a historical series. It is stored once here; the CSV writer repeats it
/// on every row to keep the established file layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
    pub ticker: String,
    pub bars: Vec<PriceBar>,
    pub analyst_target_price: Option<f64>,
}

impl PriceSeries {
    pub fn new(ticker: impl Into<String>, bars: Vec<PriceBar>) -> Self {
        Self {
            ticker: ticker.into(),
            bars,
            analyst_target_price: None,
        }
    }

    /// Attach an analyst target, returning the updated series.
    pub fn with_analyst_target(mut self, target: Option<f64>) -> Self {
        self.analyst_target_price = target;
        self
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.bars.first().map(|b| b.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.bars.last().map(|b| b.date)
    }

    /// The `close` column as a plain vector.
    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }
}

/// A `PriceSeries` with rolling indicators, trimmed to rows with full history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedSeries {
    pub ticker: String,
    pub bars: Vec<EnrichedBar>,
    pub analyst_target_price: Option<f64>,
}

impl EnrichedSeries {
    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.bars.first().map(|b| b.bar.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.bars.last().map(|b| b.bar.date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(day: u32, close: f64) -> PriceBar {
        PriceBar {
            date: NaiveDate::from_ymd_opt(2024, 3, day).unwrap(),
            open: close,
            high: close + 1.0,
            low: close - 1.0,
            close,
            volume: 1_000,
        }
    }

    #[test]
    fn new_series_has_no_target() {
        let series = PriceSeries::new("AAPL", vec![bar(1, 10.0)]);
        assert_eq!(series.ticker, "AAPL");
        assert!(series.analyst_target_price.is_none());
    }

    #[test]
    fn date_bounds_follow_bar_order() {
        let series = PriceSeries::new("AAPL", vec![bar(1, 10.0), bar(4, 11.0), bar(5, 12.0)]);
        assert_eq!(series.first_date(), NaiveDate::from_ymd_opt(2024, 3, 1));
        assert_eq!(series.last_date(), NaiveDate::from_ymd_opt(2024, 3, 5));
        assert_eq!(series.closes(), vec![10.0, 11.0, 12.0]);
    }

    #[test]
    fn empty_series_has_no_bounds() {
        let series = PriceSeries::new("DEAD", Vec::new());
        assert!(series.is_empty());
        assert_eq!(series.first_date(), None);
    }

    #[test]
    fn with_analyst_target_sets_scalar() {
        let series = PriceSeries::new("AAPL", vec![bar(1, 10.0)]).with_analyst_target(Some(250.5));
        assert_eq!(series.analyst_target_price, Some(250.5));
    }

    #[test]
    fn series_json_round_trip() {
        let series = PriceSeries::new("AAPL", vec![bar(1, 10.0), bar(4, 11.0)])
            .with_analyst_target(Some(250.5));
        let json = serde_json::to_string(&series).unwrap();
        assert!(json.contains("\"analyst_target_price\":250.5"));
        let back: PriceSeries = serde_json::from_str(&json).unwrap();
        assert_eq!(back, series);

        let enriched = EnrichedSeries {
            ticker: "AAPL".to_string(),
            bars: vec![EnrichedBar {
                bar: bar(5, 12.0),
                ma5: 11.0,
                ma20: 10.5,
                daily_return: 0.0909,
                volatility: 0.03,
            }],
            analyst_target_price: None,
        };
        let back: EnrichedSeries =
            serde_json::from_str(&serde_json::to_string(&enriched).unwrap()).unwrap();
        assert_eq!(back, enriched);
    }
}
