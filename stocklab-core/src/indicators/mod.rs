//! Rolling indicators over a price series.
//!
//! Indicators are pure functions: bar history in, numeric series out. Each
//! output has the same length as its input, with `f64::NAN` wherever the
//! trailing window is not yet full.

pub mod returns;
pub mod sma;
pub mod volatility;

pub use returns::DailyReturn;
pub use sma::Sma;
pub use volatility::RollingVolatility;

use crate::domain::PriceBar;

/// Trait for indicators.
///
/// No indicator value at bar t may depend on price data from bar t+1 or later.
pub trait Indicator: Send + Sync {
    /// Human-readable name (e.g., "ma5", "volatility").
    fn name(&self) -> &str;

    /// Number of leading bars for which the output is undefined.
    fn lookback(&self) -> usize;

    /// Compute the indicator for the entire bar series.
    ///
    /// Returns a `Vec<f64>` of the same length as `bars`.
    /// The first `lookback()` values are `f64::NAN`.
    fn compute(&self, bars: &[PriceBar]) -> Vec<f64>;
}

/// Trailing window of the short moving average (`ma5`).
pub const SHORT_WINDOW: usize = 5;

/// Trailing window of the long moving average (`ma20`).
pub const LONG_WINDOW: usize = 20;

/// Trailing window of daily returns used for `volatility`.
pub const VOLATILITY_WINDOW: usize = 20;

/// Create synthetic bars from close prices for testing.
///
/// open = prev_close (or close for first bar), high/low = ±1 around the body,
/// volume = 1000, one calendar day apart.
#[cfg(test)]
pub fn make_bars(closes: &[f64]) -> Vec<PriceBar> {
    let base_date = chrono::NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            PriceBar {
                date: base_date + chrono::Duration::days(i as i64),
                open,
                high: open.max(close) + 1.0,
                low: open.min(close) - 1.0,
                close,
                volume: 1000,
            }
        })
        .collect()
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for indicator tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
