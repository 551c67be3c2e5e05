//! Rolling volatility of daily returns.
//!
//! Sample standard deviation (n - 1 denominator) of the trailing `period`
//! daily returns. Returns start at index 1, so the first full window ends at
//! index `period`.
//! Lookback: period.

use super::returns::pct_change;
use super::Indicator;
use crate::domain::PriceBar;

#[derive(Debug, Clone)]
pub struct RollingVolatility {
    period: usize,
}

impl RollingVolatility {
    pub fn new(period: usize) -> Self {
        assert!(period >= 2, "volatility period must be >= 2");
        Self { period }
    }
}

impl Indicator for RollingVolatility {
    fn name(&self) -> &str {
        "volatility"
    }

    fn lookback(&self) -> usize {
        self.period
    }

    fn compute(&self, bars: &[PriceBar]) -> Vec<f64> {
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        let returns = pct_change(&closes);
        let mut result = vec![f64::NAN; bars.len()];

        for i in self.period..bars.len() {
            result[i] = sample_std(&returns[(i + 1 - self.period)..=i]);
        }

        result
    }
}

/// Sample standard deviation; `NaN` if any value is non-finite or fewer than two values.
fn sample_std(window: &[f64]) -> f64 {
    let n = window.len();
    if n < 2 || window.iter().any(|v| !v.is_finite()) {
        return f64::NAN;
    }
    let mean = window.iter().sum::<f64>() / n as f64;
    let ss: f64 = window.iter().map(|v| (v - mean).powi(2)).sum();
    (ss / (n - 1) as f64).sqrt()
}
