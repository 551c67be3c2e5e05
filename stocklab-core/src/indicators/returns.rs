//! Daily return.
//!
//! return[t] = close[t] / close[t-1] - 1
//! Lookback: 1.

use super::Indicator;
use crate::domain::PriceBar;

#[derive(Debug, Clone, Default)]
pub struct DailyReturn;

impl DailyReturn {
    pub fn new() -> Self {
        Self
    }
}

impl Indicator for DailyReturn {
    fn name(&self) -> &str {
        "daily_return"
    }

    fn lookback(&self) -> usize {
        1
    }

    fn compute(&self, bars: &[PriceBar]) -> Vec<f64> {
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        pct_change(&closes)
    }
}

/// Fractional change between consecutive values. `NaN` at index 0 and
/// wherever either operand is non-finite or the previous value is zero.
pub(crate) fn pct_change(values: &[f64]) -> Vec<f64> {
    let mut result = vec![f64::NAN; values.len()];
    for i in 1..values.len() {
        let prev = values[i - 1];
        let curr = values[i];
        if prev.is_finite() && curr.is_finite() && prev != 0.0 {
            result[i] = curr / prev - 1.0;
        }
    }
    result
}
