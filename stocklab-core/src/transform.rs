//! Enrichment step: attach rolling indicators and drop warmup rows.

use crate::domain::{EnrichedBar, EnrichedSeries, PriceSeries};
use crate::error::PipelineError;
use crate::indicators::{
    DailyReturn, Indicator, RollingVolatility, Sma, LONG_WINDOW, SHORT_WINDOW, VOLATILITY_WINDOW,
};

/// Derives `ma5`, `ma20`, `daily_return` and `volatility` for a series.
///
/// Pure: no I/O, no logging. Re-running on the same input yields the same
/// output. Running it on its own output is not meaningful since the windows
/// would start over on an already-trimmed series.
#[derive(Debug, Clone)]
pub struct Transformer {
    ma_short: Sma,
    ma_long: Sma,
    returns: DailyReturn,
    volatility: RollingVolatility,
}

impl Default for Transformer {
    fn default() -> Self {
        Self::new()
    }
}

impl Transformer {
    pub fn new() -> Self {
        Self {
            ma_short: Sma::new(SHORT_WINDOW),
            ma_long: Sma::new(LONG_WINDOW),
            returns: DailyReturn::new(),
            volatility: RollingVolatility::new(VOLATILITY_WINDOW),
        }
    }

    /// Leading input rows that can never carry a full set of indicators.
    pub fn warmup(&self) -> usize {
        self.ma_short
            .lookback()
            .max(self.ma_long.lookback())
            .max(self.returns.lookback())
            .max(self.volatility.lookback())
    }

    /// Compute indicators and keep only rows where every one is defined.
    ///
    /// Fails with `Processing` if any price is non-finite or a close is not positive.
    pub fn transform(&self, series: &PriceSeries) -> Result<EnrichedSeries, PipelineError> {
        for bar in &series.bars {
            if bar.is_void() {
                return Err(PipelineError::Processing(format!(
                    "{}: bar on {} has a non-numeric price (open {}, high {}, low {}, close {})",
                    series.ticker, bar.date, bar.open, bar.high, bar.low, bar.close
                )));
            }
            if bar.close <= 0.0 {
                return Err(PipelineError::Processing(format!(
                    "{}: close on {} is not a positive number ({})",
                    series.ticker, bar.date, bar.close
                )));
            }
        }

        let bars = &series.bars;
        let ma5 = self.ma_short.compute(bars);
        let ma20 = self.ma_long.compute(bars);
        let daily_return = self.returns.compute(bars);
        let volatility = self.volatility.compute(bars);

        let enriched = bars
            .iter()
            .enumerate()
            .filter_map(|(i, bar)| {
                let row = EnrichedBar {
                    bar: bar.clone(),
                    ma5: ma5[i],
                    ma20: ma20[i],
                    daily_return: daily_return[i],
                    volatility: volatility[i],
                };
                let complete = row.ma5.is_finite()
                    && row.ma20.is_finite()
                    && row.daily_return.is_finite()
                    && row.volatility.is_finite();
                complete.then_some(row)
            })
            .collect();

        Ok(EnrichedSeries {
            ticker: series.ticker.clone(),
            bars: enriched,
            analyst_target_price: series.analyst_target_price,
        })
    }
}
