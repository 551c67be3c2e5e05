//! Yahoo Finance data provider.
//!
//! Daily OHLCV bars come from the v8 chart API. The analyst target comes from
//! the v10 quoteSummary `financialData` module, which needs a session cookie
//! and a crumb token obtained beforehand.
//!
//! Yahoo Finance has no official API and is subject to unannounced format
//! changes. Parse failures surface as `ResponseFormatChanged`.

use super::provider::{MarketDataProvider, ProviderError};
use crate::config::ProviderConfig;
use crate::domain::PriceBar;
use chrono::{NaiveDate, NaiveTime};
use serde::Deserialize;
use std::sync::Mutex;
use std::time::Duration;

const SECONDS_PER_DAY: i64 = 86_400;

/// Yahoo Finance v8 chart API response.
#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    #[serde(default)]
    meta: Option<ChartMeta>,
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

/// Exchange offset from UTC, in seconds. Bars are stamped at the local session open.
#[derive(Debug, Default, Deserialize)]
struct ChartMeta {
    #[serde(default)]
    gmtoffset: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteData>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct QuoteData {
    open: Vec<Option<f64>>,
    high: Vec<Option<f64>>,
    low: Vec<Option<f64>>,
    close: Vec<Option<f64>>,
    volume: Vec<Option<u64>>,
}

/// Yahoo Finance v10 quoteSummary response.
#[derive(Debug, Deserialize)]
struct QuoteSummaryResponse {
    #[serde(rename = "quoteSummary")]
    quote_summary: QuoteSummaryData,
}

#[derive(Debug, Deserialize)]
struct QuoteSummaryData {
    result: Option<Vec<QuoteSummaryResult>>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct QuoteSummaryResult {
    #[serde(rename = "financialData", default)]
    financial_data: Option<FinancialData>,
}

#[derive(Debug, Deserialize)]
struct FinancialData {
    #[serde(rename = "targetMeanPrice", default)]
    target_mean_price: Option<RawValue>,
}

/// Yahoo wraps numbers as `{"raw": 1.0, "fmt": "1.00"}`.
#[derive(Debug, Deserialize)]
struct RawValue {
    #[serde(default)]
    raw: Option<f64>,
}

/// Yahoo Finance data provider over a blocking HTTP client.
pub struct YahooProvider {
    client: reqwest::blocking::Client,
    base_url: String,
    cookie_url: String,
    crumb: Mutex<Option<String>>,
}

impl YahooProvider {
    pub fn new(config: &ProviderConfig) -> Result<Self, ProviderError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.as_str())
            .cookie_store(true)
            .build()
            .map_err(|e| ProviderError::InvalidRequest(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            cookie_url: config.cookie_url.clone(),
            crumb: Mutex::new(None),
        })
    }

    /// Unix-second bounds covering `start` 00:00:00 through `end` 23:59:59 UTC.
    fn period_bounds(start: NaiveDate, end: NaiveDate) -> (i64, i64) {
        let start_ts = start.and_time(NaiveTime::default()).and_utc().timestamp();
        let end_ts = end.and_time(NaiveTime::default()).and_utc().timestamp() + SECONDS_PER_DAY - 1;
        (start_ts, end_ts)
    }

    fn chart_url(&self, symbol: &str) -> String {
        format!("{}/v8/finance/chart/{symbol}", self.base_url)
    }

    fn quote_summary_url(&self, symbol: &str) -> String {
        format!("{}/v10/finance/quoteSummary/{symbol}", self.base_url)
    }

    /// Parse the chart API response body into bars, ordered as Yahoo returns them.
    fn parse_chart(symbol: &str, body: &str) -> Result<Vec<PriceBar>, ProviderError> {
        let resp: ChartResponse = serde_json::from_str(body).map_err(|e| {
            ProviderError::ResponseFormatChanged(format!("failed to parse chart for {symbol}: {e}"))
        })?;

        if let Some(err) = resp.chart.error {
            return Err(api_error(symbol, err));
        }

        let Some(data) = resp.chart.result.and_then(|r| r.into_iter().next()) else {
            return Ok(Vec::new());
        };

        // No timestamps means no trading days in the requested period.
        let Some(timestamps) = data.timestamp else {
            return Ok(Vec::new());
        };

        let quote = data
            .indicators
            .quote
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::ResponseFormatChanged("no quote data".into()))?;

        let offset = data.meta.and_then(|m| m.gmtoffset).unwrap_or(0);
        let mut bars = Vec::with_capacity(timestamps.len());

        for (i, &ts) in timestamps.iter().enumerate() {
            // Exchange-local calendar date, not the UTC one.
            let date = chrono::DateTime::from_timestamp(ts + offset, 0)
                .map(|dt| dt.naive_utc().date())
                .ok_or_else(|| {
                    ProviderError::ResponseFormatChanged(format!("invalid timestamp: {ts}"))
                })?;

            let open = quote.open.get(i).copied().flatten();
            let high = quote.high.get(i).copied().flatten();
            let low = quote.low.get(i).copied().flatten();
            let close = quote.close.get(i).copied().flatten();
            let volume = quote.volume.get(i).copied().flatten();

            // Holidays and half-populated rows carry nulls; skip them.
            let (Some(open), Some(high), Some(low), Some(close)) = (open, high, low, close) else {
                continue;
            };

            bars.push(PriceBar {
                date,
                open,
                high,
                low,
                close,
                volume: volume.unwrap_or(0),
            });
        }

        Ok(bars)
    }

    /// Extract `financialData.targetMeanPrice` from a quoteSummary body.
    ///
    /// A zero target is treated the same as a missing one.
    fn parse_target(symbol: &str, body: &str) -> Result<Option<f64>, ProviderError> {
        let resp: QuoteSummaryResponse = serde_json::from_str(body).map_err(|e| {
            ProviderError::ResponseFormatChanged(format!(
                "failed to parse quoteSummary for {symbol}: {e}"
            ))
        })?;

        if let Some(err) = resp.quote_summary.error {
            return Err(api_error(symbol, err));
        }

        let target = resp
            .quote_summary
            .result
            .and_then(|r| r.into_iter().next())
            .and_then(|r| r.financial_data)
            .and_then(|f| f.target_mean_price)
            .and_then(|v| v.raw)
            .filter(|v| v.is_finite() && *v != 0.0);

        Ok(target)
    }

    fn get(&self, url: &str, query: &[(&str, String)]) -> Result<(u16, String), ProviderError> {
        let resp = self
            .client
            .get(url)
            .header("referer", "https://finance.yahoo.com/")
            .query(query)
            .send()
            .map_err(|e| ProviderError::NetworkUnreachable(e.to_string()))?;
        let status = resp.status().as_u16();
        let body = resp
            .text()
            .map_err(|e| ProviderError::NetworkUnreachable(e.to_string()))?;
        Ok((status, body))
    }

    /// Map a quoteSummary response to a target, and report whether the crumb went stale.
    ///
    /// A 404 still carries a JSON body (`"Not Found"` error code), so it is parsed.
    fn target_response(
        symbol: &str,
        status: u16,
        body: &str,
    ) -> (Result<Option<f64>, ProviderError>, bool) {
        let stale_crumb = status == 401 || status == 403;
        let target = if (200..300).contains(&status) || status == 404 {
            Self::parse_target(symbol, body)
        } else {
            Err(status_error(status))
        };
        (target, stale_crumb)
    }

    /// Drop the cached crumb; the next lookup redoes the handshake.
    fn forget_crumb(&self) {
        *self.crumb.lock().unwrap_or_else(|e| e.into_inner()) = None;
    }

    /// Return the cached crumb, performing the cookie + crumb handshake on first use.
    fn crumb(&self) -> Result<String, ProviderError> {
        let mut cached = self.crumb.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(crumb) = cached.as_ref() {
            return Ok(crumb.clone());
        }

        // fc.yahoo.com answers 404 but sets the session cookie; only transport errors matter.
        self.get(&self.cookie_url, &[])?;

        let (status, body) = self.get(&format!("{}/v1/test/getcrumb", self.base_url), &[])?;
        let crumb = parse_crumb(status, &body)?;
        *cached = Some(crumb.clone());
        Ok(crumb)
    }
}

impl MarketDataProvider for YahooProvider {
    fn name(&self) -> &str {
        "yahoo_finance"
    }

    fn history(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PriceBar>, ProviderError> {
        let (period1, period2) = Self::period_bounds(start, end);
        let query = [
            ("period1", period1.to_string()),
            ("period2", period2.to_string()),
            ("interval", "1d".to_string()),
            ("events", "history".to_string()),
        ];
        let (status, body) = self.get(&self.chart_url(symbol), &query)?;

        match status {
            200..=299 => Self::parse_chart(symbol, &body),
            404 => Err(ProviderError::SymbolNotFound {
                symbol: symbol.to_string(),
            }),
            _ => Err(status_error(status)),
        }
    }

    fn analyst_target(&self, symbol: &str) -> Result<Option<f64>, ProviderError> {
        let crumb = self.crumb()?;
        let query = [
            ("modules", "financialData".to_string()),
            ("crumb", crumb),
        ];
        let (status, body) = self.get(&self.quote_summary_url(symbol), &query)?;

        let (target, stale_crumb) = Self::target_response(symbol, status, &body);
        if stale_crumb {
            self.forget_crumb();
        }
        target
    }
}

fn api_error(symbol: &str, err: ApiError) -> ProviderError {
    if err.code == "Not Found" {
        ProviderError::SymbolNotFound {
            symbol: symbol.to_string(),
        }
    } else {
        ProviderError::ResponseFormatChanged(format!("{}: {}", err.code, err.description))
    }
}

fn status_error(status: u16) -> ProviderError {
    match status {
        429 => ProviderError::RateLimited,
        401 | 403 => ProviderError::AuthenticationRequired(format!(
            "Yahoo Finance refused the request (HTTP {status})"
        )),
        _ => ProviderError::Http { status },
    }
}

/// Validate a getcrumb response body.
fn parse_crumb(status: u16, body: &str) -> Result<String, ProviderError> {
    if status == 429 {
        return Err(ProviderError::RateLimited);
    }
    if !(200..300).contains(&status) {
        return Err(ProviderError::AuthenticationRequired(format!(
            "crumb request failed with HTTP {status}"
        )));
    }

    let crumb = body.trim();
    if crumb.to_lowercase().contains("too many requests") {
        return Err(ProviderError::RateLimited);
    }
    if crumb.is_empty() || crumb.len() >= 100 || crumb.contains(' ') || crumb.contains("<html") {
        return Err(ProviderError::AuthenticationRequired(
            "crumb response was not a token".into(),
        ));
    }
    Ok(crumb.to_string())
}
