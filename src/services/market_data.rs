//! Market data facade
//!
//! Daily price bars come from a [`QuoteProvider`]. The production provider
//! talks to the Yahoo Finance v8 chart endpoint; tests plug in a stub.
//! Responses are cached per (symbol, range) for the configured TTL.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use moka::future::Cache;
use reqwest::Client;
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::models::market::{QuoteView, UNAVAILABLE};

const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

#[derive(Debug, Error)]
pub enum MarketDataError {
    #[error("market data request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("market data provider returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("market data provider error for {symbol}: {message}")]
    Provider { symbol: String, message: String },

    #[error("no market data for {0}")]
    NoData(String),

    #[error("unsupported chart range '{0}'")]
    InvalidRange(String),
}

/// One daily bar. Only `close` is guaranteed.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceBar {
    pub timestamp: DateTime<Utc>,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: f64,
    pub volume: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ChartRange {
    FiveDays,
    #[default]
    OneMonth,
    ThreeMonths,
    SixMonths,
    OneYear,
    TwoYears,
    FiveYears,
    Max,
}

impl ChartRange {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChartRange::FiveDays => "5d",
            ChartRange::OneMonth => "1mo",
            ChartRange::ThreeMonths => "3mo",
            ChartRange::SixMonths => "6mo",
            ChartRange::OneYear => "1y",
            ChartRange::TwoYears => "2y",
            ChartRange::FiveYears => "5y",
            ChartRange::Max => "max",
        }
    }
}

impl fmt::Display for ChartRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChartRange {
    type Err = MarketDataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "5d" => Ok(ChartRange::FiveDays),
            "1mo" => Ok(ChartRange::OneMonth),
            "3mo" => Ok(ChartRange::ThreeMonths),
            "6mo" => Ok(ChartRange::SixMonths),
            "1y" => Ok(ChartRange::OneYear),
            "2y" => Ok(ChartRange::TwoYears),
            "5y" => Ok(ChartRange::FiveYears),
            "max" => Ok(ChartRange::Max),
            other => Err(MarketDataError::InvalidRange(other.to_string())),
        }
    }
}

/// Source of daily bars for a ticker
#[async_trait]
pub trait QuoteProvider: Send + Sync {
    async fn daily_bars(
        &self,
        symbol: &str,
        range: ChartRange,
    ) -> Result<Vec<PriceBar>, MarketDataError>;
}

// Yahoo chart payload, trimmed to the fields we read

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    chart: ChartBody,
}

#[derive(Debug, Deserialize)]
struct ChartBody {
    result: Option<Vec<ChartResult>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: Option<String>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<QuoteBlock>,
}

#[derive(Debug, Default, Deserialize)]
struct QuoteBlock {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<u64>>,
}

/// Turn a raw chart payload into bars, dropping days without a close.
fn parse_chart(symbol: &str, body: &str) -> Result<Vec<PriceBar>, MarketDataError> {
    let envelope: ChartEnvelope =
        serde_json::from_str(body).map_err(|e| MarketDataError::Provider {
            symbol: symbol.to_string(),
            message: format!("unreadable chart payload: {}", e),
        })?;

    if let Some(err) = envelope.chart.error {
        return Err(MarketDataError::Provider {
            symbol: symbol.to_string(),
            message: err
                .description
                .or(err.code)
                .unwrap_or_else(|| "unknown error".to_string()),
        });
    }

    let Some(result) = envelope.chart.result.and_then(|r| r.into_iter().next()) else {
        return Err(MarketDataError::NoData(symbol.to_string()));
    };

    let quote = result.indicators.quote.into_iter().next().unwrap_or_default();
    let at = |values: &Vec<Option<f64>>, i: usize| values.get(i).copied().flatten();

    let bars: Vec<PriceBar> = result
        .timestamp
        .iter()
        .enumerate()
        .filter_map(|(i, ts)| {
            let close = at(&quote.close, i)?;
            let timestamp = DateTime::from_timestamp(*ts, 0)?;
            Some(PriceBar {
                timestamp,
                open: at(&quote.open, i),
                high: at(&quote.high, i),
                low: at(&quote.low, i),
                close,
                volume: quote.volume.get(i).copied().flatten(),
            })
        })
        .collect();

    if bars.is_empty() {
        return Err(MarketDataError::NoData(symbol.to_string()));
    }

    Ok(bars)
}

/// Yahoo Finance v8 chart endpoint
pub struct YahooChartProvider {
    client: Client,
    base_url: String,
}

impl YahooChartProvider {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, MarketDataError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl QuoteProvider for YahooChartProvider {
    async fn daily_bars(
        &self,
        symbol: &str,
        range: ChartRange,
    ) -> Result<Vec<PriceBar>, MarketDataError> {
        let url = format!("{}/{}", self.base_url, symbol);

        let response = self
            .client
            .get(&url)
            .header("accept", "application/json")
            .query(&[("range", range.as_str()), ("interval", "1d")])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        // Unknown tickers come back as 404 with a chart.error payload
        if status == reqwest::StatusCode::NOT_FOUND {
            return parse_chart(symbol, &body);
        }

        if !status.is_success() {
            return Err(MarketDataError::Status {
                status: status.as_u16(),
                body: body.chars().take(200).collect(),
            });
        }

        parse_chart(symbol, &body)
    }
}

/// Close, open and percent change for the latest bar, formatted for display.
pub fn summarize(symbol: &str, bars: &[PriceBar]) -> QuoteView {
    let Some(last) = bars.last() else {
        return QuoteView::unavailable(symbol);
    };

    let open = last.open.filter(|o| o.is_finite());
    let change_percent = match open {
        Some(open) if open != 0.0 => format!("{:.2}", (last.close - open) / open * 100.0),
        _ => UNAVAILABLE.to_string(),
    };

    QuoteView {
        symbol: symbol.to_string(),
        close: format!("{:.2}", last.close),
        open: open
            .map(|o| format!("{:.2}", o))
            .unwrap_or_else(|| UNAVAILABLE.to_string()),
        change_percent,
    }
}

#[derive(Clone)]
pub struct MarketDataService {
    provider: Arc<dyn QuoteProvider>,
    cache: Arc<Cache<String, Arc<Vec<PriceBar>>>>,
}

impl MarketDataService {
    pub fn new(provider: Arc<dyn QuoteProvider>, ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(500)
            .time_to_live(ttl)
            .build();

        Self {
            provider,
            cache: Arc::new(cache),
        }
    }

    pub fn yahoo(
        base_url: &str,
        timeout: Duration,
        ttl: Duration,
    ) -> Result<Self, MarketDataError> {
        let provider = YahooChartProvider::new(base_url, timeout)?;
        Ok(Self::new(Arc::new(provider), ttl))
    }

    /// Daily bars for one symbol. Failures are returned, not cached.
    pub async fn history(
        &self,
        symbol: &str,
        range: ChartRange,
    ) -> Result<Arc<Vec<PriceBar>>, MarketDataError> {
        let cache_key = format!("{}_{}", symbol, range);

        if let Some(cached) = self.cache.get(&cache_key).await {
            tracing::debug!("Cache hit for {}", cache_key);
            return Ok(cached);
        }

        tracing::debug!("Fetching {} bars for {}", range, symbol);
        let bars = Arc::new(self.provider.daily_bars(symbol, range).await?);
        self.cache.insert(cache_key, bars.clone()).await;

        Ok(bars)
    }

    /// Latest quote for a symbol, or an "N/A" row when the provider has nothing.
    pub async fn quote(&self, symbol: &str) -> QuoteView {
        match self.history(symbol, ChartRange::OneMonth).await {
            Ok(bars) => summarize(symbol, &bars),
            Err(e) => {
                tracing::warn!("Quote unavailable for {}: {}", symbol, e);
                QuoteView::unavailable(symbol)
            }
        }
    }

    /// Quotes for several symbols, fetched concurrently, in input order.
    pub async fn quotes(&self, symbols: &[String]) -> Vec<QuoteView> {
        join_all(symbols.iter().map(|symbol| self.quote(symbol))).await
    }
}
