use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Placeholder shown for any quote value the provider could not supply
pub const UNAVAILABLE: &str = "N/A";

/// Dashboard quote row. Every value is pre-formatted; unavailable symbols carry "N/A".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteView {
    pub symbol: String,
    pub close: String,
    pub open: String,
    pub change_percent: String,
}

impl QuoteView {
    pub fn unavailable(symbol: &str) -> Self {
        Self {
            symbol: symbol.to_string(),
            close: UNAVAILABLE.to_string(),
            open: UNAVAILABLE.to_string(),
            change_percent: UNAVAILABLE.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct QuotesQuery {
    /// Comma separated, e.g. `AAPL,MSFT`
    pub symbols: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct QuotesResponse {
    pub quotes: Vec<QuoteView>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChartQuery {
    pub range: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartPoint {
    pub date: DateTime<Utc>,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: f64,
    pub volume: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartResponse {
    pub symbol: String,
    pub range: String,
    pub chart_data: Vec<ChartPoint>,
}
