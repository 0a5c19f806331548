use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};

use crate::AppState;
use crate::config::parse_symbol_list;
use crate::models::error::{ApiError, api_error};
use crate::models::market::{ChartPoint, ChartQuery, ChartResponse, QuotesQuery, QuotesResponse};
use crate::services::assets::normalize_symbol;
use crate::services::market_data::ChartRange;

const MAX_QUOTE_SYMBOLS: usize = 25;

/// Quotes for `?symbols=A,B`, or the dashboard watchlist when none are given
pub async fn get_quotes(
    State(state): State<AppState>,
    Query(params): Query<QuotesQuery>,
) -> Result<Json<QuotesResponse>, ApiError> {
    let requested = params
        .symbols
        .as_deref()
        .map(parse_symbol_list)
        .unwrap_or_default();

    let symbols = if requested.is_empty() {
        state.config.dashboard_symbols.clone()
    } else {
        if requested.len() > MAX_QUOTE_SYMBOLS {
            return Err(api_error(
                StatusCode::BAD_REQUEST,
                format!("At most {} symbols per request", MAX_QUOTE_SYMBOLS),
            ));
        }
        if let Some(bad) = requested.iter().find(|s| normalize_symbol(s).is_none()) {
            return Err(api_error(
                StatusCode::BAD_REQUEST,
                format!("Invalid symbol: '{}'", bad),
            ));
        }
        requested
    };

    let quotes = state.market_data.quotes(&symbols).await;
    Ok(Json(QuotesResponse { quotes }))
}

pub async fn get_chart(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
    Query(params): Query<ChartQuery>,
) -> Result<Json<ChartResponse>, ApiError> {
    let symbol = normalize_symbol(&symbol).ok_or_else(|| {
        api_error(
            StatusCode::BAD_REQUEST,
            format!("Invalid symbol: '{}'", symbol),
        )
    })?;

    let range = match params.range.as_deref() {
        Some(raw) => raw.parse::<ChartRange>()?,
        None => ChartRange::default(),
    };

    let bars = state.market_data.history(&symbol, range).await?;

    let chart_data = bars
        .iter()
        .map(|bar| ChartPoint {
            date: bar.timestamp,
            open: bar.open,
            high: bar.high,
            low: bar.low,
            close: bar.close,
            volume: bar.volume,
        })
        .collect();

    Ok(Json(ChartResponse {
        symbol,
        range: range.to_string(),
        chart_data,
    }))
}
