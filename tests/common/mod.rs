#![allow(dead_code)]

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{HeaderMap, Method, Request, StatusCode, header},
};
use chrono::DateTime;
use migration::{Migrator, MigratorTrait};
use paper_trader::{
    AppState, app_router,
    config::AppConfig,
    services::market_data::{
        ChartRange, MarketDataError, MarketDataService, PriceBar, QuoteProvider,
    },
};
use rust_decimal::Decimal;
use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};
use serde_json::{Value, json};
use tower::ServiceExt;

pub const TEST_PASSWORD: &str = "correct-horse-42";

/// Fresh in-memory SQLite database with every migration applied.
///
/// A single pooled connection keeps the in-memory database alive for the whole test.
pub async fn setup_test_db() -> Result<DatabaseConnection, DbErr> {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options
        .max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);

    let db = Database::connect(options).await?;
    Migrator::up(&db, None).await?;
    Ok(db)
}

/// Canned daily bars per symbol; unknown symbols have no data
pub struct StubProvider {
    bars: HashMap<String, Vec<PriceBar>>,
}

impl StubProvider {
    pub fn with_defaults() -> Self {
        let mut bars = HashMap::new();
        bars.insert(
            "AAPL".to_string(),
            vec![bar(1767225600, 148.0, 150.0), bar(1767312000, 150.0, 153.0)],
        );
        bars.insert("MSFT".to_string(), vec![bar(1767312000, 400.0, 396.0)]);
        Self { bars }
    }
}

fn bar(ts: i64, open: f64, close: f64) -> PriceBar {
    PriceBar {
        timestamp: DateTime::from_timestamp(ts, 0).unwrap(),
        open: Some(open),
        high: Some(open.max(close)),
        low: Some(open.min(close)),
        close,
        volume: Some(1_000),
    }
}

#[async_trait]
impl QuoteProvider for StubProvider {
    async fn daily_bars(
        &self,
        symbol: &str,
        _range: ChartRange,
    ) -> Result<Vec<PriceBar>, MarketDataError> {
        self.bars
            .get(symbol)
            .cloned()
            .ok_or_else(|| MarketDataError::NoData(symbol.to_string()))
    }
}

pub async fn build_test_state() -> AppState {
    let db = setup_test_db().await.expect("Failed to set up test DB");

    let config = AppConfig {
        dashboard_symbols: vec!["AAPL".to_string(), "MSFT".to_string(), "NOPE".to_string()],
        ..AppConfig::default()
    };

    AppState {
        db,
        market_data: MarketDataService::new(
            Arc::new(StubProvider::with_defaults()),
            Duration::from_secs(60),
        ),
        config: Arc::new(config),
    }
}

pub async fn build_test_app() -> (Router, AppState) {
    let state = build_test_state().await;
    (app_router(state.clone()), state)
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestResponse {
    /// Session key from the `Set-Cookie` header, if one was set
    pub fn session_cookie(&self) -> Option<String> {
        self.headers
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .find_map(|v| v.strip_prefix("sessionid="))
            .map(|v| v.split(';').next().unwrap_or_default().to_string())
    }
}

pub async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    session_key: Option<&str>,
    body: Option<Value>,
) -> TestResponse {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(key) = session_key {
        builder = builder.header(header::COOKIE, format!("sessionid={}", key));
    }
    builder = builder.header(header::USER_AGENT, "integration-test");

    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

    TestResponse {
        status,
        headers,
        body,
    }
}

/// Register `username` and return the session key it was logged in with
pub async fn register(app: &Router, username: &str) -> String {
    let response = send(
        app,
        Method::POST,
        "/register",
        None,
        Some(json!({
            "username": username,
            "password1": TEST_PASSWORD,
            "password2": TEST_PASSWORD,
        })),
    )
    .await;
    assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);
    response.body["session_key"].as_str().unwrap().to_string()
}

pub async fn trade(
    app: &Router,
    session_key: &str,
    side: &str,
    symbol: &str,
    quantity: &str,
    price: &str,
) -> TestResponse {
    send(
        app,
        Method::POST,
        "/trade",
        Some(session_key),
        Some(json!({
            "symbol": symbol,
            "side": side,
            "quantity": quantity,
            "price": price,
        })),
    )
    .await
}

/// Decimals serialize as JSON strings
pub fn decimal(value: &Value) -> Decimal {
    match value {
        Value::String(s) => Decimal::from_str(s).unwrap(),
        Value::Number(n) => Decimal::from_str(&n.to_string()).unwrap(),
        other => panic!("not a decimal: {}", other),
    }
}
