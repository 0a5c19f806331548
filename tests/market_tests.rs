mod common;

use axum::http::{Method, StatusCode};

use crate::common::{build_test_app, send};

#[tokio::test]
async fn test_quotes_with_missing_symbol() {
    let (app, _state) = build_test_app().await;

    let response = send(&app, Method::GET, "/quotes?symbols=aapl,GHOST", None, None).await;
    assert_eq!(response.status, StatusCode::OK);

    let quotes = response.body["quotes"].as_array().unwrap();
    assert_eq!(quotes.len(), 2);
    assert_eq!(quotes[0]["symbol"], "AAPL");
    assert_eq!(quotes[0]["close"], "153.00");
    assert_eq!(quotes[0]["open"], "150.00");
    assert_eq!(quotes[0]["changePercent"], "2.00");

    assert_eq!(quotes[1]["symbol"], "GHOST");
    assert_eq!(quotes[1]["close"], "N/A");
    assert_eq!(quotes[1]["open"], "N/A");
    assert_eq!(quotes[1]["changePercent"], "N/A");
}

#[tokio::test]
async fn test_quotes_default_to_watchlist() {
    let (app, _state) = build_test_app().await;

    let response = send(&app, Method::GET, "/quotes", None, None).await;
    assert_eq!(response.status, StatusCode::OK);

    let quotes = response.body["quotes"].as_array().unwrap();
    assert_eq!(quotes.len(), 3);
    assert_eq!(quotes[1]["symbol"], "MSFT");
    assert_eq!(quotes[1]["changePercent"], "-1.00");
}

#[tokio::test]
async fn test_quotes_reject_bad_symbol() {
    let (app, _state) = build_test_app().await;
    let response = send(&app, Method::GET, "/quotes?symbols=AAPL,%24%24%24", None, None).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_chart() {
    let (app, _state) = build_test_app().await;

    let response = send(&app, Method::GET, "/chart/aapl?range=3mo", None, None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["symbol"], "AAPL");
    assert_eq!(response.body["range"], "3mo");

    let points = response.body["chartData"].as_array().unwrap();
    assert_eq!(points.len(), 2);
    assert_eq!(points[1]["close"], 153.0);
    assert_eq!(points[1]["open"], 150.0);

    let default_range = send(&app, Method::GET, "/chart/MSFT", None, None).await;
    assert_eq!(default_range.body["range"], "1mo");
}

#[tokio::test]
async fn test_chart_errors() {
    let (app, _state) = build_test_app().await;

    let no_data = send(&app, Method::GET, "/chart/GHOST", None, None).await;
    assert_eq!(no_data.status, StatusCode::NOT_FOUND);

    let bad_range = send(&app, Method::GET, "/chart/AAPL?range=3w", None, None).await;
    assert_eq!(bad_range.status, StatusCode::BAD_REQUEST);

    let bad_symbol = send(&app, Method::GET, "/chart/%24%24%24", None, None).await;
    assert_eq!(bad_symbol.status, StatusCode::BAD_REQUEST);
}
