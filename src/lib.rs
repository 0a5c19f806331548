// src/lib.rs

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use sea_orm::DatabaseConnection;
use tower_http::trace::TraceLayer;

use config::AppConfig;
use services::market_data::MarketDataService;

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub market_data: MarketDataService,
    pub config: Arc<AppConfig>,
}

pub mod entities {
    pub mod prelude;
    pub mod assets;
    pub mod portfolio_positions;
    pub mod portfolios;
    pub mod transactions;
    pub mod user_profiles;
    pub mod user_sessions;
    pub mod users;
}

pub mod services {
    pub mod accounts;
    pub mod assets;
    pub mod market_data;
    pub mod portfolio;
    pub mod sessions;
    pub mod trading;
}

pub mod handlers {
    pub mod account;
    pub mod dashboard;
    pub mod market;
    pub mod trade;
}

pub mod auth;
pub mod config;
pub mod models;

async fn home() -> &'static str {
    "Hello from Paper Trader Backend! 📈"
}

pub fn app_router(state: AppState) -> Router {
    use handlers::{account, dashboard, market, trade};

    Router::new()
        .route("/", get(home))
        .route("/register", post(account::register))
        .route("/login", post(account::login))
        .route("/logout", post(account::logout))
        .route(
            "/profile",
            get(account::get_profile)
                .put(account::update_profile)
                .post(account::update_profile),
        )
        .route("/dashboard", get(dashboard::get_dashboard))
        .route("/trade", post(trade::trade))
        .route("/transactions", get(trade::list_transactions))
        .route("/quotes", get(market::get_quotes))
        .route("/chart/{symbol}", get(market::get_chart))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
