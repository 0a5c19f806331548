use std::net::SocketAddr;
use std::sync::Arc;

use migration::{Migrator, MigratorTrait};
use paper_trader::{
    AppState, app_router, config::AppConfig, services::market_data::MarketDataService,
};
use sea_orm::Database;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,paper_trader=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env().expect("Invalid configuration");

    // Connect to database
    tracing::info!("Connecting to database...");
    let db = Database::connect(&config.database_url)
        .await
        .expect("Failed to connect to database");

    // Run migrations
    tracing::info!("Running migrations...");
    Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");

    let market_data = MarketDataService::yahoo(
        &config.market_data_base_url,
        config.market_data_timeout,
        config.market_data_cache_ttl,
    )
    .expect("Failed to build market data client");

    tracing::info!(
        "Dashboard watchlist: {}",
        config.dashboard_symbols.join(", ")
    );

    let listen_addr = config.listen_addr;
    let state = AppState {
        db,
        market_data,
        config: Arc::new(config),
    };

    let app = app_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(listen_addr)
        .await
        .expect("Failed to bind listen address");

    tracing::info!("Server listening on {}", listener.local_addr().unwrap());

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .unwrap();
}
