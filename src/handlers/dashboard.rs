use axum::{Json, extract::State, http::StatusCode};

use crate::AppState;
use crate::auth::AuthUser;
use crate::models::dashboard::DashboardResponse;
use crate::models::error::{ApiError, api_error, db_error};
use crate::services::{accounts, portfolio};

const RECENT_TRANSACTIONS: u64 = 10;

pub async fn get_dashboard(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<DashboardResponse>, ApiError> {
    let (user, profile) = accounts::load_profile(&state.db, auth.user.id).await?;

    let portfolio = portfolio::portfolio_for_user(&state.db, user.id)
        .await
        .map_err(db_error)?
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, "Portfolio not found"))?;

    let positions = portfolio::positions(&state.db, portfolio.id)
        .await
        .map_err(db_error)?;
    let recent_transactions =
        portfolio::transactions(&state.db, portfolio.id, Some(RECENT_TRANSACTIONS))
            .await
            .map_err(db_error)?;

    let mut symbols = state.config.dashboard_symbols.clone();
    for position in &positions {
        if !symbols.contains(&position.symbol) {
            symbols.push(position.symbol.clone());
        }
    }
    let market = state.market_data.quotes(&symbols).await;

    Ok(Json(DashboardResponse {
        username: user.username,
        portfolio_name: portfolio.name,
        account_balance: profile.account_balance,
        positions,
        recent_transactions,
        market,
    }))
}
