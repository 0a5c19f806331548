use axum::{Json, extract::State, http::StatusCode};

use crate::AppState;
use crate::auth::AuthUser;
use crate::models::error::{ApiError, api_error, db_error};
use crate::models::trade::{TradeRequest, TradeResponse, TransactionListResponse};
use crate::services::portfolio;
use crate::services::trading::{TradeOrder, execute_trade};

pub async fn trade(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<TradeRequest>,
) -> Result<(StatusCode, Json<TradeResponse>), ApiError> {
    let order = TradeOrder::from_request(&payload)?;
    let receipt = execute_trade(&state.db, auth.user.id, &order).await?;

    Ok((
        StatusCode::CREATED,
        Json(TradeResponse {
            transaction: portfolio::to_entry(receipt.transaction, receipt.asset.symbol),
            account_balance: receipt.balance,
            position_quantity: receipt.position_quantity,
        }),
    ))
}

/// Whole ledger for the caller's portfolio, newest first
pub async fn list_transactions(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<TransactionListResponse>, ApiError> {
    let portfolio = portfolio::portfolio_for_user(&state.db, auth.user.id)
        .await
        .map_err(db_error)?
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, "Portfolio not found"))?;

    let transactions = portfolio::transactions(&state.db, portfolio.id, None)
        .await
        .map_err(db_error)?;

    Ok(Json(TransactionListResponse { transactions }))
}
