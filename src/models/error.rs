use axum::{Json, http::StatusCode};
use serde::{Deserialize, Serialize};

use crate::services::{accounts::AccountError, market_data::MarketDataError, trading::TradeError};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Error shape every handler returns
pub type ApiError = (StatusCode, Json<ErrorResponse>);

pub fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

pub fn db_error(e: sea_orm::DbErr) -> ApiError {
    tracing::error!("Database error: {}", e);
    api_error(
        StatusCode::INTERNAL_SERVER_ERROR,
        format!("Database error: {}", e),
    )
}

impl From<TradeError> for ApiError {
    fn from(e: TradeError) -> Self {
        match e {
            TradeError::Database(e) => db_error(e),
            TradeError::AccountNotFound => api_error(StatusCode::NOT_FOUND, e.to_string()),
            other => api_error(StatusCode::BAD_REQUEST, other.to_string()),
        }
    }
}

impl From<AccountError> for ApiError {
    fn from(e: AccountError) -> Self {
        let status = match e {
            AccountError::Database(e) => return db_error(e),
            AccountError::Validation(_) => StatusCode::BAD_REQUEST,
            AccountError::UsernameTaken => StatusCode::CONFLICT,
            AccountError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AccountError::Inactive => StatusCode::FORBIDDEN,
            AccountError::NotFound => StatusCode::NOT_FOUND,
            AccountError::Hashing(ref message) => {
                tracing::error!("Password hashing error: {}", message);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        api_error(status, e.to_string())
    }
}

impl From<MarketDataError> for ApiError {
    fn from(e: MarketDataError) -> Self {
        let status = match &e {
            MarketDataError::InvalidRange(_) => StatusCode::BAD_REQUEST,
            MarketDataError::NoData(_) => StatusCode::NOT_FOUND,
            _ => {
                tracing::warn!("Market data error: {}", e);
                StatusCode::BAD_GATEWAY
            }
        };
        api_error(status, e.to_string())
    }
}
