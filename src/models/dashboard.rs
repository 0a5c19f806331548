use rust_decimal::Decimal;
use serde::Serialize;

use crate::models::market::QuoteView;
use crate::models::trade::{PositionEntry, TransactionEntry};

#[derive(Debug, Clone, Serialize)]
pub struct DashboardResponse {
    pub username: String,
    pub portfolio_name: String,
    pub account_balance: Decimal,
    pub positions: Vec<PositionEntry>,
    pub recent_transactions: Vec<TransactionEntry>,
    /// Watchlist plus every held symbol
    pub market: Vec<QuoteView>,
}
