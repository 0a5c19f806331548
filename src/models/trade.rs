use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Trade direction, stored as "BUY" / "SELL" in the ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeSide {
    Buy,
    Sell,
}

impl TradeSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeSide::Buy => "BUY",
            TradeSide::Sell => "SELL",
        }
    }
}

impl std::fmt::Display for TradeSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Asset categories accepted by the catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetType {
    #[default]
    Stock,
    Crypto,
    Forex,
    Etf,
}

impl AssetType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetType::Stock => "stock",
            AssetType::Crypto => "crypto",
            AssetType::Forex => "forex",
            AssetType::Etf => "etf",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TradeRequest {
    pub symbol: String,
    pub quantity: Decimal,
    pub price: Decimal,
    #[serde(alias = "transaction_type")]
    pub side: TradeSide,
    /// Display name used when the asset is first added to the catalog
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub asset_type: Option<AssetType>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TradeResponse {
    pub transaction: TransactionEntry,
    pub account_balance: Decimal,
    /// Remaining quantity, zero when the position was closed
    pub position_quantity: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct TransactionEntry {
    pub id: i32,
    pub symbol: String,
    pub transaction_type: String,
    pub quantity: Decimal,
    pub price: Decimal,
    pub total: Decimal,
    pub timestamp: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize)]
pub struct PositionEntry {
    pub symbol: String,
    pub name: String,
    pub asset_type: String,
    pub quantity: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct TransactionListResponse {
    pub transactions: Vec<TransactionEntry>,
}
