//! Trade execution
//!
//! Applies a BUY or SELL against the user's cash balance and position. Every
//! mutation of a single trade happens inside one database transaction, so a
//! rejected order leaves balance, position and ledger untouched.

use chrono::Utc;
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, ModelTrait,
    QueryFilter, QuerySelect, Select, Set, TransactionTrait,
};
use thiserror::Error;
use tracing::info;

use crate::entities::{
    assets, portfolio_positions, portfolios, prelude::*, transactions, user_profiles,
};
use crate::models::trade::{AssetType, TradeRequest, TradeSide};
use crate::services::assets::{normalize_symbol, resolve_or_create};

/// Largest quantity or price the ledger columns hold (16 digits, 8 after the point)
const MAX_UNITS: Decimal = dec!(99999999.99999999);
/// Largest balance the profile column holds (15 digits, 2 after the point)
const MAX_BALANCE: Decimal = dec!(9999999999999.99);
const UNIT_SCALE: u32 = 8;
const BALANCE_SCALE: u32 = 2;

#[derive(Debug, Error)]
pub enum TradeError {
    #[error("Quantity must be greater than zero with at most 8 decimal places")]
    InvalidQuantity,
    #[error("Price must be greater than zero with at most 8 decimal places")]
    InvalidPrice,
    #[error("Invalid symbol: '{0}'")]
    InvalidSymbol(String),
    #[error("Order value exceeds the supported range")]
    Overflow,
    #[error("Insufficient funds: order costs {required} but the available balance is {available}")]
    InsufficientFunds {
        required: Decimal,
        available: Decimal,
    },
    #[error("No position held in {symbol}")]
    NoPosition { symbol: String },
    #[error("Insufficient holdings: cannot sell {requested} {symbol}, only {held} held")]
    InsufficientHoldings {
        symbol: String,
        requested: Decimal,
        held: Decimal,
    },
    #[error("Trading account not found")]
    AccountNotFound,
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

/// A validated order, ready to be settled
#[derive(Debug, Clone, PartialEq)]
pub struct TradeOrder {
    pub symbol: String,
    pub side: TradeSide,
    pub quantity: Decimal,
    pub price: Decimal,
    pub name: Option<String>,
    pub asset_type: Option<AssetType>,
}

impl TradeOrder {
    pub fn new(
        symbol: &str,
        side: TradeSide,
        quantity: Decimal,
        price: Decimal,
    ) -> Result<Self, TradeError> {
        let symbol =
            normalize_symbol(symbol).ok_or_else(|| TradeError::InvalidSymbol(symbol.to_string()))?;
        let quantity = quantity.normalize();
        let price = price.normalize();

        if quantity <= Decimal::ZERO || quantity.scale() > UNIT_SCALE {
            return Err(TradeError::InvalidQuantity);
        }
        if price <= Decimal::ZERO || price.scale() > UNIT_SCALE {
            return Err(TradeError::InvalidPrice);
        }
        if quantity > MAX_UNITS || price > MAX_UNITS {
            return Err(TradeError::Overflow);
        }

        Ok(Self {
            symbol,
            side,
            quantity,
            price,
            name: None,
            asset_type: None,
        })
    }

    pub fn from_request(request: &TradeRequest) -> Result<Self, TradeError> {
        let mut order = Self::new(&request.symbol, request.side, request.quantity, request.price)?;
        order.name = request.name.clone();
        order.asset_type = request.asset_type;
        Ok(order)
    }

    /// quantity × price
    pub fn notional(&self) -> Result<Decimal, TradeError> {
        self.quantity
            .checked_mul(self.price)
            .ok_or(TradeError::Overflow)
    }
}

/// Balance and position after a trade
#[derive(Debug, Clone, PartialEq)]
pub struct Settlement {
    pub balance: Decimal,
    /// `None` when the position is fully closed
    pub position: Option<Decimal>,
    pub notional: Decimal,
    /// Cash moved: buy cost rounded up to the cent, sell proceeds rounded down
    pub cash: Decimal,
}

/// Pure balance/position arithmetic for one order.
///
/// `held` is the current position quantity, `None` when no position row exists.
pub fn settle(
    order: &TradeOrder,
    balance: Decimal,
    held: Option<Decimal>,
) -> Result<Settlement, TradeError> {
    let notional = order.notional()?;

    match order.side {
        TradeSide::Buy => {
            let cost =
                notional.round_dp_with_strategy(BALANCE_SCALE, RoundingStrategy::AwayFromZero);
            if balance < cost {
                return Err(TradeError::InsufficientFunds {
                    required: cost,
                    available: balance,
                });
            }

            let position = held.unwrap_or(Decimal::ZERO) + order.quantity;
            if position > MAX_UNITS {
                return Err(TradeError::Overflow);
            }

            Ok(Settlement {
                balance: (balance - cost).round_dp(BALANCE_SCALE),
                position: Some(position),
                notional,
                cash: cost,
            })
        }
        TradeSide::Sell => {
            let held = held.ok_or_else(|| TradeError::NoPosition {
                symbol: order.symbol.clone(),
            })?;

            if held < order.quantity {
                return Err(TradeError::InsufficientHoldings {
                    symbol: order.symbol.clone(),
                    requested: order.quantity,
                    held,
                });
            }

            let proceeds =
                notional.round_dp_with_strategy(BALANCE_SCALE, RoundingStrategy::ToZero);
            let balance = (balance + proceeds).round_dp(BALANCE_SCALE);
            if balance > MAX_BALANCE {
                return Err(TradeError::Overflow);
            }

            let remaining = held - order.quantity;
            Ok(Settlement {
                balance,
                position: if remaining.is_zero() {
                    None
                } else {
                    Some(remaining)
                },
                notional,
                cash: proceeds,
            })
        }
    }
}

/// Outcome of a committed trade
#[derive(Debug, Clone)]
pub struct TradeReceipt {
    pub transaction: transactions::Model,
    pub asset: assets::Model,
    pub balance: Decimal,
    pub position_quantity: Decimal,
}

/// The user's profile row, locked `FOR UPDATE` until the trade commits.
///
/// Concurrent trades for one user queue on this lock instead of both debiting
/// from the same balance. SQLite has no row locks and ignores the clause.
fn profile_for_update(user_id: i32) -> Select<UserProfiles> {
    UserProfiles::find()
        .filter(user_profiles::Column::UserId.eq(user_id))
        .lock_exclusive()
}

/// Validate and apply `order` for `user_id`, all-or-nothing.
pub async fn execute_trade(
    db: &DatabaseConnection,
    user_id: i32,
    order: &TradeOrder,
) -> Result<TradeReceipt, TradeError> {
    let txn = db.begin().await?;

    let profile = profile_for_update(user_id)
        .one(&txn)
        .await?
        .ok_or(TradeError::AccountNotFound)?;

    let portfolio = Portfolios::find()
        .filter(portfolios::Column::UserId.eq(user_id))
        .one(&txn)
        .await?
        .ok_or(TradeError::AccountNotFound)?;

    let asset = resolve_or_create(&txn, &order.symbol, order.name.as_deref(), order.asset_type)
        .await?;

    let position = PortfolioPositions::find()
        .filter(portfolio_positions::Column::PortfolioId.eq(portfolio.id))
        .filter(portfolio_positions::Column::AssetId.eq(asset.id))
        .one(&txn)
        .await?;

    // Returning here drops `txn`, which rolls back the asset insert as well
    let settlement = settle(
        order,
        profile.account_balance,
        position.as_ref().map(|p| p.quantity),
    )?;

    let now = Utc::now().naive_utc();

    let mut profile_model: user_profiles::ActiveModel = profile.into();
    profile_model.account_balance = Set(settlement.balance);
    profile_model.updated_at = Set(now);
    profile_model.update(&txn).await?;

    match (position, settlement.position) {
        (Some(existing), Some(quantity)) => {
            let mut active_model: portfolio_positions::ActiveModel = existing.into();
            active_model.quantity = Set(quantity);
            active_model.update(&txn).await?;
        }
        (Some(existing), None) => {
            existing.delete(&txn).await?;
        }
        (None, Some(quantity)) => {
            let new_position = portfolio_positions::ActiveModel {
                portfolio_id: Set(portfolio.id),
                asset_id: Set(asset.id),
                quantity: Set(quantity),
                ..Default::default()
            };
            new_position.insert(&txn).await?;
        }
        // settle never closes a position that does not exist
        (None, None) => {}
    }

    let transaction = transactions::ActiveModel {
        portfolio_id: Set(portfolio.id),
        asset_id: Set(asset.id),
        transaction_type: Set(order.side.as_str().to_string()),
        quantity: Set(order.quantity),
        price: Set(order.price),
        timestamp: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;

    info!(
        user_id,
        side = %order.side,
        symbol = %order.symbol,
        quantity = %order.quantity,
        price = %order.price,
        balance = %settlement.balance,
        "Trade executed"
    );

    Ok(TradeReceipt {
        transaction,
        asset,
        balance: settlement.balance,
        position_quantity: settlement.position.unwrap_or(Decimal::ZERO),
    })
}
