//! Read side of the portfolio: positions and the transaction ledger

use sea_orm::{
    ColumnTrait, ConnectionTrait, DbErr, EntityTrait, Order, QueryFilter, QueryOrder, QuerySelect,
};

use crate::entities::{portfolio_positions, portfolios, prelude::*, transactions};
use crate::models::trade::{PositionEntry, TransactionEntry};

pub async fn portfolio_for_user<C>(
    conn: &C,
    user_id: i32,
) -> Result<Option<portfolios::Model>, DbErr>
where
    C: ConnectionTrait,
{
    Portfolios::find()
        .filter(portfolios::Column::UserId.eq(user_id))
        .one(conn)
        .await
}

/// Open positions, sorted by symbol
pub async fn positions<C>(conn: &C, portfolio_id: i32) -> Result<Vec<PositionEntry>, DbErr>
where
    C: ConnectionTrait,
{
    let rows = PortfolioPositions::find()
        .filter(portfolio_positions::Column::PortfolioId.eq(portfolio_id))
        .find_also_related(Assets)
        .all(conn)
        .await?;

    let mut entries: Vec<PositionEntry> = rows
        .into_iter()
        .filter_map(|(position, asset)| {
            // The FK cascades, so a missing asset only happens mid-delete
            let asset = asset?;
            Some(PositionEntry {
                symbol: asset.symbol,
                name: asset.name,
                asset_type: asset.asset_type,
                quantity: position.quantity,
            })
        })
        .collect();

    entries.sort_by(|a, b| a.symbol.cmp(&b.symbol));
    Ok(entries)
}

/// Ledger entries, newest first. `limit = None` returns the whole history.
pub async fn transactions<C>(
    conn: &C,
    portfolio_id: i32,
    limit: Option<u64>,
) -> Result<Vec<TransactionEntry>, DbErr>
where
    C: ConnectionTrait,
{
    let mut query = Transactions::find()
        .filter(transactions::Column::PortfolioId.eq(portfolio_id))
        .order_by(transactions::Column::Timestamp, Order::Desc)
        .order_by(transactions::Column::Id, Order::Desc)
        .find_also_related(Assets);

    if let Some(limit) = limit {
        query = query.limit(limit);
    }

    let rows = query.all(conn).await?;

    Ok(rows
        .into_iter()
        .map(|(transaction, asset)| {
            let symbol = asset.map(|a| a.symbol).unwrap_or_default();
            to_entry(transaction, symbol)
        })
        .collect())
}

pub fn to_entry(transaction: transactions::Model, symbol: String) -> TransactionEntry {
    TransactionEntry {
        id: transaction.id,
        symbol,
        total: transaction.quantity * transaction.price,
        transaction_type: transaction.transaction_type,
        quantity: transaction.quantity,
        price: transaction.price,
        timestamp: transaction.timestamp,
    }
}
