//! Asset catalog: ticker symbol → display name and category.
//!
//! Assets are created lazily the first time a symbol is traded.

use lazy_static::lazy_static;
use regex::Regex;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, Set, SqlErr,
    TransactionTrait,
};

use crate::entities::{assets, prelude::Assets};
use crate::models::trade::AssetType;

lazy_static! {
    // Plain tickers plus the punctuation market-data symbols use (BRK.B, BTC-USD, ^GSPC, EURUSD=X)
    static ref SYMBOL_RE: Regex = Regex::new(r"^[A-Z0-9^][A-Z0-9.\-^=]{0,19}$").unwrap();
}

/// Trim and uppercase a ticker, returning `None` when it is not a plausible symbol
pub fn normalize_symbol(raw: &str) -> Option<String> {
    let symbol = raw.trim().to_uppercase();
    if SYMBOL_RE.is_match(&symbol) {
        Some(symbol)
    } else {
        None
    }
}

/// Find the asset for `symbol`, inserting it when this is the first time it is seen.
///
/// `symbol` must already be normalized. Runs on whatever connection it is given so the
/// trade executor can keep it inside its transaction.
pub async fn resolve_or_create<C>(
    conn: &C,
    symbol: &str,
    name: Option<&str>,
    asset_type: Option<AssetType>,
) -> Result<assets::Model, DbErr>
where
    C: ConnectionTrait + TransactionTrait,
{
    if let Some(existing) = find_by_symbol(conn, symbol).await? {
        return Ok(existing);
    }
    insert_or_find(conn, symbol, name, asset_type).await
}

async fn find_by_symbol<C>(conn: &C, symbol: &str) -> Result<Option<assets::Model>, DbErr>
where
    C: ConnectionTrait,
{
    Assets::find()
        .filter(assets::Column::Symbol.eq(symbol))
        .one(conn)
        .await
}

/// Insert the asset, or return the row a concurrent request inserted first.
///
/// The insert runs under a savepoint so a unique violation does not abort the
/// caller's transaction on Postgres.
async fn insert_or_find<C>(
    conn: &C,
    symbol: &str,
    name: Option<&str>,
    asset_type: Option<AssetType>,
) -> Result<assets::Model, DbErr>
where
    C: ConnectionTrait + TransactionTrait,
{
    let name = name
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(|n| n.chars().take(120).collect::<String>())
        .unwrap_or_else(|| symbol.to_string());

    let new_asset = assets::ActiveModel {
        symbol: Set(symbol.to_string()),
        name: Set(name),
        asset_type: Set(asset_type.unwrap_or_default().as_str().to_string()),
        ..Default::default()
    };

    let savepoint = conn.begin().await?;
    match new_asset.insert(&savepoint).await {
        Ok(asset) => {
            savepoint.commit().await?;
            tracing::info!("Added {} to the asset catalog ({})", asset.symbol, asset.asset_type);
            Ok(asset)
        }
        Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
            savepoint.rollback().await?;
            tracing::debug!("{} was added concurrently, reusing it", symbol);
            find_by_symbol(conn, symbol).await?.ok_or(e)
        }
        Err(e) => Err(e),
    }
}
