//! `SeaORM` Entity for assets table

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "assets")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub symbol: String,
    pub name: String,
    /// One of: stock, crypto, forex, etf
    pub asset_type: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::portfolio_positions::Entity")]
    PortfolioPositions,
    #[sea_orm(has_many = "super::transactions::Entity")]
    Transactions,
}

impl Related<super::portfolio_positions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PortfolioPositions.def()
    }
}

impl Related<super::transactions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transactions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
