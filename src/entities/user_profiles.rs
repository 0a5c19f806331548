//! `SeaORM` Entity for user_profiles table
//!
//! Account-level attributes extending a user, including the cash balance.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "user_profiles")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub user_id: i32,
    pub phone_number: Option<String>,
    pub date_of_birth: Option<Date>,
    /// Cash available for buying, two decimal places
    #[sea_orm(column_type = "Decimal(Some((15, 2)))")]
    pub account_balance: Decimal,
    pub created_at: DateTime,
    pub updated_at: DateTime,
    pub last_login_ip: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id",
        on_delete = "Cascade"
    )]
    Users,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Users.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
