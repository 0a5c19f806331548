use sea_orm_migration::prelude::*;

use super::m20260301_000004_create_assets::Assets;
use super::m20260301_000005_create_portfolios::Portfolios;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Transactions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Transactions::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Transactions::PortfolioId).integer().not_null())
                    .col(ColumnDef::new(Transactions::AssetId).integer().not_null())
                    .col(
                        ColumnDef::new(Transactions::TransactionType)
                            .string_len(4)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Transactions::Quantity)
                            .decimal_len(16, 8)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Transactions::Price)
                            .decimal_len(16, 8)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Transactions::Timestamp)
                            .timestamp()
                            .not_null()
                            .default(SimpleExpr::Keyword(Keyword::CurrentTimestamp)),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_transactions_portfolio_id")
                            .from(Transactions::Table, Transactions::PortfolioId)
                            .to(Portfolios::Table, Portfolios::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_transactions_asset_id")
                            .from(Transactions::Table, Transactions::AssetId)
                            .to(Assets::Table, Assets::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_transactions_portfolio_timestamp")
                    .table(Transactions::Table)
                    .col(Transactions::PortfolioId)
                    .col(Transactions::Timestamp)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Transactions::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Transactions {
    Table,
    Id,
    PortfolioId,
    AssetId,
    TransactionType,
    Quantity,
    Price,
    Timestamp,
}
