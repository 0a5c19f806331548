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
                    .table(PortfolioPositions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PortfolioPositions::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(PortfolioPositions::PortfolioId).integer().not_null())
                    .col(ColumnDef::new(PortfolioPositions::AssetId).integer().not_null())
                    .col(
                        ColumnDef::new(PortfolioPositions::Quantity)
                            .decimal_len(16, 8)
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_portfolio_positions_portfolio_id")
                            .from(PortfolioPositions::Table, PortfolioPositions::PortfolioId)
                            .to(Portfolios::Table, Portfolios::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_portfolio_positions_asset_id")
                            .from(PortfolioPositions::Table, PortfolioPositions::AssetId)
                            .to(Assets::Table, Assets::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // One position row per asset within a portfolio
        manager
            .create_index(
                Index::create()
                    .name("idx_portfolio_positions_unique")
                    .table(PortfolioPositions::Table)
                    .col(PortfolioPositions::PortfolioId)
                    .col(PortfolioPositions::AssetId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PortfolioPositions::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum PortfolioPositions {
    Table,
    Id,
    PortfolioId,
    AssetId,
    Quantity,
}
