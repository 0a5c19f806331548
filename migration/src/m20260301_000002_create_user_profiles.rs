use sea_orm_migration::prelude::*;

use super::m20260301_000001_create_users::Users;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(UserProfiles::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(UserProfiles::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(UserProfiles::UserId)
                            .integer()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(UserProfiles::PhoneNumber).string_len(11).null())
                    .col(ColumnDef::new(UserProfiles::DateOfBirth).date().null())
                    .col(
                        ColumnDef::new(UserProfiles::AccountBalance)
                            .decimal_len(15, 2)
                            .not_null()
                            .default(10000), // Every new account starts with 10k of play money
                    )
                    .col(
                        ColumnDef::new(UserProfiles::CreatedAt)
                            .timestamp()
                            .not_null()
                            .default(SimpleExpr::Keyword(Keyword::CurrentTimestamp)),
                    )
                    .col(
                        ColumnDef::new(UserProfiles::UpdatedAt)
                            .timestamp()
                            .not_null()
                            .default(SimpleExpr::Keyword(Keyword::CurrentTimestamp)),
                    )
                    .col(ColumnDef::new(UserProfiles::LastLoginIp).string_len(45).null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_user_profiles_user_id")
                            .from(UserProfiles::Table, UserProfiles::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(UserProfiles::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum UserProfiles {
    Table,
    Id,
    UserId,
    PhoneNumber,
    DateOfBirth,
    AccountBalance,
    CreatedAt,
    UpdatedAt,
    LastLoginIp,
}
