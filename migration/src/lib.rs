pub use sea_orm_migration::prelude::*;

mod m20260301_000001_create_users;
mod m20260301_000002_create_user_profiles;
mod m20260301_000003_create_user_sessions;
mod m20260301_000004_create_assets;
mod m20260301_000005_create_portfolios;
mod m20260301_000006_create_portfolio_positions;
mod m20260301_000007_create_transactions;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260301_000001_create_users::Migration),
            Box::new(m20260301_000002_create_user_profiles::Migration),
            Box::new(m20260301_000003_create_user_sessions::Migration),
            Box::new(m20260301_000004_create_assets::Migration),
            Box::new(m20260301_000005_create_portfolios::Migration),
            Box::new(m20260301_000006_create_portfolio_positions::Migration),
            Box::new(m20260301_000007_create_transactions::Migration),
        ]
    }
}
