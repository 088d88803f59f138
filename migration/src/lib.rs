pub use sea_orm_migration::prelude::*;

pub mod entities;
mod m20260301_000001_money_tables;
mod m20260301_000002_affiliate_tables;
mod m20260301_000003_referral_payout_tables;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260301_000001_money_tables::Migration),
            Box::new(m20260301_000002_affiliate_tables::Migration),
            Box::new(m20260301_000003_referral_payout_tables::Migration),
        ]
    }
}
