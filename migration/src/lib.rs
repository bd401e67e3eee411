pub use sea_orm_migration::prelude::*;

pub mod entities;
mod m20260301_000001_accounts;
mod m20260301_000002_rbac;
mod m20260301_000003_rbac_seed;
mod m20260301_000004_audit_and_blacklist;
mod m20260301_000005_analytics_events;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260301_000001_accounts::Migration),
            Box::new(m20260301_000002_rbac::Migration),
            Box::new(m20260301_000003_rbac_seed::Migration),
            Box::new(m20260301_000004_audit_and_blacklist::Migration),
            Box::new(m20260301_000005_analytics_events::Migration),
        ]
    }
}
