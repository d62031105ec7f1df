pub use sea_orm_migration::prelude::*;

mod m20260829_000001_faction;
mod m20260829_000002_snapshot;
mod m20260829_000003_snapshot_member;
mod m20260829_000004_member;
mod m20260829_000005_member_faction;
mod m20260829_000006_daily_aggregate;
mod m20260829_000007_ranking;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260829_000001_faction::Migration),
            Box::new(m20260829_000002_snapshot::Migration),
            Box::new(m20260829_000003_snapshot_member::Migration),
            Box::new(m20260829_000004_member::Migration),
            Box::new(m20260829_000005_member_faction::Migration),
            Box::new(m20260829_000006_daily_aggregate::Migration),
            Box::new(m20260829_000007_ranking::Migration),
        ]
    }
}
