pub use sea_orm_migration::prelude::*;

mod m20251001_000001_create_catalog;
mod m20251001_000002_create_promo_reservations;
mod m20251003_000001_create_payment_records;
mod m20251010_000001_add_plan_subscriptions;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20251001_000001_create_catalog::Migration),
            Box::new(m20251001_000002_create_promo_reservations::Migration),
            Box::new(m20251003_000001_create_payment_records::Migration),
            Box::new(m20251010_000001_add_plan_subscriptions::Migration),
        ]
    }
}
