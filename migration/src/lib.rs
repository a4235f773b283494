pub use sea_orm_migration::prelude::*;

mod m20261016_000001_create_users;
mod m20261016_000002_create_promotions;
mod m20261016_000003_create_affiliate_system;
mod m20261016_000004_create_coupon_redemptions;
mod m20261016_000005_create_tracked_events;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
  fn migrations() -> Vec<Box<dyn MigrationTrait>> {
    vec![
      Box::new(m20261016_000001_create_users::Migration),
      Box::new(m20261016_000002_create_promotions::Migration),
      Box::new(m20261016_000003_create_affiliate_system::Migration),
      Box::new(m20261016_000004_create_coupon_redemptions::Migration),
      Box::new(m20261016_000005_create_tracked_events::Migration),
    ]
  }
}
