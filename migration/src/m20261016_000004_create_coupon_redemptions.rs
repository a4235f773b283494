use sea_orm_migration::prelude::*;

use super::{
  m20261016_000001_create_users::Users,
  m20261016_000002_create_promotions::{CouponCodes, Promotions},
};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
  async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .create_table(
        Table::create()
          .table(CouponRedemptions::Table)
          .if_not_exists()
          .col(
            ColumnDef::new(CouponRedemptions::Id)
              .integer()
              .not_null()
              .auto_increment()
              .primary_key(),
          )
          .col(
            ColumnDef::new(CouponRedemptions::CouponId).integer().not_null(),
          )
          .col(
            ColumnDef::new(CouponRedemptions::PromotionId)
              .integer()
              .not_null(),
          )
          .col(ColumnDef::new(CouponRedemptions::UserId).integer().not_null())
          .col(
            ColumnDef::new(CouponRedemptions::RedeemedAt)
              .date_time()
              .not_null(),
          )
          .foreign_key(
            ForeignKey::create()
              .name("fk_coupon_redemptions_coupon")
              .from(CouponRedemptions::Table, CouponRedemptions::CouponId)
              .to(CouponCodes::Table, CouponCodes::Id)
              .on_delete(ForeignKeyAction::Cascade),
          )
          .foreign_key(
            ForeignKey::create()
              .name("fk_coupon_redemptions_promotion")
              .from(CouponRedemptions::Table, CouponRedemptions::PromotionId)
              .to(Promotions::Table, Promotions::Id)
              .on_delete(ForeignKeyAction::Cascade),
          )
          .foreign_key(
            ForeignKey::create()
              .name("fk_coupon_redemptions_user")
              .from(CouponRedemptions::Table, CouponRedemptions::UserId)
              .to(Users::Table, Users::Id)
              .on_delete(ForeignKeyAction::Cascade),
          )
          .to_owned(),
      )
      .await?;

    manager
      .create_index(
        Index::create()
          .name("idx_coupon_redemptions_promotion_user")
          .table(CouponRedemptions::Table)
          .col(CouponRedemptions::PromotionId)
          .col(CouponRedemptions::UserId)
          .to_owned(),
      )
      .await
  }

  async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .drop_table(Table::drop().table(CouponRedemptions::Table).to_owned())
      .await
  }
}

#[derive(DeriveIden)]
enum CouponRedemptions {
  Table,
  Id,
  CouponId,
  PromotionId,
  UserId,
  RedeemedAt,
}
