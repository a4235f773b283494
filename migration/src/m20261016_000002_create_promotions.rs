use sea_orm_migration::prelude::*;

use super::m20261016_000001_create_users::Users;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
  async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .create_table(
        Table::create()
          .table(Promotions::Table)
          .if_not_exists()
          .col(
            ColumnDef::new(Promotions::Id)
              .integer()
              .not_null()
              .auto_increment()
              .primary_key(),
          )
          .col(ColumnDef::new(Promotions::Name).string().not_null())
          .col(
            ColumnDef::new(Promotions::Description)
              .string()
              .not_null()
              .default(""),
          )
          .col(ColumnDef::new(Promotions::DiscountKind).string().not_null())
          .col(
            ColumnDef::new(Promotions::DiscountValue).big_integer().not_null(),
          )
          .col(ColumnDef::new(Promotions::StartDate).date_time().not_null())
          .col(ColumnDef::new(Promotions::EndDate).date_time().null())
          .col(
            ColumnDef::new(Promotions::IsActive)
              .boolean()
              .not_null()
              .default(true),
          )
          .col(ColumnDef::new(Promotions::MaxUses).integer().null())
          .col(
            ColumnDef::new(Promotions::TotalUsesCount)
              .integer()
              .not_null()
              .default(0),
          )
          .col(ColumnDef::new(Promotions::MaxUsesPerUser).integer().null())
          .col(ColumnDef::new(Promotions::CreatedAt).date_time().not_null())
          .col(ColumnDef::new(Promotions::UpdatedAt).date_time().not_null())
          .to_owned(),
      )
      .await?;

    manager
      .create_index(
        Index::create()
          .name("idx_promotions_active")
          .table(Promotions::Table)
          .col(Promotions::IsActive)
          .to_owned(),
      )
      .await?;

    manager
      .create_table(
        Table::create()
          .table(CouponCodes::Table)
          .if_not_exists()
          .col(
            ColumnDef::new(CouponCodes::Id)
              .integer()
              .not_null()
              .auto_increment()
              .primary_key(),
          )
          .col(ColumnDef::new(CouponCodes::PromotionId).integer().not_null())
          .col(
            ColumnDef::new(CouponCodes::Code).string().not_null().unique_key(),
          )
          .col(
            ColumnDef::new(CouponCodes::IsActive)
              .boolean()
              .not_null()
              .default(true),
          )
          .col(
            ColumnDef::new(CouponCodes::UsesCount)
              .integer()
              .not_null()
              .default(0),
          )
          .col(ColumnDef::new(CouponCodes::MaxUses).integer().null())
          .col(ColumnDef::new(CouponCodes::ValidFrom).date_time().null())
          .col(ColumnDef::new(CouponCodes::ValidTo).date_time().null())
          .col(ColumnDef::new(CouponCodes::UserSpecificId).integer().null())
          .col(ColumnDef::new(CouponCodes::CreatedAt).date_time().not_null())
          .col(ColumnDef::new(CouponCodes::UpdatedAt).date_time().not_null())
          .foreign_key(
            ForeignKey::create()
              .name("fk_coupon_codes_promotion")
              .from(CouponCodes::Table, CouponCodes::PromotionId)
              .to(Promotions::Table, Promotions::Id)
              .on_delete(ForeignKeyAction::Cascade),
          )
          .foreign_key(
            ForeignKey::create()
              .name("fk_coupon_codes_user")
              .from(CouponCodes::Table, CouponCodes::UserSpecificId)
              .to(Users::Table, Users::Id)
              .on_delete(ForeignKeyAction::SetNull),
          )
          .to_owned(),
      )
      .await?;

    manager
      .create_index(
        Index::create()
          .name("idx_coupon_codes_promotion")
          .table(CouponCodes::Table)
          .col(CouponCodes::PromotionId)
          .to_owned(),
      )
      .await
  }

  async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .drop_table(Table::drop().table(CouponCodes::Table).to_owned())
      .await?;

    manager
      .drop_table(Table::drop().table(Promotions::Table).to_owned())
      .await
  }
}

#[derive(DeriveIden)]
pub enum Promotions {
  Table,
  Id,
  Name,
  Description,
  DiscountKind,
  DiscountValue,
  StartDate,
  EndDate,
  IsActive,
  MaxUses,
  TotalUsesCount,
  MaxUsesPerUser,
  CreatedAt,
  UpdatedAt,
}

#[derive(DeriveIden)]
pub enum CouponCodes {
  Table,
  Id,
  PromotionId,
  Code,
  IsActive,
  UsesCount,
  MaxUses,
  ValidFrom,
  ValidTo,
  UserSpecificId,
  CreatedAt,
  UpdatedAt,
}
