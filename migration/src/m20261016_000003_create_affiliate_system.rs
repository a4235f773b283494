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
          .table(AffiliateProfiles::Table)
          .if_not_exists()
          .col(
            ColumnDef::new(AffiliateProfiles::Id)
              .integer()
              .not_null()
              .auto_increment()
              .primary_key(),
          )
          .col(
            ColumnDef::new(AffiliateProfiles::UserId)
              .integer()
              .not_null()
              .unique_key(),
          )
          .col(
            ColumnDef::new(AffiliateProfiles::ReferralCode)
              .string()
              .not_null()
              .unique_key(),
          )
          .col(
            ColumnDef::new(AffiliateProfiles::Balance)
              .big_integer()
              .not_null()
              .default(0),
          )
          .col(
            ColumnDef::new(AffiliateProfiles::TotalEarned)
              .big_integer()
              .not_null()
              .default(0),
          )
          .col(
            ColumnDef::new(AffiliateProfiles::IsActive)
              .boolean()
              .not_null()
              .default(true),
          )
          .col(ColumnDef::new(AffiliateProfiles::PayoutEmail).string().null())
          .col(
            ColumnDef::new(AffiliateProfiles::CreatedAt).date_time().not_null(),
          )
          .col(
            ColumnDef::new(AffiliateProfiles::UpdatedAt).date_time().not_null(),
          )
          .foreign_key(
            ForeignKey::create()
              .name("fk_affiliate_profiles_user")
              .from(AffiliateProfiles::Table, AffiliateProfiles::UserId)
              .to(Users::Table, Users::Id)
              .on_delete(ForeignKeyAction::Cascade),
          )
          .to_owned(),
      )
      .await?;

    manager
      .create_table(
        Table::create()
          .table(Referrals::Table)
          .if_not_exists()
          .col(
            ColumnDef::new(Referrals::Id)
              .integer()
              .not_null()
              .auto_increment()
              .primary_key(),
          )
          // one referral per user, whichever affiliate it came from
          .col(
            ColumnDef::new(Referrals::ReferredUserId)
              .integer()
              .not_null()
              .unique_key(),
          )
          .col(ColumnDef::new(Referrals::CodeUsed).string().not_null())
          .col(ColumnDef::new(Referrals::AffiliateId).integer().null())
          .col(ColumnDef::new(Referrals::Timestamp).date_time().not_null())
          .col(ColumnDef::new(Referrals::CommissionEarned).big_integer().null())
          .col(
            ColumnDef::new(Referrals::Status)
              .string()
              .not_null()
              .default("pending"),
          )
          .col(ColumnDef::new(Referrals::CreatedAt).date_time().not_null())
          .col(ColumnDef::new(Referrals::UpdatedAt).date_time().not_null())
          .foreign_key(
            ForeignKey::create()
              .name("fk_referrals_referred_user")
              .from(Referrals::Table, Referrals::ReferredUserId)
              .to(Users::Table, Users::Id)
              .on_delete(ForeignKeyAction::Cascade),
          )
          .foreign_key(
            ForeignKey::create()
              .name("fk_referrals_affiliate")
              .from(Referrals::Table, Referrals::AffiliateId)
              .to(AffiliateProfiles::Table, AffiliateProfiles::Id)
              .on_delete(ForeignKeyAction::SetNull),
          )
          .to_owned(),
      )
      .await?;

    manager
      .create_index(
        Index::create()
          .name("idx_referrals_code_used")
          .table(Referrals::Table)
          .col(Referrals::CodeUsed)
          .to_owned(),
      )
      .await?;

    manager
      .create_index(
        Index::create()
          .name("idx_referrals_status")
          .table(Referrals::Table)
          .col(Referrals::Status)
          .to_owned(),
      )
      .await
  }

  async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .drop_table(Table::drop().table(Referrals::Table).to_owned())
      .await?;

    manager
      .drop_table(Table::drop().table(AffiliateProfiles::Table).to_owned())
      .await
  }
}

#[derive(DeriveIden)]
pub enum AffiliateProfiles {
  Table,
  Id,
  UserId,
  ReferralCode,
  Balance,
  TotalEarned,
  IsActive,
  PayoutEmail,
  CreatedAt,
  UpdatedAt,
}

#[derive(DeriveIden)]
pub enum Referrals {
  Table,
  Id,
  ReferredUserId,
  CodeUsed,
  AffiliateId,
  Timestamp,
  CommissionEarned,
  Status,
  CreatedAt,
  UpdatedAt,
}
