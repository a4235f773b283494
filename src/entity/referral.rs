use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::{affiliate_profile, user};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[derive(EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum ReferralStatus {
  #[sea_orm(string_value = "pending")]
  #[default]
  Pending,
  #[sea_orm(string_value = "confirmed")]
  Confirmed,
  #[sea_orm(string_value = "commission_awarded")]
  CommissionAwarded,
  #[sea_orm(string_value = "paid_out")]
  PaidOut,
  #[sea_orm(string_value = "cancelled")]
  Cancelled,
}

impl ReferralStatus {
  /// Lifecycle: `pending -> confirmed -> commission_awarded -> paid_out`,
  /// with `cancelled` reachable until commission is awarded.
  pub fn can_become(self, next: Self) -> bool {
    use ReferralStatus::*;

    matches!(
      (self, next),
      (Pending, Confirmed | CommissionAwarded | Cancelled)
        | (Confirmed, CommissionAwarded | Cancelled)
        | (CommissionAwarded, PaidOut)
    ) || self == next
  }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "referrals")]
pub struct Model {
  #[sea_orm(primary_key)]
  pub id: i32,
  #[sea_orm(unique)]
  pub referred_user_id: i32,
  /// Uppercased code as typed at signup, kept even if the owner changes.
  pub code_used: String,
  pub affiliate_id: Option<i32>,
  pub timestamp: DateTime,
  pub commission_earned: Option<i64>,
  pub status: ReferralStatus,
  pub created_at: DateTime,
  pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
  #[sea_orm(
    belongs_to = "user::Entity",
    from = "Column::ReferredUserId",
    to = "user::Column::Id",
    on_delete = "Cascade"
  )]
  ReferredUser,
  #[sea_orm(
    belongs_to = "affiliate_profile::Entity",
    from = "Column::AffiliateId",
    to = "affiliate_profile::Column::Id",
    on_delete = "SetNull"
  )]
  Affiliate,
}

impl Related<user::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::ReferredUser.def()
  }
}

impl Related<affiliate_profile::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::Affiliate.def()
  }
}

impl ActiveModelBehavior for ActiveModel {}
