use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::{referral, user};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "affiliate_profiles")]
pub struct Model {
  #[sea_orm(primary_key)]
  pub id: i32,
  #[sea_orm(unique)]
  pub user_id: i32,
  #[sea_orm(unique)]
  pub referral_code: String,
  /// Spendable commission, in cents.
  pub balance: i64,
  /// Lifetime commission, in cents.
  pub total_earned: i64,
  pub is_active: bool,
  pub payout_email: Option<String>,
  pub created_at: DateTime,
  pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
  #[sea_orm(
    belongs_to = "user::Entity",
    from = "Column::UserId",
    to = "user::Column::Id",
    on_delete = "Cascade"
  )]
  User,
  #[sea_orm(has_many = "referral::Entity")]
  Referrals,
}

impl Related<user::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::User.def()
  }
}

impl Related<referral::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::Referrals.def()
  }
}

impl ActiveModelBehavior for ActiveModel {}
