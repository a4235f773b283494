use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::{affiliate_profile, coupon_redemption, referral};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[derive(EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
  #[sea_orm(string_value = "user")]
  #[default]
  User,
  #[sea_orm(string_value = "admin")]
  Admin,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
  #[sea_orm(primary_key)]
  pub id: i32,
  /// Subject id issued by the identity provider.
  #[sea_orm(unique)]
  pub uid: String,
  #[sea_orm(unique)]
  pub email: String,
  pub role: UserRole,
  pub joined_at: DateTime,
}

impl Model {
  pub fn is_admin(&self) -> bool {
    self.role == UserRole::Admin
  }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
  #[sea_orm(has_one = "affiliate_profile::Entity")]
  AffiliateProfile,
  #[sea_orm(has_many = "referral::Entity")]
  ReferralsReceived,
  #[sea_orm(has_many = "coupon_redemption::Entity")]
  Redemptions,
}

impl Related<affiliate_profile::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::AffiliateProfile.def()
  }
}

impl Related<referral::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::ReferralsReceived.def()
  }
}

impl Related<coupon_redemption::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::Redemptions.def()
  }
}

impl ActiveModelBehavior for ActiveModel {}
