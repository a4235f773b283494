use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::user;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[derive(EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum EventType {
  #[sea_orm(string_value = "user_signup")]
  UserSignup,
  #[sea_orm(string_value = "user_login")]
  UserLogin,
  #[sea_orm(string_value = "coupon_validated")]
  CouponValidated,
  #[sea_orm(string_value = "coupon_applied")]
  CouponApplied,
  #[sea_orm(string_value = "user_referred")]
  UserReferred,
  #[sea_orm(string_value = "affiliate_profile_created")]
  AffiliateProfileCreated,
  #[sea_orm(string_value = "affiliate_profile_updated")]
  AffiliateProfileUpdated,
}

/// Append-only audit record. Nothing updates or deletes these rows.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "tracked_events")]
pub struct Model {
  #[sea_orm(primary_key)]
  pub id: i32,
  pub event_type: EventType,
  pub user_id: Option<i32>,
  pub timestamp: DateTime,
  pub session_id: Option<String>,
  pub ip_address: Option<String>,
  pub user_agent: Option<String>,
  pub data: Option<Json>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
  #[sea_orm(
    belongs_to = "user::Entity",
    from = "Column::UserId",
    to = "user::Column::Id",
    on_delete = "SetNull"
  )]
  User,
}

impl Related<user::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::User.def()
  }
}

impl ActiveModelBehavior for ActiveModel {}
