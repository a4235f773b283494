use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::coupon_code;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[derive(EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum DiscountKind {
  #[sea_orm(string_value = "percentage")]
  #[default]
  Percentage,
  #[sea_orm(string_value = "fixed_amount")]
  FixedAmount,
}

/// A discount campaign. Monetary and percentage values are kept in
/// hundredths, so `10%` is stored as `1000` and `$2.50` as `250`.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "promotions")]
pub struct Model {
  #[sea_orm(primary_key)]
  pub id: i32,
  pub name: String,
  pub description: String,
  pub discount_kind: DiscountKind,
  pub discount_value: i64,
  pub start_date: DateTime,
  pub end_date: Option<DateTime>,
  pub is_active: bool,
  /// Cap on redemptions across every coupon of this promotion.
  pub max_uses: Option<i32>,
  pub total_uses_count: i32,
  pub max_uses_per_user: Option<i32>,
  pub created_at: DateTime,
  pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
  #[sea_orm(has_many = "coupon_code::Entity")]
  Coupons,
}

impl Related<coupon_code::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::Coupons.def()
  }
}

impl ActiveModelBehavior for ActiveModel {}
