use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::{coupon_code, promotion, user};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "coupon_redemptions")]
pub struct Model {
  #[sea_orm(primary_key)]
  pub id: i32,
  pub coupon_id: i32,
  pub promotion_id: i32,
  pub user_id: i32,
  pub redeemed_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
  #[sea_orm(
    belongs_to = "coupon_code::Entity",
    from = "Column::CouponId",
    to = "coupon_code::Column::Id",
    on_delete = "Cascade"
  )]
  Coupon,
  #[sea_orm(
    belongs_to = "promotion::Entity",
    from = "Column::PromotionId",
    to = "promotion::Column::Id",
    on_delete = "Cascade"
  )]
  Promotion,
  #[sea_orm(
    belongs_to = "user::Entity",
    from = "Column::UserId",
    to = "user::Column::Id",
    on_delete = "Cascade"
  )]
  User,
}

impl Related<coupon_code::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::Coupon.def()
  }
}

impl Related<promotion::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::Promotion.def()
  }
}

impl Related<user::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::User.def()
  }
}

impl ActiveModelBehavior for ActiveModel {}
