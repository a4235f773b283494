use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::{promotion, user};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "coupon_codes")]
pub struct Model {
  #[sea_orm(primary_key)]
  pub id: i32,
  pub promotion_id: i32,
  /// Always stored uppercase.
  #[sea_orm(unique)]
  pub code: String,
  pub is_active: bool,
  pub uses_count: i32,
  pub max_uses: Option<i32>,
  pub valid_from: Option<DateTime>,
  pub valid_to: Option<DateTime>,
  pub user_specific_id: Option<i32>,
  pub created_at: DateTime,
  pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
  #[sea_orm(
    belongs_to = "promotion::Entity",
    from = "Column::PromotionId",
    to = "promotion::Column::Id",
    on_delete = "Cascade"
  )]
  Promotion,
  #[sea_orm(
    belongs_to = "user::Entity",
    from = "Column::UserSpecificId",
    to = "user::Column::Id",
    on_delete = "SetNull"
  )]
  UserSpecific,
}

impl Related<promotion::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::Promotion.def()
  }
}

impl Related<user::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::UserSpecific.def()
  }
}

impl ActiveModelBehavior for ActiveModel {}
