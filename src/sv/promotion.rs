use sea_orm::DbErr;
use serde::Deserialize;

use crate::{
  entity::{DiscountKind, coupon_code, promotion, user},
  error::is_unique_violation,
  prelude::*,
  utils::{self, nullable},
};

pub const MAX_CODE_LEN: usize = 50;

fn yes() -> bool {
  true
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewPromotion {
  pub name: String,
  #[serde(default)]
  pub description: String,
  #[serde(rename = "discount_type")]
  pub discount_kind: DiscountKind,
  pub discount_value: Decimal,
  pub start_date: DateTime,
  #[serde(default)]
  pub end_date: Option<DateTime>,
  #[serde(default = "yes")]
  pub is_active: bool,
  #[serde(default)]
  pub max_uses: Option<i32>,
  #[serde(default)]
  pub max_uses_per_user: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PromotionPatch {
  pub name: Option<String>,
  pub description: Option<String>,
  #[serde(rename = "discount_type")]
  pub discount_kind: Option<DiscountKind>,
  pub discount_value: Option<Decimal>,
  pub start_date: Option<DateTime>,
  #[serde(default, deserialize_with = "nullable")]
  pub end_date: Option<Option<DateTime>>,
  pub is_active: Option<bool>,
  #[serde(default, deserialize_with = "nullable")]
  pub max_uses: Option<Option<i32>>,
  #[serde(default, deserialize_with = "nullable")]
  pub max_uses_per_user: Option<Option<i32>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewCoupon {
  pub promotion_id: i32,
  pub code: String,
  #[serde(default = "yes")]
  pub is_active: bool,
  #[serde(default)]
  pub max_uses: Option<i32>,
  #[serde(default)]
  pub valid_from: Option<DateTime>,
  #[serde(default)]
  pub valid_to: Option<DateTime>,
  #[serde(default)]
  pub user_specific_id: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CouponPatch {
  pub code: Option<String>,
  pub is_active: Option<bool>,
  #[serde(default, deserialize_with = "nullable")]
  pub max_uses: Option<Option<i32>>,
  #[serde(default, deserialize_with = "nullable")]
  pub valid_from: Option<Option<DateTime>>,
  #[serde(default, deserialize_with = "nullable")]
  pub valid_to: Option<Option<DateTime>>,
  #[serde(default, deserialize_with = "nullable")]
  pub user_specific_id: Option<Option<i32>>,
}

fn discount(kind: DiscountKind, value: Decimal) -> Result<i64> {
  let cents = utils::to_cents(value)?;
  if kind == DiscountKind::Percentage && cents > 100 * utils::CENTS {
    return Err(Error::InvalidArgs(
      "Percentage discount cannot exceed 100.".into(),
    ));
  }
  Ok(cents)
}

fn cap(value: Option<i32>, field: &str) -> Result<Option<i32>> {
  match value {
    Some(n) if n < 0 => {
      Err(Error::InvalidArgs(format!("{field} must not be negative.")))
    }
    _ => Ok(value),
  }
}

fn window(from: Option<DateTime>, to: Option<DateTime>) -> Result<()> {
  match (from, to) {
    (Some(from), Some(to)) if to < from => Err(Error::InvalidArgs(
      "End of the validity window precedes its start.".into(),
    )),
    _ => Ok(()),
  }
}

pub fn normalize_code(code: &str) -> Result<String> {
  let code = code.trim().to_uppercase();
  if code.is_empty() || code.chars().count() > MAX_CODE_LEN {
    return Err(Error::InvalidArgs(format!(
      "Code must be between 1 and {MAX_CODE_LEN} characters."
    )));
  }
  Ok(code)
}

fn code_conflict(err: DbErr) -> Error {
  if is_unique_violation(&err) {
    Error::Conflict("Coupon code already exists.".into())
  } else {
    err.into()
  }
}

/// Administration of promotions and the coupon codes they own.
pub struct Promotion<'a> {
  db: &'a DatabaseConnection,
}

impl<'a> Promotion<'a> {
  pub fn new(db: &'a DatabaseConnection) -> Self {
    Self { db }
  }

  pub async fn all(&self) -> Result<Vec<promotion::Model>> {
    Ok(
      promotion::Entity::find()
        .order_by_desc(promotion::Column::CreatedAt)
        .order_by_desc(promotion::Column::Id)
        .all(self.db)
        .await?,
    )
  }

  pub async fn by_id(&self, id: i32) -> Result<promotion::Model> {
    promotion::Entity::find_by_id(id)
      .one(self.db)
      .await?
      .ok_or(Error::PromotionNotFound)
  }

  pub async fn create(&self, new: NewPromotion) -> Result<promotion::Model> {
    let name = new.name.trim().to_string();
    if name.is_empty() {
      return Err(Error::InvalidArgs("Name is required.".into()));
    }

    let discount_value = discount(new.discount_kind, new.discount_value)?;
    window(Some(new.start_date), new.end_date)?;
    let now = utils::now();

    let promotion = promotion::ActiveModel {
      id: NotSet,
      name: Set(name),
      description: Set(new.description),
      discount_kind: Set(new.discount_kind),
      discount_value: Set(discount_value),
      start_date: Set(new.start_date),
      end_date: Set(new.end_date),
      is_active: Set(new.is_active),
      max_uses: Set(cap(new.max_uses, "max_uses")?),
      total_uses_count: Set(0),
      max_uses_per_user: Set(cap(new.max_uses_per_user, "max_uses_per_user")?),
      created_at: Set(now),
      updated_at: Set(now),
    }
    .insert(self.db)
    .await?;

    info!("Promotion {} `{}` created", promotion.id, promotion.name);
    Ok(promotion)
  }

  pub async fn update(
    &self,
    id: i32,
    patch: PromotionPatch,
  ) -> Result<promotion::Model> {
    let current = self.by_id(id).await?;

    let kind = patch.discount_kind.unwrap_or(current.discount_kind);
    let value = match patch.discount_value {
      Some(value) => discount(kind, value)?,
      None => discount(kind, utils::to_decimal(current.discount_value))?,
    };
    let start = patch.start_date.unwrap_or(current.start_date);
    let end = patch.end_date.unwrap_or(current.end_date);
    window(Some(start), end)?;

    let mut active: promotion::ActiveModel = current.into();

    if let Some(name) = patch.name {
      let name = name.trim().to_string();
      if name.is_empty() {
        return Err(Error::InvalidArgs("Name is required.".into()));
      }
      active.name = Set(name);
    }
    if let Some(description) = patch.description {
      active.description = Set(description);
    }
    if let Some(is_active) = patch.is_active {
      active.is_active = Set(is_active);
    }
    if let Some(max_uses) = patch.max_uses {
      active.max_uses = Set(cap(max_uses, "max_uses")?);
    }
    if let Some(per_user) = patch.max_uses_per_user {
      active.max_uses_per_user = Set(cap(per_user, "max_uses_per_user")?);
    }

    active.discount_kind = Set(kind);
    active.discount_value = Set(value);
    active.start_date = Set(start);
    active.end_date = Set(end);
    active.updated_at = Set(utils::now());

    Ok(active.update(self.db).await?)
  }

  /// Removes the promotion together with its coupon codes.
  pub async fn delete(&self, id: i32) -> Result<()> {
    let txn = self.db.begin().await?;

    coupon_code::Entity::delete_many()
      .filter(coupon_code::Column::PromotionId.eq(id))
      .exec(&txn)
      .await?;
    let deleted = promotion::Entity::delete_by_id(id).exec(&txn).await?;

    if deleted.rows_affected == 0 {
      return Err(Error::PromotionNotFound);
    }

    txn.commit().await?;
    info!("Promotion {} deleted", id);
    Ok(())
  }

  pub async fn coupons(
    &self,
    promotion_id: Option<i32>,
  ) -> Result<Vec<coupon_code::Model>> {
    let mut query = coupon_code::Entity::find();
    if let Some(id) = promotion_id {
      query = query.filter(coupon_code::Column::PromotionId.eq(id));
    }

    Ok(
      query
        .order_by_desc(coupon_code::Column::CreatedAt)
        .order_by_desc(coupon_code::Column::Id)
        .all(self.db)
        .await?,
    )
  }

  pub async fn coupon(&self, id: i32) -> Result<coupon_code::Model> {
    coupon_code::Entity::find_by_id(id)
      .one(self.db)
      .await?
      .ok_or(Error::CouponNotFound)
  }

  async fn ensure_user(&self, id: Option<i32>) -> Result<()> {
    if let Some(id) = id {
      user::Entity::find_by_id(id)
        .one(self.db)
        .await?
        .ok_or(Error::UserNotFound)?;
    }
    Ok(())
  }

  pub async fn create_coupon(
    &self,
    new: NewCoupon,
  ) -> Result<coupon_code::Model> {
    let promotion = self.by_id(new.promotion_id).await?;
    let code = normalize_code(&new.code)?;
    window(new.valid_from, new.valid_to)?;
    self.ensure_user(new.user_specific_id).await?;
    let now = utils::now();

    let coupon = coupon_code::ActiveModel {
      id: NotSet,
      promotion_id: Set(promotion.id),
      code: Set(code),
      is_active: Set(new.is_active),
      uses_count: Set(0),
      max_uses: Set(cap(new.max_uses, "max_uses")?),
      valid_from: Set(new.valid_from),
      valid_to: Set(new.valid_to),
      user_specific_id: Set(new.user_specific_id),
      created_at: Set(now),
      updated_at: Set(now),
    }
    .insert(self.db)
    .await
    .map_err(code_conflict)?;

    info!("Coupon {} added to promotion {}", coupon.code, promotion.id);
    Ok(coupon)
  }

  pub async fn update_coupon(
    &self,
    id: i32,
    patch: CouponPatch,
  ) -> Result<coupon_code::Model> {
    let current = self.coupon(id).await?;

    let from = patch.valid_from.unwrap_or(current.valid_from);
    let to = patch.valid_to.unwrap_or(current.valid_to);
    window(from, to)?;

    let mut active: coupon_code::ActiveModel = current.into();

    if let Some(code) = patch.code {
      active.code = Set(normalize_code(&code)?);
    }
    if let Some(is_active) = patch.is_active {
      active.is_active = Set(is_active);
    }
    if let Some(max_uses) = patch.max_uses {
      active.max_uses = Set(cap(max_uses, "max_uses")?);
    }
    if let Some(user_id) = patch.user_specific_id {
      self.ensure_user(user_id).await?;
      active.user_specific_id = Set(user_id);
    }

    active.valid_from = Set(from);
    active.valid_to = Set(to);
    active.updated_at = Set(utils::now());

    active.update(self.db).await.map_err(code_conflict)
  }

  pub async fn delete_coupon(&self, id: i32) -> Result<()> {
    let deleted = coupon_code::Entity::delete_by_id(id).exec(self.db).await?;
    if deleted.rows_affected == 0 {
      return Err(Error::CouponNotFound);
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::sv::test_utils::{fixtures, test_db};

  fn new_promotion() -> NewPromotion {
    json::from_value(json::json!({
      "name": "Launch",
      "discount_type": "fixed_amount",
      "discount_value": "2.50",
      "start_date": "2026-01-01T00:00:00",
    }))
    .unwrap()
  }

  #[tokio::test]
  async fn test_create_and_patch_promotion() {
    let db = test_db::setup().await;
    let sv = Promotion::new(&db);

    let promo = sv.create(new_promotion()).await.unwrap();
    assert_eq!(promo.discount_kind, DiscountKind::FixedAmount);
    assert_eq!(promo.discount_value, 250);
    assert!(promo.is_active);
    assert_eq!(promo.total_uses_count, 0);

    let patch: PromotionPatch = json::from_value(json::json!({
      "max_uses": 10,
      "end_date": "2026-12-31T00:00:00",
    }))
    .unwrap();
    let promo = sv.update(promo.id, patch).await.unwrap();
    assert_eq!(promo.max_uses, Some(10));
    assert!(promo.end_date.is_some());

    let patch: PromotionPatch =
      json::from_value(json::json!({ "end_date": null })).unwrap();
    let promo = sv.update(promo.id, patch).await.unwrap();
    assert_eq!(promo.end_date, None);
    assert_eq!(promo.max_uses, Some(10));
  }

  #[tokio::test]
  async fn test_promotion_terms_are_checked() {
    let db = test_db::setup().await;
    let sv = Promotion::new(&db);

    let mut new = new_promotion();
    new.discount_kind = DiscountKind::Percentage;
    new.discount_value = Decimal::from(101);
    assert!(matches!(sv.create(new).await, Err(Error::InvalidArgs(_))));

    let mut new = new_promotion();
    new.end_date = Some(new.start_date - TimeDelta::days(1));
    assert!(matches!(sv.create(new).await, Err(Error::InvalidArgs(_))));

    let mut new = new_promotion();
    new.max_uses = Some(-1);
    assert!(matches!(sv.create(new).await, Err(Error::InvalidArgs(_))));
  }

  #[tokio::test]
  async fn test_coupon_crud() {
    let db = test_db::setup().await;
    let sv = Promotion::new(&db);
    let promo = fixtures::promotion(&db).await;
    let other = fixtures::promotion(&db).await;

    let new: NewCoupon = json::from_value(json::json!({
      "promotion_id": promo.id,
      "code": "  spring25 ",
    }))
    .unwrap();
    let coupon = sv.create_coupon(new.clone()).await.unwrap();
    assert_eq!(coupon.code, "SPRING25");
    assert!(coupon.is_active);

    let dup = NewCoupon { code: "Spring25".into(), ..new.clone() };
    assert!(matches!(sv.create_coupon(dup).await, Err(Error::Conflict(_))));

    let orphan = NewCoupon { promotion_id: 999, ..new };
    assert!(matches!(
      sv.create_coupon(orphan).await,
      Err(Error::PromotionNotFound)
    ));

    fixtures::coupon(&db, other.id, "ELSEWHERE").await;
    assert_eq!(sv.coupons(None).await.unwrap().len(), 2);
    assert_eq!(sv.coupons(Some(promo.id)).await.unwrap().len(), 1);

    let patch = CouponPatch { is_active: Some(false), ..Default::default() };
    let coupon = sv.update_coupon(coupon.id, patch).await.unwrap();
    assert!(!coupon.is_active);

    sv.delete_coupon(coupon.id).await.unwrap();
    assert!(matches!(
      sv.delete_coupon(coupon.id).await,
      Err(Error::CouponNotFound)
    ));
  }

  #[tokio::test]
  async fn test_delete_promotion_cascades() {
    let db = test_db::setup().await;
    let sv = Promotion::new(&db);
    let promo = fixtures::promotion(&db).await;
    fixtures::coupon(&db, promo.id, "GONE1").await;
    fixtures::coupon(&db, promo.id, "GONE2").await;

    sv.delete(promo.id).await.unwrap();

    assert!(sv.coupons(None).await.unwrap().is_empty());
    assert!(matches!(sv.by_id(promo.id).await, Err(Error::PromotionNotFound)));
  }

  #[test]
  fn test_code_normalization() {
    assert_eq!(normalize_code(" abc ").unwrap(), "ABC");
    assert!(normalize_code("   ").is_err());
    assert!(normalize_code(&"x".repeat(MAX_CODE_LEN + 1)).is_err());
  }
}
