use json::json;
use sea_orm::{
  Condition,
  sea_query::{Expr, Func},
};

use crate::{
  entity::{
    DiscountKind, EventType, coupon_code, coupon_redemption, promotion,
  },
  prelude::*,
  sv::event::{Events, RequestMeta},
  utils,
};

pub const INVALID_CODE: &str = "Invalid coupon code.";
pub const VALID: &str = "Coupon is valid.";

/// Everything a rule may look at.
#[derive(Debug, Clone, Copy)]
pub struct Check<'a> {
  pub coupon: &'a coupon_code::Model,
  pub promotion: &'a promotion::Model,
  pub user_id: i32,
  /// Redemptions of this promotion already made by the user.
  pub user_uses: u64,
  pub now: DateTime,
}

/// Validity rules, evaluated in [`RULES`] order; the first failing one
/// decides the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
  Active,
  Started,
  NotEnded,
  CouponStarted,
  CouponNotEnded,
  CouponUsesLeft,
  PromotionUsesLeft,
  UserAllowed,
  UserUsesLeft,
}

pub const RULES: [Rule; 9] = [
  Rule::Active,
  Rule::Started,
  Rule::NotEnded,
  Rule::CouponStarted,
  Rule::CouponNotEnded,
  Rule::CouponUsesLeft,
  Rule::PromotionUsesLeft,
  Rule::UserAllowed,
  Rule::UserUsesLeft,
];

fn under(count: i64, cap: Option<i32>) -> bool {
  cap.is_none_or(|cap| count < i64::from(cap))
}

impl Rule {
  pub fn holds(self, c: &Check) -> bool {
    match self {
      Rule::Active => c.coupon.is_active && c.promotion.is_active,
      Rule::Started => c.now >= c.promotion.start_date,
      Rule::NotEnded => c.promotion.end_date.is_none_or(|end| c.now <= end),
      Rule::CouponStarted => c.coupon.valid_from.is_none_or(|from| c.now >= from),
      Rule::CouponNotEnded => c.coupon.valid_to.is_none_or(|to| c.now <= to),
      Rule::CouponUsesLeft => {
        under(c.coupon.uses_count.into(), c.coupon.max_uses)
      }
      Rule::PromotionUsesLeft => {
        under(c.promotion.total_uses_count.into(), c.promotion.max_uses)
      }
      Rule::UserAllowed => {
        c.coupon.user_specific_id.is_none_or(|id| id == c.user_id)
      }
      Rule::UserUsesLeft => {
        under(c.user_uses as i64, c.promotion.max_uses_per_user)
      }
    }
  }

  pub fn message(self) -> &'static str {
    match self {
      Rule::Active => "Coupon code is not active.",
      Rule::Started => "Promotion has not started yet.",
      Rule::NotEnded => "Promotion has expired.",
      Rule::CouponStarted => "Coupon is not yet valid.",
      Rule::CouponNotEnded => "Coupon has expired.",
      Rule::CouponUsesLeft => "Coupon has reached its usage limit.",
      Rule::PromotionUsesLeft => "Promotion has reached its usage limit.",
      Rule::UserAllowed => "Coupon is not valid for this user.",
      Rule::UserUsesLeft => {
        "You have reached the usage limit for this promotion."
      }
    }
  }
}

/// First rule that does not hold, if any.
pub fn first_failure(check: &Check) -> Option<Rule> {
  RULES.into_iter().find(|rule| !rule.holds(check))
}

/// Outcome of a validation. Invalid coupons are a normal result, not an
/// error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validation {
  pub valid: bool,
  pub message: &'static str,
  pub discount_kind: Option<DiscountKind>,
  /// In hundredths, like [`promotion::Model::discount_value`].
  pub discount_value: Option<i64>,
  pub coupon_id: Option<i32>,
  pub promotion_id: Option<i32>,
}

impl Validation {
  fn unknown() -> Self {
    Self {
      valid: false,
      message: INVALID_CODE,
      discount_kind: None,
      discount_value: None,
      coupon_id: None,
      promotion_id: None,
    }
  }
}

pub struct Coupon<'a> {
  db: &'a DatabaseConnection,
}

impl<'a> Coupon<'a> {
  pub fn new(db: &'a DatabaseConnection) -> Self {
    Self { db }
  }

  /// Case-insensitive lookup with the owning promotion.
  pub async fn by_code(
    &self,
    code: &str,
  ) -> Result<Option<(coupon_code::Model, promotion::Model)>> {
    let code = code.trim().to_uppercase();
    if code.is_empty() {
      return Ok(None);
    }

    let found = coupon_code::Entity::find()
      .filter(
        Expr::expr(Func::upper(Expr::col(coupon_code::Column::Code))).eq(code),
      )
      .find_also_related(promotion::Entity)
      .one(self.db)
      .await?;

    Ok(found.and_then(|(coupon, promotion)| Some((coupon, promotion?))))
  }

  async fn user_uses(&self, promotion_id: i32, user_id: i32) -> Result<u64> {
    Ok(
      coupon_redemption::Entity::find()
        .filter(coupon_redemption::Column::PromotionId.eq(promotion_id))
        .filter(coupon_redemption::Column::UserId.eq(user_id))
        .count(self.db)
        .await?,
    )
  }

  /// Decides whether `code` can be used by `user_id` right now. Read-only
  /// apart from the audit record.
  pub async fn validate(
    &self,
    code: &str,
    user_id: i32,
    meta: &RequestMeta,
  ) -> Result<Validation> {
    let validation = self.check(code, user_id, utils::now()).await?;

    Events::new(self.db)
      .record(
        EventType::CouponValidated,
        Some(user_id),
        meta,
        json!({
          "code": code,
          "valid": validation.valid,
          "message": validation.message,
          "coupon_id": validation.coupon_id,
          "promotion_id": validation.promotion_id,
        }),
      )
      .await;

    Ok(validation)
  }

  pub async fn check(
    &self,
    code: &str,
    user_id: i32,
    now: DateTime,
  ) -> Result<Validation> {
    let Some((coupon, promotion)) = self.by_code(code).await? else {
      return Ok(Validation::unknown());
    };

    let user_uses = match promotion.max_uses_per_user {
      Some(_) => self.user_uses(promotion.id, user_id).await?,
      None => 0,
    };

    let check =
      Check { coupon: &coupon, promotion: &promotion, user_id, user_uses, now };

    Ok(match first_failure(&check) {
      Some(rule) => Validation {
        valid: false,
        message: rule.message(),
        discount_kind: None,
        discount_value: None,
        coupon_id: Some(coupon.id),
        promotion_id: Some(promotion.id),
      },
      None => Validation {
        valid: true,
        message: VALID,
        discount_kind: Some(promotion.discount_kind),
        discount_value: Some(promotion.discount_value),
        coupon_id: Some(coupon.id),
        promotion_id: Some(promotion.id),
      },
    })
  }

  /// Consumes one use of the coupon for `user_id`, typically once checkout
  /// has gone through.
  ///
  /// Both counters are bumped server-side (`n = n + 1`) behind their caps,
  /// and the coupon row is written before anything is read so the
  /// transaction holds its write lock from the first statement. Any failed
  /// step rolls the whole redemption back.
  pub async fn redeem(
    &self,
    coupon_id: i32,
    user_id: i32,
    meta: &RequestMeta,
  ) -> Result<coupon_redemption::Model> {
    let txn = self.db.begin().await?;
    let now = utils::now();

    let bumped = coupon_code::Entity::update_many()
      .col_expr(
        coupon_code::Column::UsesCount,
        Expr::col(coupon_code::Column::UsesCount).add(1),
      )
      .col_expr(coupon_code::Column::UpdatedAt, Expr::value(now))
      .filter(coupon_code::Column::Id.eq(coupon_id))
      .filter(
        Condition::any().add(coupon_code::Column::MaxUses.is_null()).add(
          Expr::col(coupon_code::Column::UsesCount)
            .lt(Expr::col(coupon_code::Column::MaxUses)),
        ),
      )
      .exec(&txn)
      .await?;

    let coupon = coupon_code::Entity::find_by_id(coupon_id)
      .one(&txn)
      .await?
      .ok_or(Error::CouponNotFound)?;

    if bumped.rows_affected == 0 {
      return Err(Error::UsageLimitExceeded);
    }

    let bumped = promotion::Entity::update_many()
      .col_expr(
        promotion::Column::TotalUsesCount,
        Expr::col(promotion::Column::TotalUsesCount).add(1),
      )
      .col_expr(promotion::Column::UpdatedAt, Expr::value(now))
      .filter(promotion::Column::Id.eq(coupon.promotion_id))
      .filter(
        Condition::any().add(promotion::Column::MaxUses.is_null()).add(
          Expr::col(promotion::Column::TotalUsesCount)
            .lt(Expr::col(promotion::Column::MaxUses)),
        ),
      )
      .exec(&txn)
      .await?;

    if bumped.rows_affected == 0 {
      return Err(Error::UsageLimitExceeded);
    }

    let promotion = promotion::Entity::find_by_id(coupon.promotion_id)
      .one(&txn)
      .await?
      .ok_or(Error::PromotionNotFound)?;

    if let Some(cap) = promotion.max_uses_per_user {
      let used = coupon_redemption::Entity::find()
        .filter(coupon_redemption::Column::PromotionId.eq(promotion.id))
        .filter(coupon_redemption::Column::UserId.eq(user_id))
        .count(&txn)
        .await?;

      if used >= cap.max(0) as u64 {
        return Err(Error::UsageLimitExceeded);
      }
    }

    let redemption = coupon_redemption::ActiveModel {
      id: NotSet,
      coupon_id: Set(coupon.id),
      promotion_id: Set(promotion.id),
      user_id: Set(user_id),
      redeemed_at: Set(now),
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;

    debug!(
      "Coupon {} redeemed by user {} (promotion {})",
      coupon.code, user_id, promotion.id
    );

    Events::new(self.db)
      .record(
        EventType::CouponApplied,
        Some(user_id),
        meta,
        json!({
          "coupon_id": coupon.id,
          "code": coupon.code,
          "promotion_id": promotion.id,
          "redemption_id": redemption.id,
        }),
      )
      .await;

    Ok(redemption)
  }
}
