//! Response bodies. Storage keeps money in cents, the wire carries decimals.

use serde::Serialize;

use crate::{
  entity::{
    DiscountKind, ReferralStatus, UserRole, affiliate_profile, promotion,
    referral, user,
  },
  prelude::*,
  sv::coupon::Validation,
  utils::to_decimal,
};

#[derive(Debug, Serialize)]
pub struct UserView {
  pub id: i32,
  pub uid: String,
  pub email: String,
  pub role: UserRole,
  pub is_admin: bool,
  pub joined_at: DateTime,
}

impl From<user::Model> for UserView {
  fn from(user: user::Model) -> Self {
    Self {
      is_admin: user.is_admin(),
      id: user.id,
      uid: user.uid,
      email: user.email,
      role: user.role,
      joined_at: user.joined_at,
    }
  }
}

#[derive(Debug, Serialize)]
pub struct ValidationView {
  pub valid: bool,
  pub message: &'static str,
  pub discount_type: Option<DiscountKind>,
  #[serde(with = "rust_decimal::serde::float_option")]
  pub discount_value: Option<Decimal>,
  pub coupon_id: Option<i32>,
  pub promotion_id: Option<i32>,
}

impl From<Validation> for ValidationView {
  fn from(v: Validation) -> Self {
    Self {
      valid: v.valid,
      message: v.message,
      discount_type: v.discount_kind,
      discount_value: v.discount_value.map(to_decimal),
      coupon_id: v.coupon_id,
      promotion_id: v.promotion_id,
    }
  }
}

#[derive(Debug, Serialize)]
pub struct PromotionView {
  pub id: i32,
  pub name: String,
  pub description: String,
  pub discount_type: DiscountKind,
  pub discount_value: Decimal,
  pub start_date: DateTime,
  pub end_date: Option<DateTime>,
  pub is_active: bool,
  pub max_uses: Option<i32>,
  pub total_uses_count: i32,
  pub max_uses_per_user: Option<i32>,
  pub created_at: DateTime,
  pub updated_at: DateTime,
}

impl From<promotion::Model> for PromotionView {
  fn from(p: promotion::Model) -> Self {
    Self {
      id: p.id,
      name: p.name,
      description: p.description,
      discount_type: p.discount_kind,
      discount_value: to_decimal(p.discount_value),
      start_date: p.start_date,
      end_date: p.end_date,
      is_active: p.is_active,
      max_uses: p.max_uses,
      total_uses_count: p.total_uses_count,
      max_uses_per_user: p.max_uses_per_user,
      created_at: p.created_at,
      updated_at: p.updated_at,
    }
  }
}

#[derive(Debug, Serialize)]
pub struct AffiliateView {
  pub id: i32,
  pub user_id: i32,
  pub referral_code: String,
  pub balance: Decimal,
  pub total_earned: Decimal,
  pub is_active: bool,
  pub payout_email: Option<String>,
  pub created_at: DateTime,
  pub updated_at: DateTime,
}

impl From<affiliate_profile::Model> for AffiliateView {
  fn from(a: affiliate_profile::Model) -> Self {
    Self {
      id: a.id,
      user_id: a.user_id,
      referral_code: a.referral_code,
      balance: to_decimal(a.balance),
      total_earned: to_decimal(a.total_earned),
      is_active: a.is_active,
      payout_email: a.payout_email,
      created_at: a.created_at,
      updated_at: a.updated_at,
    }
  }
}

#[derive(Debug, Serialize)]
pub struct ReferralView {
  pub id: i32,
  pub referred_user_id: i32,
  pub code_used: String,
  pub affiliate_id: Option<i32>,
  pub timestamp: DateTime,
  pub commission_earned: Option<Decimal>,
  pub status: ReferralStatus,
  pub created_at: DateTime,
  pub updated_at: DateTime,
}

impl From<referral::Model> for ReferralView {
  fn from(r: referral::Model) -> Self {
    Self {
      id: r.id,
      referred_user_id: r.referred_user_id,
      code_used: r.code_used,
      affiliate_id: r.affiliate_id,
      timestamp: r.timestamp,
      commission_earned: r.commission_earned.map(to_decimal),
      status: r.status,
      created_at: r.created_at,
      updated_at: r.updated_at,
    }
  }
}

pub fn many<M, V: From<M>>(models: Vec<M>) -> Vec<V> {
  models.into_iter().map(V::from).collect()
}
