use sea_orm::{DbErr, SqlErr};

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Why a referral registration was refused. Each variant carries a stable
/// machine code next to its message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
  #[error("This user has already been processed for a referral.")]
  AlreadyReferred,
  #[error("Invalid referral code.")]
  InvalidCode,
  #[error("Cannot refer yourself.")]
  SelfReferral,
}

impl Rejection {
  pub fn code(&self) -> &'static str {
    match self {
      Rejection::AlreadyReferred => "already_referred",
      Rejection::InvalidCode => "invalid_code",
      Rejection::SelfReferral => "self_referral",
    }
  }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
  #[error("database error: {0}")]
  Db(#[from] DbErr),
  #[error("user not found")]
  UserNotFound,
  #[error("promotion not found")]
  PromotionNotFound,
  #[error("coupon not found")]
  CouponNotFound,
  #[error("affiliate profile not found")]
  AffiliateNotFound,
  #[error("referral not found")]
  ReferralNotFound,
  #[error("{0}")]
  Referral(#[from] Rejection),
  #[error("usage limit exceeded")]
  UsageLimitExceeded,
  #[error("unauthorized: {0}")]
  Unauthorized(String),
  #[error("forbidden")]
  Forbidden,
  #[error("invalid arguments: {0}")]
  InvalidArgs(String),
  #[error("conflict: {0}")]
  Conflict(String),
  #[error("internal error: {0}")]
  Internal(String),
}

impl Error {
  /// Text that is safe to show to the caller.
  pub fn user_message(&self) -> String {
    match self {
      Error::Db(_) | Error::Internal(_) => "An internal error occurred".into(),
      Error::UserNotFound => "User not found.".into(),
      Error::PromotionNotFound => "Promotion not found.".into(),
      Error::CouponNotFound => "Coupon not found.".into(),
      Error::AffiliateNotFound => "Affiliate profile not found.".into(),
      Error::ReferralNotFound => "Referral not found.".into(),
      Error::Referral(rejection) => rejection.to_string(),
      Error::UsageLimitExceeded => "Usage limit reached.".into(),
      Error::Unauthorized(msg) => msg.clone(),
      Error::Forbidden => "Admin access required.".into(),
      Error::InvalidArgs(msg) | Error::Conflict(msg) => msg.clone(),
    }
  }
}

/// True when the storage layer refused a write because of a unique index.
pub fn is_unique_violation(err: &DbErr) -> bool {
  matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}
