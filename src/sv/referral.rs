use json::json;
use sea_orm::{
  DatabaseTransaction,
  sea_query::{Expr, Func},
};
use serde::Deserialize;

use crate::{
  entity::{EventType, ReferralStatus, affiliate_profile, referral},
  error::is_unique_violation,
  prelude::*,
  sv::event::{Events, RequestMeta},
  utils,
};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReferralPatch {
  pub status: Option<ReferralStatus>,
}

pub struct Referral<'a> {
  db: &'a DatabaseConnection,
}

impl<'a> Referral<'a> {
  pub fn new(db: &'a DatabaseConnection) -> Self {
    Self { db }
  }

  /// Records that `user_id` signed up through `code` and credits the code's
  /// owner with `commission` (in cents). Either everything is written or
  /// nothing is.
  pub async fn register(
    &self,
    user_id: i32,
    code: &str,
    commission: i64,
    meta: &RequestMeta,
  ) -> Result<referral::Model> {
    let code = code.trim().to_uppercase();
    if code.is_empty() {
      return Err(Rejection::InvalidCode.into());
    }

    let txn = self.db.begin().await?;

    // the insert is the first statement so the write lock is taken before
    // anything is read; the unique index on the referred user decides races
    let now = utils::now();
    let pending = referral::ActiveModel {
      id: NotSet,
      referred_user_id: Set(user_id),
      code_used: Set(code.clone()),
      affiliate_id: Set(None),
      timestamp: Set(now),
      commission_earned: Set(None),
      status: Set(ReferralStatus::Pending),
      created_at: Set(now),
      updated_at: Set(now),
    }
    .insert(&txn)
    .await
    .map_err(|err| {
      if is_unique_violation(&err) {
        Error::from(Rejection::AlreadyReferred)
      } else {
        err.into()
      }
    })?;

    let affiliate = affiliate_profile::Entity::find()
      .filter(
        Expr::expr(Func::upper(Expr::col(
          affiliate_profile::Column::ReferralCode,
        )))
        .eq(code.as_str()),
      )
      .one(&txn)
      .await?
      .ok_or(Rejection::InvalidCode)?;

    if affiliate.user_id == user_id {
      return Err(Rejection::SelfReferral.into());
    }

    let pending = referral::ActiveModel {
      affiliate_id: Set(Some(affiliate.id)),
      ..pending.into()
    }
    .update(&txn)
    .await?;

    let referral = if commission > 0 {
      award(&txn, pending, affiliate.id, commission).await?
    } else {
      pending
    };

    txn.commit().await?;

    info!(
      "User {} referred by affiliate {} ({}), commission {}",
      user_id,
      affiliate.id,
      code,
      utils::to_decimal(commission.max(0))
    );

    Events::new(self.db)
      .record(
        EventType::UserReferred,
        Some(user_id),
        meta,
        json!({
          "referred_user_id": user_id,
          "code_used": code,
          "affiliate_id": affiliate.id,
          "commission": utils::to_decimal(commission.max(0)).to_string(),
        }),
      )
      .await;

    Ok(referral)
  }

  pub async fn by_id(&self, id: i32) -> Result<referral::Model> {
    referral::Entity::find_by_id(id)
      .one(self.db)
      .await?
      .ok_or(Error::ReferralNotFound)
  }

  pub async fn all(
    &self,
    status: Option<ReferralStatus>,
    code: Option<&str>,
  ) -> Result<Vec<referral::Model>> {
    let mut query = referral::Entity::find();

    if let Some(status) = status {
      query = query.filter(referral::Column::Status.eq(status));
    }
    if let Some(code) = code.map(str::trim).filter(|c| !c.is_empty()) {
      query = query.filter(referral::Column::CodeUsed.eq(code.to_uppercase()));
    }

    Ok(
      query
        .order_by_desc(referral::Column::Timestamp)
        .order_by_desc(referral::Column::Id)
        .all(self.db)
        .await?,
    )
  }

  pub async fn update(
    &self,
    id: i32,
    patch: ReferralPatch,
  ) -> Result<referral::Model> {
    let current = self.by_id(id).await?;

    let Some(status) = patch.status else {
      return Ok(current);
    };

    if !current.status.can_become(status) {
      return Err(Error::InvalidArgs(format!(
        "Cannot move a referral from {:?} to {:?}.",
        current.status, status
      )));
    }

    Ok(
      referral::ActiveModel {
        status: Set(status),
        updated_at: Set(utils::now()),
        ..current.into()
      }
      .update(self.db)
      .await?,
    )
  }

  pub async fn delete(&self, id: i32) -> Result<()> {
    let deleted = referral::Entity::delete_by_id(id).exec(self.db).await?;
    if deleted.rows_affected == 0 {
      return Err(Error::ReferralNotFound);
    }
    Ok(())
  }
}

/// Credits the affiliate and marks the referral as paid into the balance.
async fn award(
  txn: &DatabaseTransaction,
  referral: referral::Model,
  affiliate_id: i32,
  commission: i64,
) -> Result<referral::Model> {
  let credited = affiliate_profile::Entity::update_many()
    .col_expr(
      affiliate_profile::Column::Balance,
      Expr::col(affiliate_profile::Column::Balance).add(commission),
    )
    .col_expr(
      affiliate_profile::Column::TotalEarned,
      Expr::col(affiliate_profile::Column::TotalEarned).add(commission),
    )
    .col_expr(affiliate_profile::Column::UpdatedAt, Expr::value(utils::now()))
    .filter(affiliate_profile::Column::Id.eq(affiliate_id))
    .exec(txn)
    .await?;

  if credited.rows_affected != 1 {
    return Err(Error::AffiliateNotFound);
  }

  Ok(
    referral::ActiveModel {
      commission_earned: Set(Some(commission)),
      status: Set(ReferralStatus::CommissionAwarded),
      updated_at: Set(utils::now()),
      ..referral.into()
    }
    .update(txn)
    .await?,
  )
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{
    entity::tracked_event,
    sv::test_utils::{fixtures, test_db},
  };

  async fn affiliate(
    db: &DatabaseConnection,
    id: i32,
  ) -> affiliate_profile::Model {
    affiliate_profile::Entity::find_by_id(id).one(db).await.unwrap().unwrap()
  }

  #[tokio::test]
  async fn test_register_awards_commission() {
    let db = test_db::setup().await;
    let owner = fixtures::user(&db, "owner").await;
    let newbie = fixtures::user(&db, "newbie").await;
    let profile = fixtures::affiliate(&db, owner.id, "REF123XY").await;

    let referral = Referral::new(&db)
      .register(newbie.id, "ref123xy", 200, &RequestMeta::default())
      .await
      .unwrap();

    assert_eq!(referral.status, ReferralStatus::CommissionAwarded);
    assert_eq!(referral.commission_earned, Some(200));
    assert_eq!(referral.code_used, "REF123XY");
    assert_eq!(referral.affiliate_id, Some(profile.id));
    assert_eq!(
      utils::to_decimal(referral.commission_earned.unwrap()),
      Decimal::new(2, 0)
    );

    let profile = affiliate(&db, profile.id).await;
    assert_eq!(profile.balance, 200);
    assert_eq!(profile.total_earned, 200);

    let events = tracked_event::Entity::find()
      .filter(tracked_event::Column::EventType.eq(EventType::UserReferred))
      .all(&db)
      .await
      .unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].user_id, Some(newbie.id));
  }

  #[tokio::test]
  async fn test_second_registration_is_refused() {
    let db = test_db::setup().await;
    let owner = fixtures::user(&db, "owner").await;
    let other = fixtures::user(&db, "other").await;
    let newbie = fixtures::user(&db, "newbie").await;
    let first = fixtures::affiliate(&db, owner.id, "FIRSTCODE1").await;
    fixtures::affiliate(&db, other.id, "OTHERCODE1").await;
    let sv = Referral::new(&db);
    let meta = RequestMeta::default();

    sv.register(newbie.id, "FIRSTCODE1", 100, &meta).await.unwrap();

    for code in ["FIRSTCODE1", "OTHERCODE1"] {
      let err = sv.register(newbie.id, code, 100, &meta).await.unwrap_err();
      assert!(matches!(err, Error::Referral(Rejection::AlreadyReferred)));
    }

    let first = affiliate(&db, first.id).await;
    assert_eq!(first.balance, 100);
    assert_eq!(first.total_earned, 100);
    assert_eq!(referral::Entity::find().count(&db).await.unwrap(), 1);
  }

  #[tokio::test]
  async fn test_self_referral_is_refused() {
    let db = test_db::setup().await;
    let owner = fixtures::user(&db, "owner").await;
    let profile = fixtures::affiliate(&db, owner.id, "MYOWNCODE1").await;

    let err = Referral::new(&db)
      .register(owner.id, "myowncode1", 100, &RequestMeta::default())
      .await
      .unwrap_err();

    assert!(matches!(err, Error::Referral(Rejection::SelfReferral)));
    assert_eq!(referral::Entity::find().count(&db).await.unwrap(), 0);
    assert_eq!(affiliate(&db, profile.id).await.balance, 0);
  }

  #[tokio::test]
  async fn test_unknown_code() {
    let db = test_db::setup().await;
    let owner = fixtures::user(&db, "owner").await;
    let newbie = fixtures::user(&db, "newbie").await;
    fixtures::affiliate(&db, owner.id, "KNOWNCODE1").await;
    let sv = Referral::new(&db);
    let meta = RequestMeta::default();

    for code in ["NOSUCHCODE", "KNOWNCODE", "   "] {
      let err = sv.register(newbie.id, code, 100, &meta).await.unwrap_err();
      assert!(matches!(err, Error::Referral(Rejection::InvalidCode)));
    }
    assert_eq!(referral::Entity::find().count(&db).await.unwrap(), 0);

    sv.register(newbie.id, "knowncode1", 100, &meta).await.unwrap();
  }

  #[tokio::test]
  async fn test_inactive_profile_still_earns() {
    let db = test_db::setup().await;
    let owner = fixtures::user(&db, "owner").await;
    let newbie = fixtures::user(&db, "newbie").await;
    let profile = fixtures::affiliate(&db, owner.id, "SLEEPING01").await;
    let profile = affiliate_profile::ActiveModel {
      is_active: Set(false),
      ..profile.into()
    }
    .update(&db)
    .await
    .unwrap();

    let referral = Referral::new(&db)
      .register(newbie.id, "sleeping01", 100, &RequestMeta::default())
      .await
      .unwrap();

    assert_eq!(referral.affiliate_id, Some(profile.id));
    assert_eq!(affiliate(&db, profile.id).await.balance, 100);
  }

  #[tokio::test]
  async fn test_zero_commission_stays_pending() {
    let db = test_db::setup().await;
    let owner = fixtures::user(&db, "owner").await;
    let newbie = fixtures::user(&db, "newbie").await;
    let profile = fixtures::affiliate(&db, owner.id, "FREECODE01").await;

    let referral = Referral::new(&db)
      .register(newbie.id, "FREECODE01", 0, &RequestMeta::default())
      .await
      .unwrap();

    assert_eq!(referral.status, ReferralStatus::Pending);
    assert_eq!(referral.commission_earned, None);
    assert_eq!(affiliate(&db, profile.id).await.balance, 0);
  }

  #[tokio::test]
  async fn test_admin_filters_and_transitions() {
    let db = test_db::setup().await;
    let owner = fixtures::user(&db, "owner").await;
    let a = fixtures::user(&db, "a").await;
    let b = fixtures::user(&db, "b").await;
    let profile = fixtures::affiliate(&db, owner.id, "FILTER0001").await;
    let sv = Referral::new(&db);
    let meta = RequestMeta::default();

    let paid = sv.register(a.id, "FILTER0001", 100, &meta).await.unwrap();
    let free = sv.register(b.id, "filter0001", 0, &meta).await.unwrap();

    let pending = sv.all(Some(ReferralStatus::Pending), None).await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].id, free.id);
    assert_eq!(sv.all(None, Some("filter0001")).await.unwrap().len(), 2);
    assert!(sv.all(None, Some("OTHER")).await.unwrap().is_empty());

    let patch = ReferralPatch { status: Some(ReferralStatus::PaidOut) };
    let paid = sv.update(paid.id, patch).await.unwrap();
    assert_eq!(paid.status, ReferralStatus::PaidOut);

    let patch = ReferralPatch { status: Some(ReferralStatus::Pending) };
    assert!(matches!(
      sv.update(paid.id, patch).await,
      Err(Error::InvalidArgs(_))
    ));

    // referrals outlive the profile they came from
    affiliate_profile::Entity::delete_by_id(profile.id)
      .exec(&db)
      .await
      .unwrap();
    let orphan = sv.by_id(free.id).await.unwrap();
    assert_eq!(orphan.affiliate_id, None);

    sv.delete(orphan.id).await.unwrap();
    assert!(matches!(sv.by_id(orphan.id).await, Err(Error::ReferralNotFound)));
  }

  #[tokio::test]
  async fn test_concurrent_signups_all_pay() {
    const N: usize = 12;

    let (_dir, db) = test_db::setup_file(4).await;
    let owner = fixtures::user(&db, "owner").await;
    let profile = fixtures::affiliate(&db, owner.id, "CROWD00001").await;

    let mut users = Vec::with_capacity(N);
    for i in 0..N {
      users.push(fixtures::user(&db, &format!("signup-{i}")).await.id);
    }

    let tasks = users.into_iter().map(|user_id| {
      let db = db.clone();
      tokio::spawn(async move {
        Referral::new(&db)
          .register(user_id, "CROWD00001", 100, &RequestMeta::default())
          .await
      })
    });

    for joined in futures::future::join_all(tasks).await {
      joined.unwrap().unwrap();
    }

    let profile = affiliate(&db, profile.id).await;
    assert_eq!(profile.balance, 100 * N as i64);
    assert_eq!(profile.total_earned, 100 * N as i64);
    assert_eq!(referral::Entity::find().count(&db).await.unwrap(), N as u64);
  }

  #[tokio::test]
  async fn test_concurrent_same_user_pays_once() {
    const N: usize = 8;

    let (_dir, db) = test_db::setup_file(4).await;
    let owner = fixtures::user(&db, "owner").await;
    let newbie = fixtures::user(&db, "newbie").await;
    let profile = fixtures::affiliate(&db, owner.id, "TWICE00001").await;

    let user_id = newbie.id;
    let tasks = (0..N).map(|_| {
      let db = db.clone();
      tokio::spawn(async move {
        Referral::new(&db)
          .register(user_id, "TWICE00001", 100, &RequestMeta::default())
          .await
      })
    });

    let mut accepted = 0;
    for joined in futures::future::join_all(tasks).await {
      match joined.unwrap() {
        Ok(_) => accepted += 1,
        Err(err) => assert!(
          matches!(err, Error::Referral(Rejection::AlreadyReferred)),
          "{err:?}"
        ),
      }
    }

    assert_eq!(accepted, 1);
    assert_eq!(affiliate(&db, profile.id).await.balance, 100);
    assert_eq!(referral::Entity::find().count(&db).await.unwrap(), 1);
  }
}
