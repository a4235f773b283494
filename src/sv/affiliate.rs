use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use json::json;
use serde::Deserialize;
use uuid::Uuid;
use validator::ValidateEmail;

use crate::{
  entity::{EventType, affiliate_profile},
  error::is_unique_violation,
  prelude::*,
  sv::event::{Events, RequestMeta},
  utils::{self, nullable},
};

pub const CODE_LEN: usize = 10;
const CODE_ATTEMPTS: usize = 5;

/// Fresh referral code: `CODE_LEN` uppercase ASCII letters and digits.
///
/// Drawn from v4 uuids (OS randomness), url-safe base64 with `-`/`_` removed.
pub fn generate_code() -> String {
  let mut code = String::with_capacity(CODE_LEN);

  while code.len() < CODE_LEN {
    let token = URL_SAFE_NO_PAD.encode(Uuid::new_v4().as_bytes());
    code.extend(
      token
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_uppercase())
        .take(CODE_LEN - code.len()),
    );
  }

  code
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfilePatch {
  #[serde(default, deserialize_with = "nullable")]
  pub payout_email: Option<Option<String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AdminProfilePatch {
  pub is_active: Option<bool>,
  #[serde(default, deserialize_with = "nullable")]
  pub payout_email: Option<Option<String>>,
}

fn payout_email(email: Option<String>) -> Result<Option<String>> {
  match email.map(|e| e.trim().to_string()) {
    Some(e) if e.is_empty() => Ok(None),
    Some(e) if !e.validate_email() => {
      Err(Error::InvalidArgs("Enter a valid payout email address.".into()))
    }
    other => Ok(other),
  }
}

pub struct Affiliate<'a> {
  db: &'a DatabaseConnection,
}

impl<'a> Affiliate<'a> {
  pub fn new(db: &'a DatabaseConnection) -> Self {
    Self { db }
  }

  pub async fn by_user(
    &self,
    user_id: i32,
  ) -> Result<Option<affiliate_profile::Model>> {
    Ok(
      affiliate_profile::Entity::find()
        .filter(affiliate_profile::Column::UserId.eq(user_id))
        .one(self.db)
        .await?,
    )
  }

  pub async fn by_id(&self, id: i32) -> Result<affiliate_profile::Model> {
    affiliate_profile::Entity::find_by_id(id)
      .one(self.db)
      .await?
      .ok_or(Error::AffiliateNotFound)
  }

  /// The caller's profile, created with a fresh code on first access.
  /// The flag tells whether this call created it.
  pub async fn profile(
    &self,
    user_id: i32,
    meta: &RequestMeta,
  ) -> Result<(affiliate_profile::Model, bool)> {
    self.profile_with(user_id, meta, generate_code).await
  }

  async fn profile_with(
    &self,
    user_id: i32,
    meta: &RequestMeta,
    mut next_code: impl FnMut() -> String,
  ) -> Result<(affiliate_profile::Model, bool)> {
    if let Some(profile) = self.by_user(user_id).await? {
      return Ok((profile, false));
    }

    for _ in 0..CODE_ATTEMPTS {
      let now = utils::now();
      let inserted = affiliate_profile::ActiveModel {
        id: NotSet,
        user_id: Set(user_id),
        referral_code: Set(next_code()),
        balance: Set(0),
        total_earned: Set(0),
        is_active: Set(true),
        payout_email: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
      }
      .insert(self.db)
      .await;

      match inserted {
        Ok(profile) => {
          info!(
            "Affiliate profile {} created for user {} with code {}",
            profile.id, user_id, profile.referral_code
          );

          Events::new(self.db)
            .record(
              EventType::AffiliateProfileCreated,
              Some(user_id),
              meta,
              json!({
                "affiliate_id": profile.id,
                "referral_code": profile.referral_code,
              }),
            )
            .await;

          return Ok((profile, true));
        }
        Err(err) if is_unique_violation(&err) => {
          // a parallel request may have created it in the meantime
          if let Some(profile) = self.by_user(user_id).await? {
            return Ok((profile, false));
          }
          warn!("Referral code collision for user {user_id}, retrying");
        }
        Err(err) => return Err(err.into()),
      }
    }

    Err(Error::Conflict("Could not allocate a unique referral code.".into()))
  }

  /// Self-service changes to the caller's own profile.
  pub async fn update_own(
    &self,
    user_id: i32,
    patch: ProfilePatch,
    meta: &RequestMeta,
  ) -> Result<affiliate_profile::Model> {
    let (profile, _) = self.profile(user_id, meta).await?;

    let Some(email) = patch.payout_email else {
      return Ok(profile);
    };

    let profile = affiliate_profile::ActiveModel {
      payout_email: Set(payout_email(email)?),
      updated_at: Set(utils::now()),
      ..profile.into()
    }
    .update(self.db)
    .await?;

    Events::new(self.db)
      .record(
        EventType::AffiliateProfileUpdated,
        Some(user_id),
        meta,
        json!({
          "affiliate_id": profile.id,
          "payout_email": profile.payout_email,
        }),
      )
      .await;

    Ok(profile)
  }

  pub async fn all(&self) -> Result<Vec<affiliate_profile::Model>> {
    Ok(
      affiliate_profile::Entity::find()
        .order_by_desc(affiliate_profile::Column::CreatedAt)
        .order_by_desc(affiliate_profile::Column::Id)
        .all(self.db)
        .await?,
    )
  }

  pub async fn update(
    &self,
    id: i32,
    patch: AdminProfilePatch,
  ) -> Result<affiliate_profile::Model> {
    let mut active: affiliate_profile::ActiveModel =
      self.by_id(id).await?.into();

    if let Some(is_active) = patch.is_active {
      active.is_active = Set(is_active);
    }
    if let Some(email) = patch.payout_email {
      active.payout_email = Set(payout_email(email)?);
    }
    active.updated_at = Set(utils::now());

    Ok(active.update(self.db).await?)
  }

  /// Referrals made through the profile stay, detached from it.
  pub async fn delete(&self, id: i32) -> Result<()> {
    let deleted =
      affiliate_profile::Entity::delete_by_id(id).exec(self.db).await?;
    if deleted.rows_affected == 0 {
      return Err(Error::AffiliateNotFound);
    }

    info!("Affiliate profile {} deleted", id);
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{
    entity::tracked_event,
    sv::test_utils::{fixtures, test_db},
  };

  #[test]
  fn test_generated_code_shape() {
    let mut seen = HashSet::new();

    for _ in 0..200 {
      let code = generate_code();
      assert_eq!(code.len(), CODE_LEN);
      assert!(
        code.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
      );
      seen.insert(code);
    }

    assert_eq!(seen.len(), 200);
  }

  #[tokio::test]
  async fn test_profile_is_created_once() {
    let db = test_db::setup().await;
    let user = fixtures::user(&db, "aff").await;
    let sv = Affiliate::new(&db);
    let meta = RequestMeta::default();

    let (first, created) = sv.profile(user.id, &meta).await.unwrap();
    assert!(created);
    assert_eq!(first.referral_code.len(), CODE_LEN);
    assert_eq!(first.balance, 0);

    let (again, created) = sv.profile(user.id, &meta).await.unwrap();
    assert!(!created);
    assert_eq!(again.id, first.id);
    assert_eq!(again.referral_code, first.referral_code);

    let created_events = tracked_event::Entity::find()
      .filter(
        tracked_event::Column::EventType
          .eq(EventType::AffiliateProfileCreated),
      )
      .count(&db)
      .await
      .unwrap();
    assert_eq!(created_events, 1);
  }

  #[tokio::test]
  async fn test_payout_email_updates() {
    let db = test_db::setup().await;
    let user = fixtures::user(&db, "aff").await;
    let sv = Affiliate::new(&db);
    let meta = RequestMeta::default();

    let patch = ProfilePatch {
      payout_email: Some(Some("pay@example.com".into())),
    };
    let profile = sv.update_own(user.id, patch, &meta).await.unwrap();
    assert_eq!(profile.payout_email.as_deref(), Some("pay@example.com"));

    for bad in ["nope", "a@@b.com", "a b@c.d", "@example.com"] {
      let patch = ProfilePatch { payout_email: Some(Some(bad.into())) };
      assert!(matches!(
        sv.update_own(user.id, patch, &meta).await,
        Err(Error::InvalidArgs(_))
      ));
    }

    let cleared = ProfilePatch { payout_email: Some(None) };
    let profile = sv.update_own(user.id, cleared, &meta).await.unwrap();
    assert_eq!(profile.payout_email, None);
  }

  #[tokio::test]
  async fn test_admin_update_and_delete() {
    let db = test_db::setup().await;
    let user = fixtures::user(&db, "aff").await;
    let profile = fixtures::affiliate(&db, user.id, "ADMINME01").await;
    let sv = Affiliate::new(&db);

    let patch = AdminProfilePatch { is_active: Some(false), ..Default::default() };
    let profile = sv.update(profile.id, patch).await.unwrap();
    assert!(!profile.is_active);
    assert_eq!(sv.all().await.unwrap().len(), 1);

    sv.delete(profile.id).await.unwrap();
    assert!(matches!(sv.by_id(profile.id).await, Err(Error::AffiliateNotFound)));
    assert!(matches!(sv.delete(profile.id).await, Err(Error::AffiliateNotFound)));
  }

  #[tokio::test]
  async fn test_code_collision_is_retried() {
    let db = test_db::setup().await;
    let owner = fixtures::user(&db, "owner").await;
    let user = fixtures::user(&db, "aff").await;
    fixtures::affiliate(&db, owner.id, "TAKEN00001").await;
    let sv = Affiliate::new(&db);
    let meta = RequestMeta::default();

    let mut codes = vec!["FRESH00001", "TAKEN00001"];
    let (profile, created) = sv
      .profile_with(user.id, &meta, || codes.pop().unwrap().to_string())
      .await
      .unwrap();

    assert!(created);
    assert_eq!(profile.referral_code, "FRESH00001");
    assert!(codes.is_empty());
  }

  #[tokio::test]
  async fn test_code_collision_gives_up() {
    let db = test_db::setup().await;
    let owner = fixtures::user(&db, "owner").await;
    let user = fixtures::user(&db, "aff").await;
    fixtures::affiliate(&db, owner.id, "TAKEN00001").await;
    let sv = Affiliate::new(&db);

    let mut attempts = 0;
    let result = sv
      .profile_with(user.id, &RequestMeta::default(), || {
        attempts += 1;
        "TAKEN00001".to_string()
      })
      .await;

    assert!(matches!(result, Err(Error::Conflict(_))));
    assert_eq!(attempts, CODE_ATTEMPTS);
    assert!(sv.by_user(user.id).await.unwrap().is_none());
  }
}
