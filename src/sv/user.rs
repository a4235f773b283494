use json::json;

use crate::{
  entity::{EventType, UserRole, user},
  error::is_unique_violation,
  identity::Claims,
  prelude::*,
  sv::event::{Events, RequestMeta},
  utils,
};

pub struct User<'a> {
  db: &'a DatabaseConnection,
}

impl<'a> User<'a> {
  pub fn new(db: &'a DatabaseConnection) -> Self {
    Self { db }
  }

  /// Maps verified identity claims onto a local user, creating it on first
  /// sight. Uids listed in `admins` are promoted, never demoted.
  pub async fn resolve(
    &self,
    claims: &Claims,
    admins: &HashSet<String>,
    meta: &RequestMeta,
  ) -> Result<user::Model> {
    let wants_admin = admins.contains(&claims.uid);

    if let Some(user) = self.by_uid(&claims.uid).await? {
      return self.sync(user, claims, wants_admin).await;
    }

    let role = if wants_admin { UserRole::Admin } else { UserRole::User };
    let created = user::ActiveModel {
      id: NotSet,
      uid: Set(claims.uid.clone()),
      email: Set(claims.email.clone()),
      role: Set(role),
      joined_at: Set(utils::now()),
    }
    .insert(self.db)
    .await;

    match created {
      Ok(user) => {
        info!("New user {} ({})", user.id, user.uid);

        Events::new(self.db)
          .record(
            EventType::UserSignup,
            Some(user.id),
            meta,
            json!({ "uid": user.uid, "email": user.email }),
          )
          .await;

        Ok(user)
      }
      // a concurrent first request created it, or the email is taken
      Err(err) if is_unique_violation(&err) => self
        .by_uid(&claims.uid)
        .await?
        .ok_or_else(|| Error::Conflict("Email is already registered.".into())),
      Err(err) => Err(err.into()),
    }
  }

  async fn sync(
    &self,
    user: user::Model,
    claims: &Claims,
    wants_admin: bool,
  ) -> Result<user::Model> {
    let email_changed = user.email != claims.email
      && !self.email_taken(&claims.email, user.id).await?;
    let promote = wants_admin && !user.is_admin();

    if !email_changed && !promote {
      return Ok(user);
    }

    let mut active: user::ActiveModel = user.into();
    if email_changed {
      active.email = Set(claims.email.clone());
    }
    if promote {
      active.role = Set(UserRole::Admin);
    }

    Ok(active.update(self.db).await?)
  }

  async fn email_taken(&self, email: &str, except: i32) -> Result<bool> {
    let count = user::Entity::find()
      .filter(user::Column::Email.eq(email))
      .filter(user::Column::Id.ne(except))
      .count(self.db)
      .await?;
    Ok(count > 0)
  }

  pub async fn by_uid(&self, uid: &str) -> Result<Option<user::Model>> {
    Ok(
      user::Entity::find()
        .filter(user::Column::Uid.eq(uid))
        .one(self.db)
        .await?,
    )
  }

  pub async fn by_id(&self, id: i32) -> Result<user::Model> {
    user::Entity::find_by_id(id)
      .one(self.db)
      .await?
      .ok_or(Error::UserNotFound)
  }
}
