use crate::{
  entity::{EventType, tracked_event},
  prelude::*,
  utils,
};

/// Request context attached to audit records.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestMeta {
  pub ip_address: Option<String>,
  pub user_agent: Option<String>,
  pub session_id: Option<String>,
}

pub struct Events<'a> {
  db: &'a DatabaseConnection,
}

impl<'a> Events<'a> {
  pub fn new(db: &'a DatabaseConnection) -> Self {
    Self { db }
  }

  /// Appends an audit record. Failures are logged and never reach the
  /// caller: the action being audited has already happened.
  pub async fn record(
    &self,
    event_type: EventType,
    user_id: Option<i32>,
    meta: &RequestMeta,
    data: json::Value,
  ) {
    let event = tracked_event::ActiveModel {
      id: NotSet,
      event_type: Set(event_type),
      user_id: Set(user_id),
      timestamp: Set(utils::now()),
      session_id: Set(meta.session_id.clone()),
      ip_address: Set(meta.ip_address.clone()),
      user_agent: Set(meta.user_agent.clone()),
      data: Set(Some(data)),
    };

    if let Err(err) = event.insert(self.db).await {
      warn!("Failed to record {:?} event: {}", event_type, err);
    }
  }

  pub async fn list(
    &self,
    event_type: Option<EventType>,
    user_id: Option<i32>,
    limit: u64,
  ) -> Result<Vec<tracked_event::Model>> {
    let mut query = tracked_event::Entity::find();

    if let Some(ty) = event_type {
      query = query.filter(tracked_event::Column::EventType.eq(ty));
    }
    if let Some(user_id) = user_id {
      query = query.filter(tracked_event::Column::UserId.eq(user_id));
    }

    Ok(
      query
        .order_by_desc(tracked_event::Column::Timestamp)
        .order_by_desc(tracked_event::Column::Id)
        .limit(limit)
        .all(self.db)
        .await?,
    )
  }
}

#[cfg(test)]
mod tests {
  use json::json;

  use super::*;
  use crate::sv::test_utils::{fixtures, test_db};

  #[tokio::test]
  async fn test_record_and_list() {
    let db = test_db::setup().await;
    let user = fixtures::user(&db, "uid-1").await;
    let events = Events::new(&db);

    let meta = RequestMeta {
      ip_address: Some("10.0.0.1".into()),
      user_agent: Some("curl/8".into()),
      session_id: None,
    };

    events
      .record(EventType::UserLogin, Some(user.id), &meta, json!({"n": 1}))
      .await;
    events
      .record(EventType::CouponValidated, None, &meta, json!({"n": 2}))
      .await;

    let all = events.list(None, None, 10).await.unwrap();
    assert_eq!(all.len(), 2);

    let logins =
      events.list(Some(EventType::UserLogin), None, 10).await.unwrap();
    assert_eq!(logins.len(), 1);
    assert_eq!(logins[0].user_id, Some(user.id));
    assert_eq!(logins[0].ip_address.as_deref(), Some("10.0.0.1"));
    assert_eq!(logins[0].data, Some(json!({"n": 1})));

    let mine = events.list(None, Some(user.id), 10).await.unwrap();
    assert_eq!(mine.len(), 1);
  }
}
