//! Shared test utilities for database setup

#[cfg(test)]
pub mod test_db {
  use std::time::Duration;

  use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbBackend,
    EntityTrait, Schema,
  };
  use tempfile::TempDir;

  use crate::{entity::*, prelude::MigratorTrait};

  async fn create_table<E: EntityTrait>(
    db: &DatabaseConnection,
    schema: &Schema,
    entity: E,
  ) {
    let stmt = schema.create_table_from_entity(entity);
    db.execute(db.get_database_backend().build(&stmt)).await.unwrap();
  }

  /// Creates an in-memory SQLite database with all required tables
  pub async fn setup() -> DatabaseConnection {
    // every pooled connection to `:memory:` would open its own database
    let mut opts = ConnectOptions::new("sqlite::memory:");
    opts.max_connections(1).min_connections(1).sqlx_logging(false);

    let db = Database::connect(opts).await.unwrap();
    let schema = Schema::new(DbBackend::Sqlite);

    create_table(&db, &schema, user::Entity).await;
    create_table(&db, &schema, promotion::Entity).await;
    create_table(&db, &schema, coupon_code::Entity).await;
    create_table(&db, &schema, coupon_redemption::Entity).await;
    create_table(&db, &schema, affiliate_profile::Entity).await;
    create_table(&db, &schema, referral::Entity).await;
    create_table(&db, &schema, tracked_event::Entity).await;

    db
  }

  /// Creates a migrated file-backed database served by several pooled
  /// connections, for tests that need real concurrent writers.
  pub async fn setup_file(connections: u32) -> (TempDir, DatabaseConnection) {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}?mode=rwc", dir.path().join("t.db").display());

    let mut opts = ConnectOptions::new(url);
    opts
      .max_connections(connections)
      .acquire_timeout(Duration::from_secs(30))
      .sqlx_logging(false);

    let db = Database::connect(opts).await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();

    (dir, db)
  }
}

#[cfg(test)]
pub mod fixtures {
  use sea_orm::{ActiveModelTrait, DatabaseConnection, NotSet, Set};

  use crate::{
    entity::{
      DiscountKind, UserRole, affiliate_profile, coupon_code, promotion, user,
    },
    utils,
  };

  pub async fn user(db: &DatabaseConnection, uid: &str) -> user::Model {
    user::ActiveModel {
      id: NotSet,
      uid: Set(uid.to_string()),
      email: Set(format!("{uid}@example.com")),
      role: Set(UserRole::User),
      joined_at: Set(utils::now()),
    }
    .insert(db)
    .await
    .unwrap()
  }

  /// Active 10% promotion that started a day ago, no caps.
  pub async fn promotion(db: &DatabaseConnection) -> promotion::Model {
    let now = utils::now();

    promotion::ActiveModel {
      id: NotSet,
      name: Set("Autumn sale".into()),
      description: Set(String::new()),
      discount_kind: Set(DiscountKind::Percentage),
      discount_value: Set(10 * utils::CENTS),
      start_date: Set(now - chrono::TimeDelta::days(1)),
      end_date: Set(None),
      is_active: Set(true),
      max_uses: Set(None),
      total_uses_count: Set(0),
      max_uses_per_user: Set(None),
      created_at: Set(now),
      updated_at: Set(now),
    }
    .insert(db)
    .await
    .unwrap()
  }

  /// Active coupon with no caps or windows.
  pub async fn coupon(
    db: &DatabaseConnection,
    promotion_id: i32,
    code: &str,
  ) -> coupon_code::Model {
    let now = utils::now();

    coupon_code::ActiveModel {
      id: NotSet,
      promotion_id: Set(promotion_id),
      code: Set(code.to_uppercase()),
      is_active: Set(true),
      uses_count: Set(0),
      max_uses: Set(None),
      valid_from: Set(None),
      valid_to: Set(None),
      user_specific_id: Set(None),
      created_at: Set(now),
      updated_at: Set(now),
    }
    .insert(db)
    .await
    .unwrap()
  }

  pub async fn affiliate(
    db: &DatabaseConnection,
    user_id: i32,
    code: &str,
  ) -> affiliate_profile::Model {
    let now = utils::now();

    affiliate_profile::ActiveModel {
      id: NotSet,
      user_id: Set(user_id),
      referral_code: Set(code.to_string()),
      balance: Set(0),
      total_earned: Set(0),
      is_active: Set(true),
      payout_email: Set(None),
      created_at: Set(now),
      updated_at: Set(now),
    }
    .insert(db)
    .await
    .unwrap()
  }
}
