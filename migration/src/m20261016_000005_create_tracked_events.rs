use sea_orm_migration::prelude::*;

use super::m20261016_000001_create_users::Users;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
  async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .create_table(
        Table::create()
          .table(TrackedEvents::Table)
          .if_not_exists()
          .col(
            ColumnDef::new(TrackedEvents::Id)
              .integer()
              .not_null()
              .auto_increment()
              .primary_key(),
          )
          .col(ColumnDef::new(TrackedEvents::EventType).string().not_null())
          .col(ColumnDef::new(TrackedEvents::UserId).integer().null())
          .col(ColumnDef::new(TrackedEvents::Timestamp).date_time().not_null())
          .col(ColumnDef::new(TrackedEvents::SessionId).string().null())
          .col(ColumnDef::new(TrackedEvents::IpAddress).string().null())
          .col(ColumnDef::new(TrackedEvents::UserAgent).string().null())
          .col(ColumnDef::new(TrackedEvents::Data).json().null())
          .foreign_key(
            ForeignKey::create()
              .name("fk_tracked_events_user")
              .from(TrackedEvents::Table, TrackedEvents::UserId)
              .to(Users::Table, Users::Id)
              .on_delete(ForeignKeyAction::SetNull),
          )
          .to_owned(),
      )
      .await?;

    manager
      .create_index(
        Index::create()
          .name("idx_tracked_events_type_time")
          .table(TrackedEvents::Table)
          .col(TrackedEvents::EventType)
          .col(TrackedEvents::Timestamp)
          .to_owned(),
      )
      .await?;

    manager
      .create_index(
        Index::create()
          .name("idx_tracked_events_user_time")
          .table(TrackedEvents::Table)
          .col(TrackedEvents::UserId)
          .col(TrackedEvents::Timestamp)
          .to_owned(),
      )
      .await
  }

  async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .drop_table(Table::drop().table(TrackedEvents::Table).to_owned())
      .await
  }
}

#[derive(DeriveIden)]
enum TrackedEvents {
  Table,
  Id,
  EventType,
  UserId,
  Timestamp,
  SessionId,
  IpAddress,
  UserAgent,
  Data,
}
