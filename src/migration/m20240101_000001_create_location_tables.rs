use sea_orm::Schema;
use sea_orm_migration::prelude::*;

use crate::entity::{tracked_session, user_location};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let schema = Schema::new(manager.get_database_backend());

        manager
            .create_table(
                schema
                    .create_table_from_entity(tracked_session::Entity)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        // Active-session lookup: newest active row per user
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_tracked_session_user_active")
                    .table(tracked_session::Entity)
                    .col(tracked_session::Column::UserId)
                    .col(tracked_session::Column::IsActive)
                    .col(tracked_session::Column::LoginTime)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                schema
                    .create_table_from_entity(user_location::Entity)
                    .if_not_exists()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(
                Table::drop()
                    .table(user_location::Entity)
                    .if_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(
                Table::drop()
                    .table(tracked_session::Entity)
                    .if_exists()
                    .to_owned(),
            )
            .await
    }
}
