use sea_orm_migration::prelude::*;
use sea_orm::ConnectionTrait;

const SCHEMA: &str = include_str!("../../migrations/0001_ticketing_schema.sql");

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Postgres accepts the whole script over the simple query protocol.
        manager.get_connection().execute_unprepared(SCHEMA).await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared(
                "DROP TABLE IF EXISTS audit_logs, notifications, payments, tickets, \
                 order_items, orders, ticket_types, events, users CASCADE",
            )
            .await?;
        Ok(())
    }
}
