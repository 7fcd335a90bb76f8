use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Covers both the ordered log read and the last-message lookup the
        // chat directory performs per chat.
        manager
            .get_connection()
            .execute_unprepared(
                "CREATE INDEX messages_chat_ordering_idx
                 ON bookswap.messages (chat_id, created_at, id)",
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared("DROP INDEX IF EXISTS bookswap.messages_chat_ordering_idx")
            .await?;

        Ok(())
    }
}
