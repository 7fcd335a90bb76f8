use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared("CREATE SCHEMA IF NOT EXISTS bookswap")
            .await?;

        // gen_random_uuid() for uuid primary key defaults
        manager
            .get_connection()
            .execute_unprepared("CREATE EXTENSION IF NOT EXISTS pgcrypto")
            .await?;

        // Create exchange_status enum
        manager
            .get_connection()
            .execute_unprepared(
                "CREATE TYPE bookswap.exchange_status AS ENUM (
                    'pending',
                    'accepted',
                    'completed',
                    'cancelled'
                )",
            )
            .await?;

        manager
            .get_connection()
            .execute_unprepared(
                "CREATE TABLE bookswap.users (
                    id uuid PRIMARY KEY DEFAULT gen_random_uuid(),
                    name text NOT NULL,
                    email text NOT NULL UNIQUE,
                    created_at timestamptz NOT NULL DEFAULT now(),
                    updated_at timestamptz NOT NULL DEFAULT now()
                )",
            )
            .await?;

        manager
            .get_connection()
            .execute_unprepared(
                "CREATE TABLE bookswap.books (
                    id uuid PRIMARY KEY DEFAULT gen_random_uuid(),
                    owner_id uuid NOT NULL REFERENCES bookswap.users (id) ON DELETE CASCADE,
                    title text NOT NULL,
                    image_url text,
                    created_at timestamptz NOT NULL DEFAULT now(),
                    updated_at timestamptz NOT NULL DEFAULT now()
                )",
            )
            .await?;

        manager
            .get_connection()
            .execute_unprepared(
                "CREATE TABLE bookswap.chats (
                    id uuid PRIMARY KEY DEFAULT gen_random_uuid(),
                    offerer_id uuid NOT NULL REFERENCES bookswap.users (id) ON DELETE CASCADE,
                    interested_id uuid NOT NULL REFERENCES bookswap.users (id) ON DELETE CASCADE,
                    book_id uuid NOT NULL REFERENCES bookswap.books (id) ON DELETE CASCADE,
                    created_at timestamptz NOT NULL DEFAULT now()
                )",
            )
            .await?;

        // UNIQUE (chat_id): exactly one exchange per chat
        manager
            .get_connection()
            .execute_unprepared(
                "CREATE TABLE bookswap.exchanges (
                    id uuid PRIMARY KEY DEFAULT gen_random_uuid(),
                    chat_id uuid NOT NULL UNIQUE REFERENCES bookswap.chats (id) ON DELETE CASCADE,
                    status bookswap.exchange_status NOT NULL DEFAULT 'pending',
                    offerer_confirmed boolean NOT NULL DEFAULT false,
                    interested_confirmed boolean NOT NULL DEFAULT false,
                    created_at timestamptz NOT NULL DEFAULT now(),
                    updated_at timestamptz NOT NULL DEFAULT now()
                )",
            )
            .await?;

        // Append-only log; bigserial id doubles as the ordering tie-break
        manager
            .get_connection()
            .execute_unprepared(
                "CREATE TABLE bookswap.messages (
                    id bigserial PRIMARY KEY,
                    chat_id uuid NOT NULL REFERENCES bookswap.chats (id) ON DELETE CASCADE,
                    sender_id uuid NOT NULL REFERENCES bookswap.users (id) ON DELETE CASCADE,
                    content text NOT NULL,
                    created_at timestamptz NOT NULL DEFAULT now()
                )",
            )
            .await?;

        manager
            .get_connection()
            .execute_unprepared(
                "CREATE INDEX chats_offerer_id_idx ON bookswap.chats (offerer_id)",
            )
            .await?;

        manager
            .get_connection()
            .execute_unprepared(
                "CREATE INDEX chats_interested_id_idx ON bookswap.chats (interested_id)",
            )
            .await?;

        manager
            .get_connection()
            .execute_unprepared("CREATE INDEX chats_book_id_idx ON bookswap.chats (book_id)")
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared("DROP TABLE IF EXISTS bookswap.messages")
            .await?;
        manager
            .get_connection()
            .execute_unprepared("DROP TABLE IF EXISTS bookswap.exchanges")
            .await?;
        manager
            .get_connection()
            .execute_unprepared("DROP TABLE IF EXISTS bookswap.chats")
            .await?;
        manager
            .get_connection()
            .execute_unprepared("DROP TABLE IF EXISTS bookswap.books")
            .await?;
        manager
            .get_connection()
            .execute_unprepared("DROP TABLE IF EXISTS bookswap.users")
            .await?;
        manager
            .get_connection()
            .execute_unprepared("DROP TYPE IF EXISTS bookswap.exchange_status")
            .await?;

        Ok(())
    }
}
