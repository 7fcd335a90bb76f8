//! The append-only message log.
//!
//! Appends are gated by the exchange lifecycle: only a chat whose
//! exchange is still live accepts messages. The gate and the insert run in
//! one transaction holding the exchange row lock, so a concurrent
//! cancellation cannot slip a message into a dead chat.

use crate::error::{DomainErrorKind, EntityErrorKind, Error, InternalErrorKind};
use crate::messages::Model;
use entity_api::error::EntityApiErrorKind;
use entity_api::{chat, exchange, message};
use events::{DomainEvent, EventPublisher};
use log::*;
use sea_orm::{DatabaseConnection, TransactionTrait};

fn txn_error(err: sea_orm::DbErr) -> Error {
    Error {
        source: Some(Box::new(err)),
        error_kind: DomainErrorKind::Internal(InternalErrorKind::Entity(
            EntityErrorKind::DbTransaction,
        )),
    }
}

/// Appends a message to the chat's log.
///
/// The sender must be a participant (`Forbidden`) and the chat's exchange
/// must be pending or accepted (`InvalidState`). A chat with no exchange
/// row is treated as cancelled. The id and timestamp are server-assigned.
pub async fn append(
    db: &DatabaseConnection,
    event_publisher: &EventPublisher,
    chat_id: crate::Id,
    sender_id: crate::Id,
    content: String,
) -> Result<Model, Error> {
    let chat = chat::find_by_id(db, chat_id).await?;

    if !chat.is_participant(sender_id) {
        return Err(Error {
            source: None,
            error_kind: DomainErrorKind::Forbidden,
        });
    }

    let txn = db.begin().await.map_err(txn_error)?;

    let status = match exchange::find_by_chat_id_for_update(&txn, chat_id).await {
        Ok(exchange) => exchange.status,
        Err(err) if err.error_kind == EntityApiErrorKind::RecordNotFound => {
            warn!("Chat {chat_id} has no exchange row; treating it as cancelled");
            crate::exchange_status::ExchangeStatus::Cancelled
        }
        Err(err) => return Err(err.into()),
    };

    if !status.is_active() {
        return Err(Error {
            source: None,
            error_kind: DomainErrorKind::InvalidState,
        });
    }

    let stored = message::create(&txn, chat_id, sender_id, content).await?;

    txn.commit().await.map_err(txn_error)?;

    event_publisher
        .publish(DomainEvent::MessageAppended {
            chat_id,
            message: serde_json::to_value(&stored)?,
            notify_user_ids: chat.participants().to_vec(),
        })
        .await;

    Ok(stored)
}

/// The chat's full message log, ordered `(timestamp, id)` ascending.
/// `NotFound` when the chat itself does not exist.
pub async fn list(db: &DatabaseConnection, chat_id: crate::Id) -> Result<Vec<Model>, Error> {
    chat::find_by_id(db, chat_id).await?;

    Ok(message::find_by_chat_id(db, chat_id).await?)
}

#[cfg(test)]
// We need to gate seaORM's mock feature behind conditional compilation because
// the feature removes the Clone trait implementation from seaORM's DatabaseConnection.
// see https://github.com/SeaQL/sea-orm/issues/830
#[cfg(feature = "mock")]
mod tests {
    use super::*;
    use crate::exchange_status::ExchangeStatus;
    use entity::{chats, exchanges, messages};
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn chat_model() -> chats::Model {
        chats::Model {
            id: crate::Id::new_v4(),
            offerer_id: crate::Id::new_v4(),
            interested_id: crate::Id::new_v4(),
            book_id: crate::Id::new_v4(),
            created_at: chrono::Utc::now().into(),
        }
    }

    fn exchange_model(chat: &chats::Model, status: ExchangeStatus) -> exchanges::Model {
        let now = chrono::Utc::now();
        exchanges::Model {
            id: crate::Id::new_v4(),
            chat_id: chat.id,
            status,
            offerer_confirmed: false,
            interested_confirmed: false,
            created_at: now.into(),
            updated_at: now.into(),
        }
    }

    #[tokio::test]
    async fn append_rejects_non_participants() {
        let chat = chat_model();

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![vec![chat.clone()]])
            .into_connection();

        let result = append(
            &db,
            &EventPublisher::default(),
            chat.id,
            crate::Id::new_v4(),
            "hello".to_owned(),
        )
        .await;

        assert_eq!(result.unwrap_err().error_kind, DomainErrorKind::Forbidden);
    }

    #[tokio::test]
    async fn append_rejects_completed_and_cancelled_chats() {
        for status in [ExchangeStatus::Completed, ExchangeStatus::Cancelled] {
            let chat = chat_model();
            let exchange = exchange_model(&chat, status);

            let db = MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results(vec![vec![chat.clone()]])
                .append_query_results(vec![vec![exchange]])
                .into_connection();

            let result = append(
                &db,
                &EventPublisher::default(),
                chat.id,
                chat.offerer_id,
                "too late".to_owned(),
            )
            .await;

            assert_eq!(
                result.unwrap_err().error_kind,
                DomainErrorKind::InvalidState,
                "{status}"
            );
        }
    }

    #[tokio::test]
    async fn append_treats_a_missing_exchange_as_cancelled() {
        let chat = chat_model();

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![vec![chat.clone()]])
            .append_query_results(vec![Vec::<exchanges::Model>::new()])
            .into_connection();

        let result = append(
            &db,
            &EventPublisher::default(),
            chat.id,
            chat.offerer_id,
            "anyone there?".to_owned(),
        )
        .await;

        assert_eq!(result.unwrap_err().error_kind, DomainErrorKind::InvalidState);
    }

    #[tokio::test]
    async fn append_stores_the_message_while_the_exchange_is_live() {
        let chat = chat_model();
        let exchange = exchange_model(&chat, ExchangeStatus::Pending);
        let stored = messages::Model {
            id: 7,
            chat_id: chat.id,
            sender_id: chat.interested_id,
            content: "hello".to_owned(),
            created_at: chrono::Utc::now().into(),
        };

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![vec![chat.clone()]])
            .append_query_results(vec![vec![exchange]])
            .append_query_results(vec![vec![stored.clone()]])
            .into_connection();

        let message = append(
            &db,
            &EventPublisher::default(),
            chat.id,
            chat.interested_id,
            "hello".to_owned(),
        )
        .await
        .expect("append should succeed");

        assert_eq!(message.id, 7);
        assert_eq!(message.sender_id, chat.interested_id);
    }

    #[tokio::test]
    async fn list_requires_the_chat_to_exist() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![Vec::<chats::Model>::new()])
            .into_connection();

        let result = list(&db, crate::Id::new_v4()).await;

        assert_eq!(
            result.unwrap_err().error_kind,
            DomainErrorKind::Internal(InternalErrorKind::Entity(EntityErrorKind::NotFound))
        );
    }
}
