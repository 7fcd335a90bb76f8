use super::error::{EntityApiErrorKind, Error};
use entity::messages::{ActiveModel, Column, Entity, Model};
use entity::Id;
use sea_orm::{entity::prelude::*, ActiveValue::Set, ConnectionTrait, QueryOrder};

use log::*;

/// Appends one message. The id comes back from the database sequence and
/// the timestamp is the server clock; nothing client-supplied is stored
/// beyond the content itself.
pub async fn create(
    db: &impl ConnectionTrait,
    chat_id: Id,
    sender_id: Id,
    content: String,
) -> Result<Model, Error> {
    debug!("New Message to be appended to chat {chat_id} from sender {sender_id}");

    let message_active_model = ActiveModel {
        chat_id: Set(chat_id),
        sender_id: Set(sender_id),
        content: Set(content),
        created_at: Set(chrono::Utc::now().into()),
        ..Default::default()
    };

    Ok(message_active_model.insert(db).await?)
}

/// Every message of the chat, oldest first. Ties on the timestamp are
/// broken by the monotonically increasing id.
pub async fn find_by_chat_id(db: &impl ConnectionTrait, chat_id: Id) -> Result<Vec<Model>, Error> {
    let messages = Entity::find()
        .filter(Column::ChatId.eq(chat_id))
        .order_by_asc(Column::CreatedAt)
        .order_by_asc(Column::Id)
        .all(db)
        .await?;

    Ok(messages)
}

/// The chat's most recent message under the same ordering, if any.
pub async fn find_last_for_chat(
    db: &impl ConnectionTrait,
    chat_id: Id,
) -> Result<Option<Model>, Error> {
    let message = Entity::find()
        .filter(Column::ChatId.eq(chat_id))
        .order_by_desc(Column::CreatedAt)
        .order_by_desc(Column::Id)
        .one(db)
        .await?;

    Ok(message)
}

#[cfg(test)]
// We need to gate seaORM's mock feature behind conditional compilation because
// the feature removes the Clone trait implementation from seaORM's DatabaseConnection.
// see https://github.com/SeaQL/sea-orm/issues/830
#[cfg(feature = "mock")]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn message_model(id: i64, chat_id: Id, content: &str) -> Model {
        Model {
            id,
            chat_id,
            sender_id: Id::new_v4(),
            content: content.to_owned(),
            created_at: chrono::Utc::now().into(),
        }
    }

    #[tokio::test]
    async fn create_returns_the_stored_message() -> Result<(), Error> {
        let chat_id = Id::new_v4();
        let stored = message_model(1, chat_id, "hello");

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![vec![stored.clone()]])
            .into_connection();

        let message = create(&db, chat_id, stored.sender_id, "hello".to_owned()).await?;

        assert_eq!(message.id, 1);
        assert_eq!(message.content, "hello");

        Ok(())
    }

    #[tokio::test]
    async fn find_by_chat_id_returns_messages_in_stored_order() -> Result<(), Error> {
        let chat_id = Id::new_v4();
        let first = message_model(1, chat_id, "first");
        let second = message_model(2, chat_id, "second");

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![vec![first.clone(), second.clone()]])
            .into_connection();

        let messages = find_by_chat_id(&db, chat_id).await?;

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].id, 1);
        assert_eq!(messages[1].id, 2);

        Ok(())
    }
}
