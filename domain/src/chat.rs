//! Chat creation and the per-user chat directory.
//!
//! A chat is opened by an interested user against a listing; the listing's
//! owner becomes the offerer. The directory view is always recomputed from
//! the message log and the exchange state — it is never persisted, so it
//! cannot go stale.

use crate::error::{DomainErrorKind, EntityErrorKind, Error, InternalErrorKind};
use crate::{chats, exchanges};
use entity_api::{book, chat, exchange, message, user};
use events::{DomainEvent, EventPublisher};
use log::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::{DatabaseConnection, TransactionTrait};
use serde::Serialize;

pub use entity_api::chat::find_by_id;

/// Result of [`find_or_create`]: the chat, its exchange, and whether this
/// call created them or found an existing live pair.
#[derive(Debug, Serialize)]
pub struct ChatCreation {
    pub chat: chats::Model,
    pub exchange: exchanges::Model,
    #[serde(skip)]
    pub created: bool,
}

/// One row of a user's chat directory.
#[derive(Debug, Clone, Serialize)]
pub struct ChatSummary {
    pub chat_id: crate::Id,
    pub counterpart_name: String,
    pub book_title: String,
    pub book_image_url: Option<String>,
    /// Content of the latest message; `None` for a chat with no messages yet
    pub last_message: Option<String>,
    /// Latest message timestamp, or the chat's creation time as the
    /// activity marker for an empty chat
    pub last_message_at: DateTimeWithTimeZone,
    /// True when the latest message was authored by the viewing user
    pub is_mine: bool,
}

/// Counterpart/book preview for a single chat, shown in the conversation
/// header.
#[derive(Debug, Serialize)]
pub struct ChatPreview {
    pub book_title: String,
    pub book_image_url: Option<String>,
    pub counterpart_name: String,
    pub counterpart_id: crate::Id,
}

fn txn_error(err: sea_orm::DbErr) -> Error {
    Error {
        source: Some(Box::new(err)),
        error_kind: DomainErrorKind::Internal(InternalErrorKind::Entity(
            EntityErrorKind::DbTransaction,
        )),
    }
}

/// Loads the chat and verifies `user_id` is one of its two participants.
pub async fn ensure_participant(
    db: &DatabaseConnection,
    chat_id: crate::Id,
    user_id: crate::Id,
) -> Result<chats::Model, Error> {
    let chat = chat::find_by_id(db, chat_id).await?;

    if !chat.is_participant(user_id) {
        return Err(Error {
            source: None,
            error_kind: DomainErrorKind::Forbidden,
        });
    }

    Ok(chat)
}

/// Opens a chat (and its exchange) between the book's owner and
/// `interested_user_id`, or returns the existing one when a live exchange
/// for the same pairing already exists — duplicate "start chat" taps must
/// not fork the conversation.
///
/// The chat, its exchange, and the greeting message are inserted in one
/// transaction, so a chat without an exchange is never observable.
pub async fn find_or_create(
    db: &DatabaseConnection,
    event_publisher: &EventPublisher,
    book_id: crate::Id,
    interested_user_id: crate::Id,
) -> Result<ChatCreation, Error> {
    let book = book::find_by_id(db, book_id).await?;

    if book.owner_id == interested_user_id {
        // The owner-vs-requester pairing is the only legitimate one.
        return Err(Error {
            source: None,
            error_kind: DomainErrorKind::Conflict,
        });
    }

    if let Some(existing) =
        chat::find_active_for_pair(db, book_id, book.owner_id, interested_user_id).await?
    {
        debug!(
            "Live chat {} already open for book {book_id}; returning it",
            existing.id
        );
        let exchange = exchange::find_by_chat_id(db, existing.id).await?;
        return Ok(ChatCreation {
            chat: existing,
            exchange,
            created: false,
        });
    }

    let interested_user = user::find_by_id(db, interested_user_id).await?;

    let txn = db.begin().await.map_err(txn_error)?;

    let chat = chat::create(&txn, book.owner_id, interested_user_id, book_id).await?;
    let exchange = exchange::create(&txn, chat.id).await?;
    message::create(
        &txn,
        chat.id,
        interested_user_id,
        format!(
            "{} started this conversation to arrange an exchange!",
            interested_user.name
        ),
    )
    .await?;

    txn.commit().await.map_err(txn_error)?;

    info!(
        "Opened chat {} on book {book_id} between {} and {interested_user_id}",
        chat.id, book.owner_id
    );

    event_publisher
        .publish(DomainEvent::ChatCreated {
            chat_id: chat.id,
            notify_user_ids: chat.participants().to_vec(),
        })
        .await;

    Ok(ChatCreation {
        chat,
        exchange,
        created: true,
    })
}

/// The chat directory for `user_id`: every chat they participate in whose
/// exchange is still live, most recently active first.
pub async fn active_chats_for(
    db: &DatabaseConnection,
    user_id: crate::Id,
) -> Result<Vec<ChatSummary>, Error> {
    let rows = chat::find_active_for_user(db, user_id).await?;

    let mut summaries = Vec::with_capacity(rows.len());
    for (chat, _exchange) in rows {
        summaries.push(summarize_for(db, &chat, user_id).await?);
    }

    // Most recently active first; empty chats sort by creation time.
    summaries.sort_by(|a, b| b.last_message_at.cmp(&a.last_message_at));

    Ok(summaries)
}

/// The directory row for one chat from `user_id`'s point of view.
pub async fn summarize_for(
    db: &DatabaseConnection,
    chat: &chats::Model,
    user_id: crate::Id,
) -> Result<ChatSummary, Error> {
    let book = book::find_by_id(db, chat.book_id).await?;

    let counterpart_id = if chat.offerer_id == user_id {
        chat.interested_id
    } else {
        chat.offerer_id
    };
    let counterpart = user::find_by_id(db, counterpart_id).await?;

    let last = message::find_last_for_chat(db, chat.id).await?;

    Ok(ChatSummary {
        chat_id: chat.id,
        counterpart_name: counterpart.name,
        book_title: book.title,
        book_image_url: book.image_url,
        is_mine: last
            .as_ref()
            .map(|message| message.sender_id == user_id)
            .unwrap_or(false),
        last_message_at: last
            .as_ref()
            .map(|message| message.created_at)
            .unwrap_or(chat.created_at),
        last_message: last.map(|message| message.content),
    })
}

/// The conversation-header preview of one chat, from `viewer_id`'s side.
pub async fn preview_for(
    db: &DatabaseConnection,
    chat_id: crate::Id,
    viewer_id: crate::Id,
) -> Result<ChatPreview, Error> {
    let chat = ensure_participant(db, chat_id, viewer_id).await?;

    let book = book::find_by_id(db, chat.book_id).await?;

    let counterpart_id = if chat.offerer_id == viewer_id {
        chat.interested_id
    } else {
        chat.offerer_id
    };
    let counterpart = user::find_by_id(db, counterpart_id).await?;

    Ok(ChatPreview {
        book_title: book.title,
        book_image_url: book.image_url,
        counterpart_name: counterpart.name,
        counterpart_id,
    })
}

#[cfg(test)]
// We need to gate seaORM's mock feature behind conditional compilation because
// the feature removes the Clone trait implementation from seaORM's DatabaseConnection.
// see https://github.com/SeaQL/sea-orm/issues/830
#[cfg(feature = "mock")]
mod tests {
    use super::*;
    use entity::exchange_status::ExchangeStatus;
    use entity::{books, messages, users};
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn book_model(owner_id: crate::Id, title: &str) -> books::Model {
        let now = chrono::Utc::now();
        books::Model {
            id: crate::Id::new_v4(),
            owner_id,
            title: title.to_owned(),
            image_url: None,
            created_at: now.into(),
            updated_at: now.into(),
        }
    }

    fn user_model(name: &str) -> users::Model {
        let now = chrono::Utc::now();
        users::Model {
            id: crate::Id::new_v4(),
            name: name.to_owned(),
            email: format!("{name}@bookswap.dev"),
            created_at: now.into(),
            updated_at: now.into(),
        }
    }

    fn chat_model(offerer_id: crate::Id, interested_id: crate::Id) -> chats::Model {
        chats::Model {
            id: crate::Id::new_v4(),
            offerer_id,
            interested_id,
            book_id: crate::Id::new_v4(),
            created_at: chrono::Utc::now().into(),
        }
    }

    fn exchange_model(chat: &chats::Model) -> exchanges::Model {
        let now = chrono::Utc::now();
        exchanges::Model {
            id: crate::Id::new_v4(),
            chat_id: chat.id,
            status: ExchangeStatus::Pending,
            offerer_confirmed: false,
            interested_confirmed: false,
            created_at: now.into(),
            updated_at: now.into(),
        }
    }

    #[tokio::test]
    async fn find_or_create_rejects_chatting_with_yourself() {
        let owner = crate::Id::new_v4();
        let book = book_model(owner, "Dune");

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![vec![book.clone()]])
            .into_connection();

        let result =
            find_or_create(&db, &EventPublisher::default(), book.id, owner).await;

        assert_eq!(result.unwrap_err().error_kind, DomainErrorKind::Conflict);
    }

    #[tokio::test]
    async fn find_or_create_returns_the_existing_live_chat() {
        let owner = crate::Id::new_v4();
        let interested = crate::Id::new_v4();
        let book = book_model(owner, "Dune");
        let existing = chats::Model {
            book_id: book.id,
            ..chat_model(owner, interested)
        };
        let exchange = exchange_model(&existing);

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![vec![book.clone()]])
            .append_query_results(vec![vec![existing.clone()]])
            .append_query_results(vec![vec![exchange.clone()]])
            .into_connection();

        let creation = find_or_create(&db, &EventPublisher::default(), book.id, interested)
            .await
            .expect("existing chat should be returned");

        assert!(!creation.created);
        assert_eq!(creation.chat.id, existing.id);
        assert_eq!(creation.exchange.id, exchange.id);
    }

    #[tokio::test]
    async fn ensure_participant_rejects_outsiders() {
        let chat = chat_model(crate::Id::new_v4(), crate::Id::new_v4());

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![vec![chat.clone()]])
            .into_connection();

        let result = ensure_participant(&db, chat.id, crate::Id::new_v4()).await;

        assert_eq!(result.unwrap_err().error_kind, DomainErrorKind::Forbidden);
    }

    #[tokio::test]
    async fn active_chats_sort_most_recent_first_and_mark_authorship() {
        let viewer = crate::Id::new_v4();
        let counterpart = user_model("Bruno Keller");

        let older_chat = chat_model(viewer, counterpart.id);
        let newer_chat = chat_model(counterpart.id, viewer);
        let older_exchange = exchange_model(&older_chat);
        let newer_exchange = exchange_model(&newer_chat);

        let book_a = book_model(viewer, "Dune");
        let book_b = book_model(counterpart.id, "Solaris");

        let earlier = chrono::Utc::now() - chrono::Duration::minutes(10);
        let later = chrono::Utc::now();

        let older_last = messages::Model {
            id: 1,
            chat_id: older_chat.id,
            sender_id: counterpart.id,
            content: "still interested?".to_owned(),
            created_at: earlier.into(),
        };
        let newer_last = messages::Model {
            id: 2,
            chat_id: newer_chat.id,
            sender_id: viewer,
            content: "see you at noon".to_owned(),
            created_at: later.into(),
        };

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![vec![
                (older_chat.clone(), older_exchange.clone()),
                (newer_chat.clone(), newer_exchange.clone()),
            ]])
            // older chat summary: book, counterpart, last message
            .append_query_results(vec![vec![book_a.clone()]])
            .append_query_results(vec![vec![counterpart.clone()]])
            .append_query_results(vec![vec![older_last.clone()]])
            // newer chat summary
            .append_query_results(vec![vec![book_b.clone()]])
            .append_query_results(vec![vec![counterpart.clone()]])
            .append_query_results(vec![vec![newer_last.clone()]])
            .into_connection();

        let summaries = active_chats_for(&db, viewer)
            .await
            .expect("directory should compute");

        assert_eq!(summaries.len(), 2);
        // The chat with the later message sorts first and was authored by
        // the viewer.
        assert_eq!(summaries[0].chat_id, newer_chat.id);
        assert!(summaries[0].is_mine);
        assert_eq!(summaries[0].last_message.as_deref(), Some("see you at noon"));
        assert_eq!(summaries[1].chat_id, older_chat.id);
        assert!(!summaries[1].is_mine);
    }

    #[tokio::test]
    async fn empty_chats_fall_back_to_creation_time() {
        let viewer = crate::Id::new_v4();
        let counterpart = user_model("Bruno Keller");
        let chat = chat_model(viewer, counterpart.id);
        let exchange = exchange_model(&chat);
        let book = book_model(viewer, "Dune");

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![vec![(chat.clone(), exchange)]])
            .append_query_results(vec![vec![book]])
            .append_query_results(vec![vec![counterpart]])
            .append_query_results(vec![Vec::<messages::Model>::new()])
            .into_connection();

        let summaries = active_chats_for(&db, viewer)
            .await
            .expect("directory should compute");

        assert_eq!(summaries.len(), 1);
        assert!(summaries[0].last_message.is_none());
        assert!(!summaries[0].is_mine);
        assert_eq!(summaries[0].last_message_at, chat.created_at);
    }
}
