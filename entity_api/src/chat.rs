use super::error::{EntityApiErrorKind, Error};
use entity::chats::{ActiveModel, Column, Entity, Model, Relation};
use entity::exchange_status::ExchangeStatus;
use entity::{exchanges, Id};
use sea_orm::{entity::prelude::*, ActiveValue::Set, ConnectionTrait, JoinType, QueryOrder, QuerySelect};

use log::*;

pub async fn create(
    db: &impl ConnectionTrait,
    offerer_id: Id,
    interested_id: Id,
    book_id: Id,
) -> Result<Model, Error> {
    debug!("New Chat to be inserted for book {book_id}: offerer {offerer_id}, interested {interested_id}");

    let now = chrono::Utc::now();

    let chat_active_model: ActiveModel = ActiveModel {
        id: Set(Id::new_v4()),
        offerer_id: Set(offerer_id),
        interested_id: Set(interested_id),
        book_id: Set(book_id),
        created_at: Set(now.into()),
    };

    Ok(chat_active_model.insert(db).await?)
}

pub async fn find_by_id(db: &impl ConnectionTrait, id: Id) -> Result<Model, Error> {
    Entity::find_by_id(id).one(db).await?.ok_or_else(|| Error {
        source: None,
        error_kind: EntityApiErrorKind::RecordNotFound,
    })
}

/// The existing chat for this (book, offerer, interested) triple whose
/// exchange is still live, if any. Used to make chat creation idempotent
/// against duplicate "start chat" taps.
pub async fn find_active_for_pair(
    db: &impl ConnectionTrait,
    book_id: Id,
    offerer_id: Id,
    interested_id: Id,
) -> Result<Option<Model>, Error> {
    let chat = Entity::find()
        .join(JoinType::InnerJoin, Relation::Exchanges.def())
        .filter(Column::BookId.eq(book_id))
        .filter(Column::OffererId.eq(offerer_id))
        .filter(Column::InterestedId.eq(interested_id))
        .filter(
            exchanges::Column::Status
                .is_in([ExchangeStatus::Pending, ExchangeStatus::Accepted]),
        )
        .one(db)
        .await?;

    Ok(chat)
}

/// All chats where the user is a participant and the exchange is still
/// live, paired with their exchange rows. Most recently created first;
/// callers re-sort by last activity.
pub async fn find_active_for_user(
    db: &impl ConnectionTrait,
    user_id: Id,
) -> Result<Vec<(Model, exchanges::Model)>, Error> {
    let rows = Entity::find()
        .find_also_related(exchanges::Entity)
        .filter(Column::OffererId.eq(user_id).or(Column::InterestedId.eq(user_id)))
        .filter(
            exchanges::Column::Status
                .is_in([ExchangeStatus::Pending, ExchangeStatus::Accepted]),
        )
        .order_by_desc(Column::CreatedAt)
        .all(db)
        .await?;

    // The status filter makes the exchange side of the join non-nullable;
    // a missing row here would mean a chat without its exchange row.
    rows.into_iter()
        .map(|(chat, exchange)| {
            exchange.map(|exchange| (chat, exchange)).ok_or_else(|| {
                warn!("Chat without exchange row surfaced in active-chat query");
                Error {
                    source: None,
                    error_kind: EntityApiErrorKind::RecordNotFound,
                }
            })
        })
        .collect()
}

#[cfg(test)]
// We need to gate seaORM's mock feature behind conditional compilation because
// the feature removes the Clone trait implementation from seaORM's DatabaseConnection.
// see https://github.com/SeaQL/sea-orm/issues/830
#[cfg(feature = "mock")]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase};

    #[tokio::test]
    async fn create_returns_a_new_chat_model() -> Result<(), Error> {
        let now = chrono::Utc::now();

        let chat_model = Model {
            id: Id::new_v4(),
            offerer_id: Id::new_v4(),
            interested_id: Id::new_v4(),
            book_id: Id::new_v4(),
            created_at: now.into(),
        };

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![vec![chat_model.clone()]])
            .into_connection();

        let chat = create(
            &db,
            chat_model.offerer_id,
            chat_model.interested_id,
            chat_model.book_id,
        )
        .await?;

        assert_eq!(chat.book_id, chat_model.book_id);

        Ok(())
    }

    #[tokio::test]
    async fn find_active_for_pair_returns_none_when_no_live_exchange() -> Result<(), Error> {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![Vec::<Model>::new()])
            .into_connection();

        let chat =
            find_active_for_pair(&db, Id::new_v4(), Id::new_v4(), Id::new_v4()).await?;

        assert!(chat.is_none());

        Ok(())
    }
}
