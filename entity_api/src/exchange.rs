use super::error::{EntityApiErrorKind, Error};
use entity::exchange_status::ExchangeStatus;
use entity::exchanges::{ActiveModel, Column, Entity, Model};
use entity::Id;
use sea_orm::{
    entity::prelude::*,
    ActiveValue::{Set, Unchanged},
    ConnectionTrait, QuerySelect,
};

use log::*;

pub async fn create(db: &impl ConnectionTrait, chat_id: Id) -> Result<Model, Error> {
    debug!("New Exchange to be inserted for chat {chat_id}");

    let now = chrono::Utc::now();

    let exchange_active_model: ActiveModel = ActiveModel {
        id: Set(Id::new_v4()),
        chat_id: Set(chat_id),
        status: Set(ExchangeStatus::Pending),
        offerer_confirmed: Set(false),
        interested_confirmed: Set(false),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    };

    Ok(exchange_active_model.insert(db).await?)
}

pub async fn find_by_chat_id(db: &impl ConnectionTrait, chat_id: Id) -> Result<Model, Error> {
    Entity::find()
        .filter(Column::ChatId.eq(chat_id))
        .one(db)
        .await?
        .ok_or_else(|| Error {
            source: None,
            error_kind: EntityApiErrorKind::RecordNotFound,
        })
}

/// Row-locked variant for read-modify-write transitions. Callers must hold
/// an open transaction; the lock is released at commit/rollback.
pub async fn find_by_chat_id_for_update(
    db: &impl ConnectionTrait,
    chat_id: Id,
) -> Result<Model, Error> {
    Entity::find()
        .filter(Column::ChatId.eq(chat_id))
        .lock_exclusive()
        .one(db)
        .await?
        .ok_or_else(|| Error {
            source: None,
            error_kind: EntityApiErrorKind::RecordNotFound,
        })
}

pub async fn update_status(
    db: &impl ConnectionTrait,
    exchange: Model,
    status: ExchangeStatus,
) -> Result<Model, Error> {
    debug!(
        "Exchange {} status update: {} -> {}",
        exchange.id, exchange.status, status
    );

    let active_model: ActiveModel = ActiveModel {
        id: Unchanged(exchange.id),
        chat_id: Unchanged(exchange.chat_id),
        status: Set(status),
        offerer_confirmed: Unchanged(exchange.offerer_confirmed),
        interested_confirmed: Unchanged(exchange.interested_confirmed),
        created_at: Unchanged(exchange.created_at),
        updated_at: Set(chrono::Utc::now().into()),
    };

    Ok(active_model.update(db).await?)
}

/// Writes both confirmation flags and the status derived from them in one
/// UPDATE, so no intermediate both-flags-set-but-not-completed state is
/// ever observable.
pub async fn update_confirmations(
    db: &impl ConnectionTrait,
    exchange: Model,
    offerer_confirmed: bool,
    interested_confirmed: bool,
    status: ExchangeStatus,
) -> Result<Model, Error> {
    let active_model: ActiveModel = ActiveModel {
        id: Unchanged(exchange.id),
        chat_id: Unchanged(exchange.chat_id),
        status: Set(status),
        offerer_confirmed: Set(offerer_confirmed),
        interested_confirmed: Set(interested_confirmed),
        created_at: Unchanged(exchange.created_at),
        updated_at: Set(chrono::Utc::now().into()),
    };

    Ok(active_model.update(db).await?)
}
