use super::error::{EntityApiErrorKind, Error};
use entity::books::{ActiveModel, Entity, Model};
use entity::Id;
use sea_orm::{entity::prelude::*, ActiveValue::Set, ConnectionTrait};

pub async fn create(db: &impl ConnectionTrait, book_model: Model) -> Result<Model, Error> {
    let now = chrono::Utc::now();

    let book_active_model: ActiveModel = ActiveModel {
        id: Set(Id::new_v4()),
        owner_id: Set(book_model.owner_id),
        title: Set(book_model.title),
        image_url: Set(book_model.image_url),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    };

    Ok(book_active_model.insert(db).await?)
}

pub async fn find_by_id(db: &impl ConnectionTrait, id: Id) -> Result<Model, Error> {
    Entity::find_by_id(id).one(db).await?.ok_or_else(|| Error {
        source: None,
        error_kind: EntityApiErrorKind::RecordNotFound,
    })
}
