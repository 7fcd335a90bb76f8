//! SeaORM Entity for the chats table.
//! A chat binds the book's owner (offerer) and the requesting user
//! (interested) to one conversation. Immutable after creation; lifecycle
//! state lives on the associated exchange row.

use crate::Id;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize, ToSchema)]
#[schema(as = entity::chats::Model)]
#[sea_orm(schema_name = "bookswap", table_name = "chats")]
pub struct Model {
    #[serde(skip_deserializing)]
    #[sea_orm(primary_key)]
    #[schema(value_type = String, format = Uuid)]
    pub id: Id,

    /// The book's listing owner
    #[schema(value_type = String, format = Uuid)]
    pub offerer_id: Id,

    /// The user who opened the conversation
    #[schema(value_type = String, format = Uuid)]
    pub interested_id: Id,

    #[schema(value_type = String, format = Uuid)]
    pub book_id: Id,

    #[serde(skip_deserializing)]
    #[schema(value_type = String, format = DateTime)]
    pub created_at: DateTimeWithTimeZone,
}

impl Model {
    /// Both participants, offerer first.
    pub fn participants(&self) -> [Id; 2] {
        [self.offerer_id, self.interested_id]
    }

    pub fn is_participant(&self, user_id: Id) -> bool {
        self.offerer_id == user_id || self.interested_id == user_id
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::books::Entity",
        from = "Column::BookId",
        to = "super::books::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Books,

    // Two user relations on purpose; no Related<users::Entity> impl since
    // the join target is ambiguous. entity_api queries filter on the
    // columns directly.
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::OffererId",
        to = "super::users::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Offerer,

    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::InterestedId",
        to = "super::users::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Interested,

    #[sea_orm(has_one = "super::exchanges::Entity")]
    Exchanges,

    #[sea_orm(has_many = "super::messages::Entity")]
    Messages,
}

impl Related<super::books::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Books.def()
    }
}

impl Related<super::exchanges::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Exchanges.def()
    }
}

impl Related<super::messages::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Messages.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
