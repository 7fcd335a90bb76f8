//! SeaORM Entity for the exchanges table.
//! Exactly one exchange per chat (UNIQUE on chat_id), created in the same
//! transaction as the chat. Mutated only through validated transitions.

use crate::exchange_status::ExchangeStatus;
use crate::Id;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize, ToSchema)]
#[schema(as = entity::exchanges::Model)]
#[sea_orm(schema_name = "bookswap", table_name = "exchanges")]
pub struct Model {
    #[serde(skip_deserializing)]
    #[sea_orm(primary_key)]
    #[schema(value_type = String, format = Uuid)]
    pub id: Id,

    #[sea_orm(unique)]
    #[schema(value_type = String, format = Uuid)]
    pub chat_id: Id,

    pub status: ExchangeStatus,

    /// Completion vote of the book owner's side
    pub offerer_confirmed: bool,

    /// Completion vote of the requesting side
    pub interested_confirmed: bool,

    #[serde(skip_deserializing)]
    #[schema(value_type = String, format = DateTime)]
    pub created_at: DateTimeWithTimeZone,

    #[serde(skip_deserializing)]
    #[schema(value_type = String, format = DateTime)]
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::chats::Entity",
        from = "Column::ChatId",
        to = "super::chats::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Chats,
}

impl Related<super::chats::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Chats.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
