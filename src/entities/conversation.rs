use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A named thread of messages, carrying a denormalized cache of its most
/// recent message (`last_message`, `last_timestamp`). The cache is only ever
/// touched by the summary-update path when a message is appended.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "conversations")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    pub last_message: String,
    pub last_timestamp: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::message::Entity")]
    Message,
}

impl Related<super::message::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Message.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Draft for a conversation the store has not assigned an id to yet.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct NewConversation {
    pub name: String,
    pub last_timestamp: i64,
}
