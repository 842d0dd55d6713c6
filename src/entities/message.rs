use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A single directional text entry belonging to one conversation.
/// Append-only: rows are never edited or deleted.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "messages")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub conversation_id: i32,
    pub text: Option<String>,
    pub timestamp: i64,
    pub is_sent_by_me: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::conversation::Entity",
        from = "Column::ConversationId",
        to = "super::conversation::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Conversation,
}

impl Related<super::conversation::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Conversation.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Draft for a message the store has not assigned an id to yet.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct NewMessage {
    pub conversation_id: i32,
    pub text: Option<String>,
    pub timestamp: i64,
    pub is_sent_by_me: bool,
}
