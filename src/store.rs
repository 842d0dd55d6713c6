//! Durable persistence for conversations and messages, with live-updating
//! read access.
//!
//! Reads are not one-shot snapshots: each query has a [`watch`] channel that
//! holds its latest result set, and every successful write re-runs the
//! affected query and pushes the fresh snapshot into that channel. A new
//! subscriber immediately observes the current snapshot, then each
//! re-emission.

use std::collections::HashMap;

use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder,
};
use tokio::sync::{watch, Mutex};
use tracing::debug;

use crate::entities::conversation::{self, NewConversation};
use crate::entities::message::{self, NewMessage};
use crate::error::ChatError;

pub struct ChatStore {
    db: DatabaseConnection,
    conversations_tx: watch::Sender<Vec<conversation::Model>>,
    // One feed per conversation, created on first subscription and kept for
    // the life of the store so later subscribers resume the same feed.
    message_feeds: Mutex<HashMap<i32, watch::Sender<Vec<message::Model>>>>,
}

impl ChatStore {
    pub async fn new(db: DatabaseConnection) -> Result<Self, ChatError> {
        let conversations = query_conversations(&db).await?;
        let (conversations_tx, _) = watch::channel(conversations);
        Ok(Self {
            db,
            conversations_tx,
            message_feeds: Mutex::new(HashMap::new()),
        })
    }

    /// All conversations, newest-first by cached last-message timestamp.
    pub fn list_conversations(&self) -> watch::Receiver<Vec<conversation::Model>> {
        self.conversations_tx.subscribe()
    }

    pub async fn create_conversation(
        &self,
        draft: NewConversation,
    ) -> Result<conversation::Model, ChatError> {
        let created = conversation::ActiveModel {
            name: Set(draft.name),
            last_message: Set(String::new()),
            last_timestamp: Set(draft.last_timestamp),
            ..Default::default()
        }
        .insert(&self.db)
        .await?;
        debug!("Created conversation {}", created.id);
        self.emit_conversations().await?;
        Ok(created)
    }

    /// Messages of one conversation, oldest-first by timestamp.
    pub async fn list_messages(
        &self,
        conversation_id: i32,
    ) -> Result<watch::Receiver<Vec<message::Model>>, ChatError> {
        conversation::Entity::find_by_id(conversation_id)
            .one(&self.db)
            .await?
            .ok_or(ChatError::ConversationNotFound(conversation_id))?;

        let mut feeds = self.message_feeds.lock().await;
        if let Some(tx) = feeds.get(&conversation_id) {
            return Ok(tx.subscribe());
        }
        let messages = query_messages(&self.db, conversation_id).await?;
        let (tx, rx) = watch::channel(messages);
        feeds.insert(conversation_id, tx);
        Ok(rx)
    }

    pub async fn insert_message(&self, draft: NewMessage) -> Result<message::Model, ChatError> {
        conversation::Entity::find_by_id(draft.conversation_id)
            .one(&self.db)
            .await?
            .ok_or(ChatError::ConversationNotFound(draft.conversation_id))?;

        let created = message::ActiveModel {
            conversation_id: Set(draft.conversation_id),
            text: Set(draft.text),
            timestamp: Set(draft.timestamp),
            is_sent_by_me: Set(draft.is_sent_by_me),
            ..Default::default()
        }
        .insert(&self.db)
        .await?;
        debug!(
            "Inserted message {} into conversation {}",
            created.id, created.conversation_id
        );
        self.emit_messages(created.conversation_id).await?;
        Ok(created)
    }

    /// Overwrite the cached last-message fields on a conversation. Only the
    /// send path drives this; the fields are never mutated independently.
    pub async fn update_conversation_summary(
        &self,
        conversation_id: i32,
        last_message: String,
        last_timestamp: i64,
    ) -> Result<(), ChatError> {
        let existing = conversation::Entity::find_by_id(conversation_id)
            .one(&self.db)
            .await?
            .ok_or(ChatError::ConversationNotFound(conversation_id))?;

        let mut updated: conversation::ActiveModel = existing.into();
        updated.last_message = Set(last_message);
        updated.last_timestamp = Set(last_timestamp);
        updated.update(&self.db).await?;
        self.emit_conversations().await
    }

    async fn emit_conversations(&self) -> Result<(), ChatError> {
        let conversations = query_conversations(&self.db).await?;
        self.conversations_tx.send_replace(conversations);
        Ok(())
    }

    async fn emit_messages(&self, conversation_id: i32) -> Result<(), ChatError> {
        let feeds = self.message_feeds.lock().await;
        if let Some(tx) = feeds.get(&conversation_id) {
            let messages = query_messages(&self.db, conversation_id).await?;
            tx.send_replace(messages);
        }
        Ok(())
    }
}

async fn query_conversations(
    db: &DatabaseConnection,
) -> Result<Vec<conversation::Model>, sea_orm::DbErr> {
    conversation::Entity::find()
        .order_by_desc(conversation::Column::LastTimestamp)
        .all(db)
        .await
}

async fn query_messages(
    db: &DatabaseConnection,
    conversation_id: i32,
) -> Result<Vec<message::Model>, sea_orm::DbErr> {
    message::Entity::find()
        .filter(message::Column::ConversationId.eq(conversation_id))
        .order_by_asc(message::Column::Timestamp)
        .all(db)
        .await
}
