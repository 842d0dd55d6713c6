//! Thin façade over the store. Adds no business logic beyond delegation and
//! the composite send (append a message, then refresh the owning
//! conversation's cached summary).

use tokio::sync::watch;

use crate::entities::conversation::{self, NewConversation};
use crate::entities::message::{self, NewMessage};
use crate::error::ChatError;
use crate::store::ChatStore;

pub struct ChatRepository {
    store: ChatStore,
}

impl ChatRepository {
    pub fn new(store: ChatStore) -> Self {
        Self { store }
    }

    pub fn list_conversations(&self) -> watch::Receiver<Vec<conversation::Model>> {
        self.store.list_conversations()
    }

    pub async fn create_conversation(
        &self,
        draft: NewConversation,
    ) -> Result<conversation::Model, ChatError> {
        self.store.create_conversation(draft).await
    }

    pub async fn list_messages(
        &self,
        conversation_id: i32,
    ) -> Result<watch::Receiver<Vec<message::Model>>, ChatError> {
        self.store.list_messages(conversation_id).await
    }

    pub async fn insert_message(&self, draft: NewMessage) -> Result<message::Model, ChatError> {
        self.store.insert_message(draft).await
    }

    pub async fn update_conversation_summary(
        &self,
        conversation_id: i32,
        last_message: String,
        last_timestamp: i64,
    ) -> Result<(), ChatError> {
        self.store
            .update_conversation_summary(conversation_id, last_message, last_timestamp)
            .await
    }

    /// Append a message, then overwrite the conversation's cached summary
    /// with that message's text and timestamp.
    ///
    /// The two writes are deliberately not wrapped in a transaction. If the
    /// summary update fails after the insert committed, the message is
    /// durable and the cached summary stays stale until the next successful
    /// send.
    pub async fn send_message(&self, draft: NewMessage) -> Result<message::Model, ChatError> {
        let message = self.store.insert_message(draft).await?;
        let last_message = message.text.clone().unwrap_or_default();
        self.store
            .update_conversation_summary(message.conversation_id, last_message, message.timestamp)
            .await?;
        Ok(message)
    }
}
