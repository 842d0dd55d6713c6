//! Observable UI state bridging the store's live feeds to a frontend.
//!
//! The view model owns its own `conversations` and `messages` channels and
//! keeps them current by mirroring the store's feeds in background tasks.
//! Every task is tied to the view model's cancellation scope, so teardown
//! stops all of them and no late emission can land afterwards.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{watch, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::entities::conversation::{self, NewConversation};
use crate::entities::message::{self, NewMessage};
use crate::error::ChatError;
use crate::repository::ChatRepository;

pub struct ChatViewModel {
    repository: Arc<ChatRepository>,
    scope: CancellationToken,
    conversations: Arc<watch::Sender<Vec<conversation::Model>>>,
    messages: Arc<watch::Sender<Vec<message::Model>>>,
    // Serializes mirror publications against subscription swaps: a mirror
    // whose token was cancelled under this lock can never publish afterwards.
    publish: Arc<Mutex<()>>,
    open: Mutex<Option<Subscription>>,
}

/// The single live message subscription. Opening another conversation
/// cancels this one's token, which stops its mirror task.
struct Subscription {
    conversation_id: i32,
    token: CancellationToken,
}

impl ChatViewModel {
    /// Must be called inside a tokio runtime; spawns the conversation-list
    /// mirror immediately.
    pub fn new(repository: Arc<ChatRepository>) -> Self {
        let scope = CancellationToken::new();
        let (conversations, _) = watch::channel(Vec::new());
        let conversations = Arc::new(conversations);
        let (messages, _) = watch::channel(Vec::new());
        let publish = Arc::new(Mutex::new(()));

        let rx = repository.list_conversations();
        spawn_mirror(rx, conversations.clone(), scope.child_token(), publish.clone());

        Self {
            repository,
            scope,
            conversations,
            messages: Arc::new(messages),
            publish,
            open: Mutex::new(None),
        }
    }

    /// Current snapshot of the conversation list, newest-first.
    pub fn conversations(&self) -> Vec<conversation::Model> {
        self.conversations.borrow().clone()
    }

    pub fn subscribe_conversations(&self) -> watch::Receiver<Vec<conversation::Model>> {
        self.conversations.subscribe()
    }

    /// Current snapshot of the open conversation's messages, oldest-first.
    /// Empty until a conversation has been opened.
    pub fn messages(&self) -> Vec<message::Model> {
        self.messages.borrow().clone()
    }

    pub fn subscribe_messages(&self) -> watch::Receiver<Vec<message::Model>> {
        self.messages.subscribe()
    }

    /// Start mirroring `conversation_id`'s messages into [`Self::messages`],
    /// replacing any previously open conversation's subscription.
    pub async fn open_conversation(&self, conversation_id: i32) -> Result<(), ChatError> {
        let rx = self.repository.list_messages(conversation_id).await?;
        let mut open = self.open.lock().await;
        if let Some(previous) = open.take() {
            debug!("Closing message feed for conversation {}", previous.conversation_id);
            // Cancel under the publish lock so a mirror that already woke for
            // the old conversation cannot publish once we return.
            let _guard = self.publish.lock().await;
            previous.token.cancel();
        }
        let token = self.scope.child_token();
        spawn_mirror(rx, self.messages.clone(), token.clone(), self.publish.clone());
        *open = Some(Subscription {
            conversation_id,
            token,
        });
        Ok(())
    }

    /// Append a message stamped with the current wall clock, update the
    /// conversation's cached summary, and (re)subscribe to that
    /// conversation's messages.
    pub async fn send_message(
        &self,
        conversation_id: i32,
        text: String,
        is_sent_by_me: bool,
    ) -> Result<(), ChatError> {
        let draft = NewMessage {
            conversation_id,
            text: Some(text),
            timestamp: Utc::now().timestamp_millis(),
            is_sent_by_me,
        };
        self.repository.send_message(draft).await?;
        self.open_conversation(conversation_id).await
    }

    /// Create a conversation named `name`, stamped with the current wall
    /// clock. The store assigns its id.
    pub async fn create_conversation(&self, name: String) -> Result<conversation::Model, ChatError> {
        let draft = NewConversation {
            name,
            last_timestamp: Utc::now().timestamp_millis(),
        };
        self.repository.create_conversation(draft).await
    }

    /// Stop all mirror tasks. Idempotent; also runs on drop.
    pub fn close(&self) {
        self.scope.cancel();
    }
}

impl Drop for ChatViewModel {
    fn drop(&mut self) {
        self.scope.cancel();
    }
}

/// Copy every emission of `rx` into `state` until the token is cancelled or
/// the feed closes. The current value is copied over immediately, so a fresh
/// subscription exposes its snapshot without waiting for the next write.
/// Cancellation is checked under the publish lock, the same lock the swap
/// path cancels under, so a cancelled mirror never publishes a stale
/// snapshot after its replacement took over.
fn spawn_mirror<T>(
    mut rx: watch::Receiver<Vec<T>>,
    state: Arc<watch::Sender<Vec<T>>>,
    token: CancellationToken,
    publish: Arc<Mutex<()>>,
) where
    T: Clone + Send + Sync + 'static,
{
    tokio::spawn(async move {
        loop {
            let snapshot = rx.borrow_and_update().clone();
            {
                let _guard = publish.lock().await;
                if token.is_cancelled() {
                    break;
                }
                state.send_replace(snapshot);
            }
            tokio::select! {
                biased;
                _ = token.cancelled() => break,
                changed = rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }
    });
}
