use std::collections::HashSet;

use delachat::entities::conversation::NewConversation;
use delachat::entities::message::NewMessage;
use delachat::error::ChatError;
use delachat::repository::ChatRepository;
use delachat::store::ChatStore;
use tempfile::TempDir;

async fn open_store() -> (TempDir, ChatStore) {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let dir = tempfile::tempdir().expect("tempdir");
    let db = delachat::init_db(&dir.path().join("chat.sqlite"))
        .await
        .expect("init db");
    let store = ChatStore::new(db).await.expect("store");
    (dir, store)
}

fn conversation(name: &str, last_timestamp: i64) -> NewConversation {
    NewConversation {
        name: name.to_string(),
        last_timestamp,
    }
}

fn message(conversation_id: i32, text: &str, timestamp: i64) -> NewMessage {
    NewMessage {
        conversation_id,
        text: Some(text.to_string()),
        timestamp,
        is_sent_by_me: true,
    }
}

#[tokio::test]
async fn created_conversations_get_unique_ids_and_list_newest_first() {
    let (_dir, store) = open_store().await;

    let a = store.create_conversation(conversation("a", 10)).await.unwrap();
    let b = store.create_conversation(conversation("b", 30)).await.unwrap();
    let c = store.create_conversation(conversation("c", 20)).await.unwrap();

    let ids: HashSet<i32> = [a.id, b.id, c.id].into_iter().collect();
    assert_eq!(ids.len(), 3);

    let rx = store.list_conversations();
    let names: Vec<String> = rx.borrow().iter().map(|cv| cv.name.clone()).collect();
    assert_eq!(names, ["b", "c", "a"]);
}

#[tokio::test]
async fn messages_stay_scoped_to_their_conversation_and_sort_ascending() {
    let (_dir, store) = open_store().await;

    let a = store.create_conversation(conversation("a", 0)).await.unwrap();
    let b = store.create_conversation(conversation("b", 0)).await.unwrap();

    store.insert_message(message(a.id, "third", 30)).await.unwrap();
    store.insert_message(message(a.id, "first", 10)).await.unwrap();
    store.insert_message(message(a.id, "second", 20)).await.unwrap();
    store.insert_message(message(b.id, "other", 15)).await.unwrap();

    let rx = store.list_messages(a.id).await.unwrap();
    let timestamps: Vec<i64> = rx.borrow().iter().map(|m| m.timestamp).collect();
    assert_eq!(timestamps, [10, 20, 30]);
    assert!(rx.borrow().iter().all(|m| m.conversation_id == a.id));

    let rx = store.list_messages(b.id).await.unwrap();
    let texts: Vec<Option<String>> = rx.borrow().iter().map(|m| m.text.clone()).collect();
    assert_eq!(texts, [Some("other".to_string())]);
}

#[tokio::test]
async fn feeds_reemit_after_each_write() {
    let (_dir, store) = open_store().await;

    let mut conversations = store.list_conversations();
    assert!(conversations.borrow_and_update().is_empty());

    let a = store.create_conversation(conversation("a", 0)).await.unwrap();
    conversations.changed().await.unwrap();
    assert_eq!(conversations.borrow_and_update().len(), 1);

    let mut messages = store.list_messages(a.id).await.unwrap();
    assert!(messages.borrow_and_update().is_empty());

    store.insert_message(message(a.id, "hello", 5)).await.unwrap();
    messages.changed().await.unwrap();
    assert_eq!(messages.borrow_and_update().len(), 1);

    store
        .update_conversation_summary(a.id, "hello".to_string(), 5)
        .await
        .unwrap();
    conversations.changed().await.unwrap();
    let snapshot = conversations.borrow_and_update().clone();
    assert_eq!(snapshot[0].last_message, "hello");
    assert_eq!(snapshot[0].last_timestamp, 5);
}

#[tokio::test]
async fn inserting_into_unknown_conversation_fails_without_reemitting() {
    let (_dir, store) = open_store().await;

    let a = store.create_conversation(conversation("a", 0)).await.unwrap();
    let mut conversations = store.list_conversations();
    let mut messages = store.list_messages(a.id).await.unwrap();
    conversations.borrow_and_update();
    messages.borrow_and_update();

    let err = store.insert_message(message(999, "ghost", 1)).await.unwrap_err();
    assert!(matches!(err, ChatError::ConversationNotFound(999)));

    assert!(!conversations.has_changed().unwrap());
    assert!(!messages.has_changed().unwrap());
}

#[tokio::test]
async fn missing_conversation_errors_on_summary_update_and_open() {
    let (_dir, store) = open_store().await;

    let err = store
        .update_conversation_summary(42, "x".to_string(), 1)
        .await
        .unwrap_err();
    assert!(matches!(err, ChatError::ConversationNotFound(42)));

    let err = store.list_messages(7).await.unwrap_err();
    assert!(matches!(err, ChatError::ConversationNotFound(7)));
}

#[tokio::test]
async fn composite_send_caches_the_summary() {
    let (_dir, store) = open_store().await;
    let a = store.create_conversation(conversation("a", 0)).await.unwrap();
    let repository = ChatRepository::new(store);

    let sent = repository.send_message(message(a.id, "hello", 77)).await.unwrap();
    assert_eq!(sent.conversation_id, a.id);

    let conversations = repository.list_conversations();
    let snapshot = conversations.borrow().clone();
    assert_eq!(snapshot[0].last_message, "hello");
    assert_eq!(snapshot[0].last_timestamp, 77);

    let messages = repository.list_messages(a.id).await.unwrap();
    let texts: Vec<Option<String>> = messages.borrow().iter().map(|m| m.text.clone()).collect();
    assert_eq!(texts, [Some("hello".to_string())]);
}
