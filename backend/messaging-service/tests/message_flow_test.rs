use std::sync::Arc;

use uuid::Uuid;

use messaging_service::config::Config;
use messaging_service::error::AppError;
use messaging_service::models::{ConversationType, MessageType};
use messaging_service::services::{NullNotifier, SendMessageRequest, UnconfiguredTranscriber};
use messaging_service::state::AppState;
use messaging_service::store::{MemoryStore, MessageStore};

struct Fixture {
    state: AppState,
    store: MemoryStore,
    alice: Uuid,
    bob: Uuid,
    conversation_id: Uuid,
}

async fn fixture() -> Fixture {
    let store = MemoryStore::new();
    let state = AppState::build(
        Config::test_defaults(),
        store.clone(),
        Arc::new(NullNotifier),
        Arc::new(UnconfiguredTranscriber),
    );
    let alice = Uuid::new_v4();
    let bob = Uuid::new_v4();
    let conversation = state
        .conversations
        .create_conversation(alice, ConversationType::Direct, None, vec![bob])
        .await
        .unwrap();
    Fixture {
        state,
        store,
        alice,
        bob,
        conversation_id: conversation.id,
    }
}

fn text_message(conversation_id: Uuid, content: &str) -> SendMessageRequest {
    SendMessageRequest {
        conversation_id,
        kind: MessageType::Text,
        content: content.to_string(),
        reply_to_message_id: None,
        attachments: Vec::new(),
    }
}

#[tokio::test]
async fn sent_message_is_stored_encrypted_and_read_back_as_plaintext() {
    let f = fixture().await;
    let sent = f
        .state
        .messages
        .send_message(f.alice, text_message(f.conversation_id, "the plan is go"))
        .await
        .unwrap();
    assert_eq!(sent.content, "the plan is go");

    let stored = MessageStore::get(&f.store, sent.id).await.unwrap().unwrap();
    assert_ne!(stored.content_encrypted, b"the plan is go");
    assert!(!stored.content_nonce.is_empty());

    let read = f.state.messages.get_message(f.bob, sent.id).await.unwrap();
    assert_eq!(read.content, "the plan is go");
}

#[tokio::test]
async fn non_members_cannot_send_or_read() {
    let f = fixture().await;
    let outsider = Uuid::new_v4();

    let err = f
        .state
        .messages
        .send_message(outsider, text_message(f.conversation_id, "hi"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    let sent = f
        .state
        .messages
        .send_message(f.alice, text_message(f.conversation_id, "hi"))
        .await
        .unwrap();
    let err = f
        .state
        .messages
        .get_message(outsider, sent.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));
}

#[tokio::test]
async fn archived_conversations_reject_new_messages() {
    let f = fixture().await;
    f.state
        .conversations
        .archive(f.alice, f.conversation_id)
        .await
        .unwrap();

    let err = f
        .state
        .messages
        .send_message(f.alice, text_message(f.conversation_id, "too late"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
}

#[tokio::test]
async fn reply_target_must_belong_to_the_same_conversation() {
    let f = fixture().await;
    let other = f
        .state
        .conversations
        .create_conversation(f.alice, ConversationType::Direct, None, vec![Uuid::new_v4()])
        .await
        .unwrap();
    let elsewhere = f
        .state
        .messages
        .send_message(f.alice, text_message(other.id, "elsewhere"))
        .await
        .unwrap();

    let mut request = text_message(f.conversation_id, "reply");
    request.reply_to_message_id = Some(elsewhere.id);
    let err = f
        .state
        .messages
        .send_message(f.alice, request)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidInput(_)));
}

#[tokio::test]
async fn only_the_sender_may_edit() {
    let f = fixture().await;
    let sent = f
        .state
        .messages
        .send_message(f.alice, text_message(f.conversation_id, "v1"))
        .await
        .unwrap();

    let err = f
        .state
        .messages
        .edit_message(f.bob, sent.id, "hacked".into())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    let edited = f
        .state
        .messages
        .edit_message(f.alice, sent.id, "v2".into())
        .await
        .unwrap();
    assert!(edited.is_edited);
    assert_eq!(edited.content, "v2");

    let read = f.state.messages.get_message(f.bob, sent.id).await.unwrap();
    assert_eq!(read.content, "v2");
}

#[tokio::test]
async fn delete_is_soft_and_idempotent() {
    let f = fixture().await;
    let sent = f
        .state
        .messages
        .send_message(f.alice, text_message(f.conversation_id, "oops"))
        .await
        .unwrap();

    f.state
        .messages
        .delete_message(f.alice, sent.id)
        .await
        .unwrap();
    f.state
        .messages
        .delete_message(f.alice, sent.id)
        .await
        .unwrap();

    // Hidden from the other side, still visible to the sender.
    let err = f
        .state
        .messages
        .get_message(f.bob, sent.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
    let own = f
        .state
        .messages
        .get_message(f.alice, sent.id)
        .await
        .unwrap();
    assert!(own.is_deleted);

    let bob_page = f
        .state
        .messages
        .get_conversation_messages(f.bob, f.conversation_id, 0, 50)
        .await
        .unwrap();
    assert!(bob_page.is_empty());
}

#[tokio::test]
async fn pages_come_back_newest_first() {
    let f = fixture().await;
    for i in 0..5 {
        f.state
            .messages
            .send_message(f.alice, text_message(f.conversation_id, &format!("m{i}")))
            .await
            .unwrap();
    }
    let page = f
        .state
        .messages
        .get_conversation_messages(f.bob, f.conversation_id, 0, 2)
        .await
        .unwrap();
    assert_eq!(page.len(), 2);
    assert_eq!(page[0].content, "m4");
    assert_eq!(page[1].content, "m3");
}

#[tokio::test]
async fn mark_as_read_is_idempotent_and_updates_unread_count() {
    let f = fixture().await;
    let first = f
        .state
        .messages
        .send_message(f.alice, text_message(f.conversation_id, "one"))
        .await
        .unwrap();
    f.state
        .messages
        .send_message(f.alice, text_message(f.conversation_id, "two"))
        .await
        .unwrap();

    assert_eq!(
        f.state
            .messages
            .unread_count(f.bob, f.conversation_id)
            .await
            .unwrap(),
        2
    );

    f.state
        .messages
        .mark_as_read(f.bob, first.id, None)
        .await
        .unwrap();
    f.state
        .messages
        .mark_as_read(f.bob, first.id, None)
        .await
        .unwrap();

    assert_eq!(
        f.state
            .messages
            .unread_count(f.bob, f.conversation_id)
            .await
            .unwrap(),
        1
    );
}

#[tokio::test]
async fn own_messages_never_count_as_unread() {
    let f = fixture().await;
    f.state
        .messages
        .send_message(f.alice, text_message(f.conversation_id, "mine"))
        .await
        .unwrap();
    assert_eq!(
        f.state
            .messages
            .unread_count(f.alice, f.conversation_id)
            .await
            .unwrap(),
        0
    );
}

#[tokio::test]
async fn empty_content_is_rejected() {
    let f = fixture().await;
    let err = f
        .state
        .messages
        .send_message(f.alice, text_message(f.conversation_id, ""))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidInput(_)));
}
