use std::sync::Arc;

use uuid::Uuid;

use messaging_service::config::Config;
use messaging_service::error::AppError;
use messaging_service::models::{ConversationType, KeyStatus, MessageType};
use messaging_service::services::{
    KeyVault, NullNotifier, SendMessageRequest, UnconfiguredTranscriber,
};
use messaging_service::state::AppState;
use messaging_service::store::{KeyStore, MemoryStore};

struct Fixture {
    state: AppState,
    store: MemoryStore,
    alice: Uuid,
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
    let conversation = state
        .conversations
        .create_conversation(alice, ConversationType::Direct, None, vec![Uuid::new_v4()])
        .await
        .unwrap();
    Fixture {
        state,
        store,
        alice,
        conversation_id: conversation.id,
    }
}

#[tokio::test]
async fn active_key_is_created_lazily_on_first_send() {
    let f = fixture().await;
    assert!(f
        .store
        .active_for_conversation(f.conversation_id)
        .await
        .unwrap()
        .is_none());

    f.state
        .messages
        .send_message(
            f.alice,
            SendMessageRequest {
                conversation_id: f.conversation_id,
                kind: MessageType::Text,
                content: "first".into(),
                reply_to_message_id: None,
                attachments: Vec::new(),
            },
        )
        .await
        .unwrap();

    assert!(f
        .store
        .active_for_conversation(f.conversation_id)
        .await
        .unwrap()
        .is_some());
}

#[tokio::test]
async fn rotation_leaves_exactly_one_active_key() {
    let f = fixture().await;
    let first = f
        .state
        .vault
        .ensure_active_key(f.conversation_id)
        .await
        .unwrap();

    let rotated = f
        .state
        .vault
        .rotate_keys(f.conversation_id, f.alice)
        .await
        .unwrap();
    assert_ne!(rotated.id, first.id);

    let keys = f
        .store
        .keys_for_conversation(f.conversation_id)
        .await
        .unwrap();
    let active: Vec<_> = keys
        .iter()
        .filter(|k| k.is_active(chrono::Utc::now()))
        .collect();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].id, rotated.id);

    let old = KeyStore::get(&f.store, first.id).await.unwrap().unwrap();
    assert!(old.revoked);
    assert_eq!(old.revocation_reason.as_deref(), Some("rotated"));
}

#[tokio::test]
async fn old_messages_remain_readable_after_rotation() {
    let f = fixture().await;
    let sent = f
        .state
        .messages
        .send_message(
            f.alice,
            SendMessageRequest {
                conversation_id: f.conversation_id,
                kind: MessageType::Text,
                content: "pre-rotation".into(),
                reply_to_message_id: None,
                attachments: Vec::new(),
            },
        )
        .await
        .unwrap();

    f.state
        .vault
        .rotate_keys(f.conversation_id, f.alice)
        .await
        .unwrap();

    let read = f
        .state
        .messages
        .get_message(f.alice, sent.id)
        .await
        .unwrap();
    assert_eq!(read.content, "pre-rotation");
}

#[tokio::test]
async fn validate_key_reports_status_and_reason() {
    let f = fixture().await;
    let key = f
        .state
        .vault
        .ensure_active_key(f.conversation_id)
        .await
        .unwrap();

    let validation = f.state.vault.validate_key(key.id).await.unwrap();
    assert!(validation.valid);
    assert_eq!(validation.status, KeyStatus::Active);

    f.state
        .vault
        .revoke_key(key.id, f.alice, Some("compromised".into()))
        .await
        .unwrap();
    let validation = f.state.vault.validate_key(key.id).await.unwrap();
    assert!(!validation.valid);
    assert_eq!(validation.status, KeyStatus::Revoked);
    assert_eq!(validation.reason.as_deref(), Some("compromised"));
}

#[tokio::test]
async fn revoke_is_idempotent_and_keeps_the_first_reason() {
    let f = fixture().await;
    let key = f
        .state
        .vault
        .ensure_active_key(f.conversation_id)
        .await
        .unwrap();

    f.state
        .vault
        .revoke_key(key.id, f.alice, Some("lost device".into()))
        .await
        .unwrap();
    let second = f
        .state
        .vault
        .revoke_key(key.id, f.alice, Some("other reason".into()))
        .await
        .unwrap();
    assert_eq!(second.status, KeyStatus::Revoked);

    let stored = KeyStore::get(&f.store, key.id).await.unwrap().unwrap();
    assert_eq!(stored.revocation_reason.as_deref(), Some("lost device"));
}

#[tokio::test]
async fn expired_keys_are_not_active_but_still_open_ciphertext() {
    let store = MemoryStore::new();
    // TTL in the past: every generated key is born expired.
    let vault = KeyVault::new(Arc::new(store.clone()), -1);
    let conversation_id = Uuid::new_v4();

    let sealed = vault.seal(conversation_id, "short-lived").await.unwrap();
    let key = KeyStore::get(&store, sealed.key_id).await.unwrap().unwrap();
    assert_eq!(key.status(chrono::Utc::now()), KeyStatus::Expired);

    let opened = vault
        .open(sealed.key_id, &sealed.nonce, &sealed.ciphertext)
        .await
        .unwrap();
    assert_eq!(opened, "short-lived");
}

#[tokio::test]
async fn opening_with_an_unknown_key_fails() {
    let f = fixture().await;
    let err = f
        .state
        .vault
        .open(Uuid::new_v4(), &[0u8; 24], b"junk")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}
