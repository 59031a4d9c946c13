use std::sync::Arc;

use chrono::{Duration, Utc};
use uuid::Uuid;

use messaging_service::config::Config;
use messaging_service::error::AppError;
use messaging_service::models::{ConversationType, DestructMode, MessageType};
use messaging_service::services::{
    DestructRequest, NullNotifier, SendMessageRequest, UnconfiguredTranscriber,
};
use messaging_service::state::AppState;
use messaging_service::store::{MemoryStore, PolicyStore};

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

async fn send(f: &Fixture, content: &str) -> Uuid {
    f.state
        .messages
        .send_message(
            f.alice,
            SendMessageRequest {
                conversation_id: f.conversation_id,
                kind: MessageType::Text,
                content: content.to_string(),
                reply_to_message_id: None,
                attachments: Vec::new(),
            },
        )
        .await
        .unwrap()
        .id
}

fn view_policy(max_views: u32) -> DestructRequest {
    DestructRequest {
        mode: DestructMode::ViewBased,
        timer_seconds: None,
        max_views: Some(max_views),
        notify_on_destruction: false,
    }
}

#[tokio::test]
async fn only_the_sender_configures_destruction() {
    let f = fixture().await;
    let message_id = send(&f, "secret").await;

    let err = f
        .state
        .destruct
        .configure(f.bob, message_id, view_policy(1))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    f.state
        .destruct
        .configure(f.alice, message_id, view_policy(1))
        .await
        .unwrap();
}

#[tokio::test]
async fn invalid_policy_parameters_are_rejected() {
    let f = fixture().await;
    let message_id = send(&f, "secret").await;

    let err = f
        .state
        .destruct
        .configure(f.alice, message_id, view_policy(0))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidInput(_)));

    let err = f
        .state
        .destruct
        .configure(
            f.alice,
            message_id,
            DestructRequest {
                mode: DestructMode::Timer,
                timer_seconds: Some(-5),
                max_views: None,
                notify_on_destruction: false,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidInput(_)));
}

#[tokio::test]
async fn zero_second_timer_destroys_before_any_view() {
    let f = fixture().await;
    let message_id = send(&f, "gone at once").await;

    let policy = f
        .state
        .destruct
        .configure(
            f.alice,
            message_id,
            DestructRequest {
                mode: DestructMode::Timer,
                timer_seconds: Some(0),
                max_views: None,
                notify_on_destruction: false,
            },
        )
        .await
        .unwrap();
    assert_eq!(policy.timer_seconds, Some(0));

    let err = f
        .state
        .destruct
        .record_view(f.bob, message_id, None, None)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::MessageDestroyed));

    let err = f
        .state
        .messages
        .get_message(f.bob, message_id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::MessageDestroyed));
}

#[tokio::test]
async fn view_limit_destroys_exactly_once_under_concurrency() {
    let f = fixture().await;
    let message_id = send(&f, "burn after reading").await;
    f.state
        .destruct
        .configure(f.alice, message_id, view_policy(3))
        .await
        .unwrap();

    let mut handles = Vec::new();
    for _ in 0..10 {
        let engine = f.state.destruct.clone();
        let viewer = f.bob;
        handles.push(tokio::spawn(async move {
            engine.record_view(viewer, message_id, None, None).await
        }));
    }

    let mut counted = 0;
    let mut destroyed_now = 0;
    let mut rejected = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(Some(outcome)) => {
                counted += 1;
                if outcome.destroyed_now {
                    destroyed_now += 1;
                }
            }
            Ok(None) => panic!("policy must exist"),
            Err(AppError::MessageDestroyed) => rejected += 1,
            Err(e) => panic!("unexpected error: {e}"),
        }
    }

    assert_eq!(counted, 3);
    assert_eq!(destroyed_now, 1);
    assert_eq!(rejected, 7);

    let err = f
        .state
        .messages
        .get_message(f.bob, message_id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::MessageDestroyed));
}

#[tokio::test]
async fn views_are_recorded_for_audit() {
    let f = fixture().await;
    let message_id = send(&f, "tracked").await;
    f.state
        .destruct
        .configure(f.alice, message_id, view_policy(5))
        .await
        .unwrap();

    f.state
        .destruct
        .record_view(f.bob, message_id, Some(1200), None)
        .await
        .unwrap();
    let views = f.state.destruct.views(message_id).await.unwrap();
    assert_eq!(views.len(), 1);
    assert_eq!(views[0].viewer_id, f.bob);
    assert_eq!(views[0].view_duration_ms, Some(1200));
}

#[tokio::test]
async fn overdue_timer_is_destroyed_lazily_on_read() {
    let f = fixture().await;
    let message_id = send(&f, "expiring").await;
    let mut policy = f
        .state
        .destruct
        .configure(
            f.alice,
            message_id,
            DestructRequest {
                mode: DestructMode::Timer,
                timer_seconds: Some(60),
                max_views: None,
                notify_on_destruction: false,
            },
        )
        .await
        .unwrap();

    // Backdate the policy so the deadline has already passed.
    policy.configured_at = Utc::now() - Duration::seconds(120);
    f.store.upsert(policy).await.unwrap();

    let err = f
        .state
        .messages
        .get_message(f.bob, message_id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::MessageDestroyed));

    let stored = PolicyStore::get(&f.store, message_id).await.unwrap().unwrap();
    assert!(stored.is_destroyed);
    assert_eq!(stored.destruction_reason.as_deref(), Some("timer expired"));
}

#[tokio::test]
async fn sweep_destroys_due_timers() {
    let f = fixture().await;
    let message_id = send(&f, "swept").await;
    let mut policy = f
        .state
        .destruct
        .configure(
            f.alice,
            message_id,
            DestructRequest {
                mode: DestructMode::Timer,
                timer_seconds: Some(30),
                max_views: None,
                notify_on_destruction: false,
            },
        )
        .await
        .unwrap();
    policy.configured_at = Utc::now() - Duration::seconds(60);
    f.store.upsert(policy).await.unwrap();

    let destroyed = f.state.destruct.sweep().await.unwrap();
    assert_eq!(destroyed, 1);

    // A second pass finds nothing left to do.
    assert_eq!(f.state.destruct.sweep().await.unwrap(), 0);
}

#[tokio::test]
async fn destroyed_messages_drop_out_of_pages() {
    let f = fixture().await;
    let keep = send(&f, "keep").await;
    let burn = send(&f, "burn").await;
    f.state
        .destruct
        .configure(f.alice, burn, view_policy(1))
        .await
        .unwrap();
    f.state
        .destruct
        .record_view(f.bob, burn, None, None)
        .await
        .unwrap();

    let page = f
        .state
        .messages
        .get_conversation_messages(f.bob, f.conversation_id, 0, 50)
        .await
        .unwrap();
    assert_eq!(page.len(), 1);
    assert_eq!(page[0].id, keep);
}

#[tokio::test]
async fn manual_trigger_is_sender_only_and_idempotent() {
    let f = fixture().await;
    let message_id = send(&f, "pull the plug").await;
    f.state
        .destruct
        .configure(f.alice, message_id, view_policy(10))
        .await
        .unwrap();

    let err = f
        .state
        .destruct
        .trigger(f.bob, message_id, "nope")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    f.state
        .destruct
        .trigger(f.alice, message_id, "sender request")
        .await
        .unwrap();
    // Second trigger succeeds without changing the recorded reason.
    f.state
        .destruct
        .trigger(f.alice, message_id, "again")
        .await
        .unwrap();

    let stored = PolicyStore::get(&f.store, message_id).await.unwrap().unwrap();
    assert_eq!(stored.destruction_reason.as_deref(), Some("sender request"));
}

#[tokio::test]
async fn cancel_removes_a_pending_policy_but_not_a_destroyed_one() {
    let f = fixture().await;
    let message_id = send(&f, "changed my mind").await;
    f.state
        .destruct
        .configure(f.alice, message_id, view_policy(2))
        .await
        .unwrap();

    assert!(f.state.destruct.cancel(f.alice, message_id).await.unwrap());
    assert!(!f.state.destruct.cancel(f.alice, message_id).await.unwrap());

    // Destroyed policies cannot be cancelled away.
    f.state
        .destruct
        .configure(f.alice, message_id, view_policy(1))
        .await
        .unwrap();
    f.state
        .destruct
        .record_view(f.bob, message_id, None, None)
        .await
        .unwrap();
    let err = f
        .state
        .destruct
        .cancel(f.alice, message_id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
}
