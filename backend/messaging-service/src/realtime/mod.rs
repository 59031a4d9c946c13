//! In-process fan-out of conversation events.
//!
//! Subscribers register an unbounded channel per (conversation, connection);
//! broadcasts are fire-and-forget and closed receivers are pruned on the next
//! send.

mod events;

pub use events::RealtimeEvent;

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

#[derive(Default)]
pub struct ConversationHub {
    subscribers: RwLock<HashMap<Uuid, Vec<UnboundedSender<Value>>>>,
}

impl ConversationHub {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub async fn subscribe(&self, conversation_id: Uuid) -> UnboundedReceiver<Value> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers
            .write()
            .await
            .entry(conversation_id)
            .or_default()
            .push(tx);
        rx
    }

    pub async fn publish(&self, event: RealtimeEvent) {
        let conversation_id = event.conversation_id();
        let payload = event.to_broadcast_payload();
        let mut subscribers = self.subscribers.write().await;
        if let Some(senders) = subscribers.get_mut(&conversation_id) {
            senders.retain(|tx| tx.send(payload.clone()).is_ok());
            if senders.is_empty() {
                subscribers.remove(&conversation_id);
            }
        }
        debug!(
            event = event.event_type(),
            %conversation_id,
            "published realtime event"
        );
    }

    pub async fn subscriber_count(&self, conversation_id: Uuid) -> usize {
        self.subscribers
            .read()
            .await
            .get(&conversation_id)
            .map(Vec::len)
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn publish_reaches_all_subscribers() {
        let hub = ConversationHub::new();
        let conversation_id = Uuid::new_v4();
        let mut rx_a = hub.subscribe(conversation_id).await;
        let mut rx_b = hub.subscribe(conversation_id).await;

        hub.publish(RealtimeEvent::TypingStarted {
            conversation_id,
            user_id: Uuid::new_v4(),
        })
        .await;

        assert_eq!(rx_a.recv().await.unwrap()["event"], "typing.started");
        assert_eq!(rx_b.recv().await.unwrap()["event"], "typing.started");
    }

    #[tokio::test]
    async fn dropped_subscribers_are_pruned() {
        let hub = ConversationHub::new();
        let conversation_id = Uuid::new_v4();
        let rx = hub.subscribe(conversation_id).await;
        drop(rx);

        hub.publish(RealtimeEvent::TypingStopped {
            conversation_id,
            user_id: Uuid::new_v4(),
        })
        .await;

        assert_eq!(hub.subscriber_count(conversation_id).await, 0);
    }
}
