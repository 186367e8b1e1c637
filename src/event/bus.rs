use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tracing::debug;

use super::events::StatsEvent;

const TOPIC_CAPACITY: usize = 100;

/// Receives events from the write paths. Publishing never fails the caller.
#[async_trait]
pub trait StatsEventSink: Send + Sync {
    async fn publish(&self, event: StatsEvent);
}

/// Broadcasts statistics events to per-topic subscribers
#[derive(Debug, Clone, Default)]
pub struct EventBus {
    /// topic -> sender
    topic_channels: Arc<RwLock<HashMap<String, broadcast::Sender<StatsEvent>>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Emits an event to all subscribers of its topic
    pub async fn emit(&self, event: StatsEvent) {
        let topic = event.topic();
        let sender = self.sender_for(&topic).await;

        match sender.send(event) {
            Ok(receiver_count) => {
                debug!(topic = %topic, receivers = receiver_count, "Stats event emitted");
            }
            Err(_) => {
                debug!(topic = %topic, "Stats event emitted with no receivers");
            }
        }
    }

    pub async fn subscribe(&self, topic: &str) -> broadcast::Receiver<StatsEvent> {
        self.sender_for(topic).await.subscribe()
    }

    async fn sender_for(&self, topic: &str) -> broadcast::Sender<StatsEvent> {
        {
            let topic_channels = self.topic_channels.read().await;
            if let Some(sender) = topic_channels.get(topic) {
                return sender.clone();
            }
        }

        debug!(topic = %topic, "Creating new topic channel");
        let mut topic_channels = self.topic_channels.write().await;
        topic_channels
            .entry(topic.to_string())
            .or_insert_with(|| broadcast::channel(TOPIC_CAPACITY).0)
            .clone()
    }
}

#[async_trait]
impl StatsEventSink for EventBus {
    async fn publish(&self, event: StatsEvent) {
        self.emit(event).await;
    }
}
