use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{RwLock, broadcast};
use tracing::debug;

use cipherchan_types::events::GatewayEvent;

/// Per-topic buffer. A subscriber that falls further behind than this skips ahead.
const TOPIC_CAPACITY: usize = 256;

/// Per-channel publish/subscribe fan-out.
///
/// Delivery is fire-and-forget: nothing is persisted or replayed, and a
/// subscriber only sees events published after it subscribed.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

struct DispatcherInner {
    /// channel_id -> broadcast sender for that channel's subscribers
    topics: RwLock<HashMap<i64, broadcast::Sender<GatewayEvent>>>,
}

/// Prefix a chat line with its human-readable UTC stamp.
pub fn stamp(text: &str, at: DateTime<Utc>) -> String {
    format!("[{}] {}", at.format("%Y-%m-%d %H:%M:%S"), text)
}

impl Dispatcher {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(DispatcherInner {
                topics: RwLock::new(HashMap::new()),
            }),
        }
    }

    /// Subscribe to a channel's events, creating the topic on first use.
    pub async fn subscribe(&self, channel_id: i64) -> broadcast::Receiver<GatewayEvent> {
        let mut topics = self.inner.topics.write().await;
        topics
            .entry(channel_id)
            .or_insert_with(|| broadcast::channel(TOPIC_CAPACITY).0)
            .subscribe()
    }

    /// Stamp `text` with the current time and deliver it to everyone
    /// subscribed to `channel_id`. Returns how many subscribers it reached.
    pub async fn publish(&self, channel_id: i64, text: &str) -> usize {
        self.publish_event(GatewayEvent::ChannelMessage {
            channel_id,
            message: stamp(text, Utc::now()),
        })
        .await
    }

    pub async fn publish_event(&self, event: GatewayEvent) -> usize {
        let channel_id = event.channel_id();
        let sent = {
            let topics = self.inner.topics.read().await;
            match topics.get(&channel_id) {
                Some(tx) => tx.send(event).ok(),
                None => return 0,
            }
        };

        match sent {
            Some(n) => n,
            None => {
                // Every receiver is gone
                self.release(channel_id).await;
                0
            }
        }
    }

    /// Drop a channel's topic if nobody is listening any more.
    pub async fn release(&self, channel_id: i64) {
        let mut topics = self.inner.topics.write().await;
        if topics.get(&channel_id).is_some_and(|tx| tx.receiver_count() == 0) {
            topics.remove(&channel_id);
            debug!("Released idle topic for channel {}", channel_id);
        }
    }

    pub async fn subscriber_count(&self, channel_id: i64) -> usize {
        self.inner
            .topics
            .read()
            .await
            .get(&channel_id)
            .map_or(0, |tx| tx.receiver_count())
    }

    pub async fn topic_count(&self) -> usize {
        self.inner.topics.read().await.len()
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}
