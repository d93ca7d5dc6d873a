use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use desk_core::current_unix_timestamp_ms;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tokio::sync::broadcast;

pub const DEFAULT_TOPIC_BUFFER_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Public struct `BroadcastHubConfig` used across Desk components.
pub struct BroadcastHubConfig {
    pub topic_buffer_capacity: usize,
}

impl Default for BroadcastHubConfig {
    fn default() -> Self {
        Self {
            topic_buffer_capacity: DEFAULT_TOPIC_BUFFER_CAPACITY,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// Wire frame delivered to every subscriber of a topic.
pub struct BroadcastEnvelope {
    pub topic: String,
    pub event: String,
    pub payload: Value,
    pub published_unix_ms: u64,
}

#[derive(Debug, Error)]
/// Enumerates supported `BroadcastError` values.
pub enum BroadcastError {
    #[error("broadcast hub is closed")]
    HubClosed,
}

#[derive(Debug)]
struct BroadcastHubInner {
    config: BroadcastHubConfig,
    senders: RwLock<HashMap<String, broadcast::Sender<BroadcastEnvelope>>>,
    closed: AtomicBool,
}

/// Process-wide pub/sub fan-out over named topics.
///
/// Created once at startup, injected wherever publishing or subscribing
/// happens, and closed at shutdown. Subscriber add/remove is safe under
/// concurrent publish.
#[derive(Debug, Clone)]
pub struct BroadcastHub {
    inner: Arc<BroadcastHubInner>,
}

impl BroadcastHub {
    pub fn new(config: BroadcastHubConfig) -> Self {
        assert!(
            config.topic_buffer_capacity > 0,
            "topic_buffer_capacity must be greater than 0"
        );
        Self {
            inner: Arc::new(BroadcastHubInner {
                config,
                senders: RwLock::new(HashMap::new()),
                closed: AtomicBool::new(false),
            }),
        }
    }

    /// Publishes one event to every live subscriber of `topic`.
    ///
    /// Fire-and-forget: the result is the number of receivers the envelope
    /// reached, with zero when nobody is listening. Missed events are not
    /// replayed.
    pub fn publish(
        &self,
        topic: &str,
        event: &str,
        payload: Value,
    ) -> Result<usize, BroadcastError> {
        if self.inner.closed.load(Ordering::SeqCst) {
            return Err(BroadcastError::HubClosed);
        }
        let envelope = BroadcastEnvelope {
            topic: topic.to_string(),
            event: event.to_string(),
            payload,
            published_unix_ms: current_unix_timestamp_ms(),
        };
        let senders = self
            .inner
            .senders
            .read()
            .expect("broadcast hub sender lock poisoned");
        match senders.get(topic) {
            Some(sender) => Ok(sender.send(envelope).unwrap_or(0)),
            None => Ok(0),
        }
    }

    /// Subscribes to `topic` for the lifetime of the returned subscription,
    /// creating the topic on first use. Subscribing to a closed hub yields an
    /// already-terminated subscription.
    pub fn subscribe(&self, topic: &str) -> BroadcastSubscription {
        if self.inner.closed.load(Ordering::SeqCst) {
            return BroadcastSubscription {
                topic: topic.to_string(),
                hub: Arc::clone(&self.inner),
                receiver: None,
            };
        }
        let mut senders = self
            .inner
            .senders
            .write()
            .expect("broadcast hub sender lock poisoned");
        let sender = senders.entry(topic.to_string()).or_insert_with(|| {
            let (sender, _receiver) = broadcast::channel(self.inner.config.topic_buffer_capacity);
            sender
        });
        BroadcastSubscription {
            topic: topic.to_string(),
            hub: Arc::clone(&self.inner),
            receiver: Some(sender.subscribe()),
        }
    }

    /// Number of live subscribers on `topic`.
    pub fn topic_subscriber_count(&self, topic: &str) -> usize {
        let senders = self
            .inner
            .senders
            .read()
            .expect("broadcast hub sender lock poisoned");
        senders
            .get(topic)
            .map(|sender| sender.receiver_count())
            .unwrap_or(0)
    }

    /// Tears the hub down: later publishes fail and every open subscription
    /// terminates after draining already-buffered envelopes.
    pub fn close(&self) {
        self.inner.closed.store(true, Ordering::SeqCst);
        let mut senders = self
            .inner
            .senders
            .write()
            .expect("broadcast hub sender lock poisoned");
        senders.clear();
    }
}

impl Default for BroadcastHub {
    fn default() -> Self {
        Self::new(BroadcastHubConfig::default())
    }
}

impl BroadcastHubInner {
    fn release_topic(&self, topic: &str) {
        let mut senders = self
            .senders
            .write()
            .expect("broadcast hub sender lock poisoned");
        let drained = senders
            .get(topic)
            .map(|sender| sender.receiver_count() == 0)
            .unwrap_or(false);
        if drained {
            senders.remove(topic);
        }
    }
}

/// One viewer session's handle on a topic.
#[derive(Debug)]
pub struct BroadcastSubscription {
    topic: String,
    hub: Arc<BroadcastHubInner>,
    receiver: Option<broadcast::Receiver<BroadcastEnvelope>>,
}

impl BroadcastSubscription {
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Receives the next envelope, or `None` once the subscription has been
    /// unsubscribed or the hub closed. A lagged consumer skips the missed
    /// span and keeps receiving from the present.
    pub async fn recv(&mut self) -> Option<BroadcastEnvelope> {
        let receiver = self.receiver.as_mut()?;
        loop {
            match receiver.recv().await {
                Ok(envelope) => return Some(envelope),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    eprintln!(
                        "broadcast subscription lagged: topic={} skipped={}",
                        self.topic, skipped
                    );
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Releases the subscription. Idempotent; the topic itself is released
    /// once its last subscriber departs.
    pub fn unsubscribe(&mut self) {
        if let Some(receiver) = self.receiver.take() {
            drop(receiver);
            self.hub.release_topic(&self.topic);
        }
    }
}

impl Drop for BroadcastSubscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}
