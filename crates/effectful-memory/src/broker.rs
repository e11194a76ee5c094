// In-memory message broker
//
// Topics fan out to every subscription attached to them. Received messages
// stay in flight until acknowledged, and can be handed back for redelivery.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use tracing::debug;

use effectful_core::effect::{Delivery, MessageId, ReceivedMessage};
use effectful_core::interpreter::MessageBroker;
use effectful_error::{BackendError, BackendResult};

use crate::faults::Faults;

fn unknown_subscription(subscription: &str) -> BackendError {
    BackendError::invalid_request(format!("unknown subscription {subscription}"))
}

#[derive(Debug)]
struct Subscription {
    topic: String,
    ready: VecDeque<ReceivedMessage>,
    in_flight: BTreeMap<MessageId, ReceivedMessage>,
}

/// Topic/subscription broker held in memory
#[derive(Debug, Default)]
pub struct MemoryBroker {
    subscriptions: Mutex<HashMap<String, Subscription>>,
    next_id: AtomicU64,
    faults: Faults,
}

impl MemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Failure injection for `publish`, `receive` and `acknowledge`
    pub fn faults(&self) -> &Faults {
        &self.faults
    }

    /// Attach `subscription` to `topic`. Messages published before this call
    /// are not delivered to it.
    pub fn subscribe(&self, topic: &str, subscription: &str) {
        self.subscriptions
            .lock()
            .entry(subscription.to_string())
            .or_insert_with(|| Subscription {
                topic: topic.to_string(),
                ready: VecDeque::new(),
                in_flight: BTreeMap::new(),
            });
    }

    /// Messages waiting to be received on `subscription`
    pub fn backlog(&self, subscription: &str) -> usize {
        self.subscriptions
            .lock()
            .get(subscription)
            .map_or(0, |sub| sub.ready.len())
    }

    /// Messages received but not yet acknowledged on `subscription`
    pub fn in_flight(&self, subscription: &str) -> usize {
        self.subscriptions
            .lock()
            .get(subscription)
            .map_or(0, |sub| sub.in_flight.len())
    }

    /// Return every unacknowledged message to the front of the queue, as a
    /// broker does when a consumer's lease expires. Returns how many.
    pub fn redeliver(&self, subscription: &str) -> usize {
        let mut subscriptions = self.subscriptions.lock();
        let Some(sub) = subscriptions.get_mut(subscription) else {
            return 0;
        };
        let expired = std::mem::take(&mut sub.in_flight);
        let count = expired.len();
        for (_, message) in expired.into_iter().rev() {
            sub.ready.push_front(message);
        }
        count
    }
}

#[async_trait]
impl MessageBroker for MemoryBroker {
    async fn publish(
        &self,
        topic: &str,
        payload: Bytes,
        attributes: &BTreeMap<String, String>,
    ) -> BackendResult<Delivery> {
        self.faults.check("publish")?;
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let message_id = MessageId::new(format!("msg-{id:08}"));

        let mut subscriptions = self.subscriptions.lock();
        let mut fanout: usize = 0;
        for sub in subscriptions.values_mut().filter(|sub| sub.topic == topic) {
            sub.ready.push_back(ReceivedMessage {
                message_id: message_id.clone(),
                topic: topic.to_string(),
                payload: payload.clone(),
                attributes: attributes.clone(),
                delivery_attempt: 0,
            });
            fanout += 1;
        }
        debug!(topic, message_id = %message_id, fanout, "published");

        Ok(Delivery {
            topic: topic.to_string(),
            message_id,
            fanout,
        })
    }

    async fn receive(&self, subscription: &str) -> BackendResult<Option<ReceivedMessage>> {
        self.faults.check("receive")?;
        let mut subscriptions = self.subscriptions.lock();
        let sub = subscriptions
            .get_mut(subscription)
            .ok_or_else(|| unknown_subscription(subscription))?;

        let Some(mut message) = sub.ready.pop_front() else {
            return Ok(None);
        };
        message.delivery_attempt += 1;
        sub.in_flight
            .insert(message.message_id.clone(), message.clone());
        Ok(Some(message))
    }

    async fn acknowledge(&self, subscription: &str, message_id: &MessageId) -> BackendResult<bool> {
        self.faults.check("acknowledge")?;
        let mut subscriptions = self.subscriptions.lock();
        let sub = subscriptions
            .get_mut(subscription)
            .ok_or_else(|| unknown_subscription(subscription))?;
        Ok(sub.in_flight.remove(message_id).is_some())
    }
}
