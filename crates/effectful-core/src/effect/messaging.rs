// Messaging family
//
// Publication to topics and at-least-once consumption from subscriptions.

use std::collections::BTreeMap;
use std::fmt;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Broker-assigned message identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MessageId(pub String);

impl MessageId {
    pub fn new(id: impl Into<String>) -> Self {
        MessageId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Publish a message to a topic
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Publish {
    pub topic: String,
    pub payload: Bytes,
    pub attributes: BTreeMap<String, String>,
}

impl Publish {
    pub fn new(topic: impl Into<String>, payload: impl Into<Bytes>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }
}

/// Take the next available message from a subscription
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receive {
    pub subscription: String,
}

impl Receive {
    pub fn new(subscription: impl Into<String>) -> Self {
        Self {
            subscription: subscription.into(),
        }
    }
}

/// Confirm that a received message has been processed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Acknowledge {
    pub subscription: String,
    pub message_id: MessageId,
}

impl Acknowledge {
    pub fn new(subscription: impl Into<String>, message_id: MessageId) -> Self {
        Self {
            subscription: subscription.into(),
            message_id,
        }
    }
}

/// Messaging family effects
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum MessagingEffect {
    Publish(Publish),
    Receive(Receive),
    Acknowledge(Acknowledge),
}

impl MessagingEffect {
    pub fn operation(&self) -> &'static str {
        match self {
            MessagingEffect::Publish(_) => "publish",
            MessagingEffect::Receive(_) => "receive",
            MessagingEffect::Acknowledge(_) => "acknowledge",
        }
    }
}

//-----------------------------------------------------------------------------
// Results
//-----------------------------------------------------------------------------

/// Delivery acknowledgment for a publication
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delivery {
    pub topic: String,
    pub message_id: MessageId,
    /// Number of subscriptions the message was fanned out to
    pub fanout: usize,
}

/// A message handed to a consumer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceivedMessage {
    pub message_id: MessageId,
    pub topic: String,
    pub payload: Bytes,
    pub attributes: BTreeMap<String, String>,
    /// 1 on first delivery, incremented on each redelivery
    pub delivery_attempt: u32,
}

/// Outcome of a receive
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "message", rename_all = "snake_case")]
pub enum Inbox {
    Message(ReceivedMessage),
    Empty,
}

/// Outcome of an acknowledgment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AckStatus {
    Acknowledged,
    /// The message was not in flight: already acknowledged, or never delivered
    Unknown,
}

/// Messaging family results
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", content = "outcome", rename_all = "snake_case")]
pub enum MessagingResult {
    Published(Delivery),
    Received(Inbox),
    Acknowledged(AckStatus),
}

request!(Publish, MessagingEffect::Publish, Messaging, MessagingResult::Published => Delivery);
request!(Receive, MessagingEffect::Receive, Messaging, MessagingResult::Received => Inbox);
request!(
    Acknowledge,
    MessagingEffect::Acknowledge,
    Messaging,
    MessagingResult::Acknowledged => AckStatus
);
