// Message broker interpreter

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use effectful_error::BackendResult;

use super::{check_payload, require, MessagingInterpreter, Rejection};
use crate::config::InterpreterConfig;
use crate::effect::{
    AckStatus, Delivery, Inbox, MessageId, MessagingEffect, MessagingResult, ReceivedMessage,
};
use crate::outcome::Outcome;

/// A topic/subscription broker with at-least-once delivery
#[async_trait]
pub trait MessageBroker: Send + Sync {
    async fn publish(
        &self,
        topic: &str,
        payload: Bytes,
        attributes: &BTreeMap<String, String>,
    ) -> BackendResult<Delivery>;

    /// Next available message, if any
    async fn receive(&self, subscription: &str) -> BackendResult<Option<ReceivedMessage>>;

    /// Returns whether the message was in flight
    async fn acknowledge(&self, subscription: &str, message_id: &MessageId) -> BackendResult<bool>;
}

/// [`MessagingInterpreter`] over a [`MessageBroker`]
#[derive(Clone)]
pub struct BrokerInterpreter {
    broker: Arc<dyn MessageBroker>,
    config: Arc<InterpreterConfig>,
}

impl BrokerInterpreter {
    pub fn new(broker: Arc<dyn MessageBroker>, config: Arc<InterpreterConfig>) -> Self {
        Self { broker, config }
    }

    async fn apply(&self, effect: &MessagingEffect) -> Result<MessagingResult, Rejection> {
        match effect {
            MessagingEffect::Publish(op) => {
                require("topic", &op.topic)?;
                check_payload(&self.config, "message payload", op.payload.len())?;
                let delivery = self
                    .broker
                    .publish(&op.topic, op.payload.clone(), &op.attributes)
                    .await?;
                Ok(MessagingResult::Published(delivery))
            }
            MessagingEffect::Receive(op) => {
                require("subscription", &op.subscription)?;
                let inbox = match self.broker.receive(&op.subscription).await? {
                    Some(message) => Inbox::Message(message),
                    None => Inbox::Empty,
                };
                Ok(MessagingResult::Received(inbox))
            }
            MessagingEffect::Acknowledge(op) => {
                require("subscription", &op.subscription)?;
                require("message id", op.message_id.as_str())?;
                let status = if self.broker.acknowledge(&op.subscription, &op.message_id).await? {
                    AckStatus::Acknowledged
                } else {
                    AckStatus::Unknown
                };
                Ok(MessagingResult::Acknowledged(status))
            }
        }
    }
}

#[async_trait]
impl MessagingInterpreter for BrokerInterpreter {
    async fn handle(&self, effect: MessagingEffect) -> Outcome<MessagingResult> {
        self.apply(&effect)
            .await
            .map_err(|rejection| rejection.into_error(effect.into(), &self.config))
    }
}
