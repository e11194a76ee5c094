// Session transport interpreter

use std::sync::Arc;

use async_trait::async_trait;

use effectful_error::BackendResult;

use super::{check_payload, require, Rejection, TransportInterpreter};
use crate::config::InterpreterConfig;
use crate::effect::{
    CloseStatus, ConnectionId, Frame, Incoming, SendStatus, TransportEffect, TransportResult,
};
use crate::outcome::Outcome;

/// Close codes a caller may send: the standard range plus the private range
const CLOSE_CODES: std::ops::RangeInclusive<u16> = 1000..=4999;

/// A message-oriented session layer
#[async_trait]
pub trait SessionTransport: Send + Sync {
    async fn send(&self, connection: &ConnectionId, frame: Frame) -> BackendResult<SendStatus>;

    /// Waits for the next frame, or reports that the peer closed
    async fn receive(&self, connection: &ConnectionId) -> BackendResult<Incoming>;

    async fn close(
        &self,
        connection: &ConnectionId,
        code: u16,
        reason: &str,
    ) -> BackendResult<CloseStatus>;
}

/// [`TransportInterpreter`] over a [`SessionTransport`]
#[derive(Clone)]
pub struct SessionInterpreter {
    transport: Arc<dyn SessionTransport>,
    config: Arc<InterpreterConfig>,
}

impl SessionInterpreter {
    pub fn new(transport: Arc<dyn SessionTransport>, config: Arc<InterpreterConfig>) -> Self {
        Self { transport, config }
    }

    async fn apply(&self, effect: &TransportEffect) -> Result<TransportResult, Rejection> {
        require("connection id", effect.connection().as_str())?;
        match effect {
            TransportEffect::Send(op) => {
                check_payload(&self.config, "frame", op.frame.len())?;
                let status = self.transport.send(&op.connection, op.frame.clone()).await?;
                Ok(TransportResult::Sent(status))
            }
            TransportEffect::Receive(op) => {
                let incoming = self.transport.receive(&op.connection).await?;
                Ok(TransportResult::Received(incoming))
            }
            TransportEffect::Close(op) => {
                if !CLOSE_CODES.contains(&op.code) {
                    let message = format!("close code {} is out of range", op.code);
                    return Err(Rejection::invalid(message));
                }
                // Close reasons must fit a single control frame
                if op.reason.len() > 123 {
                    return Err(Rejection::invalid("close reason exceeds 123 bytes"));
                }
                let status = self.transport.close(&op.connection, op.code, &op.reason).await?;
                Ok(TransportResult::Closed(status))
            }
        }
    }
}

#[async_trait]
impl TransportInterpreter for SessionInterpreter {
    async fn handle(&self, effect: TransportEffect) -> Outcome<TransportResult> {
        self.apply(&effect)
            .await
            .map_err(|rejection| rejection.into_error(effect.into(), &self.config))
    }
}
