// Transport family
//
// Websocket-style sessions: frames sent to and received from one connection.

use std::fmt;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Identifier of an established session
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConnectionId(pub String);

impl ConnectionId {
    pub fn new(id: impl Into<String>) -> Self {
        ConnectionId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One message on a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum Frame {
    Text(String),
    Binary(Bytes),
}

impl Frame {
    pub fn text(text: impl Into<String>) -> Self {
        Frame::Text(text.into())
    }

    /// Payload size in bytes
    pub fn len(&self) -> usize {
        match self {
            Frame::Text(text) => text.len(),
            Frame::Binary(bytes) => bytes.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Send a frame to the peer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendFrame {
    pub connection: ConnectionId,
    pub frame: Frame,
}

impl SendFrame {
    pub fn new(connection: ConnectionId, frame: Frame) -> Self {
        Self { connection, frame }
    }
}

/// Wait for the next frame from the peer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiveFrame {
    pub connection: ConnectionId,
}

impl ReceiveFrame {
    pub fn new(connection: ConnectionId) -> Self {
        Self { connection }
    }
}

/// Close the session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloseConnection {
    pub connection: ConnectionId,
    pub code: u16,
    pub reason: String,
}

impl CloseConnection {
    /// Normal closure (1000)
    pub fn normal(connection: ConnectionId) -> Self {
        Self {
            connection,
            code: 1000,
            reason: String::new(),
        }
    }

    pub fn with_reason(connection: ConnectionId, code: u16, reason: impl Into<String>) -> Self {
        Self {
            connection,
            code,
            reason: reason.into(),
        }
    }
}

/// Transport family effects
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum TransportEffect {
    Send(SendFrame),
    Receive(ReceiveFrame),
    Close(CloseConnection),
}

impl TransportEffect {
    pub fn operation(&self) -> &'static str {
        match self {
            TransportEffect::Send(_) => "send_frame",
            TransportEffect::Receive(_) => "receive_frame",
            TransportEffect::Close(_) => "close_connection",
        }
    }

    pub fn connection(&self) -> &ConnectionId {
        match self {
            TransportEffect::Send(op) => &op.connection,
            TransportEffect::Receive(op) => &op.connection,
            TransportEffect::Close(op) => &op.connection,
        }
    }
}

//-----------------------------------------------------------------------------
// Results
//-----------------------------------------------------------------------------

/// Outcome of a send
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SendStatus {
    Delivered,
    /// The session was already closed; nothing was sent
    Closed,
}

/// Outcome of a receive
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "frame", rename_all = "snake_case")]
pub enum Incoming {
    Frame(Frame),
    /// The peer closed the session and no frames remain
    Closed,
}

/// Outcome of a close
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CloseStatus {
    Closed,
    AlreadyClosed,
}

/// Transport family results
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", content = "outcome", rename_all = "snake_case")]
pub enum TransportResult {
    Sent(SendStatus),
    Received(Incoming),
    Closed(CloseStatus),
}

request!(SendFrame, TransportEffect::Send, Transport, TransportResult::Sent => SendStatus);
request!(ReceiveFrame, TransportEffect::Receive, Transport, TransportResult::Received => Incoming);
request!(
    CloseConnection,
    TransportEffect::Close,
    Transport,
    TransportResult::Closed => CloseStatus
);
