// In-memory session transport
//
// Each connection is a pair of unbounded channels. The server side is driven
// through `SessionTransport`; the peer holds a `ClientHandle`. Once the server
// closes a session only its id is kept, to answer late calls with `Closed`.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::{mpsc, watch};
use tracing::debug;

use effectful_core::effect::{CloseStatus, ConnectionId, Frame, Incoming, SendStatus};
use effectful_core::interpreter::SessionTransport;
use effectful_error::{BackendError, BackendResult};

use crate::faults::Faults;

/// Code and reason a connection was closed with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseFrame {
    pub code: u16,
    pub reason: String,
}

#[derive(Debug)]
struct Connection {
    outbound: Mutex<Option<mpsc::UnboundedSender<Frame>>>,
    inbound: tokio::sync::Mutex<mpsc::UnboundedReceiver<Frame>>,
    closed: watch::Sender<Option<CloseFrame>>,
}

impl Connection {
    fn is_closed(&self) -> bool {
        self.closed.borrow().is_some()
    }
}

#[derive(Debug, Default)]
struct Sessions {
    open: HashMap<ConnectionId, Arc<Connection>>,
    /// Server-closed ids; their channels are already released
    closed: HashSet<ConnectionId>,
}

enum Session {
    Open(Arc<Connection>),
    Closed,
}

/// Sessions held in memory
#[derive(Debug, Default)]
pub struct MemoryTransport {
    sessions: Mutex<Sessions>,
    next_id: AtomicU64,
    faults: Faults,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Failure injection for `send`, `receive` and `close`
    pub fn faults(&self) -> &Faults {
        &self.faults
    }

    /// Open a new session and return the peer's end of it
    pub fn connect(&self) -> ClientHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let id = ConnectionId::new(format!("conn-{id}"));

        let (to_client, from_server) = mpsc::unbounded_channel();
        let (to_server, from_client) = mpsc::unbounded_channel();
        let (closed, close_watch) = watch::channel(None);

        let connection = Connection {
            outbound: Mutex::new(Some(to_client)),
            inbound: tokio::sync::Mutex::new(from_client),
            closed,
        };
        self.sessions
            .lock()
            .open
            .insert(id.clone(), Arc::new(connection));
        debug!(connection = %id, "session opened");

        ClientHandle {
            id,
            to_server: Some(to_server),
            from_server,
            close_watch,
        }
    }

    /// Number of sessions not yet closed by the server
    pub fn open_connections(&self) -> usize {
        self.sessions.lock().open.len()
    }

    fn session(&self, id: &ConnectionId) -> BackendResult<Session> {
        let sessions = self.sessions.lock();
        if let Some(connection) = sessions.open.get(id) {
            return Ok(Session::Open(Arc::clone(connection)));
        }
        if sessions.closed.contains(id) {
            return Ok(Session::Closed);
        }
        Err(BackendError::invalid_request(format!("unknown connection {id}")))
    }
}

#[async_trait]
impl SessionTransport for MemoryTransport {
    async fn send(&self, connection: &ConnectionId, frame: Frame) -> BackendResult<SendStatus> {
        self.faults.check("send")?;
        let Session::Open(session) = self.session(connection)? else {
            return Ok(SendStatus::Closed);
        };
        let outbound = session.outbound.lock();
        let status = match outbound.as_ref() {
            Some(sender) if sender.send(frame).is_ok() => SendStatus::Delivered,
            _ => SendStatus::Closed,
        };
        Ok(status)
    }

    async fn receive(&self, connection: &ConnectionId) -> BackendResult<Incoming> {
        self.faults.check("receive")?;
        let Session::Open(session) = self.session(connection)? else {
            return Ok(Incoming::Closed);
        };
        let mut closed = session.closed.subscribe();
        if session.is_closed() {
            return Ok(Incoming::Closed);
        }

        let mut inbound = session.inbound.lock().await;
        tokio::select! {
            frame = inbound.recv() => Ok(frame.map_or(Incoming::Closed, Incoming::Frame)),
            _ = closed.changed() => Ok(Incoming::Closed),
        }
    }

    async fn close(
        &self,
        connection: &ConnectionId,
        code: u16,
        reason: &str,
    ) -> BackendResult<CloseStatus> {
        self.faults.check("close")?;
        let session = {
            let mut sessions = self.sessions.lock();
            match sessions.open.remove(connection) {
                Some(session) => {
                    sessions.closed.insert(connection.clone());
                    session
                }
                None if sessions.closed.contains(connection) => {
                    return Ok(CloseStatus::AlreadyClosed);
                }
                None => {
                    return Err(BackendError::invalid_request(format!(
                        "unknown connection {connection}"
                    )));
                }
            }
        };
        session.outbound.lock().take();
        session.closed.send_replace(Some(CloseFrame {
            code,
            reason: reason.to_string(),
        }));
        debug!(connection = %connection, code, "session closed");
        Ok(CloseStatus::Closed)
    }
}

/// The peer's end of a session
#[derive(Debug)]
pub struct ClientHandle {
    id: ConnectionId,
    to_server: Option<mpsc::UnboundedSender<Frame>>,
    from_server: mpsc::UnboundedReceiver<Frame>,
    close_watch: watch::Receiver<Option<CloseFrame>>,
}

impl ClientHandle {
    pub fn id(&self) -> &ConnectionId {
        &self.id
    }

    /// Send a frame to the server; false once either side has closed
    pub fn send(&self, frame: Frame) -> bool {
        match &self.to_server {
            Some(sender) => sender.send(frame).is_ok(),
            None => false,
        }
    }

    /// Next frame from the server, or `None` once it closed the session
    pub async fn recv(&mut self) -> Option<Frame> {
        self.from_server.recv().await
    }

    /// Hang up; the server sees `Closed` once queued frames are drained
    pub fn hang_up(&mut self) {
        self.to_server.take();
    }

    /// How the server closed the session, if it has
    pub fn close_frame(&self) -> Option<CloseFrame> {
        self.close_watch.borrow().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_frames_flow_both_ways() {
        let transport = MemoryTransport::new();
        let mut client = transport.connect();
        let id = client.id().clone();

        assert!(client.send(Frame::text("hello")));
        assert_eq!(
            transport.receive(&id).await,
            Ok(Incoming::Frame(Frame::text("hello")))
        );

        assert_eq!(
            transport.send(&id, Frame::text("welcome")).await,
            Ok(SendStatus::Delivered)
        );
        assert_eq!(client.recv().await, Some(Frame::text("welcome")));
    }

    #[tokio::test]
    async fn test_client_hang_up_drains_then_closes() {
        let transport = MemoryTransport::new();
        let mut client = transport.connect();
        let id = client.id().clone();

        client.send(Frame::text("last words"));
        client.hang_up();

        assert_eq!(
            transport.receive(&id).await,
            Ok(Incoming::Frame(Frame::text("last words")))
        );
        assert_eq!(transport.receive(&id).await, Ok(Incoming::Closed));
    }

    #[tokio::test]
    async fn test_server_close() {
        let transport = MemoryTransport::new();
        let mut client = transport.connect();
        let id = client.id().clone();
        assert_eq!(transport.open_connections(), 1);

        assert_eq!(transport.close(&id, 1001, "going away").await, Ok(CloseStatus::Closed));
        assert_eq!(
            transport.close(&id, 1000, "").await,
            Ok(CloseStatus::AlreadyClosed)
        );
        assert_eq!(transport.open_connections(), 0);

        assert_eq!(client.recv().await, None);
        assert_eq!(
            client.close_frame(),
            Some(CloseFrame {
                code: 1001,
                reason: "going away".to_string()
            })
        );
        assert_eq!(
            transport.send(&id, Frame::text("late")).await,
            Ok(SendStatus::Closed)
        );
        assert_eq!(transport.receive(&id).await, Ok(Incoming::Closed));
    }

    #[tokio::test]
    async fn test_close_wakes_pending_receive() {
        let transport = Arc::new(MemoryTransport::new());
        let client = transport.connect();
        let id = client.id().clone();

        let waiting = {
            let transport = Arc::clone(&transport);
            let id = id.clone();
            tokio::spawn(async move { transport.receive(&id).await })
        };
        tokio::task::yield_now().await;

        transport.close(&id, 1000, "").await.unwrap();
        assert_eq!(waiting.await.unwrap(), Ok(Incoming::Closed));
    }

    #[tokio::test]
    async fn test_closed_sessions_release_their_channels() {
        let transport = MemoryTransport::new();
        let clients: Vec<ClientHandle> = (0..8).map(|_| transport.connect()).collect();
        for client in &clients {
            transport.close(client.id(), 1000, "").await.unwrap();
        }

        let sessions = transport.sessions.lock();
        assert!(sessions.open.is_empty());
        assert_eq!(sessions.closed.len(), 8);
        drop(sessions);

        for client in &clients {
            assert!(!client.send(Frame::text("late")));
            assert_eq!(
                client.close_frame(),
                Some(CloseFrame {
                    code: 1000,
                    reason: String::new()
                })
            );
        }
    }

    #[tokio::test]
    async fn test_unknown_connection() {
        let transport = MemoryTransport::new();
        let err = transport
            .receive(&ConnectionId::new("conn-404"))
            .await
            .unwrap_err();
        assert_eq!(err, BackendError::invalid_request("unknown connection conn-404"));
    }
}
