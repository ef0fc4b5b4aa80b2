//! Per-client connection lifecycle.
//!
//! A connection is a [`ConnectionHandle`] in the hub's registry plus two
//! loops driven by [`serve_connection`]:
//!
//! - **Read loop** (inline, on the accepting task): decodes one message per
//!   frame and hands it verbatim to [`Hub::receive`]. The first read error,
//!   the peer closing, or the hub closing the handle ends it.
//! - **Write loop** (spawned): drains the connection's outbound queue into
//!   the transport. The first write error unregisters the connection.
//!
//! Lifecycle is `Connecting -> Active -> Closed`; `Closed` is terminal and
//! there is no resumption.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use relay_types::connection::ConnectionId;
use relay_types::error::ConnectionError;
use relay_types::message::Message;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::hub::Hub;
use crate::store::MessageStore;

/// Inbound half of a client transport.
///
/// `next_message` must be cancel-safe: the read loop races it against the
/// connection being closed.
pub trait FrameReader: Send {
    /// The next decoded message, an error for a malformed frame or broken
    /// transport, or `None` once the peer has closed.
    fn next_message(
        &mut self,
    ) -> impl Future<Output = Option<Result<Message, ConnectionError>>> + Send;
}

/// Outbound half of a client transport.
pub trait FrameWriter: Send + 'static {
    fn write(&mut self, msg: &Message) -> impl Future<Output = Result<(), ConnectionError>> + Send;

    /// Close the underlying transport. Errors are ignored.
    fn close(&mut self) -> impl Future<Output = ()> + Send;
}

/// Registry entry for one live connection.
///
/// Cloning shares the same outbound queue and close signal.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    id: ConnectionId,
    outbound: mpsc::Sender<Arc<Message>>,
    cancel: CancellationToken,
}

/// Receiving side of a connection's outbound queue, owned by its write loop.
#[derive(Debug)]
pub struct Outbound {
    receiver: mpsc::Receiver<Arc<Message>>,
    cancel: CancellationToken,
}

impl ConnectionHandle {
    /// Create a handle with an outbound queue holding `capacity` messages.
    pub fn new(capacity: usize) -> (Self, Outbound) {
        let (tx, rx) = mpsc::channel(capacity);
        let cancel = CancellationToken::new();
        let handle = Self {
            id: ConnectionId::new(),
            outbound: tx,
            cancel: cancel.clone(),
        };
        (handle, Outbound { receiver: rx, cancel })
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Queue a message for this client without waiting.
    ///
    /// # Errors
    ///
    /// [`ConnectionError::SlowConsumer`] if the outbound queue is full,
    /// [`ConnectionError::Closed`] if the connection is closed. Either is
    /// terminal for the connection.
    pub fn send(&self, msg: &Arc<Message>) -> Result<(), ConnectionError> {
        if self.cancel.is_cancelled() {
            return Err(ConnectionError::Closed);
        }
        self.outbound
            .try_send(Arc::clone(msg))
            .map_err(|err| match err {
                mpsc::error::TrySendError::Full(_) => ConnectionError::SlowConsumer,
                mpsc::error::TrySendError::Closed(_) => ConnectionError::Closed,
            })
    }

    /// Signal both loops to stop. Idempotent.
    pub fn close(&self) {
        self.cancel.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Resolves once the connection has been closed.
    pub async fn closed(&self) {
        self.cancel.cancelled().await;
    }
}

impl Outbound {
    /// Next queued message, or `None` once every handle has been dropped and
    /// the queue is drained.
    pub async fn recv(&mut self) -> Option<Arc<Message>> {
        self.receiver.recv().await
    }
}

/// Why a connection's read loop ended.
#[derive(Debug)]
pub enum Disconnect {
    /// The peer closed the transport.
    PeerClosed,
    /// A frame failed to decode or the transport failed.
    ReadFailed(ConnectionError),
    /// The hub closed the connection (failed send or shutdown).
    Closed,
    /// The broadcast loop is no longer running.
    HubStopped,
}

impl fmt::Display for Disconnect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Disconnect::PeerClosed => write!(f, "peer closed"),
            Disconnect::ReadFailed(err) => write!(f, "read failed: {err}"),
            Disconnect::Closed => write!(f, "closed by hub"),
            Disconnect::HubStopped => write!(f, "hub stopped"),
        }
    }
}

/// Serve one accepted client for its whole lifetime.
///
/// Registers the connection, spawns its write loop, and runs the read loop
/// on the calling task. On return the connection is unregistered and its
/// transport closed.
pub async fn serve_connection<S, R, W>(hub: Arc<Hub<S>>, mut reader: R, writer: W) -> Disconnect
where
    S: MessageStore,
    R: FrameReader,
    W: FrameWriter,
{
    let (handle, outbound) = ConnectionHandle::new(hub.outbound_capacity());
    let id = handle.id();
    hub.register(handle.clone());

    let write_task = tokio::spawn(write_loop(Arc::clone(&hub), id, outbound, writer));

    let reason = read_loop(&hub, &handle, &mut reader).await;

    hub.unregister(&id);
    if let Err(err) = write_task.await {
        warn!(connection_id = %id, error = %err, "write loop panicked");
    }

    info!(connection_id = %id, reason = %reason, "client disconnected");
    reason
}

async fn read_loop<S, R>(hub: &Hub<S>, handle: &ConnectionHandle, reader: &mut R) -> Disconnect
where
    S: MessageStore,
    R: FrameReader,
{
    loop {
        let next = tokio::select! {
            biased;
            _ = handle.closed() => return Disconnect::Closed,
            next = reader.next_message() => next,
        };

        let msg = match next {
            Some(Ok(msg)) => msg,
            Some(Err(err)) => {
                warn!(connection_id = %handle.id(), error = %err, "read error");
                return Disconnect::ReadFailed(err);
            }
            None => return Disconnect::PeerClosed,
        };

        debug!(
            connection_id = %handle.id(),
            message_type = %msg.message_type,
            sender_id = %msg.sender_id,
            "message received"
        );

        if hub.receive(msg).await.is_err() {
            return Disconnect::HubStopped;
        }
    }
}

async fn write_loop<S, W>(hub: Arc<Hub<S>>, id: ConnectionId, mut outbound: Outbound, mut writer: W)
where
    S: MessageStore,
    W: FrameWriter,
{
    loop {
        let next = tokio::select! {
            biased;
            _ = outbound.cancel.cancelled() => break,
            next = outbound.receiver.recv() => next,
        };

        let Some(msg) = next else { break };

        // A peer that stopped reading can leave the write pending forever.
        let written = tokio::select! {
            biased;
            _ = outbound.cancel.cancelled() => break,
            written = writer.write(&msg) => written,
        };

        if let Err(err) = written {
            warn!(connection_id = %id, error = %err, "write error");
            hub.unregister(&id);
            break;
        }
    }

    writer.close().await;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
