//! The hub: connection registry plus the single ordered broadcast path.
//!
//! Every inbound message goes through [`Hub::receive`], which stamps it,
//! hands it to the [`MessageStore`], and enqueues it on one bounded delivery
//! queue. A single consumer ([`Hub::run`]) drains that queue and fans each
//! message out to every live connection, so all clients observe broadcasts
//! in the same relative order.
//!
//! The live set is a `HashMap` behind one mutex. Registration, removal, and
//! the fan-out iteration all take that lock; the fan-out only performs
//! non-blocking queue pushes while holding it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use relay_types::config::HubConfig;
use relay_types::connection::ConnectionId;
use relay_types::error::{HubError, RepositoryError};
use relay_types::message::Message;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::connection::ConnectionHandle;
use crate::store::MessageStore;

/// Receiving end of the delivery queue, consumed by [`Hub::run`].
pub struct DeliveryQueue {
    receiver: mpsc::Receiver<Message>,
}

/// Registry of live connections and owner of the broadcast path.
pub struct Hub<S> {
    store: Arc<S>,
    connections: Mutex<HashMap<ConnectionId, ConnectionHandle>>,
    delivery: mpsc::Sender<Message>,
    outbound_capacity: usize,
    save_timeout: Duration,
}

impl<S: MessageStore> Hub<S> {
    /// Create a hub and the queue its broadcast loop consumes.
    ///
    /// The delivery queue holds `delivery_capacity` messages; when it is
    /// full, [`Hub::receive`] waits for space rather than dropping anything.
    pub fn new(store: Arc<S>, config: &HubConfig) -> (Arc<Self>, DeliveryQueue) {
        let (delivery, receiver) = mpsc::channel(config.delivery_capacity);
        let hub = Self {
            store,
            connections: Mutex::new(HashMap::new()),
            delivery,
            outbound_capacity: config.outbound_capacity,
            save_timeout: config.save_timeout(),
        };
        (Arc::new(hub), DeliveryQueue { receiver })
    }

    /// Per-connection outbound queue size new connections should use.
    pub fn outbound_capacity(&self) -> usize {
        self.outbound_capacity
    }

    /// Add a connection to the live set.
    ///
    /// A handle with the same id replaces the previous entry.
    pub fn register(&self, handle: ConnectionHandle) {
        let id = handle.id();
        let count = {
            let mut connections = self.lock_connections();
            connections.insert(id, handle);
            connections.len()
        };
        info!(connection_id = %id, connections = count, "client connected");
    }

    /// Remove a connection from the live set and close it.
    ///
    /// Idempotent: removing an absent id does nothing. Returns `true` if the
    /// connection was registered.
    pub fn unregister(&self, id: &ConnectionId) -> bool {
        let removed = self.lock_connections().remove(id);
        match removed {
            Some(handle) => {
                handle.close();
                debug!(connection_id = %id, "unregistered connection");
                true
            }
            None => false,
        }
    }

    pub fn is_registered(&self, id: &ConnectionId) -> bool {
        self.lock_connections().contains_key(id)
    }

    pub fn connection_count(&self) -> usize {
        self.lock_connections().len()
    }

    /// Accept one inbound message from a connection's read loop.
    ///
    /// Clears any client-supplied id, stamps the arrival time, persists the
    /// message, then enqueues it for broadcast. A failed or timed-out save is
    /// logged and the message is broadcast anyway, without an id.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Closed`] if the broadcast loop has stopped.
    pub async fn receive(&self, mut msg: Message) -> Result<(), HubError> {
        msg.id = None;
        msg.stamp(Utc::now());

        match tokio::time::timeout(self.save_timeout, self.store.save(&msg)).await {
            Ok(Ok(id)) => {
                msg.id = Some(id);
                debug!(message_id = %id, sender_id = %msg.sender_id, "message saved");
            }
            Ok(Err(err)) => {
                warn!(error = %err, sender_id = %msg.sender_id, "failed to save message, broadcasting anyway");
            }
            Err(_) => {
                let err = RepositoryError::Timeout(self.save_timeout);
                warn!(error = %err, sender_id = %msg.sender_id, "failed to save message, broadcasting anyway");
            }
        }

        self.delivery.send(msg).await.map_err(|_| HubError::Closed)
    }

    /// The broadcast loop. Must run on exactly one task.
    ///
    /// Consumes the delivery queue in order and fans each message out to
    /// every live connection. Returns when `shutdown` is cancelled.
    pub async fn run(&self, mut queue: DeliveryQueue, shutdown: CancellationToken) {
        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                next = queue.receiver.recv() => match next {
                    Some(msg) => {
                        let delivered = self.broadcast(msg);
                        debug!(delivered, "broadcast complete");
                    }
                    None => break,
                },
            }
        }
        debug!("broadcast loop stopped");
    }

    /// Push one message to every live connection.
    ///
    /// A connection whose send fails is removed and closed inside the same
    /// critical section, so it is dropped exactly once and sees nothing
    /// further. Returns the number of connections that accepted the message.
    fn broadcast(&self, msg: Message) -> usize {
        let msg = Arc::new(msg);
        let mut connections = self.lock_connections();

        let mut failed = Vec::new();
        for (id, handle) in connections.iter() {
            if let Err(err) = handle.send(&msg) {
                warn!(connection_id = %id, error = %err, "send failed, dropping connection");
                failed.push(*id);
            }
        }

        for id in &failed {
            if let Some(handle) = connections.remove(id) {
                handle.close();
            }
        }

        connections.len()
    }

    /// Close and forget every live connection.
    pub fn shutdown(&self) {
        let drained: Vec<ConnectionHandle> = {
            let mut connections = self.lock_connections();
            connections.drain().map(|(_, handle)| handle).collect()
        };
        for handle in &drained {
            handle.close();
        }
        info!(closed = drained.len(), "hub shut down");
    }

    fn lock_connections(&self) -> std::sync::MutexGuard<'_, HashMap<ConnectionId, ConnectionHandle>> {
        self.connections
            .lock()
            .expect("connection registry lock poisoned")
    }
}

impl<S> std::fmt::Debug for Hub<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let connections = self.connections.lock().map(|c| c.len()).unwrap_or_default();
        f.debug_struct("Hub")
            .field("connections", &connections)
            .field("outbound_capacity", &self.outbound_capacity)
            .field("save_timeout", &self.save_timeout)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
