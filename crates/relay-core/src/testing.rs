//! In-memory fakes shared by the hub and connection tests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use relay_types::config::HubConfig;
use relay_types::error::{ConnectionError, RepositoryError};
use relay_types::message::{Message, MessageId};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::connection::{FrameReader, FrameWriter};
use crate::hub::Hub;
use crate::store::MessageStore;

/// Vec-backed store that can be switched into failing or stalling mode.
#[derive(Default)]
pub(crate) struct MemoryStore {
    messages: Mutex<Vec<Message>>,
    fail: AtomicBool,
    stall: AtomicBool,
}

impl MemoryStore {
    pub(crate) fn failing() -> Self {
        let store = Self::default();
        store.fail.store(true, Ordering::SeqCst);
        store
    }

    pub(crate) fn stalling() -> Self {
        let store = Self::default();
        store.stall.store(true, Ordering::SeqCst);
        store
    }

    pub(crate) fn saved(&self) -> Vec<Message> {
        self.messages.lock().unwrap().clone()
    }
}

impl MessageStore for MemoryStore {
    async fn save(&self, msg: &Message) -> Result<MessageId, RepositoryError> {
        if self.stall.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(RepositoryError::Query("disk full".to_string()));
        }
        let mut messages = self.messages.lock().unwrap();
        let id = MessageId(messages.len() as i64 + 1);
        messages.push(Message {
            id: Some(id),
            ..msg.clone()
        });
        Ok(id)
    }

    async fn list_all(&self) -> Result<Vec<Message>, RepositoryError> {
        Ok(self.saved())
    }
}

/// Start a hub with its broadcast loop running on a background task.
pub(crate) fn spawn_hub<S: MessageStore>(
    store: Arc<S>,
    config: &HubConfig,
) -> (Arc<Hub<S>>, CancellationToken, JoinHandle<()>) {
    let (hub, queue) = Hub::new(store, config);
    let shutdown = CancellationToken::new();
    let runner = {
        let hub = Arc::clone(&hub);
        let shutdown = shutdown.clone();
        tokio::spawn(async move { hub.run(queue, shutdown).await })
    };
    (hub, shutdown, runner)
}

/// Reader fed from a channel; dropping the sender simulates the peer closing.
pub(crate) struct ScriptedReader {
    frames: mpsc::UnboundedReceiver<Result<Message, ConnectionError>>,
}

impl ScriptedReader {
    pub(crate) fn new() -> (mpsc::UnboundedSender<Result<Message, ConnectionError>>, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        (tx, Self { frames: rx })
    }
}

impl FrameReader for ScriptedReader {
    async fn next_message(&mut self) -> Option<Result<Message, ConnectionError>> {
        self.frames.recv().await
    }
}

/// Writer that forwards every frame to a channel, or fails every write.
pub(crate) struct RecordingWriter {
    written: mpsc::UnboundedSender<Message>,
    fail: bool,
    closed: Arc<AtomicBool>,
}

impl RecordingWriter {
    pub(crate) fn new() -> (mpsc::UnboundedReceiver<Message>, Arc<AtomicBool>, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        let closed = Arc::new(AtomicBool::new(false));
        let writer = Self {
            written: tx,
            fail: false,
            closed: Arc::clone(&closed),
        };
        (rx, closed, writer)
    }

    pub(crate) fn broken() -> (Arc<AtomicBool>, Self) {
        let (_rx, closed, mut writer) = Self::new();
        writer.fail = true;
        (closed, writer)
    }
}

impl FrameWriter for RecordingWriter {
    async fn write(&mut self, msg: &Message) -> Result<(), ConnectionError> {
        if self.fail {
            return Err(ConnectionError::Transport("broken pipe".to_string()));
        }
        self.written
            .send(msg.clone())
            .map_err(|_| ConnectionError::Closed)
    }

    async fn close(&mut self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// Writer whose `write` never completes, like a peer that stopped reading.
pub(crate) struct StalledWriter {
    closed: Arc<AtomicBool>,
}

impl StalledWriter {
    pub(crate) fn new() -> (Arc<AtomicBool>, Self) {
        let closed = Arc::new(AtomicBool::new(false));
        (Arc::clone(&closed), Self { closed })
    }
}

impl FrameWriter for StalledWriter {
    async fn write(&mut self, _msg: &Message) -> Result<(), ConnectionError> {
        std::future::pending().await
    }

    async fn close(&mut self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}
