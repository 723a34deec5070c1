//! In-memory fakes shared by the unit tests.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use tokio::sync::mpsc;

use salesline_types::error::{StorageError, TransportError};
use salesline_types::protocol::{FallbackRequest, FallbackResponse};
use salesline_types::visitor::VisitorId;

use crate::storage::kv_store::KvStore;
use crate::storage::memory::MemoryKvStore;
use crate::transport::connector::{FallbackClient, StreamChannel, StreamConnector};
use crate::transport::manager::TransportEvent;

/// Wait briefly for the next queued transport event.
pub async fn recv_event(rx: &mut mpsc::UnboundedReceiver<TransportEvent>) -> Option<TransportEvent> {
    tokio::time::timeout(Duration::from_millis(200), rx.recv())
        .await
        .ok()
        .flatten()
}

/// Store whose every operation fails.
pub struct FailingKvStore;

impl KvStore for FailingKvStore {
    async fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
        Err(StorageError::Connection("disk unavailable".to_string()))
    }

    async fn set(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
        Err(StorageError::Query("disk full".to_string()))
    }

    async fn remove(&self, _key: &str) -> Result<(), StorageError> {
        Err(StorageError::Query("disk full".to_string()))
    }
}

/// Memory store that counts writes.
#[derive(Default)]
pub struct CountingKvStore {
    inner: MemoryKvStore,
    writes: AtomicUsize,
}

impl CountingKvStore {
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

impl KvStore for CountingKvStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.set(key, value).await
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.inner.remove(key).await
    }
}

/// Memory store whose reads can be made to fail while writes keep working.
#[derive(Default)]
pub struct ReadFailingKvStore {
    inner: MemoryKvStore,
    reads_fail: AtomicBool,
}

impl ReadFailingKvStore {
    pub fn set_reads_failing(&self, failing: bool) {
        self.reads_fail.store(failing, Ordering::SeqCst);
    }
}

impl KvStore for ReadFailingKvStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        if self.reads_fail.load(Ordering::SeqCst) {
            return Err(StorageError::Connection("database is locked".to_string()));
        }
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.inner.set(key, value).await
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.inner.remove(key).await
    }
}

/// Server side of a fake stream.
pub struct FakeServer {
    client_frames: Option<mpsc::Receiver<String>>,
    frames: mpsc::UnboundedSender<Result<String, TransportError>>,
}

impl FakeServer {
    pub async fn recv_client_frame(&mut self) -> Option<String> {
        let client_frames = self.client_frames.as_mut()?;
        tokio::time::timeout(Duration::from_millis(200), client_frames.recv())
            .await
            .ok()
            .flatten()
    }

    /// Stop accepting client frames while keeping the inbound stream open.
    pub fn stop_reading(&mut self) {
        self.client_frames = None;
    }

    pub fn push(&self, frame: &str) {
        let _ = self.frames.send(Ok(frame.to_string()));
    }

    /// End the inbound stream cleanly.
    pub fn close(self) {}
}

/// Connector that either accepts every attempt or refuses every attempt.
pub struct FakeConnector {
    accept: bool,
    attempts: AtomicUsize,
    servers: Mutex<VecDeque<FakeServer>>,
}

impl FakeConnector {
    pub fn accepting() -> Self {
        Self::with(true)
    }

    pub fn refusing() -> Self {
        Self::with(false)
    }

    fn with(accept: bool) -> Self {
        Self {
            accept,
            attempts: AtomicUsize::new(0),
            servers: Mutex::new(VecDeque::new()),
        }
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Server side of the oldest accepted connection not yet taken.
    pub fn take_server(&self) -> Option<FakeServer> {
        self.servers.lock().unwrap().pop_front()
    }
}

impl StreamConnector for FakeConnector {
    async fn connect(&self, _visitor_id: &VisitorId) -> Result<StreamChannel, TransportError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if !self.accept {
            return Err(TransportError::Connect("connection refused".to_string()));
        }

        let (outbound, client_frames) = mpsc::channel(16);
        let (frames, mut inbound_rx) = mpsc::unbounded_channel();
        self.servers.lock().unwrap().push_back(FakeServer {
            client_frames: Some(client_frames),
            frames,
        });

        let inbound = futures_util::stream::poll_fn(move |cx| inbound_rx.poll_recv(cx));
        Ok(StreamChannel {
            outbound,
            inbound: Box::pin(inbound),
        })
    }
}

/// Fallback client that replays scripted replies in order.
#[derive(Default)]
pub struct FakeFallback {
    replies: Mutex<VecDeque<Result<FallbackResponse, TransportError>>>,
    requests: Mutex<Vec<FallbackRequest>>,
}

impl FakeFallback {
    pub fn replying(message: &str) -> Self {
        let fake = Self::default();
        fake.push_reply(Ok(FallbackResponse {
            message: message.to_string(),
            tools: Vec::new(),
        }));
        fake
    }

    pub fn failing() -> Self {
        let fake = Self::default();
        fake.push_reply(Err(TransportError::Status(503)));
        fake
    }

    pub fn push_reply(&self, reply: Result<FallbackResponse, TransportError>) {
        self.replies.lock().unwrap().push_back(reply);
    }

    pub fn requests(&self) -> Vec<FallbackRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl FallbackClient for FakeFallback {
    async fn send(&self, request: &FallbackRequest) -> Result<FallbackResponse, TransportError> {
        self.requests.lock().unwrap().push(request.clone());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::Fallback("no scripted reply".to_string())))
    }
}
