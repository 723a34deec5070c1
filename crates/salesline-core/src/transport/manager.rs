//! Streaming connection lifecycle and delivery decisions.
//!
//! `TransportManager` owns one logical connection per visitor session. All
//! background work (connection attempt plus reader, reconnect timer, fallback
//! call) runs in spawned tasks that only post [`TransportEvent`]s into a single
//! unbounded queue. The session controller drains that queue and hands each
//! event back to [`TransportManager::handle`], so every state change happens
//! on one logical thread.
//!
//! Every connection attempt carries an epoch. Lifecycle events tagged with an
//! older epoch are ignored, which keeps a late close of a superseded socket
//! from tearing down the current one.
//!
//! Messages sent over the stream stay tracked until their reply finishes. If
//! the stream drops before a reply has started, those messages are resent
//! through the fallback so no exchange is silently lost.

use std::collections::VecDeque;
use std::sync::Arc;

use futures_util::StreamExt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use salesline_types::config::ReconnectConfig;
use salesline_types::connection::{ConnectionState, DeliveryPath};
use salesline_types::error::TransportError;
use salesline_types::protocol::{
    ClientFrame, FallbackRequest, FallbackResponse, ServerFrame, StreamEvent,
};
use salesline_types::visitor::VisitorId;

use super::backoff::ReconnectBackoff;
use super::connector::{FallbackClient, StreamChannel, StreamConnector};

/// Event posted by a background task.
#[derive(Debug)]
pub enum TransportEvent {
    /// A connection attempt succeeded.
    Opened {
        epoch: u64,
        outbound: mpsc::Sender<String>,
    },
    /// A connection attempt failed before opening.
    ConnectFailed { epoch: u64, error: TransportError },
    /// A raw text frame arrived on the stream.
    Frame { epoch: u64, text: String },
    /// The stream ended, cleanly (`reason` is None) or with an error.
    Closed { epoch: u64, reason: Option<String> },
    /// A reconnect timer scheduled during `epoch` fired.
    ReconnectDue { epoch: u64 },
    /// A fallback call finished.
    FallbackReply {
        result: Result<FallbackResponse, TransportError>,
    },
}

/// What the session must apply after the manager handled an event.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportUpdate {
    /// A protocol event for the assembler.
    Stream(StreamEvent),
    /// The stream dropped; any partial assistant message must be sealed.
    StreamDropped,
    /// The fallback call for an outgoing message failed.
    FallbackFailed(TransportError),
}

pub struct TransportManager<C: StreamConnector, F: FallbackClient> {
    visitor_id: VisitorId,
    connector: Arc<C>,
    fallback: Arc<F>,
    events_tx: mpsc::UnboundedSender<TransportEvent>,
    state: ConnectionState,
    epoch: u64,
    outbound: Option<mpsc::Sender<String>>,
    backoff: ReconnectBackoff,
    reconnect_pending: bool,
    /// Root token; cancelling it stops every background task.
    cancel: CancellationToken,
    /// Token of the current connection attempt.
    connection_cancel: Option<CancellationToken>,
    /// Messages sent over the stream whose reply has not finished, oldest first.
    unanswered: VecDeque<String>,
    /// Whether reply tokens for the oldest unanswered message have arrived.
    answering: bool,
    closed: bool,
}

impl<C: StreamConnector, F: FallbackClient> TransportManager<C, F> {
    /// Create a manager in the `disconnected` state and the receiving end of
    /// its event queue.
    pub fn new(
        visitor_id: VisitorId,
        connector: Arc<C>,
        fallback: Arc<F>,
        reconnect: ReconnectConfig,
    ) -> (Self, mpsc::UnboundedReceiver<TransportEvent>) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let manager = Self {
            visitor_id,
            connector,
            fallback,
            events_tx,
            state: ConnectionState::Disconnected,
            epoch: 0,
            outbound: None,
            backoff: ReconnectBackoff::new(reconnect),
            reconnect_pending: false,
            cancel: CancellationToken::new(),
            connection_cancel: None,
            unanswered: VecDeque::new(),
            answering: false,
            closed: false,
        };
        (manager, events_rx)
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn reconnect_pending(&self) -> bool {
        self.reconnect_pending
    }

    /// Start a connection attempt.
    ///
    /// No-op while an attempt is outstanding or the stream is open, and after
    /// `close`. Returns whether a new attempt was started.
    pub fn connect(&mut self) -> bool {
        if self.closed
            || matches!(
                self.state,
                ConnectionState::Connecting | ConnectionState::Connected
            )
        {
            return false;
        }

        if let Some(previous) = self.connection_cancel.take() {
            previous.cancel();
        }
        self.outbound = None;
        self.reconnect_pending = false;
        self.epoch += 1;
        self.state = ConnectionState::Connecting;

        let token = self.cancel.child_token();
        self.connection_cancel = Some(token.clone());
        tracing::debug!(visitor_id = %self.visitor_id, epoch = self.epoch, "opening stream");
        self.spawn_attempt(self.epoch, token);
        true
    }

    /// Deliver an outgoing message over the stream when it is open, otherwise
    /// through one fallback call whose result arrives as a queued event.
    pub async fn deliver(&mut self, message: &str) -> DeliveryPath {
        if self.state == ConnectionState::Connected {
            if let Some(outbound) = self.outbound.clone() {
                match serde_json::to_string(&ClientFrame {
                    message: message.to_string(),
                }) {
                    Ok(frame) => match outbound.send(frame).await {
                        Ok(()) => {
                            tracing::debug!(epoch = self.epoch, path = "stream", "message sent");
                            self.unanswered.push_back(message.to_string());
                            return DeliveryPath::Stream;
                        }
                        Err(_) => {
                            tracing::warn!(
                                epoch = self.epoch,
                                "stream not writable, delivering via fallback"
                            );
                            self.degrade();
                        }
                    },
                    Err(e) => {
                        tracing::warn!(error = %e, "failed to encode client frame");
                    }
                }
            }
        }

        // With no reconnect scheduled, give the stream one more try.
        if matches!(
            self.state,
            ConnectionState::Disconnected | ConnectionState::Degraded
        ) && !self.reconnect_pending
        {
            self.connect();
        }

        tracing::debug!(visitor_id = %self.visitor_id, path = "fallback", "message sent");
        self.spawn_fallback(message.to_string());
        DeliveryPath::Fallback
    }

    /// Apply a queued event to the lifecycle state.
    pub fn handle(&mut self, event: TransportEvent) -> Vec<TransportUpdate> {
        if self.closed {
            return Vec::new();
        }

        match event {
            TransportEvent::Opened { epoch, outbound } => {
                if self.is_stale(epoch, "opened") {
                    return Vec::new();
                }
                tracing::info!(visitor_id = %self.visitor_id, epoch, "stream connected");
                self.outbound = Some(outbound);
                self.state = ConnectionState::Connected;
                self.backoff.reset();
                self.reconnect_pending = false;
                Vec::new()
            }
            TransportEvent::ConnectFailed { epoch, error } => {
                if self.is_stale(epoch, "connect_failed") {
                    return Vec::new();
                }
                tracing::warn!(epoch, error = %error, "failed to open stream");
                self.drop_connection();
                self.schedule_reconnect();
                Vec::new()
            }
            TransportEvent::Frame { epoch, text } => {
                if self.is_stale(epoch, "frame") {
                    return Vec::new();
                }
                match ServerFrame::parse(&text) {
                    Ok(frame) => {
                        let event = StreamEvent::from(frame);
                        tracing::trace!(epoch, kind = event.kind(), "stream event");
                        self.track_reply(&event);
                        vec![TransportUpdate::Stream(event)]
                    }
                    Err(e) => {
                        tracing::warn!(epoch, error = %e, "ignoring stream frame");
                        Vec::new()
                    }
                }
            }
            TransportEvent::Closed { epoch, reason } => {
                if self.is_stale(epoch, "closed") {
                    return Vec::new();
                }
                if self.state == ConnectionState::Degraded {
                    // Already torn down when the send failed.
                    tracing::debug!(epoch, "degraded stream closed");
                    return vec![TransportUpdate::StreamDropped];
                }
                match &reason {
                    Some(reason) => tracing::warn!(epoch, reason = %reason, "stream closed"),
                    None => tracing::info!(epoch, "stream closed"),
                }
                self.drop_connection();
                self.resend_unanswered();
                self.schedule_reconnect();
                vec![TransportUpdate::StreamDropped]
            }
            TransportEvent::ReconnectDue { epoch } => {
                if epoch != self.epoch {
                    tracing::debug!(epoch, current = self.epoch, "ignoring stale reconnect timer");
                    return Vec::new();
                }
                self.reconnect_pending = false;
                tracing::debug!(epoch, attempt = self.backoff.attempts(), "reconnecting");
                self.connect();
                Vec::new()
            }
            TransportEvent::FallbackReply { result } => match result {
                Ok(response) => response
                    .into_events()
                    .into_iter()
                    .map(TransportUpdate::Stream)
                    .collect(),
                Err(error) => {
                    tracing::warn!(error = %error, "fallback request failed");
                    vec![TransportUpdate::FallbackFailed(error)]
                }
            },
        }
    }

    /// Close the stream and cancel every background task. Idempotent.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.cancel.cancel();
        self.connection_cancel = None;
        self.outbound = None;
        self.unanswered.clear();
        self.answering = false;
        self.reconnect_pending = false;
        self.state = ConnectionState::Disconnected;
        tracing::debug!(visitor_id = %self.visitor_id, "transport closed");
    }

    fn is_stale(&self, epoch: u64, kind: &str) -> bool {
        let stale = epoch != self.epoch;
        if stale {
            tracing::debug!(epoch, current = self.epoch, kind, "ignoring stale lifecycle event");
        }
        stale
    }

    fn drop_connection(&mut self) {
        if let Some(token) = self.connection_cancel.take() {
            token.cancel();
        }
        self.outbound = None;
        self.state = ConnectionState::Disconnected;
    }

    /// Tear down a stream that can no longer be written to. The reader is
    /// stopped too, so recovery does not wait for the socket to report a close.
    fn degrade(&mut self) {
        if let Some(token) = self.connection_cancel.take() {
            token.cancel();
        }
        self.outbound = None;
        self.state = ConnectionState::Degraded;
        self.resend_unanswered();
        self.schedule_reconnect();
    }

    fn track_reply(&mut self, event: &StreamEvent) {
        match event {
            StreamEvent::Token { .. } => self.answering = !self.unanswered.is_empty(),
            StreamEvent::Done | StreamEvent::Error { .. } => {
                self.unanswered.pop_front();
                self.answering = false;
            }
            _ => {}
        }
    }

    /// Hand messages the stream never answered to the fallback. A reply that
    /// already started streaming is kept as the partial answer.
    fn resend_unanswered(&mut self) {
        if std::mem::take(&mut self.answering) {
            self.unanswered.pop_front();
        }
        for message in std::mem::take(&mut self.unanswered) {
            tracing::warn!(
                visitor_id = %self.visitor_id,
                epoch = self.epoch,
                "stream dropped before replying, resending via fallback"
            );
            self.spawn_fallback(message);
        }
    }

    fn schedule_reconnect(&mut self) {
        if self.closed || self.reconnect_pending {
            return;
        }
        let Some(delay) = self.backoff.next_delay() else {
            tracing::info!(
                visitor_id = %self.visitor_id,
                attempts = self.backoff.attempts(),
                "reconnect attempts exhausted, waiting for next message"
            );
            return;
        };

        self.reconnect_pending = true;
        let epoch = self.epoch;
        let tx = self.events_tx.clone();
        let token = self.cancel.child_token();
        tracing::debug!(epoch, delay = ?delay, "scheduling reconnect");
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(delay) => {
                    let _ = tx.send(TransportEvent::ReconnectDue { epoch });
                }
            }
        });
    }

    fn spawn_attempt(&self, epoch: u64, token: CancellationToken) {
        let connector = Arc::clone(&self.connector);
        let tx = self.events_tx.clone();
        let visitor_id = self.visitor_id;

        tokio::spawn(async move {
            let result = tokio::select! {
                _ = token.cancelled() => return,
                result = connector.connect(&visitor_id) => result,
            };

            let StreamChannel {
                outbound,
                mut inbound,
            } = match result {
                Ok(channel) => channel,
                Err(error) => {
                    let _ = tx.send(TransportEvent::ConnectFailed { epoch, error });
                    return;
                }
            };

            if tx.send(TransportEvent::Opened { epoch, outbound }).is_err() {
                return;
            }

            let reason = loop {
                tokio::select! {
                    _ = token.cancelled() => return,
                    frame = inbound.next() => match frame {
                        Some(Ok(text)) => {
                            if tx.send(TransportEvent::Frame { epoch, text }).is_err() {
                                return;
                            }
                        }
                        Some(Err(e)) => break Some(e.to_string()),
                        None => break None,
                    },
                }
            };
            let _ = tx.send(TransportEvent::Closed { epoch, reason });
        });
    }

    fn spawn_fallback(&self, message: String) {
        let client = Arc::clone(&self.fallback);
        let tx = self.events_tx.clone();
        let token = self.cancel.child_token();
        let request = FallbackRequest {
            visitor_id: self.visitor_id,
            message,
        };

        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                result = client.send(&request) => {
                    let _ = tx.send(TransportEvent::FallbackReply { result });
                }
            }
        });
    }
}

impl<C: StreamConnector, F: FallbackClient> Drop for TransportManager<C, F> {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
