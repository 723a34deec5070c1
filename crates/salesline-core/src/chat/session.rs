//! Session controller: the single API surface a front end consumes.
//!
//! Owns the visitor's conversation and connection state. Presentation code
//! calls `send_message` and drives `next_event` (or `drain_pending`); every
//! mutation is persisted and then announced to the registered observers.

use std::sync::Arc;

use tokio::sync::mpsc;

use salesline_types::chat::{Conversation, ConversationMessage};
use salesline_types::config::ClientConfig;
use salesline_types::connection::{ConnectionState, DeliveryPath};
use salesline_types::error::{SessionError, StorageError, TransportError};
use salesline_types::protocol::StreamEvent;
use salesline_types::visitor::VisitorId;

use super::assembler::MessageAssembler;
use super::observers::{ObserverId, Observers, ToolActivity};
use crate::identity::IdentityStore;
use crate::storage::history::HistoryStore;
use crate::storage::kv_store::KvStore;
use crate::transport::connector::{FallbackClient, StreamConnector};
use crate::transport::manager::{TransportEvent, TransportManager, TransportUpdate};

/// Assistant notice appended when a fallback call fails.
pub const FALLBACK_FAILURE_NOTICE: &str =
    "Sorry, I couldn't reach the assistant just now. Please try again in a moment.";

pub struct SessionController<S: KvStore, C: StreamConnector, F: FallbackClient> {
    visitor_id: VisitorId,
    history: HistoryStore<S>,
    conversation: Conversation,
    transport: TransportManager<C, F>,
    events: mpsc::UnboundedReceiver<TransportEvent>,
    observers: Observers,
    typing: bool,
    connection: ConnectionState,
    closed: bool,
}

impl<S: KvStore, C: StreamConnector, F: FallbackClient> SessionController<S, C, F> {
    /// Resolve the visitor id, restore history and start opening the stream.
    pub async fn start(
        store: Arc<S>,
        connector: Arc<C>,
        fallback: Arc<F>,
        config: &ClientConfig,
    ) -> Self {
        let visitor_id = IdentityStore::new(Arc::clone(&store))
            .get_or_create_visitor_id()
            .await;
        let mut history = HistoryStore::new(store, config.welcome_message.clone());
        let conversation = history.load().await;

        let (mut transport, events) =
            TransportManager::new(visitor_id, connector, fallback, config.reconnect.clone());
        transport.connect();

        tracing::info!(
            visitor_id = %visitor_id,
            messages = conversation.len(),
            "session started"
        );

        Self {
            visitor_id,
            history,
            typing: MessageAssembler::is_typing(&conversation),
            conversation,
            connection: transport.state(),
            transport,
            events,
            observers: Observers::default(),
            closed: false,
        }
    }

    pub fn visitor_id(&self) -> VisitorId {
        self.visitor_id
    }

    pub fn messages(&self) -> &[ConversationMessage] {
        self.conversation.messages()
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn is_typing(&self) -> bool {
        self.typing
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.connection
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Whether a storage failure has made history memory-only for this session.
    pub fn is_history_memory_only(&self) -> bool {
        self.history.is_memory_only()
    }

    pub fn on_messages_changed(
        &mut self,
        observer: impl Fn(&[ConversationMessage]) + Send + 'static,
    ) -> ObserverId {
        self.observers.add_messages(Box::new(observer))
    }

    /// Called only when the typing indicator actually flips.
    pub fn on_typing_changed(&mut self, observer: impl Fn(bool) + Send + 'static) -> ObserverId {
        self.observers.add_typing(Box::new(observer))
    }

    pub fn on_connection_changed(
        &mut self,
        observer: impl Fn(ConnectionState) + Send + 'static,
    ) -> ObserverId {
        self.observers.add_connection(Box::new(observer))
    }

    pub fn on_error(&mut self, observer: impl Fn(&str) + Send + 'static) -> ObserverId {
        self.observers.add_error(Box::new(observer))
    }

    pub fn on_tool_activity(
        &mut self,
        observer: impl Fn(&ToolActivity) + Send + 'static,
    ) -> ObserverId {
        self.observers.add_tool(Box::new(observer))
    }

    pub fn remove_observer(&mut self, id: ObserverId) -> bool {
        self.observers.remove(id)
    }

    /// Append the visitor's message and hand it to the transport.
    ///
    /// The visitor message is persisted and announced before delivery starts,
    /// so it is never lost when the transport fails.
    pub async fn send_message(&mut self, text: &str) -> Result<DeliveryPath, SessionError> {
        if self.closed {
            return Err(SessionError::Closed);
        }
        let text = text.trim();
        if text.is_empty() {
            return Err(SessionError::EmptyMessage);
        }

        self.conversation.push(ConversationMessage::visitor(text));
        self.commit().await;

        let path = self.transport.deliver(text).await;
        self.sync_connection();
        Ok(path)
    }

    /// Wait for the next queued transport event and apply it.
    ///
    /// Returns false once the session is closed.
    pub async fn next_event(&mut self) -> bool {
        if self.closed {
            return false;
        }
        match self.events.recv().await {
            Some(event) => {
                self.process(event).await;
                true
            }
            None => false,
        }
    }

    /// Apply every event already queued without waiting. Returns how many.
    pub async fn drain_pending(&mut self) -> usize {
        let mut applied = 0;
        while !self.closed {
            let Ok(event) = self.events.try_recv() else {
                break;
            };
            self.process(event).await;
            applied += 1;
        }
        applied
    }

    /// Forget the stored conversation and start over from the welcome message.
    pub async fn clear_history(&mut self) -> Result<(), StorageError> {
        self.history.reset().await?;
        self.conversation = self.history.load().await;
        self.observers.messages_changed(self.conversation.messages());
        self.set_typing(MessageAssembler::is_typing(&self.conversation));
        Ok(())
    }

    /// Close the stream, cancel background work and drop observers. Idempotent.
    pub async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.transport.close();

        if MessageAssembler::seal_open(&mut self.conversation) {
            self.history.save(&self.conversation).await;
        }
        self.observers.clear();
        self.typing = false;
        self.connection = self.transport.state();
        tracing::info!(visitor_id = %self.visitor_id, "session closed");
    }

    async fn process(&mut self, event: TransportEvent) {
        for update in self.transport.handle(event) {
            match update {
                TransportUpdate::Stream(event) => self.apply_stream_event(event).await,
                TransportUpdate::StreamDropped => {
                    if MessageAssembler::seal_open(&mut self.conversation) {
                        tracing::debug!("finalized partial reply after stream drop");
                        self.commit().await;
                    }
                    self.set_typing(false);
                }
                TransportUpdate::FallbackFailed(error) => self.fallback_failed(error).await,
            }
        }
        self.sync_connection();
    }

    async fn apply_stream_event(&mut self, event: StreamEvent) {
        match &event {
            StreamEvent::Tool { payload } => {
                tracing::debug!(payload = %payload, "tool invoked");
                self.observers
                    .tool_activity(&ToolActivity::Invoked(payload.clone()));
            }
            StreamEvent::ToolResult { payload } => {
                tracing::debug!(payload = %payload, "tool completed");
                self.observers
                    .tool_activity(&ToolActivity::Completed(payload.clone()));
            }
            _ => {}
        }

        let applied = MessageAssembler::apply(&mut self.conversation, event);
        if applied.mutated {
            self.commit().await;
        }
        self.set_typing(applied.typing);

        if let Some(error) = applied.error {
            tracing::warn!(error = %error, "agent reported an error");
            self.observers.error(&error);
        }
    }

    async fn fallback_failed(&mut self, error: TransportError) {
        MessageAssembler::seal_open(&mut self.conversation);
        self.conversation
            .push(ConversationMessage::assistant_final(FALLBACK_FAILURE_NOTICE));
        self.commit().await;
        self.set_typing(false);
        self.observers.error(&error.to_string());
    }

    async fn commit(&mut self) {
        self.history.save(&self.conversation).await;
        self.observers.messages_changed(self.conversation.messages());
    }

    fn set_typing(&mut self, typing: bool) {
        if self.typing != typing {
            self.typing = typing;
            self.observers.typing_changed(typing);
        }
    }

    fn sync_connection(&mut self) {
        let state = self.transport.state();
        if self.connection != state {
            tracing::debug!(from = %self.connection, to = %state, "connection state changed");
            self.connection = state;
            self.observers.connection_changed(state);
        }
    }
}
