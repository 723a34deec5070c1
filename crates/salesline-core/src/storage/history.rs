//! Persisted conversation history.
//!
//! The whole conversation is one JSON record, replaced on every save. A
//! missing or corrupted record yields a fresh conversation seeded with the
//! welcome message. A failed read or write switches the store to memory-only
//! for the rest of the session so persistence problems never block the chat
//! and a record that could not be read is never overwritten.

use std::sync::Arc;

use salesline_types::chat::{Conversation, ConversationMessage};
use salesline_types::error::StorageError;

use super::CONVERSATION_KEY;
use super::kv_store::KvStore;

pub struct HistoryStore<S: KvStore> {
    store: Arc<S>,
    welcome_message: String,
    memory_only: bool,
}

impl<S: KvStore> HistoryStore<S> {
    pub fn new(store: Arc<S>, welcome_message: impl Into<String>) -> Self {
        Self {
            store,
            welcome_message: welcome_message.into(),
            memory_only: false,
        }
    }

    /// Whether a storage failure has disabled persistence for this session.
    pub fn is_memory_only(&self) -> bool {
        self.memory_only
    }

    /// Restore the persisted conversation, or seed a fresh one.
    ///
    /// Messages left open by a previous process are marked final: the stream
    /// that was feeding them is gone.
    pub async fn load(&mut self) -> Conversation {
        let raw = match self.store.get(CONVERSATION_KEY).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return self.seed(),
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    "failed to read conversation history, keeping this session in memory only"
                );
                self.memory_only = true;
                return self.seed();
            }
        };

        match serde_json::from_str::<Conversation>(&raw) {
            Ok(mut conversation) if !conversation.is_empty() => {
                let sealed = conversation.finalize_all();
                if sealed > 0 {
                    tracing::debug!(sealed, "finalized messages left open by a previous session");
                }
                tracing::debug!(messages = conversation.len(), "restored conversation history");
                conversation
            }
            Ok(_) => self.seed(),
            Err(e) => {
                tracing::warn!(error = %e, "stored conversation is unreadable, starting fresh");
                self.seed()
            }
        }
    }

    /// Replace the persisted conversation with `conversation`.
    pub async fn save(&mut self, conversation: &Conversation) {
        if self.memory_only {
            return;
        }

        let json = match serde_json::to_string(conversation) {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!(error = %e, "failed to serialize conversation");
                return;
            }
        };

        if let Err(e) = self.store.set(CONVERSATION_KEY, &json).await {
            tracing::warn!(
                error = %e,
                "failed to persist conversation, keeping history in memory only"
            );
            self.memory_only = true;
        }
    }

    /// Drop the persisted record so the next `load` seeds a fresh conversation.
    pub async fn reset(&mut self) -> Result<(), StorageError> {
        self.store.remove(CONVERSATION_KEY).await
    }

    fn seed(&self) -> Conversation {
        Conversation::from_messages(vec![ConversationMessage::assistant_final(
            self.welcome_message.clone(),
        )])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::memory::MemoryKvStore;
    use crate::testing::{FailingKvStore, ReadFailingKvStore};
    use salesline_types::chat::Sender;

    const WELCOME: &str = "Hi! What are you building?";

    #[tokio::test]
    async fn test_fresh_device_gets_single_final_welcome() {
        let mut history = HistoryStore::new(Arc::new(MemoryKvStore::new()), WELCOME);
        let conversation = history.load().await;

        assert_eq!(conversation.len(), 1);
        let msg = &conversation.messages()[0];
        assert_eq!(msg.sender, Sender::Assistant);
        assert_eq!(msg.text, WELCOME);
        assert!(msg.is_final);
    }

    #[tokio::test]
    async fn test_save_then_load_restores_identical_sequence() {
        let store = Arc::new(MemoryKvStore::new());
        let mut history = HistoryStore::new(Arc::clone(&store), WELCOME);

        let mut conversation = history.load().await;
        conversation.push(ConversationMessage::visitor("I need a mobile app"));
        conversation.push(ConversationMessage::assistant_final("I can help"));
        history.save(&conversation).await;

        let restored = HistoryStore::new(store, WELCOME).load().await;
        assert_eq!(restored, conversation);
    }

    #[tokio::test]
    async fn test_open_message_is_finalized_on_load() {
        let store = Arc::new(MemoryKvStore::new());
        let mut history = HistoryStore::new(Arc::clone(&store), WELCOME);

        let mut conversation = Conversation::new();
        conversation.push(ConversationMessage::visitor("hi"));
        conversation.push(ConversationMessage::assistant_open("Hel"));
        history.save(&conversation).await;

        let restored = history.load().await;
        assert_eq!(restored.open_assistant_count(), 0);
        assert_eq!(restored.messages()[1].text, "Hel");
    }

    #[tokio::test]
    async fn test_corrupted_record_starts_fresh() {
        let store = Arc::new(MemoryKvStore::new());
        store.set(CONVERSATION_KEY, "{not json").await.unwrap();

        let conversation = HistoryStore::new(store, WELCOME).load().await;
        assert_eq!(conversation.len(), 1);
        assert_eq!(conversation.messages()[0].text, WELCOME);
    }

    #[tokio::test]
    async fn test_write_failure_degrades_to_memory_only() {
        let mut history = HistoryStore::new(Arc::new(FailingKvStore), WELCOME);

        let conversation = history.load().await;
        assert_eq!(conversation.len(), 1);

        history.save(&conversation).await;
        assert!(history.is_memory_only());

        // Further saves are skipped without error.
        history.save(&conversation).await;
        assert!(history.is_memory_only());
    }

    #[tokio::test]
    async fn test_reset_removes_record() {
        let store = Arc::new(MemoryKvStore::new());
        let mut history = HistoryStore::new(Arc::clone(&store), WELCOME);

        let mut conversation = history.load().await;
        conversation.push(ConversationMessage::visitor("hello"));
        history.save(&conversation).await;

        history.reset().await.unwrap();
        assert_eq!(store.get(CONVERSATION_KEY).await.unwrap(), None);
        assert_eq!(history.load().await.len(), 1);
    }

    #[tokio::test]
    async fn test_unreadable_store_never_overwrites_saved_history() {
        let store = Arc::new(ReadFailingKvStore::default());
        let mut history = HistoryStore::new(Arc::clone(&store), WELCOME);
        let mut saved = history.load().await;
        saved.push(ConversationMessage::visitor("I need a mobile app"));
        saved.push(ConversationMessage::assistant_final("I can help"));
        history.save(&saved).await;

        store.set_reads_failing(true);
        let mut unreadable = HistoryStore::new(Arc::clone(&store), WELCOME);
        let mut fresh = unreadable.load().await;
        assert_eq!(fresh.len(), 1);
        assert!(unreadable.is_memory_only());

        fresh.push(ConversationMessage::visitor("hello again"));
        unreadable.save(&fresh).await;

        store.set_reads_failing(false);
        let restored = HistoryStore::new(store, WELCOME).load().await;
        assert_eq!(restored, saved);
    }
}
