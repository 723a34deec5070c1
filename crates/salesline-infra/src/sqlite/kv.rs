//! SQLite key-value store implementation.
//!
//! Implements `KvStore` from `salesline-core` on the `device_store` table
//! using the split read/write pools.

use chrono::Utc;
use salesline_core::storage::kv_store::KvStore;
use salesline_types::error::StorageError;
use sqlx::Row;

use super::pool::DatabasePool;

/// SQLite-backed implementation of `KvStore`.
pub struct SqliteKvStore {
    pool: DatabasePool,
}

impl SqliteKvStore {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

impl KvStore for SqliteKvStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let row = sqlx::query("SELECT value FROM device_store WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(|e| StorageError::Query(e.to_string()))?;

        match row {
            Some(row) => {
                let value: String = row
                    .try_get("value")
                    .map_err(|e| StorageError::Query(e.to_string()))?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            r#"INSERT INTO device_store (key, value, created_at, updated_at)
               VALUES (?, ?, ?, ?)
               ON CONFLICT (key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at"#,
        )
        .bind(key)
        .bind(value)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool.writer)
        .await
        .map_err(|e| StorageError::Query(e.to_string()))?;

        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        sqlx::query("DELETE FROM device_store WHERE key = ?")
            .bind(key)
            .execute(&self.pool.writer)
            .await
            .map_err(|e| StorageError::Query(e.to_string()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use salesline_core::identity::IdentityStore;
    use salesline_core::storage::history::HistoryStore;
    use salesline_types::chat::ConversationMessage;
    use std::sync::Arc;

    async fn test_store(dir: &std::path::Path) -> SqliteKvStore {
        SqliteKvStore::new(DatabasePool::open_in(dir).await.unwrap())
    }

    #[tokio::test]
    async fn test_set_get_upsert_remove() {
        let dir = tempfile::tempdir().unwrap();
        let store = test_store(dir.path()).await;

        assert_eq!(store.get("k").await.unwrap(), None);
        store.set("k", "one").await.unwrap();
        store.set("k", "two").await.unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("two"));

        store.remove("k").await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), None);
        store.remove("k").await.unwrap();
    }

    #[tokio::test]
    async fn test_visitor_id_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();

        let first = IdentityStore::new(Arc::new(test_store(dir.path()).await))
            .get_or_create_visitor_id()
            .await;
        let second = IdentityStore::new(Arc::new(test_store(dir.path()).await))
            .get_or_create_visitor_id()
            .await;

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_conversation_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();

        let mut history = HistoryStore::new(Arc::new(test_store(dir.path()).await), "Welcome");
        let mut conversation = history.load().await;
        conversation.push(ConversationMessage::visitor("I need a mobile app"));
        conversation.push(ConversationMessage::assistant_final("I can help"));
        history.save(&conversation).await;

        let restored = HistoryStore::new(Arc::new(test_store(dir.path()).await), "Welcome")
            .load()
            .await;
        assert_eq!(restored, conversation);
    }
}
