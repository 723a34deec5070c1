//! Application state wiring storage, config and transports together.
//!
//! The session types are generic over their ports; `AppState` pins them to
//! the concrete infra implementations.

use std::path::PathBuf;
use std::sync::Arc;

use salesline_core::chat::SessionController;
use salesline_core::storage::kv_store::KvStore;
use salesline_core::storage::memory::MemoryKvStore;
use salesline_infra::config::load_client_config;
use salesline_infra::filesystem::{ensure_data_dir, resolve_data_dir};
use salesline_infra::sqlite::kv::SqliteKvStore;
use salesline_infra::sqlite::pool::DatabasePool;
use salesline_infra::transport::{HttpFallbackClient, WsConnector};
use salesline_types::config::ClientConfig;
use salesline_types::error::StorageError;

/// Session pinned to the concrete adapters.
pub type ConcreteSession = SessionController<DeviceStore, WsConnector, HttpFallbackClient>;

/// Device storage: SQLite when the database opens, memory otherwise.
pub enum DeviceStore {
    Sqlite(SqliteKvStore),
    Memory(MemoryKvStore),
}

impl DeviceStore {
    pub fn is_durable(&self) -> bool {
        matches!(self, DeviceStore::Sqlite(_))
    }
}

impl KvStore for DeviceStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        match self {
            DeviceStore::Sqlite(store) => store.get(key).await,
            DeviceStore::Memory(store) => store.get(key).await,
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        match self {
            DeviceStore::Sqlite(store) => store.set(key, value).await,
            DeviceStore::Memory(store) => store.set(key, value).await,
        }
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        match self {
            DeviceStore::Sqlite(store) => store.remove(key).await,
            DeviceStore::Memory(store) => store.remove(key).await,
        }
    }
}

pub struct AppState {
    pub data_dir: PathBuf,
    pub config: ClientConfig,
    pub store: Arc<DeviceStore>,
}

impl AppState {
    /// Resolve the data directory, load config and open device storage.
    ///
    /// Storage that cannot be opened degrades to memory with a warning; the
    /// chat still works, it just forgets everything on exit.
    pub async fn init(server_override: Option<&str>) -> anyhow::Result<Self> {
        let data_dir = resolve_data_dir();
        if let Err(e) = ensure_data_dir(&data_dir).await {
            tracing::warn!(path = %data_dir.display(), error = %e, "failed to create data directory");
        }

        let mut config = load_client_config(&data_dir).await;
        if let Some(server) = server_override {
            config.server_url = server.trim_end_matches('/').to_string();
        }

        let store = match DatabasePool::open_in(&data_dir).await {
            Ok(pool) => DeviceStore::Sqlite(SqliteKvStore::new(pool)),
            Err(e) => {
                tracing::warn!(error = %e, "device storage unavailable, history will not persist");
                DeviceStore::Memory(MemoryKvStore::new())
            }
        };

        tracing::debug!(
            data_dir = %data_dir.display(),
            server = %config.server_url,
            durable = store.is_durable(),
            "application state ready"
        );

        Ok(Self {
            data_dir,
            config,
            store: Arc::new(store),
        })
    }

    pub fn fallback_client(&self) -> anyhow::Result<HttpFallbackClient> {
        Ok(HttpFallbackClient::new(&self.config)?)
    }

    /// Start a session: resolve identity, restore history, open the stream.
    pub async fn start_session(&self) -> anyhow::Result<ConcreteSession> {
        let connector = Arc::new(WsConnector::new(self.config.clone()));
        let fallback = Arc::new(self.fallback_client()?);
        Ok(SessionController::start(Arc::clone(&self.store), connector, fallback, &self.config).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_device_store_delegates() {
        let store = DeviceStore::Memory(MemoryKvStore::new());
        assert!(!store.is_durable());

        store.set("k", "v").await.unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v"));
        store.remove("k").await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_sqlite_device_store_is_durable() {
        let dir = tempfile::tempdir().unwrap();
        let pool = DatabasePool::open_in(dir.path()).await.unwrap();
        let store = DeviceStore::Sqlite(SqliteKvStore::new(pool));
        assert!(store.is_durable());

        store.set("k", "v").await.unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v"));
    }
}
