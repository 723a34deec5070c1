//! One-time auto-open flag.
//!
//! The chat presents itself automatically only on the very first launch on a
//! device. The flag shares the key-value store with identity and history.

use std::sync::Arc;

use super::AUTO_OPENED_KEY;
use super::kv_store::KvStore;

pub struct AutoOpenFlag<S: KvStore> {
    store: Arc<S>,
    checked: bool,
}

impl<S: KvStore> AutoOpenFlag<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            checked: false,
        }
    }

    /// True exactly once per device; the first call records the flag.
    ///
    /// If storage cannot be read the first call in this process still returns
    /// true and later calls return false.
    pub async fn should_auto_open(&mut self) -> bool {
        if self.checked {
            return false;
        }
        self.checked = true;

        match self.store.get(AUTO_OPENED_KEY).await {
            Ok(Some(_)) => false,
            Ok(None) => {
                if let Err(e) = self.store.set(AUTO_OPENED_KEY, "1").await {
                    tracing::warn!(error = %e, "failed to record auto-open flag");
                }
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to read auto-open flag");
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::memory::MemoryKvStore;
    use crate::testing::FailingKvStore;

    #[tokio::test]
    async fn test_true_exactly_once_per_device() {
        let store = Arc::new(MemoryKvStore::new());

        let mut first = AutoOpenFlag::new(Arc::clone(&store));
        assert!(first.should_auto_open().await);
        assert!(!first.should_auto_open().await);

        let mut next_launch = AutoOpenFlag::new(store);
        assert!(!next_launch.should_auto_open().await);
    }

    #[tokio::test]
    async fn test_storage_failure_opens_once_in_process() {
        let mut flag = AutoOpenFlag::new(Arc::new(FailingKvStore));
        assert!(flag.should_auto_open().await);
        assert!(!flag.should_auto_open().await);
    }
}
