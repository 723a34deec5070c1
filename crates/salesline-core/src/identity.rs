//! Durable visitor identity.
//!
//! The visitor id is generated once per device and reused by every later
//! session. Storage problems never prevent a session from starting: the id
//! then lives in memory for this process only.

use std::sync::Arc;

use salesline_types::visitor::VisitorId;

use crate::storage::VISITOR_ID_KEY;
use crate::storage::kv_store::KvStore;

pub struct IdentityStore<S: KvStore> {
    store: Arc<S>,
    cached: Option<VisitorId>,
}

impl<S: KvStore> IdentityStore<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            cached: None,
        }
    }

    /// Return the persisted visitor id, creating and persisting one on first use.
    pub async fn get_or_create_visitor_id(&mut self) -> VisitorId {
        if let Some(id) = self.cached {
            return id;
        }

        let mut read_failed = false;
        let id = match self.store.get(VISITOR_ID_KEY).await {
            Ok(Some(raw)) => match raw.parse::<VisitorId>() {
                Ok(id) => Some(id),
                Err(e) => {
                    tracing::warn!(error = %e, "stored visitor id is invalid, generating a new one");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(error = %e, "failed to read visitor id");
                read_failed = true;
                None
            }
        };

        let id = match id {
            Some(id) => id,
            // A stored id may still exist; writing here would replace it.
            None if read_failed => {
                let id = VisitorId::generate();
                tracing::warn!(visitor_id = %id, "using a visitor id for this process only");
                id
            }
            None => {
                let id = VisitorId::generate();
                match self.store.set(VISITOR_ID_KEY, &id.to_string()).await {
                    Ok(()) => tracing::info!(visitor_id = %id, "created visitor identity"),
                    Err(e) => tracing::warn!(
                        visitor_id = %id,
                        error = %e,
                        "failed to persist visitor id, using it for this process only"
                    ),
                }
                id
            }
        };

        self.cached = Some(id);
        id
    }
}
