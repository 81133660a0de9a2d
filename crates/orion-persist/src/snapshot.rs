use orion_types::{SessionContext, Thread, UserProfile};
use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::error::Result;
use crate::handle::StoreHandle;
use crate::kv::KeyValueStore;

pub const KEY_THREADS: &str = "threads";
pub const KEY_USER_ID: &str = "userId";
pub const KEY_TOKEN: &str = "token";
pub const KEY_USER: &str = "user";

/// Typed view over the local key-value store
#[derive(Clone)]
pub struct LocalSnapshot {
    kv: Arc<dyn KeyValueStore>,
}

impl LocalSnapshot {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    /// Saved threads, `None` when nothing usable is stored
    pub async fn load_threads(&self) -> Result<Option<Vec<Thread>>> {
        let Some(raw) = self.kv.get(KEY_THREADS).await? else {
            return Ok(None);
        };

        match serde_json::from_str(&raw) {
            Ok(threads) => Ok(Some(threads)),
            Err(e) => {
                tracing::warn!("Ignoring unreadable thread snapshot: {}", e);
                Ok(None)
            }
        }
    }

    /// Saved threads, or the welcome thread on first launch
    pub async fn load_or_welcome(&self) -> Result<Vec<Thread>> {
        Ok(self
            .load_threads()
            .await?
            .unwrap_or_else(|| vec![Thread::welcome()]))
    }

    pub async fn save_threads(&self, threads: &[Thread]) -> Result<()> {
        self.kv.set(KEY_THREADS, serde_json::to_string(threads)?).await
    }

    /// Persistent anonymous identity, generated on first use
    pub async fn anonymous_id(&self) -> Result<String> {
        if let Some(id) = self.kv.get(KEY_USER_ID).await? {
            return Ok(id);
        }

        let id = uuid::Uuid::new_v4().to_string();
        self.kv.set(KEY_USER_ID, id.clone()).await?;
        tracing::info!("Created anonymous identity");
        Ok(id)
    }

    pub async fn load_credentials(&self) -> Result<Option<(String, UserProfile)>> {
        let token = self.kv.get(KEY_TOKEN).await?;
        let user = self.kv.get(KEY_USER).await?;

        match (token, user) {
            (Some(token), Some(user)) => Ok(Some((token, serde_json::from_str(&user)?))),
            _ => Ok(None),
        }
    }

    pub async fn save_credentials(&self, token: &str, user: &UserProfile) -> Result<()> {
        self.kv.set(KEY_TOKEN, token.to_string()).await?;
        self.kv.set(KEY_USER, serde_json::to_string(user)?).await
    }

    pub async fn clear_credentials(&self) -> Result<()> {
        self.kv.remove(KEY_TOKEN).await?;
        self.kv.remove(KEY_USER).await
    }

    /// Session context restored from stored credentials, anonymous otherwise
    pub async fn restore_session(&self) -> Result<SessionContext> {
        match self.load_credentials().await? {
            Some((token, user)) => Ok(SessionContext::authenticated(token, user)),
            None => Ok(SessionContext::anonymous(self.anonymous_id().await?)),
        }
    }
}

/// Single writer that mirrors the store into the local snapshot
pub struct SnapshotWriter;

impl SnapshotWriter {
    /// Persist the current threads if this session owns the local snapshot
    pub async fn write_once(
        store: &StoreHandle,
        snapshot: &LocalSnapshot,
        session: &SessionContext,
    ) -> Result<bool> {
        if !session.is_anonymous() {
            return Ok(false);
        }
        snapshot.save_threads(&store.snapshot()).await?;
        Ok(true)
    }

    /// Rewrite the snapshot after every store change until the store is dropped
    pub fn spawn(
        store: StoreHandle,
        snapshot: LocalSnapshot,
        session: SessionContext,
    ) -> JoinHandle<()> {
        let mut changes = store.subscribe();

        tokio::spawn(async move {
            while changes.changed().await.is_ok() {
                if let Err(e) = Self::write_once(&store, &snapshot, &session).await {
                    tracing::error!("Failed to write conversation snapshot: {}", e);
                }
            }
        })
    }
}
