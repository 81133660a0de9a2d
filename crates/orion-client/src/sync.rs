use orion_persist::{ConversationRepository, LocalSnapshot, PersistError, StoreHandle};
use orion_types::SessionContext;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use crate::auth::AuthClient;
use crate::error::{ClientError, Result};

/// Keeps the store in line with whichever side owns the conversation list.
///
/// Anonymous sessions read the local snapshot. Authenticated sessions page
/// thread shells from the server and fetch message bodies on first selection.
pub struct ConversationSync {
    store: StoreHandle,
    session: SessionContext,
    snapshot: LocalSnapshot,
    repository: Arc<dyn ConversationRepository>,
    page_size: usize,
    next_offset: AtomicUsize,
    has_more: AtomicBool,
}

impl ConversationSync {
    pub fn new(
        store: StoreHandle,
        session: SessionContext,
        snapshot: LocalSnapshot,
        repository: Arc<dyn ConversationRepository>,
        page_size: usize,
    ) -> Self {
        Self {
            store,
            session,
            snapshot,
            repository,
            page_size,
            next_offset: AtomicUsize::new(0),
            has_more: AtomicBool::new(false),
        }
    }

    pub fn has_more(&self) -> bool {
        self.has_more.load(Ordering::Relaxed)
    }

    /// Replace the store contents from the owning source
    pub async fn load_initial(&self) -> Result<()> {
        if !self.session.is_authenticated() {
            return self.load_local().await;
        }

        self.reset_paging();

        let page = self.guard(self.repository.list_threads(self.page_size, 0).await).await?;
        self.next_offset.store(page.threads.len(), Ordering::Relaxed);
        self.has_more.store(page.has_more, Ordering::Relaxed);
        tracing::info!(count = page.threads.len(), "Loaded remote conversations");

        self.store.update(|s| {
            s.replace_threads(page.threads);
            if s.threads().is_empty() {
                s.create_thread();
            }
        });

        if let Some(active) = self.store.read(|s| s.active_thread_id().map(str::to_owned)) {
            self.select_thread(&active).await?;
        }
        Ok(())
    }

    /// Sign out and return to the local conversations.
    ///
    /// The store holds the local threads before the session turns anonymous,
    /// so the snapshot writer only ever sees local threads under that session.
    pub async fn logout(&self, auth: &AuthClient) -> Result<()> {
        self.load_local().await?;
        auth.logout().await
    }

    async fn load_local(&self) -> Result<()> {
        self.reset_paging();
        let threads = self.snapshot.load_or_welcome().await?;
        tracing::info!(count = threads.len(), "Loaded local conversations");
        self.store.update(|s| s.replace_threads(threads));
        Ok(())
    }

    fn reset_paging(&self) {
        self.next_offset.store(0, Ordering::Relaxed);
        self.has_more.store(false, Ordering::Relaxed);
    }

    /// Fetch the next listing page. Returns `false` when there was nothing left.
    pub async fn load_more(&self) -> Result<bool> {
        if !self.session.is_authenticated() || !self.has_more() {
            return Ok(false);
        }

        let offset = self.next_offset.load(Ordering::Relaxed);
        let page = self
            .guard(self.repository.list_threads(self.page_size, offset).await)
            .await?;

        self.next_offset
            .store(offset + page.threads.len(), Ordering::Relaxed);
        self.has_more.store(page.has_more, Ordering::Relaxed);
        self.store.update(|s| s.extend_threads(page.threads));
        Ok(true)
    }

    /// Activate a thread, fetching its messages the first time a remote shell is opened
    pub async fn select_thread(&self, thread_id: &str) -> Result<()> {
        let needs_load = self.store.update(|s| s.select_thread(thread_id))?;
        if !needs_load || !self.session.is_authenticated() {
            return Ok(());
        }

        let messages = self.guard(self.repository.get_messages(thread_id).await).await?;
        tracing::debug!(%thread_id, count = messages.len(), "Fetched thread messages");

        // The thread may have been deleted while the request was in flight
        match self.store.update(|s| s.load_messages(thread_id, messages)) {
            Ok(()) | Err(PersistError::ThreadNotFound(_)) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn delete_thread(&self, thread_id: &str) -> Result<()> {
        if self.session.is_authenticated() {
            // Threads created locally have no server copy until their first send
            match self.guard(self.repository.delete_thread(thread_id).await).await {
                Ok(()) | Err(ClientError::Persist(PersistError::Status { status: 404, .. })) => {}
                Err(e) => return Err(e),
            }
        }
        self.store.update(|s| s.delete_thread(thread_id))?;
        Ok(())
    }

    pub async fn rename_thread(&self, thread_id: &str, title: &str) -> Result<()> {
        let title = title.trim();
        if self.session.is_authenticated() {
            match self.guard(self.repository.rename_thread(thread_id, title).await).await {
                Ok(()) | Err(ClientError::Persist(PersistError::Status { status: 404, .. })) => {}
                Err(e) => return Err(e),
            }
        }
        self.store.update(|s| s.rename_thread(thread_id, title))?;
        Ok(())
    }

    /// Server rejected the token: drop it everywhere and wait for a new login
    pub async fn expire_session(&self) -> Result<()> {
        let anonymous_id = self.snapshot.anonymous_id().await?;
        self.session.expire(anonymous_id);
        self.snapshot.clear_credentials().await?;
        tracing::warn!("Session expired, re-authentication required");
        Ok(())
    }

    async fn guard<T>(&self, result: orion_persist::error::Result<T>) -> Result<T> {
        match result {
            Err(PersistError::AuthExpired) => {
                self.expire_session().await?;
                Err(ClientError::Persist(PersistError::AuthExpired))
            }
            other => other.map_err(ClientError::from),
        }
    }
}
