use orion_types::Thread;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::watch;

use crate::store::ConversationStore;

/// Shared access to the conversation store.
///
/// Every `update` bumps a revision that observers (the snapshot writer, a UI)
/// can wait on. The lock is never held across an await point.
#[derive(Clone)]
pub struct StoreHandle {
    inner: Arc<Mutex<ConversationStore>>,
    revision: Arc<watch::Sender<u64>>,
}

impl StoreHandle {
    pub fn new(store: ConversationStore) -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            inner: Arc::new(Mutex::new(store)),
            revision: Arc::new(revision),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ConversationStore> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn read<R>(&self, f: impl FnOnce(&ConversationStore) -> R) -> R {
        f(&self.lock())
    }

    /// Mutate the store and notify observers
    pub fn update<R>(&self, f: impl FnOnce(&mut ConversationStore) -> R) -> R {
        let result = f(&mut self.lock());
        self.revision.send_modify(|rev| *rev += 1);
        result
    }

    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    pub fn revision(&self) -> u64 {
        *self.revision.borrow()
    }

    /// Copy of every thread, for persistence or display
    pub fn snapshot(&self) -> Vec<Thread> {
        self.read(|store| store.threads().to_vec())
    }
}

impl Default for StoreHandle {
    fn default() -> Self {
        Self::new(ConversationStore::default())
    }
}
