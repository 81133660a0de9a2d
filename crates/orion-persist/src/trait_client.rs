use async_trait::async_trait;
use orion_types::{Message, Thread};

use crate::error::Result;

/// One page of the thread listing
#[derive(Debug, Clone, PartialEq)]
pub struct ThreadPage {
    /// Shells only: `is_loaded` is false and messages are empty
    pub threads: Vec<Thread>,
    pub has_more: bool,
}

/// Server-side conversation history for authenticated users
///
/// Implementations must reject calls without a bearer token.
#[async_trait]
pub trait ConversationRepository: Send + Sync {
    /// List threads, newest first
    async fn list_threads(&self, limit: usize, offset: usize) -> Result<ThreadPage>;

    /// Get all messages of a thread
    async fn get_messages(&self, thread_id: &str) -> Result<Vec<Message>>;

    async fn delete_thread(&self, thread_id: &str) -> Result<()>;

    async fn rename_thread(&self, thread_id: &str, title: &str) -> Result<()>;
}
